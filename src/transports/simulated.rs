//! Simulated transport for dry runs without hardware

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{info, trace};

use crate::config::SerialConfig;
use crate::transport::{PortInfo, Transport};
use crate::types::readable;
use crate::Result;

/// Transport that accepts every payload while "connected".
///
/// Nothing is written anywhere; sends are only logged at trace level.
pub struct SimulatedTransport {
    config: SerialConfig,
    connected: AtomicBool,
    sends: AtomicU64,
}

impl SimulatedTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self { config, connected: AtomicBool::new(false), sends: AtomicU64::new(0) }
    }

    /// Payloads accepted so far
    pub fn sends(&self) -> u64 {
        self.sends.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Transport for SimulatedTransport {
    async fn connect(&self) -> Result<()> {
        info!("Test mode: skipping real connection to {}", self.config.port);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, payload: &[u8]) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        self.sends.fetch_add(1, Ordering::Relaxed);
        trace!("Simulated send: {}", readable(payload));
        true
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn port_info(&self) -> PortInfo {
        PortInfo {
            port: self.config.port.clone(),
            baud_rate: self.config.baud_rate,
            is_connected: self.is_connected(),
            is_open: false,
        }
    }
}
