//! Serial device transport
//!
//! Writes frames to a serial device node (e.g. a USB-RS485 adapter at
//! `/dev/ttyUSB0`). The device is opened write-only; line settings in
//! [`SerialConfig`] are reported but must already be applied to the device.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::transport::{PortInfo, Transport};
use crate::{ReplayError, Result};

/// Transport writing to a serial device node
pub struct SerialTransport {
    config: SerialConfig,
    device: Mutex<Option<File>>,
    connected: AtomicBool,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self { config, device: Mutex::new(None), connected: AtomicBool::new(false) }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    async fn write_frame(device: &mut File, payload: &[u8]) -> std::io::Result<()> {
        device.write_all(payload).await?;
        device.flush().await
    }
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn connect(&self) -> Result<()> {
        let port = &self.config.port;
        info!("Opening {} at {} baud", port, self.config.baud_rate);

        let file = OpenOptions::new().write(true).open(port).await.map_err(|e| {
            ReplayError::transport_failed_with_source(format!("cannot open {port}"), Box::new(e))
        })?;

        tokio::time::sleep(self.config.settle()).await;

        *self.device.lock().await = Some(file);
        self.connected.store(true, Ordering::SeqCst);
        info!("Connected to {}", port);
        Ok(())
    }

    async fn send(&self, payload: &[u8]) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }

        let mut device = self.device.lock().await;
        let Some(file) = device.as_mut() else {
            return false;
        };

        let timeout = self.config.write_timeout();
        match tokio::time::timeout(timeout, Self::write_frame(file, payload)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Write to {} failed: {}", self.config.port, e);
                false
            }
            Err(_) => {
                warn!("{}", ReplayError::Timeout { duration: timeout });
                false
            }
        }
    }

    async fn disconnect(&self) {
        let device = self.device.lock().await.take();
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut file) = device {
            if let Err(e) = file.flush().await {
                warn!("Flush on close of {} failed: {}", self.config.port, e);
            }
            debug!("Closed {}", self.config.port);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn port_info(&self) -> PortInfo {
        let connected = self.is_connected();
        PortInfo {
            port: self.config.port.clone(),
            baud_rate: self.config.baud_rate,
            is_connected: connected,
            // `device` is only populated while connected
            is_open: connected,
        }
    }
}
