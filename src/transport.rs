//! Transport trait for the point-to-point link

use serde::{Deserialize, Serialize};

use crate::Result;

/// Connection details reported by a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub port: String,
    pub baud_rate: u32,
    pub is_connected: bool,
    pub is_open: bool,
}

/// Link the scheduler writes frames to.
///
/// Methods take `&self` so one transport can be shared between the replay
/// loop and the code that opened it. Implementations own their I/O timeouts;
/// the scheduler never times out a send.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the link
    async fn connect(&self) -> Result<()>;

    /// Write one payload.
    ///
    /// Returns `false` when the payload was not fully written. A failed send
    /// is an outcome, not an error: the replay carries on.
    async fn send(&self, payload: &[u8]) -> bool;

    /// Close the link. Safe to call when already closed.
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    fn port_info(&self) -> PortInfo;
}
