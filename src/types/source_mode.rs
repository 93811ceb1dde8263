//! Frame source retrieval mode

use serde::{Deserialize, Serialize};

/// Where frame bytes come from during a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Parse the capture once and keep every frame in memory
    #[default]
    Materialized,

    /// Re-read and re-parse the capture on every cycle.
    /// Memory use stays bounded by the largest block, not the file size.
    Streaming,
}

impl SourceMode {
    pub fn is_streaming(self) -> bool {
        matches!(self, SourceMode::Streaming)
    }
}
