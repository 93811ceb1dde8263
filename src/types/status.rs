//! Point-in-time scheduler snapshot

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot returned by [`ReplayController::status`](crate::ReplayController::status).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub paused: bool,
    /// 1-based position in the current cycle, 0 between cycles
    pub current_index: usize,
    pub total_frames: usize,
    pub cycle_count: u64,
    /// Successful sends over the controller's lifetime
    pub total_sent: u64,
    /// Worst observed overshoot of a pacing sleep
    pub max_drift: Duration,
}
