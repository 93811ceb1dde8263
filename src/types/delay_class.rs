//! Delay classes derived from a frame's header

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header of class-A frames (`60 01 13 20`).
pub const CLASS_A_HEADER: [u8; 4] = [0x60, 0x01, 0x13, 0x20];

/// Header of class-B frames (`60 01 13 30`).
pub const CLASS_B_HEADER: [u8; 4] = [0x60, 0x01, 0x13, 0x30];

/// Pacing category of a frame.
///
/// Class A and class B frames are paced relative to the previous send of the
/// *same* class: they only wait for whatever is left of their minimum interval.
/// Every other frame pays a flat delay before it is sent, no matter what was
/// sent before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayClass {
    /// Header `60 01 13 20`, at least 1000 ms between class-A sends
    ClassA,
    /// Header `60 01 13 30`, at least 10 ms between class-B sends
    ClassB,
    /// Anything else, flat 10 ms before every send
    Default,
}

impl DelayClass {
    /// Classify a payload by its first four bytes.
    ///
    /// Payloads shorter than four bytes are always [`DelayClass::Default`].
    pub fn of(payload: &[u8]) -> Self {
        match payload.get(..4) {
            Some(header) if header == CLASS_A_HEADER => DelayClass::ClassA,
            Some(header) if header == CLASS_B_HEADER => DelayClass::ClassB,
            _ => DelayClass::Default,
        }
    }

    /// Minimum interval for the class.
    ///
    /// For [`DelayClass::Default`] this is the flat pre-send delay.
    pub const fn min_interval(self) -> Duration {
        match self {
            DelayClass::ClassA => Duration::from_millis(1000),
            DelayClass::ClassB => Duration::from_millis(10),
            DelayClass::Default => Duration::from_millis(10),
        }
    }

    /// Whether the scheduler keeps a last-send timestamp for this class.
    pub const fn is_tracked(self) -> bool {
        !matches!(self, DelayClass::Default)
    }
}
