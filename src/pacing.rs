//! Per-class send pacing
//!
//! Class A and class B frames wait only for the part of their minimum
//! interval that has not yet elapsed since the last send of the same class.
//! Default frames always wait their full flat delay.

use std::time::Duration;
use tokio::time::Instant;

use crate::types::DelayClass;

/// Last-send timestamps of the tracked delay classes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacingClock {
    class_a: Option<Instant>,
    class_b: Option<Instant>,
}

impl PacingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long to wait at `now` before sending a frame of `class`
    pub fn required_wait(&self, class: DelayClass, now: Instant) -> Duration {
        match class {
            DelayClass::ClassA | DelayClass::ClassB => {
                deficit(class.min_interval(), self.last_send(class), now)
            }
            DelayClass::Default => flat(class.min_interval()),
        }
    }

    /// Record a send attempt of `class` completed at `at`.
    ///
    /// Default frames have no timestamp to record.
    pub fn record(&mut self, class: DelayClass, at: Instant) {
        match class {
            DelayClass::ClassA => self.class_a = Some(at),
            DelayClass::ClassB => self.class_b = Some(at),
            DelayClass::Default => {}
        }
    }

    pub fn last_send(&self, class: DelayClass) -> Option<Instant> {
        match class {
            DelayClass::ClassA => self.class_a,
            DelayClass::ClassB => self.class_b,
            DelayClass::Default => None,
        }
    }
}

fn deficit(min_interval: Duration, last: Option<Instant>, now: Instant) -> Duration {
    match last {
        Some(last) => min_interval.saturating_sub(now.saturating_duration_since(last)),
        None => Duration::ZERO,
    }
}

fn flat(delay: Duration) -> Duration {
    delay
}
