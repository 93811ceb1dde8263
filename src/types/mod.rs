//! Core types for frame replay.
//!
//! - [`Frame`] is an immutable payload with its [`DelayClass`] computed once
//! - [`DelayClass`] maps a frame header to its pacing rule
//! - [`SourceMode`] selects materialized or streaming frame retrieval
//! - [`SchedulerStatus`] is the snapshot the controller hands out
//!
//! ## Usage Example
//!
//! ```rust
//! use framepace::types::{DelayClass, Frame};
//! use std::time::Duration;
//!
//! let frame = Frame::new(vec![0x60, 0x01, 0x13, 0x20, 0x01, 0x01]);
//! assert_eq!(frame.class(), DelayClass::ClassA);
//! assert_eq!(frame.class().min_interval(), Duration::from_millis(1000));
//! assert_eq!(frame.readable(), "60 01 13 20 01 01");
//! ```

mod delay_class;
mod frame;
mod source_mode;
mod status;

pub use delay_class::{CLASS_A_HEADER, CLASS_B_HEADER, DelayClass};
pub use frame::{Frame, readable};
pub use source_mode::SourceMode;
pub use status::SchedulerStatus;
