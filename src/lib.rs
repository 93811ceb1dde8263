//! Paced replay of captured frames over a serial link.
//!
//! framepace reads a hex capture file (blocks of hex text separated by blank
//! lines), turns each block into a [`Frame`], and writes the frames to a
//! [`Transport`] in order, cycle after cycle, honouring a minimum spacing per
//! frame class:
//!
//! | Class | Header | Spacing |
//! |-------|--------|---------|
//! | [`DelayClass::ClassA`] | `60 01 13 20` | 1000 ms since the last class A send |
//! | [`DelayClass::ClassB`] | `60 01 13 30` | 10 ms since the last class B send |
//! | [`DelayClass::Default`] | anything else | a flat 10 ms before every send |
//!
//! # Components
//!
//! - [`hexfile`]: capture parsing, whole-file or line by line
//! - [`sources`]: [`MemorySource`] (parse once) and [`StreamingSource`] (re-read per cycle)
//! - [`pacing`]: per-class last-send bookkeeping
//! - [`scheduler`]: [`ReplayController`], the start/stop/pause state machine and send loop
//! - [`transports`]: [`SerialTransport`] and [`SimulatedTransport`]
//! - [`observer`]: progress callbacks, including a console printer and a channel adapter
//!
//! ## Example
//!
//! ```rust,no_run
//! use framepace::{ChannelObserver, ReplayController, SerialConfig, SimulatedTransport, SourceMode, Transport};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(SimulatedTransport::new(SerialConfig::default()));
//!     transport.connect().await?;
//!
//!     let (observer, mut events) = ChannelObserver::new();
//!     let controller =
//!         ReplayController::load("capture.txt", SourceMode::Streaming, transport, Arc::new(observer)).await?;
//!     controller.start(true).await?;
//!
//!     while let Some(event) = events.next().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Frame input
pub mod hexfile;
pub mod source;
pub mod sources;

// Replay
pub mod config;
pub mod observer;
pub mod pacing;
pub mod scheduler;
pub mod transport;
pub mod transports;

pub use error::*;
pub use types::*;

pub use config::{Parity, ReplayConfig, SerialConfig};
pub use observer::{ChannelObserver, ConsoleObserver, NoopObserver, Observer, ReplayEvent};
pub use pacing::PacingClock;
pub use scheduler::ReplayController;
pub use source::{FrameSource, FrameSourceExt};
pub use sources::{MemorySource, StreamingSource, open_source};
pub use transport::{PortInfo, Transport};
pub use transports::{SerialTransport, SimulatedTransport};
