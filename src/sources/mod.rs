//! Frame source implementations

pub mod memory;
pub mod streaming;

pub use memory::MemorySource;
pub use streaming::StreamingSource;

use std::path::Path;

use crate::Result;
use crate::source::FrameSource;
use crate::types::SourceMode;

/// Load a capture with the requested retrieval mode
pub async fn open_source<P: AsRef<Path>>(path: P, mode: SourceMode) -> Result<Box<dyn FrameSource>> {
    match mode {
        SourceMode::Materialized => Ok(Box::new(MemorySource::load(path).await?)),
        SourceMode::Streaming => Ok(Box::new(StreamingSource::open(path).await?)),
    }
}
