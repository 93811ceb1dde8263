//! Materialized source: parse once, replay from memory

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::hexfile;
use crate::source::FrameSource;
use crate::types::Frame;
use crate::{ReplayError, Result};

/// Source holding every frame of the capture in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    frames: Arc<[Frame]>,
    position: usize,
}

impl MemorySource {
    /// Load and parse a capture file.
    ///
    /// Fails with [`ReplayError::EmptySource`] when no block decodes.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let frames = hexfile::load_frames(path).await?;
        if frames.is_empty() {
            return Err(ReplayError::empty_source(path));
        }

        info!("Loaded {} frames from {}", frames.len(), path.display());
        Ok(Self::from_frames(frames))
    }

    /// Wrap frames that are already parsed
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self { frames: frames.into(), position: 0 }
    }

    /// Parse capture text held in memory
    pub fn from_text(text: &str) -> Self {
        Self::from_frames(hexfile::parse_str(text))
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

#[async_trait::async_trait]
impl FrameSource for MemorySource {
    async fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FrameSourceExt;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn traversals_restart_from_the_top() {
        let mut source = MemorySource::from_text("01\n\n02\n\n03");
        assert_eq!(source.frame_count(), 3);

        assert_eq!(source.next_frame().await.expect("read").map(|f| f.readable()), Some("01".to_string()));
        source.rewind().await.expect("rewind");

        let first: Vec<Frame> = source.traverse().try_collect().await.expect("traverse");
        let second: Vec<Frame> = source.traverse().try_collect().await.expect("traverse");
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_capture_fails_to_load() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), "zz\n\n123\n").expect("write capture");

        match MemorySource::load(file.path()).await {
            Err(ReplayError::EmptySource { path }) => assert_eq!(path, file.path()),
            other => panic!("expected EmptySource, got {:?}", other.map(|s| s.frame_count())),
        }
    }
}
