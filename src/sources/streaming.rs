//! Streaming source: re-read the capture on every traversal

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::hexfile::{self, HexReader};
use crate::source::FrameSource;
use crate::types::Frame;
use crate::{ReplayError, Result};

/// Source that keeps no payloads between traversals.
///
/// The frame count is established by a counting pass at load. Each traversal
/// counts again; if the capture changed on disk and the count no longer
/// matches, the new count is adopted and a warning is logged. A traversal
/// that finds no frame at all fails with [`ReplayError::EmptySource`].
pub struct StreamingSource {
    path: PathBuf,
    frame_count: usize,
    reader: Option<HexReader>,
    yielded: usize,
}

impl StreamingSource {
    /// Count the frames of a capture and prepare it for streaming.
    ///
    /// Fails with [`ReplayError::EmptySource`] when no block decodes.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let frame_count = hexfile::count_frames(&path).await?;
        if frame_count == 0 {
            return Err(ReplayError::empty_source(path));
        }

        info!("Counted {} frames in {} (streaming)", frame_count, path.display());
        Ok(Self { path, frame_count, reader: None, yielded: 0 })
    }

    fn finish_traversal(&mut self) -> Result<()> {
        self.reader = None;
        if self.yielded == 0 {
            return Err(ReplayError::empty_source(self.path.clone()));
        }
        if self.yielded != self.frame_count {
            warn!(
                "{} changed on disk: traversal yielded {} frames, expected {}",
                self.path.display(),
                self.yielded,
                self.frame_count
            );
            self.frame_count = self.yielded;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl FrameSource for StreamingSource {
    async fn rewind(&mut self) -> Result<()> {
        debug!("Re-opening {}", self.path.display());
        self.reader = Some(HexReader::open(&self.path).await?);
        self.yielded = 0;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        match reader.next_frame().await {
            Ok(Some(frame)) => {
                self.yielded += 1;
                Ok(Some(frame))
            }
            Ok(None) => {
                self.finish_traversal()?;
                Ok(None)
            }
            Err(e) => {
                self.reader = None;
                Err(e)
            }
        }
    }

    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn release(&mut self) {
        if self.reader.take().is_some() {
            debug!("Closed {} mid-traversal", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FrameSourceExt;
    use crate::sources::MemorySource;
    use futures::{StreamExt, TryStreamExt};
    use proptest::prelude::*;

    fn write_capture(text: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), text).expect("write capture");
        file
    }

    #[tokio::test]
    async fn next_frame_before_rewind_is_empty() {
        let file = write_capture("01\n\n02");
        let mut source = StreamingSource::open(file.path()).await.expect("open");
        assert_eq!(source.frame_count(), 2);
        assert!(source.next_frame().await.expect("read").is_none());
    }

    #[tokio::test]
    async fn every_traversal_rereads_the_file() {
        let file = write_capture("60 01 13 20 00\n\n60 01 13 30 01\n\n02 03");
        let mut source = StreamingSource::open(file.path()).await.expect("open");

        let first: Vec<Frame> = source.traverse().try_collect().await.expect("traverse");
        let second: Vec<Frame> = source.traverse().try_collect().await.expect("traverse");
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn changed_file_updates_count() {
        let file = write_capture("01\n\n02\n\n03");
        let mut source = StreamingSource::open(file.path()).await.expect("open");
        assert_eq!(source.frame_count(), 3);

        std::fs::write(file.path(), "01\n\n02").expect("rewrite capture");
        let frames: Vec<Frame> = source.traverse().try_collect().await.expect("traverse");
        assert_eq!(frames.len(), 2);
        assert_eq!(source.frame_count(), 2);
    }

    #[tokio::test]
    async fn file_emptied_on_disk_fails_the_traversal() {
        let file = write_capture("01 02");
        let mut source = StreamingSource::open(file.path()).await.expect("open");

        std::fs::write(file.path(), "zz").expect("rewrite capture");
        let result: Result<Vec<Frame>> = source.traverse().try_collect().await;
        assert!(matches!(result, Err(ReplayError::EmptySource { .. })));
        assert_eq!(source.frame_count(), 1);

        std::fs::write(file.path(), "03 04").expect("restore capture");
        let frames: Vec<Frame> = source.traverse().try_collect().await.expect("traverse");
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn release_closes_an_unfinished_traversal() {
        let file = write_capture("01\n\n02\n\n03");
        let mut source = StreamingSource::open(file.path()).await.expect("open");

        {
            let mut frames = source.traverse();
            assert!(frames.next().await.is_some());
        }
        assert!(source.reader.is_some());

        source.release();
        assert!(source.reader.is_none());
        source.release();
    }

    #[tokio::test]
    async fn deleted_file_fails_the_traversal() {
        let file = write_capture("01\n\n02");
        let path = file.path().to_path_buf();
        let mut source = StreamingSource::open(&path).await.expect("open");
        drop(file);

        let result: Result<Vec<Frame>> = source.traverse().try_collect().await;
        assert!(matches!(result, Err(ReplayError::File { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_streaming_matches_materialized(
            blocks in prop::collection::vec(
                prop::collection::vec("[0-9a-fA-F ]{0,12}", 1..4),
                1..12
            )
        ) {
            let text = blocks.iter().map(|lines| lines.join("\n")).collect::<Vec<_>>().join("\n\n");
            let file = write_capture(&text);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");

            let (materialized, streamed) = runtime.block_on(async {
                let mut memory = MemorySource::from_text(&text);
                let materialized: Vec<Frame> = memory.traverse().try_collect().await?;

                let streamed: Vec<Frame> = match StreamingSource::open(file.path()).await {
                    Ok(mut source) => source.traverse().try_collect().await?,
                    Err(ReplayError::EmptySource { .. }) => Vec::new(),
                    Err(e) => return Err(e),
                };
                Ok::<_, ReplayError>((materialized, streamed))
            }).expect("traversals");

            prop_assert_eq!(materialized, streamed);
        }
    }
}
