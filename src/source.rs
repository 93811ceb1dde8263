//! Frame source trait

use futures::stream::{self, BoxStream, StreamExt};

use crate::Result;
use crate::types::Frame;

/// Ordered, restartable sequence of frames.
///
/// A source is traversed once per replay cycle: [`rewind`](Self::rewind),
/// then [`next_frame`](Self::next_frame) until it returns `Ok(None)`. Every
/// traversal must yield the same frames in the same order, whether they are
/// held in memory or re-read from disk.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Position the source before its first frame.
    ///
    /// Streaming sources re-open their input here.
    async fn rewind(&mut self) -> Result<()>;

    /// Get the next frame of the current traversal
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - Next frame
    /// - `Ok(None)` - Traversal finished
    /// - `Err(e)` - The underlying input failed mid-traversal
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Number of frames in one traversal, known before traversing
    fn frame_count(&self) -> usize;

    /// Drop whatever the current traversal holds open.
    ///
    /// Called when a cycle ends, including cycles cut short by a stop.
    fn release(&mut self) {}
}

#[derive(Clone, Copy)]
enum Phase {
    Rewind,
    Read,
    Done,
}

/// Stream adapter over any [`FrameSource`]
pub trait FrameSourceExt: FrameSource {
    /// One fresh traversal as a stream.
    ///
    /// The stream rewinds the source before the first item and ends after the
    /// last frame or after the first error.
    fn traverse(&mut self) -> BoxStream<'_, Result<Frame>> {
        stream::unfold((self, Phase::Rewind), |(source, phase)| async move {
            match phase {
                Phase::Done => None,
                Phase::Rewind => match source.rewind().await {
                    Ok(()) => advance(source).await,
                    Err(e) => Some((Err(e), (source, Phase::Done))),
                },
                Phase::Read => advance(source).await,
            }
        })
        .boxed()
    }
}

impl<S: FrameSource + ?Sized> FrameSourceExt for S {}

async fn advance<S: FrameSource + ?Sized>(
    source: &mut S,
) -> Option<(Result<Frame>, (&mut S, Phase))> {
    match source.next_frame().await {
        Ok(Some(frame)) => Some((Ok(frame), (source, Phase::Read))),
        Ok(None) => None,
        Err(e) => Some((Err(e), (source, Phase::Done))),
    }
}
