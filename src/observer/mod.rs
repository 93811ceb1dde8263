//! Replay progress observers.
//!
//! The scheduler reports to an [`Observer`] synchronously, in send order, from
//! inside the pacing loop. Observers must return quickly: a slow observer
//! delays every following frame. [`ChannelObserver`] turns the calls into
//! [`ReplayEvent`] messages for consumers that want to do real work.

mod console;

pub use console::ConsoleObserver;

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Receiver of replay notifications. All methods default to doing nothing.
pub trait Observer: Send + Sync + 'static {
    /// A frame is about to be paced and sent (`index` is 1-based)
    fn on_progress(&self, _index: usize, _total: usize, _cycle: u64, _frame: &str) {}

    /// A send attempt finished
    fn on_frame_sent(&self, _frame: &str, _success: bool) {}

    /// Every frame of `cycle` was processed
    fn on_cycle_complete(&self, _cycle: u64) {}
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Notification emitted by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEvent {
    Progress { index: usize, total: usize, cycle: u64, frame: String },
    FrameSent { frame: String, success: bool },
    CycleComplete { cycle: u64 },
}

/// Observer forwarding notifications over an unbounded channel.
///
/// Sending never blocks the pacing loop. Events are dropped once the
/// receiving stream is gone.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ReplayEvent>,
}

impl ChannelObserver {
    /// Create the observer and the stream of its events
    pub fn new() -> (Self, UnboundedReceiverStream<ReplayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UnboundedReceiverStream::new(rx))
    }

    fn emit(&self, event: ReplayEvent) {
        let _ = self.tx.send(event);
    }
}

impl Observer for ChannelObserver {
    fn on_progress(&self, index: usize, total: usize, cycle: u64, frame: &str) {
        self.emit(ReplayEvent::Progress { index, total, cycle, frame: frame.to_string() });
    }

    fn on_frame_sent(&self, frame: &str, success: bool) {
        self.emit(ReplayEvent::FrameSent { frame: frame.to_string(), success });
    }

    fn on_cycle_complete(&self, cycle: u64) {
        self.emit(ReplayEvent::CycleComplete { cycle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn channel_observer_preserves_order() {
        let (observer, events) = ChannelObserver::new();
        observer.on_progress(1, 2, 1, "01");
        observer.on_frame_sent("01", true);
        observer.on_cycle_complete(1);
        drop(observer);

        let events: Vec<ReplayEvent> = events.collect().await;
        assert_eq!(
            events,
            vec![
                ReplayEvent::Progress { index: 1, total: 2, cycle: 1, frame: "01".into() },
                ReplayEvent::FrameSent { frame: "01".into(), success: true },
                ReplayEvent::CycleComplete { cycle: 1 },
            ]
        );
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (observer, events) = ChannelObserver::new();
        drop(events);
        observer.on_frame_sent("01", false);
        NoopObserver.on_cycle_complete(3);
    }
}
