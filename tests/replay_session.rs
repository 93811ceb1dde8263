//! End-to-end replay sessions through the public API, on real files and real time.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use framepace::{
    ChannelObserver, DelayClass, PortInfo, ReplayController, ReplayError, ReplayEvent, SourceMode,
    Transport, readable,
};
use futures::StreamExt;
use tempfile::NamedTempFile;
use tokio::time::Instant;

const CAPTURE: &str = "\
60 01 13 20 01 01

60 01 13 30
0A 0B

zz not hex at all

01 02 03

60 01 13 30 0C
";

/// Transport remembering payloads and send instants
#[derive(Default)]
struct Recorder {
    connected: AtomicBool,
    sent: Mutex<Vec<(Instant, Vec<u8>)>>,
}

impl Recorder {
    fn online() -> Arc<Self> {
        let recorder = Self::default();
        recorder.connected.store(true, Ordering::SeqCst);
        Arc::new(recorder)
    }

    fn sent(&self) -> Vec<(Instant, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for Recorder {
    async fn connect(&self) -> framepace::Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, payload: &[u8]) -> bool {
        self.sent.lock().unwrap().push((Instant::now(), payload.to_vec()));
        true
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn port_info(&self) -> PortInfo {
        PortInfo {
            port: "recorder".into(),
            baud_rate: 9600,
            is_connected: self.is_connected(),
            is_open: self.is_connected(),
        }
    }
}

fn capture_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(text.as_bytes()).expect("write capture");
    file.flush().expect("flush capture");
    file
}

fn expected_payloads() -> Vec<Vec<u8>> {
    vec![
        vec![0x60, 0x01, 0x13, 0x20, 0x01, 0x01],
        vec![0x60, 0x01, 0x13, 0x30, 0x0A, 0x0B],
        vec![0x01, 0x02, 0x03],
        vec![0x60, 0x01, 0x13, 0x30, 0x0C],
    ]
}

async fn single_cycle(path: &Path, mode: SourceMode) -> (Vec<(Instant, Vec<u8>)>, Vec<ReplayEvent>) {
    let transport = Recorder::online();
    let (observer, events) = ChannelObserver::new();
    let controller = ReplayController::load(path, mode, transport.clone(), Arc::new(observer))
        .await
        .expect("load capture");
    assert_eq!(controller.status().total_frames, 4);

    controller.start(false).await.expect("single cycle");

    let status = controller.status();
    assert_eq!(status.cycle_count, 1);
    assert_eq!(status.total_sent, 4);
    assert!(!status.running);

    drop(controller);
    (transport.sent(), events.collect().await)
}

#[tokio::test]
async fn materialized_and_streaming_send_the_same_frames() {
    let file = capture_file(CAPTURE);

    let (materialized, events) = single_cycle(file.path(), SourceMode::Materialized).await;
    let (streaming, _) = single_cycle(file.path(), SourceMode::Streaming).await;

    let payloads = |sent: &[(Instant, Vec<u8>)]| sent.iter().map(|(_, p)| p.clone()).collect::<Vec<_>>();
    assert_eq!(payloads(&materialized), expected_payloads());
    assert_eq!(payloads(&streaming), expected_payloads());

    let progress: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            ReplayEvent::Progress { frame, .. } => Some(frame.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(progress[0], "60 01 13 20 01 01");
    assert_eq!(progress, expected_payloads().iter().map(|p| readable(p)).collect::<Vec<_>>());
    assert_eq!(events.last(), Some(&ReplayEvent::CycleComplete { cycle: 1 }));
}

#[tokio::test]
async fn frames_respect_their_class_spacing() {
    let file = capture_file(CAPTURE);
    let (sent, _) = single_cycle(file.path(), SourceMode::Materialized).await;

    // The default frame waits its flat delay after whatever came before
    let default_at = sent[2].0;
    assert!(default_at - sent[1].0 >= DelayClass::Default.min_interval());

    // Both class B frames are at least their interval apart
    assert!(sent[3].0 - sent[1].0 >= DelayClass::ClassB.min_interval());
}

#[tokio::test]
async fn class_a_spacing_holds_across_cycles() {
    let file = capture_file("60 01 13 20 FF\n");
    let transport = Recorder::online();
    let controller = ReplayController::load(
        file.path(),
        SourceMode::Streaming,
        transport.clone(),
        Arc::new(framepace::NoopObserver),
    )
    .await
    .expect("load capture");

    controller.start(true).await.expect("start");
    tokio::time::sleep(Duration::from_millis(1300)).await;
    controller.stop();
    controller.wait().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].0 - sent[0].0 >= Duration::from_millis(1000));
    assert_eq!(controller.status().total_sent, 2);
}

#[tokio::test]
async fn capture_without_frames_fails_to_load() {
    let file = capture_file("not hex\n\nabc\n");
    for mode in [SourceMode::Materialized, SourceMode::Streaming] {
        let observer = Arc::new(framepace::NoopObserver);
        let result = ReplayController::load(file.path(), mode, Recorder::online(), observer).await;
        assert!(matches!(result, Err(ReplayError::EmptySource { .. })));
    }

    let missing = file.path().with_extension("missing");
    let result = ReplayController::load(
        &missing,
        SourceMode::Materialized,
        Recorder::online(),
        Arc::new(framepace::NoopObserver),
    )
    .await;
    assert!(matches!(result, Err(ReplayError::File { .. })));
}

#[tokio::test]
async fn streaming_run_survives_a_vanished_file() {
    let file = capture_file("01 02\n\n03 04\n");
    let transport = Recorder::online();
    let controller = ReplayController::load(
        file.path(),
        SourceMode::Streaming,
        transport.clone(),
        Arc::new(framepace::NoopObserver),
    )
    .await
    .expect("load capture");

    controller.start(true).await.expect("start");
    tokio::time::sleep(Duration::from_millis(50)).await;
    file.close().expect("remove capture");

    // Let any traversal holding the old file drain
    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = controller.status();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let later = controller.status();

    assert!(later.running, "aborted cycles leave the run active");
    assert_eq!(later.total_sent, settled.total_sent);
    assert!(later.cycle_count > settled.cycle_count);

    controller.stop();
    controller.wait().await;
    assert!(!controller.status().running);
}

#[tokio::test]
async fn streaming_run_backs_off_when_capture_empties() {
    let file = capture_file("01 02\n");
    let transport = Recorder::online();
    let controller = ReplayController::load(
        file.path(),
        SourceMode::Streaming,
        transport.clone(),
        Arc::new(framepace::NoopObserver),
    )
    .await
    .expect("load capture");

    controller.start(true).await.expect("start");
    tokio::time::sleep(Duration::from_millis(30)).await;
    std::fs::write(file.path(), "zz\n").expect("empty capture");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = controller.status();
    tokio::time::sleep(Duration::from_millis(400)).await;
    let later = controller.status();

    assert!(later.running);
    assert_eq!(later.total_sent, settled.total_sent);
    assert!(later.cycle_count - settled.cycle_count < 10, "empty cycles must back off");

    controller.stop();
    controller.wait().await;
}
