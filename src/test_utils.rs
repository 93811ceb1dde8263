//! Test helpers shared by unit tests and benchmarks
//!
//! Frame builders for each delay class, a transport that records what it was
//! asked to send, and a generator for capture text.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;

use crate::transport::{PortInfo, Transport};
use crate::types::{CLASS_A_HEADER, CLASS_B_HEADER, Frame};
use crate::Result;

/// Class A frame whose last byte is `tag`
pub fn class_a_frame(tag: u8) -> Frame {
    tagged(&CLASS_A_HEADER, tag)
}

/// Class B frame whose last byte is `tag`
pub fn class_b_frame(tag: u8) -> Frame {
    tagged(&CLASS_B_HEADER, tag)
}

/// Frame without a tracked header
pub fn default_frame(tag: u8) -> Frame {
    Frame::new(vec![0x01, 0x02, tag])
}

fn tagged(header: &[u8], tag: u8) -> Frame {
    let mut payload = header.to_vec();
    payload.push(tag);
    Frame::new(payload)
}

/// Capture text with `blocks` frames rotating through the three classes.
///
/// Every third block spans two lines and every seventh carries a stray comment
/// line, so parsing has some work to do.
pub fn synthetic_capture(blocks: usize) -> String {
    let mut text = String::with_capacity(blocks * 48);
    for i in 0..blocks {
        let frame = match i % 3 {
            0 => class_a_frame(i as u8),
            1 => class_b_frame(i as u8),
            _ => default_frame(i as u8),
        };
        let hex = frame.readable();
        if i % 3 == 2 {
            let _ = writeln!(text, "{hex}\nAA BB CC DD");
        } else {
            let _ = writeln!(text, "{hex}");
        }
        if i % 7 == 0 {
            text.push_str("## ---- ##\n");
        }
        text.push('\n');
    }
    text
}

/// One attempted send
#[derive(Debug, Clone)]
pub struct SendRecord {
    pub at: Instant,
    pub payload: Vec<u8>,
}

/// Transport keeping every attempted send with its timestamp.
///
/// Attempts listed in `fail_on` (1-based) report failure but are still recorded.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    connected: AtomicBool,
    fail_on: HashSet<usize>,
    records: Mutex<Vec<SendRecord>>,
}

impl RecordingTransport {
    pub fn connected() -> Self {
        Self { connected: AtomicBool::new(true), ..Default::default() }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Connected transport whose listed attempts fail
    pub fn failing_on(attempts: &[usize]) -> Self {
        Self { fail_on: attempts.iter().copied().collect(), ..Self::connected() }
    }

    pub fn records(&self) -> Vec<SendRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn attempts(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.records().into_iter().map(|r| r.payload).collect()
    }

    pub fn send_times(&self) -> Vec<Instant> {
        self.records().into_iter().map(|r| r.at).collect()
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, payload: &[u8]) -> bool {
        if !self.is_connected() {
            return false;
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.push(SendRecord { at: Instant::now(), payload: payload.to_vec() });
        !self.fail_on.contains(&records.len())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn port_info(&self) -> PortInfo {
        PortInfo {
            port: "recording".to_string(),
            baud_rate: 9600,
            is_connected: self.is_connected(),
            is_open: self.is_connected(),
        }
    }
}
