//! Terminal progress reporting for the CLI

use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::Observer;
use crate::transport::PortInfo;
use crate::types::SourceMode;

const RULE_WIDTH: usize = 80;

#[derive(Debug)]
struct ConsoleState {
    started: Instant,
    attempts: u64,
    failures: u64,
}

/// Observer printing one line per frame to stdout and failures to stderr
#[derive(Debug)]
pub struct ConsoleObserver {
    state: Mutex<ConsoleState>,
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self { state: Mutex::new(ConsoleState { started: Instant::now(), attempts: 0, failures: 0 }) }
    }

    /// Reset the clock and counters and print the start banner
    pub fn start(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = ConsoleState { started: Instant::now(), attempts: 0, failures: 0 };
        }
        let rule = "=".repeat(RULE_WIDTH);
        println!("{rule}\nframepace - replay started\n{rule}\nPress Ctrl+C to stop\n");
    }

    pub fn connection(&self, info: &PortInfo) {
        let status = if info.is_connected { "connected" } else { "not connected" };
        println!("Link: {status}\nPort: {}\nBaud rate: {}\n", info.port, info.baud_rate);
    }

    pub fn file_info(&self, path: &Path, frames: usize, mode: SourceMode) {
        let suffix = if mode.is_streaming() { " (streaming)" } else { "" };
        println!("Capture: {}\nFrames: {frames}{suffix}\n", path.display());
    }

    /// Print the end-of-run summary
    pub fn summary(&self, total_sent: u64) {
        let (elapsed, failures) = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (state.started.elapsed(), state.failures)
        };
        println!("\n{}", format_summary(total_sent, failures, elapsed));
    }
}

impl Observer for ConsoleObserver {
    fn on_progress(&self, index: usize, total: usize, cycle: u64, frame: &str) {
        let (elapsed, attempts) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.attempts += 1;
            (state.started.elapsed(), state.attempts)
        };
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", format_progress(index, total, cycle, attempts, elapsed));
        let _ = writeln!(out, "send: {frame}");
    }

    fn on_frame_sent(&self, frame: &str, success: bool) {
        if !success {
            self.state.lock().unwrap_or_else(PoisonError::into_inner).failures += 1;
            let _ = writeln!(std::io::stderr().lock(), "  FAILED - {frame}");
        }
    }

    fn on_cycle_complete(&self, cycle: u64) {
        let elapsed = self.state.lock().unwrap_or_else(PoisonError::into_inner).started.elapsed();
        println!("\n[+{:.1}s] cycle {cycle} complete\n{}", elapsed.as_secs_f64(), "-".repeat(60));
    }
}

/// Rate in events per second, 0 when no time has passed
fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

fn format_progress(index: usize, total: usize, cycle: u64, attempts: u64, elapsed: Duration) -> String {
    let percent = if total > 0 { index as f64 * 100.0 / total as f64 } else { 0.0 };
    format!(
        "[+{:>9.3}s] cycle {cycle} | {index}/{total} ({percent:.1}%) | sent {attempts} | {:.1}/s",
        elapsed.as_secs_f64(),
        rate(attempts, elapsed)
    )
}

fn format_summary(total_sent: u64, failures: u64, elapsed: Duration) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "{rule}\nSummary\n{rule}\nFrames sent: {total_sent}\nFailed sends: {failures}\nRun time: {:.2} s\nAverage rate: {:.2} frames/s\n{rule}",
        elapsed.as_secs_f64(),
        rate(total_sent, elapsed)
    )
}
