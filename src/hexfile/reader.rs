//! Async capture file reader
//!
//! Reads a capture line by line and feeds a [`BlockParser`], so a traversal
//! only ever holds the block being accumulated.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use framepace::hexfile::HexReader;
//!
//! # async fn run() -> framepace::Result<()> {
//! let mut reader = HexReader::open("capture.txt").await?;
//! while let Some(frame) = reader.next_frame().await? {
//!     println!("{}", frame);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use super::parser::{BlockParser, BlockStats};
use crate::types::Frame;
use crate::{ReplayError, Result};

/// Sequential reader yielding one frame per decodable block
pub struct HexReader {
    lines: Lines<BufReader<File>>,
    parser: BlockParser,
    path: PathBuf,
    finished: bool,
}

impl HexReader {
    /// Open a capture file for a fresh traversal
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await.map_err(|e| ReplayError::file_error(path.clone(), e))?;

        Ok(Self { lines: BufReader::new(file).lines(), parser: BlockParser::new(), path, finished: false })
    }

    /// Read up to the next decodable block.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| ReplayError::file_error(self.path.clone(), e))?;

            match line {
                Some(line) => {
                    if let Some(frame) = self.parser.push_line(&line) {
                        return Ok(Some(frame));
                    }
                }
                None => {
                    self.finished = true;
                    let last = self.parser.finish();
                    let stats = self.parser.stats();
                    if stats.skipped > 0 {
                        debug!(
                            "{}: skipped {} of {} blocks",
                            self.path.display(),
                            stats.skipped,
                            stats.blocks
                        );
                    }
                    return Ok(last);
                }
            }
        }
    }

    /// Block counters for the traversal so far
    pub fn stats(&self) -> BlockStats {
        self.parser.stats()
    }
}

/// Parse a whole capture into memory.
pub async fn load_frames<P: AsRef<Path>>(path: P) -> Result<Vec<Frame>> {
    let mut reader = HexReader::open(path).await?;
    let mut frames = Vec::new();
    while let Some(frame) = reader.next_frame().await? {
        frames.push(frame);
    }
    Ok(frames)
}

/// Count the frames in a capture without keeping any payload.
pub async fn count_frames<P: AsRef<Path>>(path: P) -> Result<usize> {
    let mut reader = HexReader::open(path).await?;
    let mut count = 0;
    while reader.next_frame().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexfile::parse_str;
    use std::io::Write;

    fn capture(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(text.as_bytes()).expect("write capture");
        file
    }

    #[tokio::test]
    async fn reader_matches_in_memory_parse() {
        let text = "60 01 13 20 01 01\n00 00 1C\n\n60 01 13 30 05\n\nFFF\n\n0a 0b 0c";
        let file = capture(text);

        let frames = load_frames(file.path()).await.expect("load");
        assert_eq!(frames, parse_str(text));
        assert_eq!(count_frames(file.path()).await.expect("count"), 3);
    }

    #[tokio::test]
    async fn reader_reports_stats() {
        let file = capture("01\n\n0\n\n02\n");
        let mut reader = HexReader::open(file.path()).await.expect("open");
        while reader.next_frame().await.expect("read").is_some() {}
        assert_eq!(reader.stats(), BlockStats { blocks: 3, frames: 2, skipped: 1 });
        assert!(reader.next_frame().await.expect("read").is_none());
    }

    #[tokio::test]
    async fn missing_file_is_a_file_error() {
        let result = HexReader::open("/definitely/not/here.txt").await;
        match result {
            Err(ReplayError::File { path, .. }) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.txt"))
            }
            _ => panic!("expected File error"),
        }
    }

    #[tokio::test]
    async fn crlf_line_endings() {
        let file = capture("01 02\r\n\r\n03 04\r\n");
        let frames = load_frames(file.path()).await.expect("load");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].payload(), &[0x03, 0x04]);
    }
}
