//! Block parser for hex capture text
//!
//! A capture is a sequence of blocks separated by blank lines. The lines of a
//! block are joined with spaces, every character outside `0-9A-Fa-f` is
//! stripped, and what remains is decoded as hex pairs. A block that does not
//! decode cleanly is dropped without an error.

use tracing::trace;

use crate::types::Frame;

/// Decode one block of text into payload bytes.
///
/// Returns `None` when nothing is left after stripping, when the digit count
/// is odd, or when decoding fails.
pub fn parse_block(block: &str) -> Option<Vec<u8>> {
    let digits: String = block.chars().filter(char::is_ascii_hexdigit).collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    hex::decode(&digits).ok()
}

/// Counters for one traversal of a capture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
    /// Blocks closed by a blank line or end of input
    pub blocks: usize,
    /// Blocks that produced a frame
    pub frames: usize,
    /// Blocks dropped because they did not decode
    pub skipped: usize,
}

/// Incremental, line-fed block parser.
///
/// Feed lines with [`push_line`](Self::push_line) and call
/// [`finish`](Self::finish) at end of input. Only the block currently being
/// accumulated is held in memory.
#[derive(Debug, Default)]
pub struct BlockParser {
    block: String,
    stats: BlockStats,
}

impl BlockParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator).
    ///
    /// Returns a frame when the line is blank and closes a block that decodes.
    pub fn push_line(&mut self, line: &str) -> Option<Frame> {
        let line = line.trim();
        if line.is_empty() {
            return self.close_block();
        }
        if !self.block.is_empty() {
            self.block.push(' ');
        }
        self.block.push_str(line);
        None
    }

    /// Close the trailing block at end of input
    pub fn finish(&mut self) -> Option<Frame> {
        self.close_block()
    }

    pub fn stats(&self) -> BlockStats {
        self.stats
    }

    fn close_block(&mut self) -> Option<Frame> {
        if self.block.is_empty() {
            return None;
        }
        self.stats.blocks += 1;
        let parsed = parse_block(&self.block);
        let frame = match parsed {
            Some(bytes) => {
                self.stats.frames += 1;
                Some(Frame::new(bytes))
            }
            None => {
                self.stats.skipped += 1;
                trace!("Skipping undecodable block {}: {:?}", self.stats.blocks, self.block);
                None
            }
        };
        self.block.clear();
        frame
    }
}

/// Parse a whole capture held in memory.
pub fn parse_str(text: &str) -> Vec<Frame> {
    let mut parser = BlockParser::new();
    let mut frames: Vec<Frame> = text.lines().filter_map(|line| parser.push_line(line)).collect();
    frames.extend(parser.finish());
    frames
}
