//! Hex capture parsing.
//!
//! Turns blank-line separated blocks of hex text into [`Frame`](crate::Frame)s,
//! either all at once or one block at a time from disk.

pub mod parser;
pub mod reader;

pub use parser::{BlockParser, BlockStats, parse_block, parse_str};
pub use reader::{HexReader, count_frames, load_frames};
