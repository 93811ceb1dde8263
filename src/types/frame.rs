//! Frame type shared by sources, scheduler and transports

use std::fmt::{self, Write};
use std::sync::Arc;

use super::DelayClass;

/// One payload destined for a single transport send.
///
/// The payload is immutable and cheap to clone (shared via `Arc`). The delay
/// class is computed once, from the header, at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Arc<[u8]>,
    class: DelayClass,
}

impl Frame {
    /// Create a frame, classifying it from its first four bytes
    pub fn new(payload: impl Into<Arc<[u8]>>) -> Self {
        let payload = payload.into();
        let class = DelayClass::of(&payload);
        Self { payload, class }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn class(&self) -> DelayClass {
        self.class
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Uppercase, space separated hex octets, e.g. `60 01 13 20 01 01`
    pub fn readable(&self) -> String {
        readable(&self.payload)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.readable())
    }
}

/// Render bytes as uppercase two-digit hex octets separated by single spaces.
pub fn readable(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // Writing to a String cannot fail
        let _ = write!(out, "{byte:02X}");
    }
    out
}
