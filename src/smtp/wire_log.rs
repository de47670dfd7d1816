//! Line-buffering logger for SMTP traffic

use std::io::{self, Write};
use tracing::debug;

/// Collects SMTP protocol bytes and logs them a line at a time on flush.
///
/// A flush of a lone line break (`"\r\n"` or `"\n"`) toggles a blank-line
/// state; only every second lone break produces an empty log line. Any
/// other line resets that state.
#[derive(Debug)]
pub struct WireLog {
    prefix: &'static str,
    buffer: Vec<u8>,
    blank: bool,
}

impl WireLog {
    /// Create a logger whose lines start with `prefix` (e.g. `C:` or `S:`)
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            buffer: Vec::new(),
            blank: false,
        }
    }

    /// Take the buffered line, returning what should be logged, if anything
    pub fn take_line(&mut self) -> Option<String> {
        let buffer = std::mem::take(&mut self.buffer);
        if buffer == b"\r\n" || buffer == b"\n" {
            self.blank = !self.blank;
            return if self.blank { None } else { Some(String::new()) };
        }
        if buffer.is_empty() {
            return None;
        }
        self.blank = false;
        Some(String::from_utf8_lossy(&buffer).trim_end().to_string())
    }
}

impl Write for WireLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(line) = self.take_line() {
            debug!(target: "smtp.wire", "{} {}", self.prefix, line);
        }
        Ok(())
    }
}
