//! Fixed-capacity log line storage and the truncating formatter.
//!
//! A [`LogLine`] is rendered once per log call and copied into every active
//! channel. Rendering writes into an inline `heapless::Vec`, so no heap
//! allocation happens on the emission path. Text that does not fit is
//! silently truncated; one byte is always held back for the terminating
//! newline so even a truncated line stays newline-terminated.

use std::fmt;

use heapless::Vec;

/// Maximum number of bytes in a single line, trailing newline included.
pub const LINE_CAPACITY: usize = 256;

/// Immutable, length-bounded, newline-terminated byte string.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LogLine {
    bytes: Vec<u8, LINE_CAPACITY>,
    truncated: bool,
}

impl LogLine {
    /// Create an empty line. Empty lines are never transmitted.
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            truncated: false,
        }
    }

    /// Render formatted text into a line.
    pub fn render(args: fmt::Arguments<'_>) -> Self {
        let mut writer = LineWriter::new();
        // `LineWriter` never reports an error, so the result is always `Ok`.
        let _ = fmt::write(&mut writer, args);
        writer.finish()
    }

    /// Copy raw bytes into a line, applying the same truncation rules as
    /// [`LogLine::render`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut writer = LineWriter::new();
        writer.push_bytes(bytes);
        writer.finish()
    }

    /// Wire bytes of the line, trailing newline included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes; never more than [`LINE_CAPACITY`].
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` for a line with no bytes. Such lines are never sent.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the rendered text exceeded [`LINE_CAPACITY`].
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Debug for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogLine")
            .field("text", &String::from_utf8_lossy(&self.bytes))
            .field("truncated", &self.truncated)
            .finish()
    }
}

/// `fmt::Write` sink that fills a line buffer and drops the overflow.
struct LineWriter {
    bytes: Vec<u8, LINE_CAPACITY>,
    truncated: bool,
}

impl LineWriter {
    const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            truncated: false,
        }
    }

    fn push_bytes(&mut self, src: &[u8]) {
        // The last slot is reserved for the newline appended by `finish`.
        let room = (LINE_CAPACITY - 1).saturating_sub(self.bytes.len());
        let take = src.len().min(room);
        if take < src.len() {
            self.truncated = true;
        }
        if self.bytes.extend_from_slice(&src[..take]).is_err() {
            self.truncated = true;
        }
    }

    fn finish(mut self) -> LogLine {
        if !self.bytes.is_empty() && self.bytes.last() != Some(&b'\n') {
            let _ = self.bytes.push(b'\n');
        }
        LogLine {
            bytes: self.bytes,
            truncated: self.truncated,
        }
    }
}

impl fmt::Write for LineWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("hello", "hello\n")]
    #[case("hello\n", "hello\n")]
    #[case("two\nlines", "two\nlines\n")]
    fn appends_newline_only_when_absent(#[case] input: &str, #[case] expected: &str) {
        let line = LogLine::render(format_args!("{input}"));
        assert_eq!(line.as_bytes(), expected.as_bytes());
        assert!(!line.is_truncated());
    }

    #[rstest]
    fn empty_message_stays_empty() {
        let line = LogLine::render(format_args!("{}", ""));
        assert!(line.is_empty());
    }

    #[rstest]
    fn overlong_message_is_truncated_and_terminated() {
        let long = "x".repeat(LINE_CAPACITY * 3);
        let line = LogLine::render(format_args!("prefix {long}"));
        assert_eq!(line.len(), LINE_CAPACITY);
        assert!(line.is_truncated());
        assert_eq!(line.as_bytes().last(), Some(&b'\n'));
        assert!(line.as_bytes().starts_with(b"prefix xxx"));
    }

    #[rstest]
    fn message_filling_buffer_exactly_keeps_newline() {
        let exact = "y".repeat(LINE_CAPACITY - 1);
        let line = LogLine::render(format_args!("{exact}"));
        assert_eq!(line.len(), LINE_CAPACITY);
        assert!(!line.is_truncated());
        assert_eq!(line.as_bytes()[LINE_CAPACITY - 1], b'\n');
    }

    #[rstest]
    fn from_bytes_matches_render() {
        let rendered = LogLine::render(format_args!("I (12) main: up"));
        let copied = LogLine::from_bytes(b"I (12) main: up");
        assert_eq!(rendered, copied);
    }

    proptest! {
        #[test]
        fn rendering_is_bounded_and_deterministic(text in ".{0,600}") {
            let first = LogLine::render(format_args!("{text}"));
            let second = LogLine::render(format_args!("{text}"));
            prop_assert_eq!(&first, &second);
            prop_assert!(first.len() <= LINE_CAPACITY);
            if !text.is_empty() {
                prop_assert_eq!(first.as_bytes().last(), Some(&b'\n'));
                let body = &first.as_bytes()[..first.len() - 1];
                prop_assert!(text.as_bytes().starts_with(body));
            }
        }
    }
}
