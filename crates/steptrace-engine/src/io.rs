//! Virtual standard input and output for traced runs.
//!
//! The traced program never touches a real terminal. Its writes go into an
//! in-memory [`OutputBuffer`] the step recorder drains, and its reads come
//! from a [`LineSource`]: either canned text replayed line by line with each
//! consumed line echoed back into the output buffer (so the transcript looks
//! typed), or a fallback that simulates a user tapping Enter forever.

use std::collections::VecDeque;

/// Growable in-memory stand-in for the traced program's stdout.
///
/// `drain` hands back everything written since the previous drain and resets
/// the buffer, so each drained chunk is attributed to exactly one step.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buf: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer::default()
    }

    pub fn write(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn drain(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// A substitutable source of input lines. Reads never block: the environment
/// has no terminal to wait on.
pub trait LineSource {
    /// Returns the next input line with its terminating newline intact,
    /// echoing it into `out` when the source models typed input.
    fn read_line(&mut self, out: &mut OutputBuffer) -> String;
}

/// Replays canned input. Each consumed record is echoed into the output
/// buffer before being returned; once the records run out, every read yields
/// a bare newline (an implicit Enter) without echo.
#[derive(Debug)]
pub struct EchoSource {
    records: VecDeque<String>,
}

impl EchoSource {
    /// Builds a source from already-normalized input text (see
    /// [`normalize_input`]).
    pub fn new(normalized: &str) -> Self {
        let mut records = VecDeque::new();
        let mut current = String::new();
        for c in normalized.chars() {
            current.push(c);
            if c == '\n' {
                records.push_back(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            current.push('\n');
            records.push_back(current);
        }
        EchoSource { records }
    }
}

impl LineSource for EchoSource {
    fn read_line(&mut self, out: &mut OutputBuffer) -> String {
        match self.records.pop_front() {
            Some(line) => {
                out.write(&line);
                line
            }
            None => "\n".to_string(),
        }
    }
}

/// Fallback when no canned input was supplied: every read returns a single
/// newline, never echoes, never blocks.
#[derive(Debug, Default)]
pub struct EnterSource;

impl LineSource for EnterSource {
    fn read_line(&mut self, _out: &mut OutputBuffer) -> String {
        "\n".to_string()
    }
}

/// Normalizes canned input text supplied by the caller: the literal
/// two-character escape `\n` becomes a real line break, and a trailing line
/// break is appended if missing.
pub fn normalize_input(raw: &str) -> String {
    let mut text = raw.replace("\\n", "\n");
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Picks the input source for a run. Empty canned input is the same as no
/// canned input at all.
pub fn source_for(input: Option<&str>) -> Box<dyn LineSource> {
    match input {
        Some(raw) if !raw.is_empty() => Box::new(EchoSource::new(&normalize_input(raw))),
        _ => Box::new(EnterSource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_resets_the_buffer() {
        let mut out = OutputBuffer::new();
        out.write("hello ");
        out.write("world");
        assert_eq!(out.drain(), "hello world");
        assert!(out.is_empty());
        assert_eq!(out.drain(), "");
    }

    #[test]
    fn echo_source_mirrors_consumed_lines() {
        let mut out = OutputBuffer::new();
        let mut src = EchoSource::new("hi\nthere\n");
        assert_eq!(src.read_line(&mut out), "hi\n");
        assert_eq!(src.read_line(&mut out), "there\n");
        assert_eq!(out.drain(), "hi\nthere\n");
    }

    #[test]
    fn exhausted_echo_source_returns_enter_without_echo() {
        let mut out = OutputBuffer::new();
        let mut src = EchoSource::new("one\n");
        src.read_line(&mut out);
        assert_eq!(src.read_line(&mut out), "\n");
        // Only the real record was echoed.
        assert_eq!(out.drain(), "one\n");
    }

    #[test]
    fn enter_source_never_echoes() {
        let mut out = OutputBuffer::new();
        let mut src = EnterSource;
        assert_eq!(src.read_line(&mut out), "\n");
        assert!(out.is_empty());
    }

    #[test]
    fn normalize_converts_escapes_and_appends_newline() {
        assert_eq!(normalize_input("5\\n7"), "5\n7\n");
        assert_eq!(normalize_input("hi"), "hi\n");
        assert_eq!(normalize_input("hi\n"), "hi\n");
    }

    #[test]
    fn empty_input_falls_back_to_enter_source() {
        let mut out = OutputBuffer::new();
        let mut src = source_for(Some(""));
        assert_eq!(src.read_line(&mut out), "\n");
        assert!(out.is_empty());
    }
}
