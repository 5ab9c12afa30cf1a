use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE_BYTES: usize = 8192;

/// One newline-delimited unit read from a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLine {
    /// Decoded line without its terminator (`\n` or `\r\n`). Invalid UTF-8 is replaced.
    Line { line_number: usize, text: String },
    /// The line exceeded the byte limit and was discarded.
    TooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
}

/// Splits an async byte stream into lines while never buffering more than `max_line_bytes`
/// of a single line.
///
/// Buffered state lives in the reader, so dropping a pending [`Self::next_line`] future (for
/// example when racing it against cancellation) loses no bytes.
pub struct SessionLineReader<R> {
    reader: R,
    max_line_bytes: usize,
    buffer: Box<[u8; CHUNK_SIZE_BYTES]>,
    buffer_pos: usize,
    buffer_len: usize,
    current_line: Vec<u8>,
    observed_bytes: usize,
    discard_mode: bool,
    line_number: usize,
    done: bool,
}

impl<R: AsyncRead + Unpin> SessionLineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            max_line_bytes,
            buffer: Box::new([0u8; CHUNK_SIZE_BYTES]),
            buffer_pos: 0,
            buffer_len: 0,
            current_line: Vec::new(),
            observed_bytes: 0,
            discard_mode: false,
            line_number: 0,
            done: false,
        }
    }

    /// Returns the next line, `Ok(None)` at end of stream, or the I/O error that broke it.
    ///
    /// A final line without a trailing newline is still returned.
    pub async fn next_line(&mut self) -> io::Result<Option<SessionLine>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if self.buffer_pos >= self.buffer_len {
                let n = self.reader.read(&mut self.buffer[..]).await?;
                self.buffer_pos = 0;
                self.buffer_len = n;
                if n == 0 {
                    self.done = true;
                    if self.discard_mode || !self.current_line.is_empty() {
                        return Ok(Some(self.finish_line()));
                    }
                    return Ok(None);
                }
            }

            let slice = &self.buffer[self.buffer_pos..self.buffer_len];
            let Some(newline_idx) = slice.iter().position(|b| *b == b'\n') else {
                let slice_len = slice.len();
                self.observe_bytes(slice_len);
                if !self.discard_mode {
                    let slice = &self.buffer[self.buffer_pos..self.buffer_len];
                    self.current_line.extend_from_slice(slice);
                }
                self.buffer_pos = self.buffer_len;
                continue;
            };

            self.observe_bytes(newline_idx);
            if !self.discard_mode {
                let segment = &self.buffer[self.buffer_pos..self.buffer_pos + newline_idx];
                self.current_line.extend_from_slice(segment);
            }
            self.buffer_pos += newline_idx + 1;
            return Ok(Some(self.finish_line()));
        }
    }

    fn finish_line(&mut self) -> SessionLine {
        self.line_number += 1;
        let line_number = self.line_number;

        let line = if self.discard_mode {
            SessionLine::TooLong {
                line_number,
                observed_bytes: self.observed_bytes,
                max_line_bytes: self.max_line_bytes,
            }
        } else {
            let bytes = std::mem::take(&mut self.current_line);
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(&bytes[..]);
            SessionLine::Line {
                line_number,
                text: String::from_utf8_lossy(bytes).into_owned(),
            }
        };

        self.current_line.clear();
        self.observed_bytes = 0;
        self.discard_mode = false;
        line
    }

    fn observe_bytes(&mut self, additional: usize) {
        self.observed_bytes = self.observed_bytes.saturating_add(additional);
        if self.observed_bytes > self.max_line_bytes && !self.discard_mode {
            self.discard_mode = true;
            self.current_line.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(bytes: &[u8], max_line_bytes: usize) -> Vec<SessionLine> {
        let mut reader = SessionLineReader::new(bytes, max_line_bytes);
        let mut out = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            out.push(line);
        }
        out
    }

    fn text(line: &SessionLine) -> &str {
        match line {
            SessionLine::Line { text, .. } => text,
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn splits_on_newlines_and_normalizes_crlf() {
        let lines = collect(b"first\r\nsecond\n\nlast-without-newline", 64).await;
        let texts: Vec<&str> = lines.iter().map(text).collect();
        assert_eq!(texts, ["first", "second", "", "last-without-newline"]);
    }

    #[tokio::test]
    async fn oversized_line_is_discarded_and_reading_continues() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"ok\n");
        bytes.extend_from_slice(&[b'a'; 50]);
        bytes.extend_from_slice(b"\nnext\n");

        let lines = collect(&bytes, 16).await;
        assert_eq!(text(&lines[0]), "ok");
        assert_eq!(
            lines[1],
            SessionLine::TooLong {
                line_number: 2,
                observed_bytes: 50,
                max_line_bytes: 16,
            }
        );
        assert_eq!(text(&lines[2]), "next");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let lines = collect(b"bad \xff byte\n", 64).await;
        assert_eq!(text(&lines[0]), "bad \u{fffd} byte");
    }

    #[tokio::test]
    async fn lines_spanning_many_chunks_are_reassembled() {
        let long = "x".repeat(CHUNK_SIZE_BYTES * 2 + 17);
        let input = format!("{long}\nshort\n");
        let lines = collect(input.as_bytes(), CHUNK_SIZE_BYTES * 4).await;
        assert_eq!(text(&lines[0]), long);
        assert_eq!(text(&lines[1]), "short");
    }
}
