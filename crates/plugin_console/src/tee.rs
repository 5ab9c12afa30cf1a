use std::{
    fmt,
    io::{self, Write},
};

use crate::ConsoleLogger;

/// Output sink decorator that duplicates whole lines into a [`ConsoleLogger`].
///
/// Line writes go to both the wrapped sink and the logger; partial writes go only to the wrapped
/// sink, because the channel carries whole lines and nothing is buffered here. Logger failures
/// are absorbed by the logger itself, so the only errors surfaced are the wrapped sink's own.
///
/// ```no_run
/// use std::io::Write;
/// use plugin_console::ConsoleLogger;
///
/// let logger = ConsoleLogger::builder().connect();
/// let mut out = logger.tee(std::io::stdout());
/// writeln!(out, "reaches the viewer and stdout")?;
/// write!(out, "stdout only")?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct ConsoleTee<W> {
    inner: W,
    logger: ConsoleLogger,
}

impl<W: Write> ConsoleTee<W> {
    pub fn new(inner: W, logger: ConsoleLogger) -> Self {
        Self { inner, logger }
    }

    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.logger.write_line(text);
        self.inner.write_all(text.as_bytes())?;
        self.inner.write_all(b"\n")
    }

    pub fn write_partial(&mut self, text: &str) -> io::Result<()> {
        self.inner.write_all(text.as_bytes())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn logger(&self) -> &ConsoleLogger {
        &self.logger
    }

    /// Gives back the original sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn forward_lines(&self, buf: &[u8]) {
        if !self.logger.is_connected() {
            return;
        }
        let Some(body) = buf.strip_suffix(b"\n") else {
            return;
        };
        let text = String::from_utf8_lossy(body);
        for line in text.split('\n') {
            self.logger
                .write_line(line.strip_suffix('\r').unwrap_or(line));
        }
    }
}

impl<W: Write> Write for ConsoleTee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }

    /// A buffer ending in `\n` is one or more whole lines; anything else is a partial write.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.forward_lines(buf);
        self.inner.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Formats into one buffer first so `writeln!` arrives as a single line write.
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        match args.as_str() {
            Some(text) => self.write_all(text.as_bytes()),
            None => self.write_all(args.to_string().as_bytes()),
        }
    }
}

impl<W: fmt::Debug> fmt::Debug for ConsoleTee<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleTee")
            .field("inner", &self.inner)
            .field("logger", &self.logger)
            .finish()
    }
}

impl ConsoleLogger {
    /// Wraps `sink` (typically `std::io::stdout()`) so its line writes also reach the viewer.
    pub fn tee<W: Write>(&self, sink: W) -> ConsoleTee<W> {
        ConsoleTee::new(sink, self.clone())
    }
}
