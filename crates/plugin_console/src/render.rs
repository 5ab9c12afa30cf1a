use std::io::{self, Write};

use chrono::{DateTime, Local};
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

/// Visual class of a received line, derived from substring markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warn,
    Info,
    Banner,
    Default,
}

impl Severity {
    /// First match wins: `[ERROR]`, `[WARN]`, `[INFO]` or `success`, `===` or `***`, else default.
    pub fn classify(line: &str) -> Self {
        if line.contains("[ERROR]") {
            Self::Error
        } else if line.contains("[WARN]") {
            Self::Warn
        } else if line.contains("[INFO]") || line.contains("success") {
            Self::Info
        } else if line.contains("===") || line.contains("***") {
            Self::Banner
        } else {
            Self::Default
        }
    }

    pub fn color(self) -> Option<Color> {
        match self {
            Self::Error => Some(Color::Red),
            Self::Warn => Some(Color::Yellow),
            Self::Info => Some(Color::Green),
            Self::Banner => Some(Color::Cyan),
            Self::Default => None,
        }
    }
}

/// Writes decorated lines to a terminal (or any byte sink).
#[derive(Debug)]
pub struct LineRenderer<W> {
    out: W,
    color: bool,
}

impl<W: Write> LineRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    /// Renders `[HH:mm:ss.fff] <line>` in the line's severity colour.
    pub fn render_line(&mut self, line: &str, at: DateTime<Local>) -> io::Result<Severity> {
        let severity = Severity::classify(line);
        let text = format!("[{}] {line}\n", at.format("%H:%M:%S%.3f"));
        match severity.color().filter(|_| self.color) {
            Some(color) => {
                queue!(self.out, SetForegroundColor(color), Print(text), ResetColor)?;
            }
            None => self.out.write_all(text.as_bytes())?,
        }
        self.out.flush()?;
        Ok(severity)
    }

    /// Undecorated viewer status line with a second-resolution timestamp.
    pub fn render_status(&mut self, message: &str, at: DateTime<Local>) -> io::Result<()> {
        writeln!(self.out, "[{}] {message}", at.format("%H:%M:%S"))?;
        self.out.flush()
    }

    pub fn render_plain(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{message}")?;
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
