//! Leveled and typed helpers layered over [`ConsoleLogger::write_line`].
//!
//! The viewer colours lines by their `[ERROR]`/`[WARN]`/`[INFO]` markers, so these helpers only
//! prefix text; they hold no state of their own.

use std::{
    backtrace::{Backtrace, BacktraceStatus},
    error::Error,
    fmt,
};

use crate::{template, ConsoleLogger, TemplateError};

/// Severity prefixes understood by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConsoleLogger {
    /// Sends `[LEVEL] message`, upper-casing free-form level names (`"debug"` becomes `[DEBUG]`).
    pub fn write_log(&self, level: impl AsRef<str>, message: impl AsRef<str>) {
        if !self.is_connected() {
            return;
        }
        self.write_line(&format!(
            "[{}] {}",
            level.as_ref().to_uppercase(),
            message.as_ref()
        ));
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.write_log(Level::Info.as_str(), message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.write_log(Level::Warn.as_str(), message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.write_log(Level::Error.as_str(), message);
    }

    pub fn info_fmt(&self, args: fmt::Arguments<'_>) {
        self.write_leveled_fmt(Level::Info, args);
    }

    pub fn warn_fmt(&self, args: fmt::Arguments<'_>) {
        self.write_leveled_fmt(Level::Warn, args);
    }

    pub fn error_fmt(&self, args: fmt::Arguments<'_>) {
        self.write_leveled_fmt(Level::Error, args);
    }

    pub fn info_template(
        &self,
        template: &str,
        args: &[&dyn fmt::Display],
    ) -> Result<(), TemplateError> {
        self.write_leveled_template(Level::Info, template, args)
    }

    pub fn warn_template(
        &self,
        template: &str,
        args: &[&dyn fmt::Display],
    ) -> Result<(), TemplateError> {
        self.write_leveled_template(Level::Warn, template, args)
    }

    pub fn error_template(
        &self,
        template: &str,
        args: &[&dyn fmt::Display],
    ) -> Result<(), TemplateError> {
        self.write_leveled_template(Level::Error, template, args)
    }

    pub fn write_empty(&self) {
        self.write_line("");
    }

    /// Sends any displayable value (numbers, booleans, dates, ...) as its own line.
    pub fn write_value(&self, value: impl fmt::Display) {
        if !self.is_connected() {
            return;
        }
        self.write_line(&value.to_string());
    }

    /// Like [`Self::write_value`], rendering `None` as `null`.
    pub fn write_optional<T: fmt::Display>(&self, value: Option<T>) {
        match value {
            Some(value) => self.write_value(value),
            None => self.write_line("null"),
        }
    }

    /// Sends `[ERROR] Exception: <Type>: <message>` followed by one `Inner exception:` line per
    /// source in the error chain.
    pub fn write_exception<E: Error + 'static>(&self, err: &E) {
        self.write_exception_lines(short_type_name::<E>(), err, None);
    }

    /// Like [`Self::write_exception`], adding a `Stack trace:` line when the backtrace was
    /// captured.
    pub fn write_exception_with_trace<E: Error + 'static>(&self, err: &E, trace: &Backtrace) {
        self.write_exception_lines(short_type_name::<E>(), err, Some(trace));
    }

    fn write_exception_lines(
        &self,
        type_name: &str,
        err: &(dyn Error + 'static),
        trace: Option<&Backtrace>,
    ) {
        if !self.is_connected() {
            return;
        }
        self.error(format!("Exception: {type_name}: {err}"));
        if let Some(trace) = trace.filter(|trace| trace.status() == BacktraceStatus::Captured) {
            self.write_line(&format!("Stack trace: {trace}"));
        }
        let mut source = err.source();
        while let Some(cause) = source {
            self.write_line(&format!("Inner exception: {cause}"));
            source = cause.source();
        }
    }

    fn write_leveled_fmt(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.is_connected() {
            return;
        }
        self.write_line(&format!("[{level}] {args}"));
    }

    fn write_leveled_template(
        &self,
        level: Level,
        template: &str,
        args: &[&dyn fmt::Display],
    ) -> Result<(), TemplateError> {
        let message = template::render_template(template, args)?;
        self.write_log(level.as_str(), message);
        Ok(())
    }
}

/// `std::io::error::Error` becomes `Error`; generic parameters are dropped.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
