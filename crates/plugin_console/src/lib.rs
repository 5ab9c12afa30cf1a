#![forbid(unsafe_code)]
//! Console bridge for plugins: lines logged inside a host process are shown in a separate,
//! always-visible viewer window.
//!
//! The producer ([`ConsoleLogger`]) is embedded in the plugin and writes newline-delimited UTF-8
//! text to a named local channel (a Unix domain socket, or a named pipe on Windows). The viewer
//! ([`Viewer`], shipped as the `plugin-console-viewer` binary) binds that channel, accepts one
//! producer at a time and renders every line with a timestamp and a colour derived from its
//! `[ERROR]`/`[WARN]`/`[INFO]` marker.
//!
//! Logging never fails from the caller's point of view: while no viewer is connected every
//! logging method is a no-op, and a failed write silently flips the logger to disconnected.
//! Transport events can be observed through [`ConsoleLoggerBuilder::diagnostics`].
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use plugin_console::ConsoleLogger;
//!
//! let console = ConsoleLogger::builder()
//!     .connect_timeout(Duration::from_secs(2))
//!     .connect();
//!
//! console.info("Plugin initialized successfully");
//! console.info_fmt(format_args!("Order {} completed with total: {:.2}", "ORDER-0001", 125.0));
//! if !console.is_connected() {
//!     console.reconnect();
//! }
//! console.shutdown();
//! ```
//!
//! Surfaces:
//! - [`ConsoleLogger::write_line`], [`ConsoleLogger::write_fmt`] and
//!   [`ConsoleLogger::write_template`] send one line each.
//! - Leveled helpers (`info`/`warn`/`error` and their `_fmt`/`_template` forms) and
//!   [`ConsoleLogger::write_exception`] for error chains.
//! - [`ConsoleLogger::tee`] wraps an output sink so its whole-line writes are mirrored.
//! - [`ChannelListener`] + [`Viewer`] for the consuming side.

mod builder;
mod channel;
mod defaults;
mod diagnostics;
mod endpoint;
mod error;
mod facade;
mod launcher;
mod producer;
mod reader;
mod render;
mod tee;
mod template;
mod viewer;

pub use builder::ConsoleLoggerBuilder;
pub use channel::{ChannelAddress, ChannelName};
pub use diagnostics::{DiagnosticSink, TransportEvent};
pub use endpoint::{open_client, ChannelListener, ChannelSession, ClientConnection};
pub use error::{AcceptError, BindError, ConnectError, LaunchError, TemplateError, ViewerError};
pub use facade::Level;
pub use launcher::{launch_viewer, ViewerLocator};
pub use producer::{ConnectStatus, ConsoleLogger};
pub use reader::{SessionLine, SessionLineReader};
pub use render::{LineRenderer, Severity};
pub use tee::ConsoleTee;
pub use template::render_template;
pub use viewer::{Viewer, ViewerConfig};

#[cfg(all(test, unix))]
mod tests;
