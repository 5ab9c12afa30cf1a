use std::io::{self, Write};

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    defaults,
    reader::{SessionLine, SessionLineReader},
    AcceptError, ChannelAddress, ChannelListener, ChannelSession, LineRenderer, ViewerError,
};

/// Settings for the viewer loop.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub address: ChannelAddress,
    /// Longest line kept from a session; longer lines are dropped with a warning.
    pub max_line_bytes: usize,
    pub color: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            address: ChannelAddress::default(),
            max_line_bytes: defaults::DEFAULT_MAX_LINE_BYTES,
            color: !defaults::color_disabled_by_env(),
        }
    }
}

#[derive(Debug)]
enum SessionEnd {
    Disconnected,
    /// The session could not go on; the viewer reports it and listens again.
    Failed(io::Error),
    Cancelled,
}

/// Consumer loop: accept one producer, render its lines until it goes away, listen again.
#[derive(Debug)]
pub struct Viewer<W> {
    config: ViewerConfig,
    renderer: LineRenderer<W>,
}

impl<W: Write> Viewer<W> {
    pub fn new(config: ViewerConfig, out: W) -> Self {
        let renderer = LineRenderer::new(out, config.color);
        Self { config, renderer }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn into_output(self) -> W {
        self.renderer.into_inner()
    }

    /// Binds the configured channel and serves sessions until `cancel` fires. The binding is
    /// released before returning.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), ViewerError> {
        let mut listener = ChannelListener::bind(self.config.address.clone())?;
        self.serve(&mut listener, cancel).await;
        Ok(())
    }

    /// Serves sessions on an already bound listener, strictly one at a time.
    ///
    /// Failures inside a session, including writes to the console output, end that session
    /// only. Returns once `cancel` fires.
    pub async fn serve(&mut self, listener: &mut ChannelListener, cancel: &CancellationToken) {
        loop {
            self.status("Waiting for plugin connection...");

            let session = match listener.accept_once(cancel).await {
                Ok(session) => session,
                Err(AcceptError::Cancelled) => break,
                Err(AcceptError::Io(err)) => {
                    warn!(error = %err, "accept failed");
                    if self.recover(&err, cancel).await {
                        continue;
                    }
                    break;
                }
            };

            self.status("Plugin connected!");
            match self.run_session(session, cancel).await {
                SessionEnd::Disconnected => self.status("Plugin disconnected."),
                SessionEnd::Failed(err) => {
                    warn!(error = %err, "session ended with an unexpected error");
                    if !self.recover(&err, cancel).await {
                        break;
                    }
                }
                SessionEnd::Cancelled => break,
            }
        }
        self.shutting_down();
    }

    async fn run_session(
        &mut self,
        session: ChannelSession,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let mut reader = SessionLineReader::new(session, self.config.max_line_bytes);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                next = reader.next_line() => next,
            };

            let rendered = match next {
                Ok(Some(SessionLine::Line { text, .. })) => {
                    self.renderer.render_line(&text, Local::now())
                }
                Ok(Some(SessionLine::TooLong {
                    line_number,
                    observed_bytes,
                    max_line_bytes,
                })) => {
                    let notice = format!(
                        "[WARN] line {line_number} too long ({observed_bytes} bytes, limit {max_line_bytes}); discarded"
                    );
                    self.renderer.render_line(&notice, Local::now())
                }
                Ok(None) => return SessionEnd::Disconnected,
                Err(err) if is_disconnect(&err) => {
                    debug!(error = %err, "session stream broke");
                    return SessionEnd::Disconnected;
                }
                Err(err) => return SessionEnd::Failed(err),
            };
            if let Err(err) = rendered {
                return SessionEnd::Failed(err);
            }
        }
    }

    /// Reports `err` and pauses before listening again. Returns `false` when cancelled meanwhile.
    async fn recover(&mut self, err: &io::Error, cancel: &CancellationToken) -> bool {
        self.report_error(err);
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(defaults::SESSION_ERROR_PAUSE) => true,
        }
    }

    // Console output is best effort from here on: a failed status write is logged and the
    // viewer keeps serving.
    fn status(&mut self, message: &str) {
        if let Err(err) = self.renderer.render_status(message, Local::now()) {
            warn!(error = %err, "failed to write status line");
        }
    }

    fn report_error(&mut self, err: &io::Error) {
        if let Err(output) = self.renderer.render_plain(&format!("[ERROR] {err}")) {
            warn!(error = %output, "failed to report session error");
        }
    }

    fn shutting_down(&mut self) {
        if let Err(err) = self.renderer.render_plain("\nShutting down...") {
            debug!(error = %err, "failed to write shutdown notice");
        }
    }
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}
