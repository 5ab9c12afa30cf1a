use std::{
    collections::VecDeque,
    fmt,
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, TryLockError,
    },
    thread,
    time::Duration,
};

use tracing::{debug, warn};

use crate::{
    builder::LoggerConfig,
    endpoint::{self, ClientConnection},
    launcher, template, ConnectError, ConsoleLoggerBuilder, DiagnosticSink, LaunchError,
    TemplateError, TransportEvent,
};

/// Outcome of a connect attempt. Never an error: an absent viewer is a normal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectStatus {
    Connected,
    /// No viewer answered within the connect timeout.
    Unavailable,
    /// The attempt failed for another reason, or an established connection broke.
    Failed { reason: String },
}

impl ConnectStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Producer side of the console bridge.
///
/// Cheap to clone; all clones share one connection. Every method may be called from any thread.
/// Logging methods never fail and never block on an absent viewer: while disconnected they do
/// nothing, and a write that fails flips the logger to disconnected.
#[derive(Clone)]
pub struct ConsoleLogger {
    inner: Arc<Inner>,
}

// Lock order: `state` before `pending`; `diagnostics` before `state`. Events are queued while
// `state` is held and handed to the sink only after it is released, so a sink may log through
// the same logger.
struct Inner {
    config: LoggerConfig,
    connected: AtomicBool,
    state: Mutex<ProducerState>,
    pending: Mutex<VecDeque<TransportEvent>>,
    diagnostics: Mutex<Option<Box<dyn DiagnosticSink>>>,
}

struct ProducerState {
    connection: Option<ClientConnection>,
    initialized: bool,
    status: ConnectStatus,
}

impl ConsoleLogger {
    pub fn builder() -> ConsoleLoggerBuilder {
        ConsoleLoggerBuilder::default()
    }

    pub(crate) fn from_config(
        config: LoggerConfig,
        diagnostics: Option<Box<dyn DiagnosticSink>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connected: AtomicBool::new(false),
                state: Mutex::new(ProducerState {
                    connection: None,
                    initialized: false,
                    status: ConnectStatus::Unavailable,
                }),
                pending: Mutex::new(VecDeque::new()),
                diagnostics: Mutex::new(diagnostics),
            }),
        }
    }

    /// Runs the initialization sequence once: reuse a running viewer, otherwise launch one
    /// (when enabled) and connect with the configured timeout.
    ///
    /// Later calls return the current status without repeating anything until
    /// [`Self::shutdown`] or [`Self::reconnect`] resets the logger.
    pub fn connect(&self) -> ConnectStatus {
        self.with_state(|state| {
            if state.initialized {
                return state.status.clone();
            }
            self.run_connect_sequence(state, true)
        })
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Sends one line. No-op while disconnected.
    pub fn write_line(&self, text: &str) {
        if !self.is_connected() {
            return;
        }

        self.with_state(|state| {
            let Some(connection) = state.connection.as_mut() else {
                return;
            };
            if let Err(err) = send_line(connection, text) {
                debug!(error = %err, "console write failed; disconnecting");
                let reason = err.to_string();
                self.drop_connection(state);
                state.status = ConnectStatus::Failed {
                    reason: reason.clone(),
                };
                self.emit(TransportEvent::WriteFailed { reason });
            }
        });
    }

    /// Sends one line built from compile-time checked format arguments, so both
    /// `write!(logger, ..)` and `writeln!(logger, ..)` send exactly one line.
    pub fn write_fmt(&self, args: fmt::Arguments<'_>) {
        if !self.is_connected() {
            return;
        }
        let owned;
        let text = match args.as_str() {
            Some(text) => text,
            None => {
                owned = args.to_string();
                &owned
            }
        };
        self.write_line(text.strip_suffix('\n').unwrap_or(text));
    }

    /// Sends one line rendered from a positional template such as `"Order {0}: {1}"`.
    ///
    /// Template errors are returned whether or not a viewer is connected.
    pub fn write_template(
        &self,
        template: &str,
        args: &[&dyn fmt::Display],
    ) -> Result<(), TemplateError> {
        let line = template::render_template(template, args)?;
        self.write_line(&line);
        Ok(())
    }

    /// Tears down any current connection and runs the connect steps again. The viewer is not
    /// relaunched.
    pub fn reconnect(&self) -> ConnectStatus {
        self.with_state(|state| {
            if self.is_connected() {
                self.shutdown_locked(state);
            }
            state.initialized = false;
            self.run_connect_sequence(state, false)
        })
    }

    /// Closes the connection and returns to the uninitialized state. Idempotent.
    pub fn shutdown(&self) {
        self.with_state(|state| {
            if state.initialized {
                self.shutdown_locked(state);
            }
        });
    }

    /// Runs `f` under the state lock, then delivers the events it raised.
    fn with_state<T>(&self, f: impl FnOnce(&mut ProducerState) -> T) -> T {
        let out = f(&mut self.lock_state());
        self.deliver_events();
        out
    }

    fn lock_state(&self) -> MutexGuard<'_, ProducerState> {
        // A panic while holding the lock leaves the state consistent enough to keep logging.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TransportEvent) {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    fn next_event(&self) -> Option<TransportEvent> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn has_pending_events(&self) -> bool {
        !self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Drains queued events into the sink. When the sink is busy (another thread is delivering,
    /// or the sink itself logged through this logger) the current holder drains the queue instead.
    fn deliver_events(&self) {
        loop {
            let mut sink = match self.inner.diagnostics.try_lock() {
                Ok(sink) => sink,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            while let Some(event) = self.next_event() {
                if let Some(sink) = sink.as_mut() {
                    sink.on_event(event);
                }
            }
            drop(sink);

            if !self.has_pending_events() {
                return;
            }
        }
    }

    fn run_connect_sequence(&self, state: &mut ProducerState, launch: bool) -> ConnectStatus {
        let config = &self.inner.config;
        let endpoint = config.address.endpoint();

        // A viewer from an earlier launch may already be listening.
        if let Ok(connection) = endpoint::open_client(&config.address, Duration::ZERO) {
            return self.attach(state, connection);
        }

        if launch && config.auto_launch {
            self.launch_viewer();
        }

        let status = match endpoint::open_client(&config.address, config.connect_timeout) {
            Ok(connection) => return self.attach(state, connection),
            Err(ConnectError::Unavailable { endpoint, timeout }) => {
                debug!(%endpoint, ?timeout, "console viewer unavailable");
                self.emit(TransportEvent::Unavailable { endpoint, timeout });
                ConnectStatus::Unavailable
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(%endpoint, error = %reason, "console connect failed");
                self.emit(TransportEvent::ConnectFailed {
                    endpoint,
                    reason: reason.clone(),
                });
                ConnectStatus::Failed { reason }
            }
        };

        state.initialized = true;
        state.status = status.clone();
        status
    }

    fn attach(&self, state: &mut ProducerState, mut connection: ClientConnection) -> ConnectStatus {
        let endpoint = self.inner.config.address.endpoint();
        if let Err(err) = connection.set_write_timeout(self.inner.config.write_timeout) {
            warn!(%endpoint, error = %err, "failed to bound console writes");
        }
        debug!(%endpoint, "console connected");
        state.connection = Some(connection);
        state.initialized = true;
        state.status = ConnectStatus::Connected;
        self.inner.connected.store(true, Ordering::Release);
        self.emit(TransportEvent::Connected { endpoint });
        ConnectStatus::Connected
    }

    fn launch_viewer(&self) {
        let config = &self.inner.config;
        match config.locator.launch() {
            Ok((binary, child)) => {
                launcher::reap_detached(child);
                self.emit(TransportEvent::ViewerLaunched { binary });
                if !config.launch_grace.is_zero() {
                    thread::sleep(config.launch_grace);
                }
            }
            Err(LaunchError::NotFound { searched }) => {
                warn!(?searched, "console viewer not found; connecting anyway");
                self.emit(TransportEvent::ViewerNotFound { searched });
            }
            Err(LaunchError::Spawn { binary, source }) => {
                warn!(
                    binary = %binary.display(),
                    error = %source,
                    "failed to start console viewer"
                );
                self.emit(TransportEvent::ViewerLaunchFailed {
                    binary,
                    reason: source.to_string(),
                });
            }
        }
    }

    fn shutdown_locked(&self, state: &mut ProducerState) {
        if let Some(connection) = state.connection.as_mut() {
            let _ = connection.flush();
        }
        self.drop_connection(state);
        state.initialized = false;
        state.status = ConnectStatus::Unavailable;
        debug!("console logger shut down");
        self.emit(TransportEvent::Shutdown);
    }

    fn drop_connection(&self, state: &mut ProducerState) {
        self.inner.connected.store(false, Ordering::Release);
        state.connection = None;
    }
}

impl fmt::Debug for ConsoleLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleLogger")
            .field("endpoint", &self.inner.config.address.endpoint())
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn send_line(connection: &mut ClientConnection, text: &str) -> std::io::Result<()> {
    let mut line = Vec::with_capacity(text.len() + 1);
    line.extend_from_slice(text.as_bytes());
    line.push(b'\n');
    connection.write_all(&line)?;
    connection.flush()
}
