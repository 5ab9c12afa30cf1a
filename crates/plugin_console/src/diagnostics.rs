use std::{path::PathBuf, time::Duration};

/// Transport-level events the producer recovers from internally.
///
/// None of these ever reach the caller of a logging method; install a [`DiagnosticSink`] to
/// observe them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected { endpoint: String },
    /// No viewer answered within the connect timeout.
    Unavailable { endpoint: String, timeout: Duration },
    ConnectFailed { endpoint: String, reason: String },
    /// A write failed and the producer is now disconnected.
    WriteFailed { reason: String },
    ViewerLaunched { binary: PathBuf },
    ViewerNotFound { searched: Vec<PathBuf> },
    ViewerLaunchFailed { binary: PathBuf, reason: String },
    Shutdown,
}

pub trait DiagnosticSink: Send + 'static {
    fn on_event(&mut self, event: TransportEvent);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(TransportEvent) + Send + 'static,
{
    fn on_event(&mut self, event: TransportEvent) {
        self(event)
    }
}
