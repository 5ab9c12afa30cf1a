use std::{fmt, path::PathBuf, time::Duration};

use crate::{
    defaults, ChannelAddress, ChannelName, ConsoleLogger, DiagnosticSink, ViewerLocator,
};

#[derive(Clone, Debug)]
pub(crate) struct LoggerConfig {
    pub(crate) address: ChannelAddress,
    pub(crate) connect_timeout: Duration,
    pub(crate) write_timeout: Duration,
    pub(crate) launch_grace: Duration,
    pub(crate) auto_launch: bool,
    pub(crate) locator: ViewerLocator,
}

/// Builder for [`ConsoleLogger`].
///
/// Defaults: channel from `PLUGIN_CONSOLE_CHANNEL` or `PluginConsole`, runtime directory from
/// `PLUGIN_CONSOLE_RUNTIME_DIR`/`XDG_RUNTIME_DIR`/temp dir, 3 s connect timeout, 1 s write
/// timeout, 1.5 s launch grace, viewer auto-launch enabled.
pub struct ConsoleLoggerBuilder {
    channel: ChannelName,
    runtime_dir: PathBuf,
    connect_timeout: Duration,
    write_timeout: Duration,
    launch_grace: Duration,
    auto_launch: bool,
    locator: ViewerLocator,
    diagnostics: Option<Box<dyn DiagnosticSink>>,
}

impl Default for ConsoleLoggerBuilder {
    fn default() -> Self {
        Self {
            channel: ChannelName::default(),
            runtime_dir: defaults::default_runtime_dir(),
            connect_timeout: defaults::DEFAULT_CONNECT_TIMEOUT,
            write_timeout: defaults::DEFAULT_WRITE_TIMEOUT,
            launch_grace: defaults::DEFAULT_LAUNCH_GRACE,
            auto_launch: true,
            locator: ViewerLocator::default(),
            diagnostics: None,
        }
    }
}

impl ConsoleLoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(mut self, channel: ChannelName) -> Self {
        self.channel = channel;
        self
    }

    /// Directory holding the channel socket (Unix only).
    pub fn runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = dir.into();
        self
    }

    pub fn address(mut self, address: ChannelAddress) -> Self {
        self.channel = address.name().clone();
        self.runtime_dir = address.runtime_dir().to_path_buf();
        self
    }

    /// How long a connect attempt waits for a viewer. Zero makes a single attempt.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Longest a single line write may wait on a viewer that is not reading. A write that runs
    /// out of time disconnects the logger, like any other failed write.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Pause after spawning the viewer, before connecting.
    pub fn launch_grace(mut self, grace: Duration) -> Self {
        self.launch_grace = grace;
        self
    }

    /// Whether the first connect may start the viewer executable when none is listening.
    pub fn auto_launch(mut self, enabled: bool) -> Self {
        self.auto_launch = enabled;
        self
    }

    pub fn locator(mut self, locator: ViewerLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.locator = self.locator.install_dir(dir);
        self
    }

    pub fn viewer_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.locator = self.locator.binary(binary);
        self
    }

    /// Receives every [`crate::TransportEvent`] the logger recovers from.
    pub fn diagnostics(mut self, sink: impl DiagnosticSink) -> Self {
        self.diagnostics = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> ConsoleLogger {
        let config = LoggerConfig {
            address: ChannelAddress::new(self.channel, self.runtime_dir),
            connect_timeout: self.connect_timeout,
            write_timeout: self.write_timeout,
            launch_grace: self.launch_grace,
            auto_launch: self.auto_launch,
            locator: self.locator,
        };
        ConsoleLogger::from_config(config, self.diagnostics)
    }

    /// Builds the logger and runs its initialization sequence.
    pub fn connect(self) -> ConsoleLogger {
        let logger = self.build();
        logger.connect();
        logger
    }
}

impl fmt::Debug for ConsoleLoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleLoggerBuilder")
            .field("channel", &self.channel)
            .field("runtime_dir", &self.runtime_dir)
            .field("connect_timeout", &self.connect_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("launch_grace", &self.launch_grace)
            .field("auto_launch", &self.auto_launch)
            .field("locator", &self.locator)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}
