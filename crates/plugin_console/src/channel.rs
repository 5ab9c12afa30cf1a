use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::defaults;

/// Well-known name shared by producer and viewer. Case-sensitive.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    pub const MAX_BYTES: usize = 64;

    /// Validates a channel name: ASCII, starts alphanumeric, then alphanumerics or `.`, `_`, `-`.
    pub fn new(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.len() > Self::MAX_BYTES || !raw.is_ascii() {
            return None;
        }
        let mut chars = raw.chars();
        let first = chars.next()?;
        if !first.is_ascii_alphanumeric() {
            return None;
        }
        if !chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-')) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelName {
    /// `PLUGIN_CONSOLE_CHANNEL` when it holds a valid name, otherwise `PluginConsole`.
    fn default() -> Self {
        defaults::channel_name_override()
            .and_then(|raw| Self::new(&raw))
            .unwrap_or_else(|| Self(defaults::DEFAULT_CHANNEL_NAME.to_string()))
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A channel name resolved against the local host.
///
/// On Unix the endpoint is a socket file `<runtime_dir>/<name>.sock`; on Windows it is the
/// named pipe `\\.\pipe\<name>` and `runtime_dir` is ignored.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChannelAddress {
    name: ChannelName,
    runtime_dir: PathBuf,
}

impl ChannelAddress {
    pub fn new(name: ChannelName, runtime_dir: impl Into<PathBuf>) -> Self {
        Self {
            name,
            runtime_dir: runtime_dir.into(),
        }
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    pub fn socket_path(&self) -> PathBuf {
        self.runtime_dir.join(format!("{}.sock", self.name))
    }

    pub fn pipe_name(&self) -> String {
        format!(r"\\.\pipe\{}", self.name)
    }

    /// Human-readable endpoint for logs and errors.
    pub fn endpoint(&self) -> String {
        if cfg!(windows) {
            self.pipe_name()
        } else {
            self.socket_path().display().to_string()
        }
    }
}

impl Default for ChannelAddress {
    fn default() -> Self {
        Self::new(ChannelName::default(), defaults::default_runtime_dir())
    }
}
