use std::{env, path::PathBuf, time::Duration};

pub(crate) const DEFAULT_CHANNEL_NAME: &str = "PluginConsole";
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);
pub(crate) const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(1000);
pub(crate) const DEFAULT_LAUNCH_GRACE: Duration = Duration::from_millis(1500);
pub(crate) const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub(crate) const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;
pub(crate) const SESSION_ERROR_PAUSE: Duration = Duration::from_secs(1);

pub(crate) const CHANNEL_ENV: &str = "PLUGIN_CONSOLE_CHANNEL";
pub(crate) const RUNTIME_DIR_ENV: &str = "PLUGIN_CONSOLE_RUNTIME_DIR";
pub(crate) const VIEWER_BINARY_ENV: &str = "PLUGIN_CONSOLE_VIEWER";
pub(crate) const XDG_RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";
pub(crate) const NO_COLOR_ENV: &str = "NO_COLOR";

#[cfg(windows)]
pub(crate) const VIEWER_BINARY_NAME: &str = "plugin-console-viewer.exe";
#[cfg(not(windows))]
pub(crate) const VIEWER_BINARY_NAME: &str = "plugin-console-viewer";

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Channel name from `PLUGIN_CONSOLE_CHANNEL`, when set.
pub(crate) fn channel_name_override() -> Option<String> {
    non_empty_env(CHANNEL_ENV)
}

/// Directory holding channel endpoints: `PLUGIN_CONSOLE_RUNTIME_DIR`, then `XDG_RUNTIME_DIR`,
/// then the system temp directory.
pub(crate) fn default_runtime_dir() -> PathBuf {
    non_empty_env(RUNTIME_DIR_ENV)
        .or_else(|| non_empty_env(XDG_RUNTIME_DIR_ENV))
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir)
}

pub(crate) fn viewer_binary_override() -> Option<PathBuf> {
    non_empty_env(VIEWER_BINARY_ENV).map(PathBuf::from)
}

pub(crate) fn default_install_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
}

/// `NO_COLOR` disables colour when present with any non-empty value.
pub(crate) fn color_disabled_by_env() -> bool {
    non_empty_env(NO_COLOR_ENV).is_some()
}
