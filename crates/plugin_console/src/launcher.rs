use std::{
    env,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};

use tracing::debug;

use crate::{defaults, LaunchError};

/// `ETXTBSY`: the executable is still open for writing (freshly copied next to the plugin).
const EXECUTABLE_FILE_BUSY: i32 = 26;

/// Resolves where the viewer executable is expected to live.
///
/// Candidates, in order: `<install_dir>/<exe>`, `<install_dir>/tools/<exe>`, `<cwd>/<exe>`.
/// `PLUGIN_CONSOLE_VIEWER`, when set, replaces the whole list.
#[derive(Clone, Debug)]
pub struct ViewerLocator {
    install_dir: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    binary_override: Option<PathBuf>,
}

impl Default for ViewerLocator {
    fn default() -> Self {
        Self {
            install_dir: defaults::default_install_dir(),
            working_dir: env::current_dir().ok(),
            binary_override: defaults::viewer_binary_override(),
        }
    }
}

impl ViewerLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory the producer was installed to; defaults to the current executable's directory.
    pub fn install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Pins the viewer binary, bypassing the candidate search.
    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary_override = Some(binary.into());
        self
    }

    pub fn candidates(&self) -> Vec<PathBuf> {
        if let Some(binary) = self.binary_override.as_ref() {
            return vec![binary.clone()];
        }

        let mut out = Vec::with_capacity(3);
        if let Some(dir) = self.install_dir.as_ref() {
            out.push(dir.join(defaults::VIEWER_BINARY_NAME));
            out.push(dir.join("tools").join(defaults::VIEWER_BINARY_NAME));
        }
        if let Some(dir) = self.working_dir.as_ref() {
            let candidate = dir.join(defaults::VIEWER_BINARY_NAME);
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }

    /// First candidate that exists as a file.
    pub fn locate(&self) -> Result<PathBuf, LaunchError> {
        let searched = self.candidates();
        match searched.iter().find(|path| path.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(LaunchError::NotFound { searched }),
        }
    }

    /// Locates the viewer and spawns it with [`launch_viewer`].
    pub fn launch(&self) -> Result<(PathBuf, Child), LaunchError> {
        let binary = self.locate()?;
        let child = launch_viewer(&binary)?;
        Ok((binary, child))
    }
}

/// Spawns the viewer as an independent process with its own working directory.
///
/// The child is not waited on; it outlives the producer.
pub fn launch_viewer(binary: &Path) -> Result<Child, LaunchError> {
    let mut command = Command::new(binary);
    command.stdin(Stdio::null());
    if let Some(dir) = binary.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        command.current_dir(dir);
    }
    detach_console(&mut command);

    let child = spawn_with_retry(&mut command, binary)?;
    debug!(binary = %binary.display(), pid = child.id(), "viewer launched");
    Ok(child)
}

/// Waits for the viewer on a background thread so an exited viewer does not linger as a zombie
/// for the lifetime of the host process.
pub(crate) fn reap_detached(mut child: Child) {
    let pid = child.id();
    let spawned = thread::Builder::new()
        .name("plugin-console-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => debug!(pid, %status, "viewer exited"),
            Err(err) => debug!(pid, error = %err, "failed to wait for viewer"),
        });
    if let Err(err) = spawned {
        debug!(pid, error = %err, "viewer left unreaped");
    }
}

#[cfg(windows)]
fn detach_console(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    command.creation_flags(CREATE_NEW_CONSOLE);
}

#[cfg(not(windows))]
fn detach_console(_command: &mut Command) {}

pub(crate) fn spawn_with_retry(command: &mut Command, binary: &Path) -> Result<Child, LaunchError> {
    let mut backoff = Duration::from_millis(2);
    let mut attempt = 0;
    loop {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(source) => {
                let is_busy = source.raw_os_error() == Some(EXECUTABLE_FILE_BUSY);
                if is_busy && attempt < 4 {
                    attempt += 1;
                    thread::sleep(backoff);
                    backoff = std::cmp::min(backoff * 2, Duration::from_millis(50));
                    continue;
                }
                return Err(LaunchError::Spawn {
                    binary: binary.to_path_buf(),
                    source,
                });
            }
        }
    }
}
