use std::{
    fs as std_fs,
    io::{BufRead, BufReader},
    os::unix::{
        fs::PermissionsExt,
        net::{UnixListener, UnixStream},
    },
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{ChannelAddress, ChannelName, ConsoleLogger, ConsoleLoggerBuilder, TransportEvent};

pub(super) const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) fn test_address(runtime_dir: &Path) -> ChannelAddress {
    ChannelAddress::new(ChannelName::new("test-console").unwrap(), runtime_dir)
}

/// Builder that never launches anything and gives up quickly.
pub(super) fn quick_builder(runtime_dir: &Path) -> ConsoleLoggerBuilder {
    ConsoleLogger::builder()
        .address(test_address(runtime_dir))
        .auto_launch(false)
        .launch_grace(Duration::ZERO)
        .connect_timeout(Duration::from_millis(200))
}

/// Blocking stand-in for the viewer: a raw listener on the channel socket.
pub(super) struct FakeViewer {
    listener: UnixListener,
}

impl FakeViewer {
    pub(super) fn bind(runtime_dir: &Path) -> Self {
        let listener = UnixListener::bind(test_address(runtime_dir).socket_path()).unwrap();
        Self { listener }
    }

    pub(super) fn accept(&self) -> FakeSession {
        let (stream, _) = self.listener.accept().unwrap();
        stream.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
        FakeSession {
            reader: BufReader::new(stream),
        }
    }
}

pub(super) struct FakeSession {
    reader: BufReader<UnixStream>,
}

impl FakeSession {
    /// Next line without its terminator; `None` at end of stream.
    pub(super) fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).unwrap();
        if n == 0 {
            return None;
        }
        assert!(line.ends_with('\n'), "unterminated line: {line:?}");
        line.pop();
        Some(line)
    }

    pub(super) fn read_lines(&mut self, count: usize) -> Vec<String> {
        (0..count)
            .map(|_| self.read_line().expect("stream ended early"))
            .collect()
    }
}

#[derive(Clone, Default)]
pub(super) struct RecordedEvents(Arc<Mutex<Vec<TransportEvent>>>);

impl RecordedEvents {
    pub(super) fn sink(&self) -> impl FnMut(TransportEvent) + Send + 'static {
        let events = Arc::clone(&self.0);
        move |event| events.lock().unwrap().push(event)
    }

    pub(super) fn snapshot(&self) -> Vec<TransportEvent> {
        self.0.lock().unwrap().clone()
    }

    pub(super) fn count(&self, matches: impl Fn(&TransportEvent) -> bool) -> usize {
        self.snapshot().iter().filter(|event| matches(event)).count()
    }
}

/// Fake viewer executable that appends one line to `marker` per launch.
pub(super) fn write_fake_viewer(dir: &Path, marker: &Path) -> PathBuf {
    let path = dir.join("fake-viewer");
    let script = format!("#!/bin/sh\necho launched >> '{}'\n", marker.display());
    std_fs::write(&path, script).unwrap();
    let mut perms = std_fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std_fs::set_permissions(&path, perms).unwrap();
    path
}

pub(super) fn launch_count(marker: &Path) -> usize {
    std_fs::read_to_string(marker)
        .map(|text| text.lines().count())
        .unwrap_or(0)
}
