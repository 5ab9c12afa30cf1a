use std::{fs, io, os::unix::net::UnixStream as StdUnixStream, path::PathBuf, time::Duration};

use tokio::net::{UnixListener, UnixStream};

use crate::{BindError, ChannelAddress};

pub(super) type ClientStream = StdUnixStream;
pub(super) type SessionStream = UnixStream;

pub(super) fn connect(address: &ChannelAddress) -> io::Result<ClientStream> {
    StdUnixStream::connect(address.socket_path())
}

/// A send that cannot complete in time fails with `WouldBlock`.
pub(super) fn set_write_timeout(stream: &mut ClientStream, timeout: Duration) -> io::Result<()> {
    stream.set_write_timeout(Some(timeout))
}

/// Socket file missing, nobody accepting, or backlog full.
pub(super) fn is_not_ready(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused | io::ErrorKind::WouldBlock
    )
}

#[derive(Debug)]
pub(super) struct Listener {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl Listener {
    pub(super) fn bind(address: &ChannelAddress) -> Result<Self, BindError> {
        let runtime_dir = address.runtime_dir();
        fs::create_dir_all(runtime_dir).map_err(|source| BindError::RuntimeDir {
            path: runtime_dir.to_path_buf(),
            source,
        })?;

        let socket_path = address.socket_path();
        if socket_path.exists() {
            if StdUnixStream::connect(&socket_path).is_ok() {
                return Err(BindError::AlreadyBound {
                    endpoint: address.endpoint(),
                });
            }
            // Left behind by a viewer that did not exit cleanly.
            match fs::remove_file(&socket_path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(BindError::Io {
                        endpoint: address.endpoint(),
                        source,
                    })
                }
            }
        }

        let listener = UnixListener::bind(&socket_path).map_err(|source| BindError::Io {
            endpoint: address.endpoint(),
            source,
        })?;
        Ok(Self {
            listener,
            socket_path,
        })
    }

    pub(super) async fn accept(&mut self) -> io::Result<SessionStream> {
        let (stream, _) = self.listener.accept().await?;
        Ok(stream)
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.socket_path);
    }
}
