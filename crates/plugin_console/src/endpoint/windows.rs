use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
    thread,
    time::Duration,
};

use tokio::net::windows::named_pipe::{NamedPipeServer, ServerOptions};

use crate::{BindError, ChannelAddress};

pub(super) type SessionStream = NamedPipeServer;

const ERROR_ACCESS_DENIED: i32 = 5;
const ERROR_PIPE_BUSY: i32 = 231;

/// Client end of the pipe.
///
/// Synchronous pipe handles have no write timeout, so writes run on a dedicated thread and the
/// caller waits for the result with a deadline. After a timed-out write the stream is broken for
/// good; the writer thread exits once the viewer drains or closes the pipe.
#[derive(Debug)]
pub(super) struct ClientStream {
    requests: Option<SyncSender<Vec<u8>>>,
    results: Receiver<io::Result<()>>,
    write_timeout: Option<Duration>,
}

pub(super) fn connect(address: &ChannelAddress) -> io::Result<ClientStream> {
    let pipe = OpenOptions::new().write(true).open(address.pipe_name())?;
    let (requests, pending) = mpsc::sync_channel::<Vec<u8>>(1);
    let (completed, results) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("plugin-console-writer".to_string())
        .spawn(move || write_loop(pipe, pending, completed))?;
    Ok(ClientStream {
        requests: Some(requests),
        results,
        write_timeout: None,
    })
}

fn write_loop(mut pipe: File, pending: Receiver<Vec<u8>>, completed: SyncSender<io::Result<()>>) {
    for buf in pending {
        let result = pipe.write_all(&buf).and_then(|()| pipe.flush());
        if completed.send(result).is_err() {
            break;
        }
    }
}

pub(super) fn set_write_timeout(stream: &mut ClientStream, timeout: Duration) -> io::Result<()> {
    stream.write_timeout = Some(timeout);
    Ok(())
}

impl Write for ClientStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(requests) = self.requests.as_ref() else {
            return Err(io::ErrorKind::BrokenPipe.into());
        };
        if requests.send(buf.to_vec()).is_err() {
            self.requests = None;
            return Err(io::ErrorKind::BrokenPipe.into());
        }

        let result = match self.write_timeout {
            Some(timeout) => self.results.recv_timeout(timeout),
            None => self
                .results
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };
        match result {
            Ok(Ok(())) => Ok(buf.len()),
            Ok(Err(err)) => {
                self.requests = None;
                Err(err)
            }
            Err(RecvTimeoutError::Timeout) => {
                self.requests = None;
                Err(io::ErrorKind::TimedOut.into())
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.requests = None;
                Err(io::ErrorKind::BrokenPipe.into())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Pipe not created yet, or every instance is serving another client.
pub(super) fn is_not_ready(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || err.raw_os_error() == Some(ERROR_PIPE_BUSY)
}

#[derive(Debug)]
pub(super) struct Listener {
    pipe_name: String,
    pending: Option<NamedPipeServer>,
}

impl Listener {
    pub(super) fn bind(address: &ChannelAddress) -> Result<Self, BindError> {
        let pipe_name = address.pipe_name();
        let server = ServerOptions::new()
            .first_pipe_instance(true)
            .access_outbound(false)
            .create(&pipe_name)
            .map_err(|source| {
                if source.raw_os_error() == Some(ERROR_ACCESS_DENIED) {
                    BindError::AlreadyBound {
                        endpoint: pipe_name.clone(),
                    }
                } else {
                    BindError::Io {
                        endpoint: pipe_name.clone(),
                        source,
                    }
                }
            })?;
        Ok(Self {
            pipe_name,
            pending: Some(server),
        })
    }

    /// Each session consumes one pipe instance; the next one is created on demand.
    pub(super) async fn accept(&mut self) -> io::Result<SessionStream> {
        if self.pending.is_none() {
            let server = ServerOptions::new()
                .access_outbound(false)
                .create(&self.pipe_name)?;
            self.pending = Some(server);
        }
        if let Some(server) = self.pending.as_ref() {
            server.connect().await?;
        }
        self.pending
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "pipe instance missing"))
    }
}
