//! Local byte-stream channel in two roles: a write-only client used by the producer and a
//! listening server that hands out one read-only session at a time to the viewer.

use std::{
    io::{self, Write},
    pin::Pin,
    task::{Context, Poll},
    thread,
    time::{Duration, Instant},
};

use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{defaults::CONNECT_POLL_INTERVAL, AcceptError, BindError, ChannelAddress, ConnectError};

const MIN_WRITE_TIMEOUT: Duration = Duration::from_millis(1);

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as sys;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as sys;

/// Opens the write side of the channel, polling until a viewer accepts or `timeout` elapses.
///
/// A zero timeout makes exactly one attempt. Reaching the deadline is reported as
/// [`ConnectError::Unavailable`], which callers treat as "no viewer right now".
pub fn open_client(
    address: &ChannelAddress,
    timeout: Duration,
) -> Result<ClientConnection, ConnectError> {
    let deadline = Instant::now() + timeout;
    loop {
        match sys::connect(address) {
            Ok(stream) => return Ok(ClientConnection { stream }),
            Err(err) if sys::is_not_ready(&err) => {
                let now = Instant::now();
                if now >= deadline {
                    debug!(endpoint = %address.endpoint(), ?timeout, "no viewer listening");
                    return Err(ConnectError::Unavailable {
                        endpoint: address.endpoint(),
                        timeout,
                    });
                }
                thread::sleep(CONNECT_POLL_INTERVAL.min(deadline - now));
            }
            Err(source) => {
                return Err(ConnectError::Io {
                    endpoint: address.endpoint(),
                    source,
                })
            }
        }
    }
}

/// Write-only handle held by the producer.
#[derive(Debug)]
pub struct ClientConnection {
    stream: sys::ClientStream,
}

impl ClientConnection {
    /// Bounds how long a single write may wait for the viewer to drain the channel. A write that
    /// runs out of time fails with `WouldBlock` or `TimedOut`. Zero is raised to one millisecond.
    pub fn set_write_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        sys::set_write_timeout(&mut self.stream, timeout.max(MIN_WRITE_TIMEOUT))
    }
}

impl Write for ClientConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Server role: owns the channel binding for as long as it lives.
#[derive(Debug)]
pub struct ChannelListener {
    address: ChannelAddress,
    inner: sys::Listener,
}

impl ChannelListener {
    /// Binds the channel. Fails with [`BindError::AlreadyBound`] while another viewer holds it.
    pub fn bind(address: ChannelAddress) -> Result<Self, BindError> {
        let inner = sys::Listener::bind(&address)?;
        debug!(endpoint = %address.endpoint(), "channel bound");
        Ok(Self { address, inner })
    }

    pub fn address(&self) -> &ChannelAddress {
        &self.address
    }

    /// Waits for exactly one producer connection, or until `cancel` fires.
    pub async fn accept_once(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<ChannelSession, AcceptError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AcceptError::Cancelled),
            accepted = self.inner.accept() => {
                let stream = accepted.map_err(AcceptError::Io)?;
                Ok(ChannelSession { stream })
            }
        }
    }
}

/// Read-only side of one accepted connection.
#[derive(Debug)]
pub struct ChannelSession {
    stream: sys::SessionStream,
}

impl AsyncRead for ChannelSession {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}
