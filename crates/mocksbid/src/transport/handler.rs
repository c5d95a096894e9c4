//! Connection handling abstractions for the device listener.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use super::LISTENER_TARGET;

/// Accepted client connection.
///
/// Every request arrives on its own connection, and the connection is closed
/// once the response (or the stream) has been written.
pub(crate) struct ConnectionStream {
    inner: TcpStream,
}

impl ConnectionStream {
    pub(crate) const fn new(inner: TcpStream) -> Self {
        Self { inner }
    }

    /// Second handle to the same socket, used as the request reader.
    pub(crate) fn try_clone(&self) -> io::Result<Self> {
        self.inner.try_clone().map(Self::new)
    }

    /// Bounds how long a read may block waiting for the client.
    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.inner.set_read_timeout(timeout)
    }

    /// Closes both directions of the socket.
    pub(crate) fn close(&self) {
        if let Err(error) = self.inner.shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(
                target: LISTENER_TARGET,
                error = %error,
                "failed to shut down connection"
            );
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}
