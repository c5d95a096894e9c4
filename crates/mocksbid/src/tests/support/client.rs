//! Minimal raw-TCP client speaking the emulator's wire format.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use serde_json::Value;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the emulator wrote before closing the connection.
#[derive(Debug, Clone)]
pub struct WireResponse {
    raw: String,
}

impl WireResponse {
    /// First line of the response, without the terminator.
    pub fn status_line(&self) -> &str {
        self.raw.lines().next().unwrap_or_default()
    }

    /// Text after the header block, trimmed.
    pub fn body(&self) -> &str {
        self.raw
            .split_once("\r\n\r\n")
            .map_or("", |(_, body)| body.trim())
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(self.body())
            .unwrap_or_else(|error| panic!("body is not JSON ({error}): {}", self.body()))
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Sends `verb` with an optional JSON body and reads until the server closes.
pub fn send(address: SocketAddr, verb: &str, body: Option<&str>) -> io::Result<WireResponse> {
    let request = match body {
        Some(body) => format!(
            "{verb} / HTTP/1.1\r\nHost: {address}\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ),
        None => format!("{verb} / HTTP/1.1\r\nHost: {address}\r\n\r\n"),
    };
    send_raw(address, request.as_bytes())
}

/// Writes `bytes` verbatim and reads until the server closes.
pub fn send_raw(address: SocketAddr, bytes: &[u8]) -> io::Result<WireResponse> {
    let mut stream = TcpStream::connect(address)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    stream.write_all(bytes)?;
    stream.flush()?;
    stream.shutdown(Shutdown::Write)?;
    let mut output = Vec::new();
    stream.read_to_end(&mut output)?;
    Ok(WireResponse {
        raw: String::from_utf8_lossy(&output).into_owned(),
    })
}
