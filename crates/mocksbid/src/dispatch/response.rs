//! Response framing for the SBI wire protocol.
//!
//! Plain responses are a status line, CORS headers and a JSON body. Streams
//! are a `multipart/x-mixed-replace` preamble followed by one part per JPEG
//! frame and a final JSON status part.

use std::io::{self, Write};

const ALLOWED_HEADERS: &str = "DNT,X-Mx-ReqToken,Keep-Alive,User-Agent,X-Requested-With,If-Modified-Since,Cache-Control,Content-Type,X-PINGOTHER,Authorization";
const BOUNDARY: &str = "--BoundaryString";

/// Builds raw response bytes for one listener address.
#[derive(Debug, Clone)]
pub struct ResponseFramer {
    cors_methods: String,
    host: String,
    port: u16,
}

impl ResponseFramer {
    pub fn new(cors_methods: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            cors_methods: cors_methods.into(),
            host: host.into(),
            port,
        }
    }

    /// `http://host:port/` as advertised in discovery payloads.
    #[must_use]
    pub fn callback_id(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// `200` envelope around `body`.
    #[must_use]
    pub fn success(&self, body: &str) -> String {
        self.envelope("200 OK", body)
    }

    /// `405` envelope around an error body.
    #[must_use]
    pub fn error(&self, body: &str) -> String {
        self.envelope("405 OK", body)
    }

    /// CORS pre-flight answer with no body.
    #[must_use]
    pub fn preflight(&self) -> String {
        format!(
            "HTTP/1.1 200 OK\r\n{}Content-Length: 0\r\nConnection: close\r\n\r\n",
            self.cors_headers()
        )
    }

    /// Multipart preamble written before the first frame.
    #[must_use]
    pub fn stream_preamble(&self) -> String {
        format!(
            concat!(
                "HTTP/1.0 200 OK\r\n",
                "Server: http://{}:{}\r\n",
                "Connection: close\r\n",
                "Max-Age: 0\r\n",
                "Expires: 0\r\n",
                "Cache-Control: no-cache, private\r\n",
                "Pragma: no-cache\r\n",
                "Content-Type: multipart/x-mixed-replace; boundary={}\r\n\r\n",
            ),
            self.host, self.port, BOUNDARY
        )
    }

    /// One JPEG part.
    #[must_use]
    pub fn frame_part(frame: &[u8]) -> Vec<u8> {
        part("image/jpeg", frame)
    }

    /// Final JSON status part.
    #[must_use]
    pub fn status_part(body: &str) -> Vec<u8> {
        part("application/json", body.as_bytes())
    }

    fn cors_headers(&self) -> String {
        format!(
            concat!(
                "Access-Control-Allow-Headers:{}\r\n",
                "Access-Control-Allow-Origin: *\r\n",
                "Access-Control-Allow-Methods: {}\r\n",
                "Access-Control-Allow-Credentials: true\r\n",
            ),
            ALLOWED_HEADERS, self.cors_methods
        )
    }

    fn envelope(&self, status: &str, body: &str) -> String {
        format!(
            concat!(
                "HTTP/1.1 {status}\r\n",
                "{cors}",
                "CACHE-CONTROL:no-cache\r\n",
                "Content-Length: {length}\r\n",
                "Content-Type: application/json\r\n",
                "LOCATION: HTTP://{host}:{port}/\r\n",
                "Connection: close\r\n\r\n",
                "{body}\r\n\r\n",
            ),
            status = status,
            cors = self.cors_headers(),
            length = body.len(),
            host = self.host,
            port = self.port,
            body = body,
        )
    }
}

fn part(content_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = format!(
        "{BOUNDARY}\r\nAccess-Control-Allow-Origin:*\r\nContent-Type:{content_type}\r\nContent-Length:{}\r\n\r\n",
        payload.len()
    )
    .into_bytes();
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(b"\r\n\r\n");
    bytes
}

/// Writer that frames responses onto a stream.
pub struct ResponseWriter<'a, W> {
    writer: W,
    framer: &'a ResponseFramer,
}

impl<'a, W: Write> ResponseWriter<'a, W> {
    /// Creates a new response writer wrapping the given output stream.
    pub fn new(writer: W, framer: &'a ResponseFramer) -> Self {
        Self { writer, framer }
    }

    /// Writes a `200` response and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_success(&mut self, body: &str) -> io::Result<()> {
        let framed = self.framer.success(body);
        self.write_flushed(framed.as_bytes())
    }

    /// Writes a `405` response and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_error(&mut self, body: &str) -> io::Result<()> {
        let framed = self.framer.error(body);
        self.write_flushed(framed.as_bytes())
    }

    /// Writes the pre-flight response and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_preflight(&mut self) -> io::Result<()> {
        let framed = self.framer.preflight();
        self.write_flushed(framed.as_bytes())
    }

    /// Writes the stream preamble and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_stream_preamble(&mut self) -> io::Result<()> {
        let framed = self.framer.stream_preamble();
        self.write_flushed(framed.as_bytes())
    }

    /// Writes one preview frame and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails, typically because the client left.
    pub fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.write_flushed(&ResponseFramer::frame_part(frame))
    }

    /// Writes the terminal stream status and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_stream_status(&mut self, body: &str) -> io::Result<()> {
        self.write_flushed(&ResponseFramer::status_part(body))
    }

    fn write_flushed(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }
}
