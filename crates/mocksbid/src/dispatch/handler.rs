//! Connection handler that answers one SBI request per connection.
//!
//! The handler reads the raw request, answers `OPTIONS` pre-flights, enforces
//! the verb allow-list, dispatches everything else and closes the socket.

use std::io::BufReader;
use std::time::Duration;

use tracing::{debug, warn};

use crate::transport::{ConnectionHandler, ConnectionStream};

use super::request::{RawRequest, RequestError};
use super::response::{ResponseFramer, ResponseWriter};
use super::router::{DISPATCH_TARGET, DispatchRequest, Reply, RequestDispatcher, Verb};
use crate::error_catalog::codes;

/// How long a client may take to send its request.
pub(crate) const READ_TIMEOUT: Duration = Duration::from_secs(30);

const PREFLIGHT_VERB: &str = "OPTIONS";

/// Connection handler backed by a [`RequestDispatcher`].
pub(crate) struct DispatchConnectionHandler {
    dispatcher: RequestDispatcher,
    framer: ResponseFramer,
}

impl DispatchConnectionHandler {
    pub(crate) fn new(dispatcher: RequestDispatcher, framer: ResponseFramer) -> Self {
        Self { dispatcher, framer }
    }

    fn dispatch(&self, stream: &mut ConnectionStream) {
        let arrived = self.dispatcher.clock().now();
        if let Err(error) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
            debug!(target: DISPATCH_TARGET, %error, "failed to set read timeout");
        }
        let request = stream
            .try_clone()
            .map_err(RequestError::from)
            .and_then(|reader| RawRequest::read_from(&mut BufReader::new(reader)));
        let mut writer = ResponseWriter::new(stream, &self.framer);

        let request = match request {
            Ok(request) => request,
            Err(RequestError::Empty) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                let body = self
                    .dispatcher
                    .settings()
                    .errors
                    .plain_json(codes::INTERNAL, &error.to_string());
                report_write(writer.write_error(&body));
                return;
            }
        };

        let verb = request.verb();
        if verb == PREFLIGHT_VERB {
            report_write(writer.write_preflight());
            return;
        }
        let parsed = Verb::parse(verb).filter(|_| self.dispatcher.settings().allows_method(verb));
        let Some(parsed) = parsed else {
            debug!(target: DISPATCH_TARGET, verb, "unsupported verb");
            let body = self
                .dispatcher
                .settings()
                .errors
                .plain_json(codes::UNSUPPORTED_VERB, verb);
            report_write(writer.write_error(&body));
            return;
        };

        let dispatch_request = DispatchRequest {
            method: verb,
            body: request.json_body(),
            arrived,
        };
        match self.dispatcher.dispatch(parsed, dispatch_request, &mut writer) {
            Reply::Json(body) => report_write(writer.write_success(&body)),
            Reply::Streamed => {}
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        self.dispatch(&mut stream);
        stream.close();
    }
}

fn report_write(result: std::io::Result<()>) {
    if let Err(error) = result {
        debug!(target: DISPATCH_TARGET, %error, "failed to write response");
    }
}
