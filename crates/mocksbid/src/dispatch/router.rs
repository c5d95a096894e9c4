//! Verb routing for the SBI dispatcher.
//!
//! The router maps a request verb onto its handler and converts every
//! handler failure into the JSON error shape of the verb's family. Handlers
//! only ever return a [`DispatchError`]; the family shapes live here.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, warn};

use super::errors::DispatchError;
use super::response::ResponseWriter;
use super::{admin, capture, discovery, stream};
use crate::crypto::{Encryptor, Signer};
use crate::device::{Clock, DeviceKind, DeviceRegistry};
use crate::error_catalog::{ErrorCatalog, codes};
use crate::health::HealthReporter;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Spec version reported in capture blocks when the request names none.
pub(crate) const DEFAULT_SPEC_VERSION: &str = "0.9.5";

/// Verbs the dispatcher understands. `OPTIONS` never reaches the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Discover,
    DeviceInfo,
    Stream,
    RegistrationCapture,
    AuthCapture,
    SetStatus,
    SetScore,
    SetDelay,
    SetProfile,
}

impl Verb {
    /// Parses an upper-cased wire verb.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let verb = match value.trim().to_ascii_uppercase().as_str() {
            "MOSIPDISC" | "GET" => Self::Discover,
            "MOSIPDINFO" => Self::DeviceInfo,
            "STREAM" => Self::Stream,
            "RCAPTURE" => Self::RegistrationCapture,
            "CAPTURE" => Self::AuthCapture,
            "SETSTATUS" => Self::SetStatus,
            "SETSCORE" => Self::SetScore,
            "SETDELAY" => Self::SetDelay,
            "SETPROFILE" => Self::SetProfile,
            _ => return None,
        };
        Some(verb)
    }

    /// Canonical wire name.
    #[must_use]
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Discover => "MOSIPDISC",
            Self::DeviceInfo => "MOSIPDINFO",
            Self::Stream => "STREAM",
            Self::RegistrationCapture => "RCAPTURE",
            Self::AuthCapture => "CAPTURE",
            Self::SetStatus => "SETSTATUS",
            Self::SetScore => "SETSCORE",
            Self::SetDelay => "SETDELAY",
            Self::SetProfile => "SETPROFILE",
        }
    }

    #[must_use]
    pub const fn family(self) -> VerbFamily {
        match self {
            Self::Discover => VerbFamily::Discovery,
            Self::DeviceInfo => VerbFamily::Info,
            Self::Stream => VerbFamily::Stream,
            Self::RegistrationCapture => VerbFamily::RegistrationCapture,
            Self::AuthCapture => VerbFamily::AuthCapture,
            Self::SetStatus | Self::SetScore | Self::SetDelay | Self::SetProfile => {
                VerbFamily::Admin
            }
        }
    }
}

/// Groups of verbs sharing an error shape and failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbFamily {
    Discovery,
    Info,
    Stream,
    RegistrationCapture,
    AuthCapture,
    Admin,
}

impl VerbFamily {
    /// Code reported for infrastructure failures within this family.
    #[must_use]
    pub const fn failure_code(self) -> u16 {
        match self {
            Self::Stream => codes::STREAM_FAILURE,
            Self::RegistrationCapture => codes::RCAPTURE_FAILURE,
            Self::AuthCapture => codes::CAPTURE_FAILURE,
            Self::Discovery | Self::Info | Self::Admin => codes::INTERNAL,
        }
    }
}

/// One request as seen by a handler.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DispatchRequest<'a> {
    /// Verb exactly as received; keys the per-device delay table.
    pub(crate) method: &'a str,
    /// Body from its first `{`, if any.
    pub(crate) body: Option<&'a str>,
    /// When the request was read, for deadline computation.
    pub(crate) arrived: Instant,
}

/// What the handler left for the connection worker to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reply {
    /// A body for the success envelope.
    Json(String),
    /// The handler already wrote a multipart stream.
    Streamed,
}

/// Trait-object collaborators shared by every handler.
#[derive(Clone)]
pub(crate) struct Collaborators {
    pub(crate) signer: Arc<dyn Signer>,
    pub(crate) encryptor: Arc<dyn Encryptor>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Static settings derived from configuration.
#[derive(Debug, Clone)]
pub(crate) struct DispatchSettings {
    pub(crate) callback_id: String,
    pub(crate) cors_methods: Vec<String>,
    pub(crate) stream_timeout: Duration,
    pub(crate) errors: ErrorCatalog,
}

impl DispatchSettings {
    pub(crate) fn allows_method(&self, method: &str) -> bool {
        let method = method.trim();
        self.cors_methods
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(method))
    }
}

/// Routes verbs to handlers against one device registry.
pub(crate) struct RequestDispatcher {
    pub(super) registry: Arc<DeviceRegistry>,
    pub(super) collaborators: Collaborators,
    pub(super) settings: DispatchSettings,
}

impl RequestDispatcher {
    pub(crate) fn new(
        registry: Arc<DeviceRegistry>,
        collaborators: Collaborators,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            collaborators,
            settings,
        }
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.collaborators.clock.as_ref()
    }

    pub(crate) const fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Runs `verb` and returns the body to frame.
    ///
    /// Failures never escape: each is logged and rendered as the family's
    /// error shape.
    pub(crate) fn dispatch<W: Write>(
        &self,
        verb: Verb,
        request: DispatchRequest<'_>,
        writer: &mut ResponseWriter<'_, W>,
    ) -> Reply {
        debug!(
            target: DISPATCH_TARGET,
            verb = verb.method_name(),
            method = request.method,
            has_body = request.body.is_some(),
            "dispatching request"
        );
        let outcome = match verb {
            Verb::Discover => discovery::discover(self, request, false).map(Reply::Json),
            Verb::DeviceInfo => discovery::discover(self, request, true).map(Reply::Json),
            Verb::Stream => stream::stream(self, request, writer),
            Verb::RegistrationCapture | Verb::AuthCapture => {
                capture::capture(self, request, verb).map(Reply::Json)
            }
            Verb::SetStatus => admin::set_status(self, request).map(Reply::Json),
            Verb::SetScore => admin::set_score(self, request).map(Reply::Json),
            Verb::SetDelay => admin::set_delay(self, request).map(Reply::Json),
            Verb::SetProfile => admin::set_profile(self, request).map(Reply::Json),
        };
        outcome.unwrap_or_else(|error| Reply::Json(self.error_body(verb, &error)))
    }

    /// Renders `error` in the shape clients of `verb` expect.
    pub(crate) fn error_body(&self, verb: Verb, error: &DispatchError) -> String {
        let family = verb.family();
        let code = error.code(family);
        let detail = error.detail();
        if matches!(error, DispatchError::Rejected { .. }) {
            debug!(
                target: DISPATCH_TARGET,
                verb = verb.method_name(),
                code,
                detail = %detail,
                "request rejected"
            );
        } else {
            warn!(
                target: DISPATCH_TARGET,
                verb = verb.method_name(),
                code,
                error = %error,
                "request failed"
            );
        }
        let errors = &self.settings.errors;
        let value = match family {
            VerbFamily::Discovery | VerbFamily::Info => {
                json!([{ "error": errors.error_value(code, &detail) }])
            }
            VerbFamily::RegistrationCapture => json!({
                "biometrics": [{
                    "specVersion": DEFAULT_SPEC_VERSION,
                    "data": "",
                    "hash": "",
                    "error": errors.error_value(code, &detail),
                }]
            }),
            VerbFamily::AuthCapture => json!({
                "biometrics": [{
                    "specVersion": DEFAULT_SPEC_VERSION,
                    "data": "",
                    "hash": "",
                    "sessionKey": "",
                    "thumbprint": "",
                    "error": errors.error_value(code, &detail),
                }]
            }),
            VerbFamily::Stream => errors.error_value(code, &detail),
            VerbFamily::Admin => errors.admin_value(code, &detail),
        };
        value.to_string()
    }

    /// Sleeps for the delay configured on `kind` for `method`.
    pub(super) fn apply_delay(&self, kind: DeviceKind, method: &str) -> Result<(), DispatchError> {
        let delay = self
            .registry
            .with_device(kind, |device| device.delays().delay_for(method))?
            .unwrap_or_default();
        if !delay.is_zero() {
            debug!(
                target: DISPATCH_TARGET,
                device = %kind,
                method,
                delay_ms = delay.as_millis(),
                "applying artificial delay"
            );
            self.clock().sleep(delay);
        }
        Ok(())
    }
}

/// Decodes a verb body, mapping serde failures onto the family code.
pub(super) fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, DispatchError> {
    serde_json::from_str(body).map_err(DispatchError::from_json_error)
}

/// Body of a verb that requires one, or `501`.
pub(super) fn require_body<'a>(request: &DispatchRequest<'a>) -> Result<&'a str, DispatchError> {
    request
        .body
        .ok_or_else(|| DispatchError::rejected(codes::MALFORMED_BODY))
}
