//! Error types for request dispatch failures.
//!
//! Every failure is eventually reported to the client as a catalogue code.
//! Rejections carry their code explicitly; infrastructure failures take the
//! failure code of the verb family that raised them.

use std::io;

use thiserror::Error;

use super::router::VerbFamily;
use crate::crypto::CryptoError;
use crate::device::{CatalogError, RegistryPoisonedError};

/// Errors surfaced while dispatching a verb.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request was understood and refused with a protocol code.
    #[error("request rejected with code {code}: {detail}")]
    Rejected { code: u16, detail: String },

    /// The body could not be decoded as the verb's request shape.
    #[error("malformed request body: {message}")]
    MalformedBody {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// IO error while writing streamed output.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Signing or encryption failed.
    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    /// Canned device data could not be read.
    #[error("catalogue failure: {0}")]
    Catalog(#[from] CatalogError),

    /// Internal error (e.g., lock poisoned).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Protocol code reported for this error within `family`.
    pub fn code(&self, family: VerbFamily) -> u16 {
        match self {
            Self::Rejected { code, .. } => *code,
            Self::MalformedBody { .. }
            | Self::Io(_)
            | Self::Crypto(_)
            | Self::Catalog(_)
            | Self::Internal { .. } => family.failure_code(),
        }
    }

    /// Text appended to the catalogue description.
    pub fn detail(&self) -> String {
        match self {
            Self::Rejected { detail, .. } => detail.clone(),
            Self::MalformedBody { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Creates a rejection with no extra detail.
    pub fn rejected(code: u16) -> Self {
        Self::Rejected {
            code,
            detail: String::new(),
        }
    }

    /// Creates a rejection with detail text.
    pub fn rejected_with(code: u16, detail: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            detail: detail.into(),
        }
    }

    /// Creates a malformed-body error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedBody {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<RegistryPoisonedError> for DispatchError {
    fn from(error: RegistryPoisonedError) -> Self {
        Self::internal(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error_catalog::codes;

    #[rstest]
    #[case::stream(VerbFamily::Stream, codes::STREAM_FAILURE)]
    #[case::registration(VerbFamily::RegistrationCapture, codes::RCAPTURE_FAILURE)]
    #[case::auth(VerbFamily::AuthCapture, codes::CAPTURE_FAILURE)]
    #[case::discovery(VerbFamily::Discovery, codes::INTERNAL)]
    #[case::admin(VerbFamily::Admin, codes::INTERNAL)]
    fn failures_take_the_family_code(#[case] family: VerbFamily, #[case] expected: u16) {
        let error = DispatchError::internal("lock poisoned");
        assert_eq!(error.code(family), expected);
        assert!(error.detail().contains("lock poisoned"));
    }

    #[test]
    fn rejections_keep_their_code() {
        let error = DispatchError::rejected_with(codes::BUSY, "finger");
        assert_eq!(error.code(VerbFamily::AuthCapture), codes::BUSY);
        assert_eq!(error.detail(), "finger");
    }

    #[test]
    fn malformed_bodies_report_the_parser_message() {
        let source = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid");
        let error = DispatchError::from_json_error(source);
        assert_eq!(error.code(VerbFamily::Stream), codes::STREAM_FAILURE);
        assert!(error.detail().contains("EOF"));
    }
}
