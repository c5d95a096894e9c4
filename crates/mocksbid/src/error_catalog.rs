//! Numeric protocol error codes and their human-readable descriptions.
//!
//! Every failure a client can observe is reported as a numeric code plus a
//! message. The message is the catalogued description for the configured
//! locale followed by any detail the handler supplied.

use serde_json::{Value, json};

/// Description used when a code has no catalogue entry for the locale.
pub(crate) const NO_DESCRIPTION: &str = "No Description available.";

/// Protocol error codes.
pub(crate) mod codes {
    pub(crate) const SUCCESS: u16 = 0;

    pub(crate) const NOT_REGISTERED: u16 = 100;
    pub(crate) const NO_DEVICE_INFO: u16 = 106;
    pub(crate) const INVALID_COUNT: u16 = 109;
    pub(crate) const NOT_READY: u16 = 110;
    pub(crate) const BUSY: u16 = 111;
    pub(crate) const INVALID_TRANSACTION_ID: u16 = 112;
    pub(crate) const INVALID_TIMEOUT: u16 = 113;
    pub(crate) const INVALID_DEVICE_TYPE: u16 = 114;
    pub(crate) const INVALID_ENV: u16 = 115;
    pub(crate) const INVALID_REQUESTED_SCORE: u16 = 116;
    pub(crate) const DEVICE_TYPE_MISMATCH: u16 = 120;
    pub(crate) const INVALID_PURPOSE: u16 = 121;
    pub(crate) const INVALID_SUBTYPE_SET: u16 = 122;

    pub(crate) const UNSUPPORTED_VERB: u16 = 500;
    pub(crate) const MALFORMED_BODY: u16 = 501;
    pub(crate) const INVALID_TYPE: u16 = 502;
    pub(crate) const NOTHING_DISCOVERED: u16 = 503;
    pub(crate) const INVALID_STATUS: u16 = 504;
    pub(crate) const INVALID_SCORE: u16 = 505;
    pub(crate) const INVALID_DELAY: u16 = 506;
    pub(crate) const INVALID_METHOD: u16 = 507;

    pub(crate) const INVALID_SUB_ID: u16 = 601;
    pub(crate) const STREAM_DEVICE_ID_EMPTY: u16 = 604;
    pub(crate) const STREAM_DEVICE_NOT_FOUND: u16 = 605;
    pub(crate) const STREAM_NOT_REGISTRATION: u16 = 606;
    pub(crate) const STREAM_TIMEOUT: u16 = 608;
    pub(crate) const STREAM_FAILURE: u16 = 610;

    pub(crate) const STREAM_ENDED: u16 = 700;
    pub(crate) const RCAPTURE_TIMEOUT: u16 = 701;
    pub(crate) const RCAPTURE_SUB_ID_MISMATCH: u16 = 702;
    pub(crate) const RCAPTURE_IN_PROGRESS: u16 = 703;
    pub(crate) const RCAPTURE_DEVICE_ID_EMPTY: u16 = 704;
    pub(crate) const RCAPTURE_DEVICE_NOT_FOUND: u16 = 705;
    pub(crate) const RCAPTURE_NOT_REGISTRATION: u16 = 706;
    pub(crate) const RCAPTURE_NOT_CAPTURED: u16 = 708;
    pub(crate) const RCAPTURE_FAILURE: u16 = 710;

    pub(crate) const CAPTURE_TIMEOUT: u16 = 801;
    pub(crate) const CAPTURE_IN_PROGRESS: u16 = 803;
    pub(crate) const CAPTURE_DEVICE_ID_EMPTY: u16 = 804;
    pub(crate) const CAPTURE_DEVICE_NOT_FOUND: u16 = 805;
    pub(crate) const CAPTURE_NOT_AUTH: u16 = 806;
    pub(crate) const CAPTURE_NOT_CAPTURED: u16 = 808;
    pub(crate) const CAPTURE_KEY_UNAVAILABLE: u16 = 809;
    pub(crate) const CAPTURE_FAILURE: u16 = 810;

    pub(crate) const INTERNAL: u16 = 999;
}

fn english(code: u16) -> Option<&'static str> {
    let description = match code {
        0 => "Success",
        100 => "Device not registered",
        106 => "Device info not available",
        109 => "Requested number of biometrics not supported",
        110 => "Device not ready",
        111 => "Device busy",
        112 => "Invalid transaction id",
        113 => "Invalid timeout",
        114 => "Invalid device type",
        115 => "Invalid environment",
        116 => "Invalid requested score",
        120 => "Device type does not match the requested type",
        121 => "Invalid purpose",
        122 => "Invalid bio subtype or exception count",
        500 => "Unsupported request verb",
        501 => "Request body is missing or malformed",
        502 => "Invalid type value",
        503 => "No devices discovered",
        504 => "Invalid device status value",
        505 => "Invalid quality score value",
        506 => "Invalid delay value",
        507 => "Invalid method value",
        601 => "Invalid device sub id",
        604 => "Device id is empty",
        605 => "Device not found for the given device id",
        606 => "Streaming is only supported by registration devices",
        608 => "Stream timed out",
        610 => "Streaming failed",
        700 => "Stream ended before capture",
        701 => "Capture timed out",
        702 => "Device sub id does not match the running stream",
        703 => "Capture already in progress",
        704 => "Device id is empty",
        705 => "Device not found for the given device id",
        706 => "Not a registration device",
        708 => "Biometric sample not captured",
        710 => "Capture failed",
        801 => "Capture timed out",
        803 => "Capture already in progress",
        804 => "Device id is empty",
        805 => "Device not found for the given device id",
        806 => "Not an authentication device",
        808 => "Biometric sample not captured",
        809 => "Encryption key unavailable",
        810 => "Capture failed",
        999 => "Unexpected internal error",
        _ => return None,
    };
    Some(description)
}

/// Locale-aware lookup of error descriptions.
#[derive(Debug, Clone)]
pub(crate) struct ErrorCatalog {
    locale: String,
}

impl ErrorCatalog {
    pub(crate) fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }

    /// Catalogued description of `code`.
    pub(crate) fn description(&self, code: u16) -> &'static str {
        let locale = self.locale.trim();
        let entry = if locale.is_empty() || locale.eq_ignore_ascii_case("en") {
            english(code)
        } else {
            None
        };
        entry.unwrap_or(NO_DESCRIPTION)
    }

    /// Description followed by `detail`, trimmed.
    pub(crate) fn message(&self, code: u16, detail: &str) -> String {
        format!("{} {detail}", self.description(code)).trim().to_owned()
    }

    /// `{errorCode, errorInfo}` as a JSON value.
    pub(crate) fn error_value(&self, code: u16, detail: &str) -> Value {
        json!({
            "errorCode": code.to_string(),
            "errorInfo": self.message(code, detail),
        })
    }

    /// `{errorCode, errorMessage}` envelope returned by the admin verbs.
    pub(crate) fn admin_value(&self, code: u16, detail: &str) -> Value {
        json!({
            "errorCode": code.to_string(),
            "errorMessage": self.message(code, detail),
        })
    }

    /// Serialised `{errorCode, errorInfo}` object.
    pub(crate) fn plain_json(&self, code: u16, detail: &str) -> String {
        self.error_value(code, detail).to_string()
    }
}
