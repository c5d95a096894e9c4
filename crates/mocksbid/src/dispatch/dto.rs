//! Request bodies accepted by each verb.
//!
//! Clients are inconsistent about quoting numbers, so numeric fields accept
//! either JSON numbers or strings and are validated by the handlers.

use serde::Deserialize;

/// A number that may arrive as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberLike {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberLike {
    /// Integer value, if the field holds one.
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) => value.to_string().parse().ok(),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// A flag that may arrive as a JSON boolean or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum FlagLike {
    Bool(bool),
    Text(String),
}

impl FlagLike {
    pub(crate) fn is_set(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(text) => text.trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// `MOSIPDISC` and `MOSIPDINFO` body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DiscoveryRequest {
    #[serde(rename = "type", default)]
    pub(crate) device_type: Option<String>,
}

/// `STREAM` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StreamRequest {
    #[serde(default)]
    pub(crate) device_id: Option<String>,
    #[serde(default)]
    pub(crate) device_sub_id: Option<NumberLike>,
    #[serde(default)]
    pub(crate) timeout: Option<NumberLike>,
}

/// `RCAPTURE` and `CAPTURE` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptureRequest {
    #[serde(default)]
    pub(crate) env: Option<String>,
    #[serde(default)]
    pub(crate) purpose: Option<String>,
    #[serde(default)]
    pub(crate) spec_version: Option<String>,
    #[serde(default)]
    pub(crate) timeout: Option<NumberLike>,
    #[serde(default)]
    pub(crate) transaction_id: Option<String>,
    #[serde(default)]
    pub(crate) bio: Vec<BioRequest>,
}

/// One entry of a capture request's `bio` array.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BioRequest {
    #[serde(rename = "type", default)]
    pub(crate) bio_type: Option<String>,
    #[serde(default)]
    pub(crate) count: Option<NumberLike>,
    #[serde(default)]
    pub(crate) bio_sub_type: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) exception: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) requested_score: Option<NumberLike>,
    #[serde(default)]
    pub(crate) device_id: Option<String>,
    #[serde(default)]
    pub(crate) device_sub_id: Option<NumberLike>,
}

/// `SETSTATUS` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusRequest {
    #[serde(rename = "type", default)]
    pub(crate) device_type: Option<String>,
    #[serde(default)]
    pub(crate) device_status: Option<String>,
}

/// `SETSCORE` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScoreRequest {
    #[serde(rename = "type", default)]
    pub(crate) device_type: Option<String>,
    #[serde(default)]
    pub(crate) quality_score: Option<NumberLike>,
    #[serde(default)]
    pub(crate) from_iso: Option<FlagLike>,
}

/// `SETDELAY` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DelayRequest {
    #[serde(rename = "type", default)]
    pub(crate) device_type: Option<String>,
    #[serde(default)]
    pub(crate) delay: Option<NumberLike>,
    #[serde(default)]
    pub(crate) method: Vec<String>,
}

/// `SETPROFILE` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileRequest {
    #[serde(default)]
    pub(crate) profile_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::number("4", Some(4))]
    #[case::quoted("\"4\"", Some(4))]
    #[case::padded("\" 12 \"", Some(12))]
    #[case::whole_float("3.0", Some(3))]
    #[case::fraction("2.5", None)]
    #[case::text("\"four\"", None)]
    fn lenient_numbers(#[case] json: &str, #[case] expected: Option<i64>) {
        let value: NumberLike = serde_json::from_str(json).expect("number-like");
        assert_eq!(value.as_i64(), expected);
    }

    #[test]
    fn capture_requests_accept_quoted_fields() {
        let request: CaptureRequest = serde_json::from_str(
            r#"{"env":"Staging","purpose":"Registration","timeout":"10000",
                "transactionId":"abc-1","bio":[{"type":"Finger","count":"4",
                "deviceId":"1","deviceSubId":"1","exception":[]}]}"#,
        )
        .expect("capture request");
        assert_eq!(request.timeout.and_then(|t| t.as_i64()), Some(10_000));
        let bio = request.bio.first().expect("bio entry");
        assert_eq!(bio.count.as_ref().and_then(NumberLike::as_i64), Some(4));
        assert_eq!(bio.device_sub_id.as_ref().and_then(NumberLike::as_i64), Some(1));
        assert!(bio.bio_sub_type.is_none());
    }

    #[rstest]
    #[case::bool("true", true)]
    #[case::text("\"TRUE\"", true)]
    #[case::no("false", false)]
    fn flags(#[case] json: &str, #[case] expected: bool) {
        let flag: FlagLike = serde_json::from_str(json).expect("flag");
        assert_eq!(flag.is_set(), expected);
    }
}
