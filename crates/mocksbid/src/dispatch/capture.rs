//! `RCAPTURE` and `CAPTURE` handlers.
//!
//! Validation runs in a fixed order and stops at the first failure, before
//! any device state changes. An accepted capture claims the device, then
//! polls the modality driver under the sensor lock until every planned
//! subtype has been attempted or the deadline passes. Teardown happens in
//! [`CaptureClaim`]'s `Drop` so the device is restored on every exit path.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mocksbi_config::Purpose;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::dto::{BioRequest, CaptureRequest, NumberLike};
use super::errors::DispatchError;
use super::router::{
    DEFAULT_SPEC_VERSION, DISPATCH_TARGET, DispatchRequest, RequestDispatcher, Verb, decode,
    require_body,
};
use crate::crypto::{RollingHash, thumbprint};
use crate::device::capture::{CaptureOutcome, CapturePlan, ClaimId, SampleSlot};
use crate::device::modality::{PlanRequest, SampleSource, driver};
use crate::device::selector::SubtypeSelector;
use crate::device::session::Admission;
use crate::device::{CatalogError, DeviceKind, DeviceRegistry, Modality};
use crate::error_catalog::codes;

/// Pause between capture polls.
pub(super) const TICK: Duration = Duration::from_millis(30);

const ENVIRONMENTS: [&str; 4] = ["Staging", "Developer", "Pre-Production", "Production"];
const MAX_TRANSACTION_ID_LEN: usize = 64;
const MAX_SCORE: i64 = 100;

/// Purpose-specific protocol codes.
#[derive(Debug, Clone, Copy)]
struct CaptureCodes {
    timeout: u16,
    device_id_empty: u16,
    not_found: u16,
    wrong_purpose: u16,
    not_captured: u16,
}

const REGISTRATION_CODES: CaptureCodes = CaptureCodes {
    timeout: codes::RCAPTURE_TIMEOUT,
    device_id_empty: codes::RCAPTURE_DEVICE_ID_EMPTY,
    not_found: codes::RCAPTURE_DEVICE_NOT_FOUND,
    wrong_purpose: codes::RCAPTURE_NOT_REGISTRATION,
    not_captured: codes::RCAPTURE_NOT_CAPTURED,
};

const AUTH_CODES: CaptureCodes = CaptureCodes {
    timeout: codes::CAPTURE_TIMEOUT,
    device_id_empty: codes::CAPTURE_DEVICE_ID_EMPTY,
    not_found: codes::CAPTURE_DEVICE_NOT_FOUND,
    wrong_purpose: codes::CAPTURE_NOT_AUTH,
    not_captured: codes::CAPTURE_NOT_CAPTURED,
};

/// Request fields that survived validation.
#[derive(Debug)]
struct ValidatedCapture {
    kind: DeviceKind,
    sub_id: u8,
    env: String,
    spec_version: String,
    transaction_id: String,
    timeout: Duration,
    plan: CapturePlan,
}

/// Runs a registration (`RCAPTURE`) or authentication (`CAPTURE`) capture.
pub(super) fn capture(
    dispatcher: &RequestDispatcher,
    request: DispatchRequest<'_>,
    verb: Verb,
) -> Result<String, DispatchError> {
    let (purpose, purpose_codes) = match verb {
        Verb::AuthCapture => (Purpose::Auth, AUTH_CODES),
        _ => (Purpose::Registration, REGISTRATION_CODES),
    };
    let registry = dispatcher.registry.as_ref();
    if registry.purpose() != purpose {
        return Err(DispatchError::rejected(purpose_codes.wrong_purpose));
    }
    let body: CaptureRequest = decode(require_body(&request)?)?;
    let validated = validate(registry, &body, purpose, purpose_codes)?;

    let ticket = registry
        .with_device(validated.kind, |device| {
            device.claim_capture(purpose, validated.sub_id, validated.plan.clone())
        })?
        .ok_or_else(|| DispatchError::rejected(purpose_codes.not_found))?
        .map_err(DispatchError::rejected)?;
    let claim = CaptureClaim {
        registry,
        kind: validated.kind,
        claim: ticket.claim,
    };
    debug!(
        target: DISPATCH_TARGET,
        device = %validated.kind,
        sub_id = validated.sub_id,
        transaction_id = %validated.transaction_id,
        layered = ticket.admission == Admission::Layered,
        "capture claimed"
    );

    dispatcher.apply_delay(validated.kind, request.method)?;
    let outcome = poll_capture(dispatcher, &validated, &claim, purpose, purpose_codes, request)?;
    drop(claim);
    let blocks = build_blocks(dispatcher, &validated, purpose, purpose_codes, outcome)?;
    Ok(json!({ "biometrics": blocks }).to_string())
}

fn validate(
    registry: &DeviceRegistry,
    body: &CaptureRequest,
    purpose: Purpose,
    purpose_codes: CaptureCodes,
) -> Result<ValidatedCapture, DispatchError> {
    let env = body.env.as_deref().unwrap_or_default().trim();
    if !ENVIRONMENTS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(env))
    {
        return Err(DispatchError::rejected_with(codes::INVALID_ENV, env));
    }
    let requested_purpose = body.purpose.as_deref().unwrap_or_default();
    if !purpose.matches(requested_purpose) {
        return Err(DispatchError::rejected_with(
            codes::INVALID_PURPOSE,
            requested_purpose,
        ));
    }

    let bio = body
        .bio
        .first()
        .ok_or_else(|| DispatchError::rejected(purpose_codes.device_id_empty))?;
    let device_id = bio.device_id.as_deref().unwrap_or_default().trim();
    if device_id.is_empty() {
        return Err(DispatchError::rejected(purpose_codes.device_id_empty));
    }
    let bio_type = bio.bio_type.as_deref().unwrap_or_default();
    let modality = Modality::parse(bio_type)
        .ok_or_else(|| DispatchError::rejected_with(codes::INVALID_DEVICE_TYPE, bio_type))?;
    let kind = registry
        .find_by_id(device_id)?
        .ok_or_else(|| DispatchError::rejected_with(purpose_codes.not_found, device_id))?;
    if kind.modality() != modality {
        return Err(DispatchError::rejected_with(
            codes::DEVICE_TYPE_MISMATCH,
            format!("{modality} requested for {kind}"),
        ));
    }
    registry
        .with_device(kind, |device| device.admit_capture(purpose))?
        .ok_or_else(|| DispatchError::rejected(purpose_codes.not_found))?
        .map_err(DispatchError::rejected)?;

    let transaction_id = body.transaction_id.as_deref().unwrap_or_default().trim();
    if !is_valid_transaction_id(transaction_id) {
        return Err(DispatchError::rejected(codes::INVALID_TRANSACTION_ID));
    }
    let timeout = positive(body.timeout.as_ref())
        .ok_or_else(|| DispatchError::rejected(codes::INVALID_TIMEOUT))?;
    let requested_score = requested_score(bio)?;
    let count = positive(bio.count.as_ref())
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| DispatchError::rejected(codes::INVALID_COUNT))?;
    let sub_id = bio
        .device_sub_id
        .as_ref()
        .map_or(Some(0), |sub_id| {
            sub_id.as_i64().and_then(|value| u8::try_from(value).ok())
        })
        .ok_or_else(|| DispatchError::rejected(codes::INVALID_SUB_ID))?;

    let subtypes = SubtypeSelector::from_tags(bio.bio_sub_type.as_deref().unwrap_or_default());
    let exceptions = SubtypeSelector::from_tags(bio.exception.as_deref().unwrap_or_default());
    let planned = driver(kind)
        .plan_subtypes(&PlanRequest {
            sub_id,
            count,
            subtypes: &subtypes,
            exceptions: &exceptions,
        })
        .map_err(|error| DispatchError::rejected_with(error.code(), error.to_string()))?;

    Ok(ValidatedCapture {
        kind,
        sub_id,
        env: env.to_owned(),
        spec_version: body
            .spec_version
            .as_deref()
            .map(str::trim)
            .filter(|version| !version.is_empty())
            .unwrap_or(DEFAULT_SPEC_VERSION)
            .to_owned(),
        transaction_id: transaction_id.to_owned(),
        timeout: Duration::from_millis(timeout.unsigned_abs()),
        plan: CapturePlan {
            subtypes: planned,
            requested_score,
        },
    })
}

fn is_valid_transaction_id(value: &str) -> bool {
    (1..=MAX_TRANSACTION_ID_LEN).contains(&value.len())
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
}

fn positive(value: Option<&NumberLike>) -> Option<i64> {
    value
        .and_then(NumberLike::as_i64)
        .filter(|number| *number > 0)
}

fn requested_score(bio: &BioRequest) -> Result<u8, DispatchError> {
    let Some(score) = bio.requested_score.as_ref() else {
        return Ok(0);
    };
    score
        .as_i64()
        .filter(|value| (0..=MAX_SCORE).contains(value))
        .and_then(|value| u8::try_from(value).ok())
        .ok_or_else(|| DispatchError::rejected(codes::INVALID_REQUESTED_SCORE))
}

/// Polls the driver until the capture completes or the deadline passes.
///
/// Only the session still bound to `claim` is advanced. If the stream a
/// layered capture joined has ended, or the device was claimed afresh in the
/// meantime, the capture fails with 700.
fn poll_capture(
    dispatcher: &RequestDispatcher,
    validated: &ValidatedCapture,
    claim: &CaptureClaim<'_>,
    purpose: Purpose,
    purpose_codes: CaptureCodes,
    request: DispatchRequest<'_>,
) -> Result<CaptureOutcome, DispatchError> {
    let registry = dispatcher.registry.as_ref();
    let clock = dispatcher.clock();
    let deadline = request.arrived + validated.timeout;
    let profile = registry.profile()?;
    let driver = driver(validated.kind);

    loop {
        if clock.now() >= deadline {
            return Err(DispatchError::rejected(purpose_codes.timeout));
        }
        let step = registry
            .with_sensor(validated.kind, |device| -> Result<_, StepError> {
                let quality = device.quality_score(registry.default_score());
                let Some(session) = device.capture_for(claim.claim) else {
                    return Err(StepError::SessionEnded);
                };
                let source = SampleSource {
                    catalog: registry.catalog(),
                    profile: &profile,
                    purpose,
                    quality,
                };
                let completed = driver.advance_capture(session, source)?;
                Ok(completed.then(|| session.outcome()))
            })?
            .ok_or_else(|| DispatchError::rejected(purpose_codes.not_found))?;
        match step {
            Ok(Some(outcome)) => return Ok(outcome),
            Ok(None) => {}
            Err(StepError::SessionEnded) => {
                return Err(DispatchError::rejected(codes::STREAM_ENDED));
            }
            Err(StepError::Catalog(error)) => return Err(error.into()),
        }
        clock.sleep(TICK);
    }
}

/// Why a capture poll could not make progress.
#[derive(Debug)]
enum StepError {
    /// The session this capture joined is gone.
    SessionEnded,
    Catalog(CatalogError),
}

impl From<CatalogError> for StepError {
    fn from(error: CatalogError) -> Self {
        Self::Catalog(error)
    }
}

fn build_blocks(
    dispatcher: &RequestDispatcher,
    validated: &ValidatedCapture,
    purpose: Purpose,
    purpose_codes: CaptureCodes,
    outcome: CaptureOutcome,
) -> Result<Vec<Value>, DispatchError> {
    let registry = dispatcher.registry.as_ref();
    let collaborators = &dispatcher.collaborators;
    let errors = &dispatcher.settings().errors;
    let catalog = registry.catalog();
    let kind = validated.kind;
    let timestamp = collaborators.clock.timestamp();

    let discovery = catalog.discovery_template(kind)?;
    let digital_template = catalog.digital_id_template(kind)?;
    let digital_id = driver(kind).build_digital_id(&digital_template, &timestamp);
    let signed_digital_id = collaborators.signer.sign(&digital_id)?;
    let recipient = match purpose {
        Purpose::Auth => Some(catalog.encryption_key(kind).map_err(|error| {
            DispatchError::rejected_with(codes::CAPTURE_KEY_UNAVAILABLE, error.to_string())
        })?),
        Purpose::Registration => None,
    };

    let mut rolling = RollingHash::new();
    let mut blocks = Vec::with_capacity(outcome.samples.len());
    for (subtype, slot) in outcome.samples {
        let SampleSlot::Captured { value, quality } = slot else {
            warn!(
                target: DISPATCH_TARGET,
                device = %kind,
                subtype = %subtype,
                "sample unavailable"
            );
            rolling.reset();
            let mut block = block_fields(
                &validated.spec_version,
                String::new(),
                String::new(),
                errors.error_value(purpose_codes.not_captured, subtype.tag()),
            );
            if recipient.is_some() {
                block.insert("sessionKey".into(), Value::from(""));
                block.insert("thumbprint".into(), Value::from(""));
            }
            blocks.push(Value::Object(block));
            continue;
        };

        let (bio_value, stamp, session_key) = match recipient.as_deref() {
            Some(public_key) => {
                let encrypted = collaborators.encryptor.encrypt(
                    public_key,
                    &value,
                    &validated.transaction_id,
                )?;
                (
                    encrypted.cipher_text,
                    encrypted.timestamp,
                    Some(encrypted.wrapped_key),
                )
            }
            None => (URL_SAFE_NO_PAD.encode(&value), timestamp.clone(), None),
        };
        let data = json!({
            "digitalId": signed_digital_id,
            "deviceCode": template_text(&discovery, "deviceCode"),
            "deviceServiceVersion": template_text(&discovery, "serviceVersion"),
            "bioType": kind.modality().label(),
            "bioSubType": subtype.tag(),
            "purpose": purpose.to_string(),
            "env": validated.env,
            "bioValue": bio_value,
            "transactionId": validated.transaction_id,
            "timestamp": stamp,
            "requestedScore": outcome.requested_score,
            "qualityScore": quality,
        });
        let signed = collaborators.signer.sign(&data)?;
        let hash = rolling.link(&value);
        let mut block = block_fields(
            &validated.spec_version,
            signed,
            hash,
            errors.error_value(codes::SUCCESS, ""),
        );
        if let (Some(session_key), Some(public_key)) = (session_key, recipient.as_deref()) {
            block.insert("sessionKey".into(), Value::from(session_key));
            block.insert("thumbprint".into(), Value::from(thumbprint(public_key)));
        }
        blocks.push(Value::Object(block));
    }
    Ok(blocks)
}

fn block_fields(
    spec_version: &str,
    data: String,
    hash: String,
    error: Value,
) -> Map<String, Value> {
    let mut block = Map::new();
    block.insert("specVersion".into(), Value::from(spec_version));
    block.insert("data".into(), Value::from(data));
    block.insert("hash".into(), Value::from(hash));
    block.insert("error".into(), error);
    block
}

fn template_text(template: &Value, field: &str) -> String {
    match template.get(field) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Restores the device when a claimed capture ends, however it ends.
struct CaptureClaim<'a> {
    registry: &'a DeviceRegistry,
    kind: DeviceKind,
    claim: ClaimId,
}

impl Drop for CaptureClaim<'_> {
    fn drop(&mut self) {
        let claim = self.claim;
        let outcome = self
            .registry
            .with_device(self.kind, |device| device.end_capture(claim));
        if let Err(error) = outcome {
            warn!(
                target: DISPATCH_TARGET,
                device = %self.kind,
                error = %error,
                "failed to release capture"
            );
        }
    }
}
