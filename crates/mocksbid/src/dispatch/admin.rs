//! Administrative verbs that reconfigure the emulated devices.
//!
//! Every admin verb answers with `{errorCode, errorMessage}`.

use std::time::Duration;

use tracing::info;

use super::dto::{DelayRequest, ProfileRequest, ScoreRequest, StatusRequest};
use super::errors::DispatchError;
use super::filter::DeviceFilter;
use super::router::{DISPATCH_TARGET, DispatchRequest, RequestDispatcher, decode, require_body};
use crate::device::DeviceStatus;
use crate::error_catalog::codes;
use crate::health::HealthReporter;

const MAX_SCORE: i64 = 100;

fn device_filter(device_type: Option<&str>) -> Result<DeviceFilter, DispatchError> {
    let value = device_type.unwrap_or_default();
    DeviceFilter::parse(value)
        .ok_or_else(|| DispatchError::rejected_with(codes::INVALID_TYPE, value))
}

fn success(dispatcher: &RequestDispatcher) -> String {
    dispatcher
        .settings()
        .errors
        .admin_value(codes::SUCCESS, "")
        .to_string()
}

/// `SETSTATUS`: matching devices take the status, the rest become ready.
pub(super) fn set_status(
    dispatcher: &RequestDispatcher,
    request: DispatchRequest<'_>,
) -> Result<String, DispatchError> {
    let body: StatusRequest = decode(require_body(&request)?)?;
    let filter = device_filter(body.device_type.as_deref())?;
    let requested = body.device_status.as_deref().unwrap_or_default();
    let status = requested
        .trim()
        .parse::<DeviceStatus>()
        .map_err(|_| DispatchError::rejected_with(codes::INVALID_STATUS, requested))?;

    let mut changes = Vec::new();
    dispatcher.registry.for_each_device(|device| {
        let next = if filter.matches(device.kind()) {
            status
        } else {
            DeviceStatus::Ready
        };
        if device.status() != next {
            device.set_status(next);
            changes.push((device.kind(), next));
        }
    })?;
    for (kind, status) in changes {
        dispatcher
            .collaborators
            .reporter
            .device_status_changed(kind, status);
    }
    Ok(success(dispatcher))
}

/// `SETSCORE`: matching devices report the score, the rest revert to the
/// configured default.
///
/// `fromIso` is accepted and logged only; samples are always read from the
/// canned files.
pub(super) fn set_score(
    dispatcher: &RequestDispatcher,
    request: DispatchRequest<'_>,
) -> Result<String, DispatchError> {
    let body: ScoreRequest = decode(require_body(&request)?)?;
    let filter = device_filter(body.device_type.as_deref())?;
    let score = body
        .quality_score
        .as_ref()
        .and_then(|score| score.as_i64())
        .filter(|score| (0..=MAX_SCORE).contains(score))
        .and_then(|score| u8::try_from(score).ok())
        .ok_or_else(|| DispatchError::rejected(codes::INVALID_SCORE))?;
    let from_iso = body.from_iso.as_ref().is_some_and(|flag| flag.is_set());

    dispatcher.registry.for_each_device(|device| {
        if filter.matches(device.kind()) {
            device.set_score(Some(score));
        } else {
            device.set_score(None);
        }
    })?;
    info!(
        target: DISPATCH_TARGET,
        score,
        from_iso,
        "quality score override updated"
    );
    Ok(success(dispatcher))
}

/// `SETDELAY`: replaces the delay table on matching devices.
pub(super) fn set_delay(
    dispatcher: &RequestDispatcher,
    request: DispatchRequest<'_>,
) -> Result<String, DispatchError> {
    let body: DelayRequest = decode(require_body(&request)?)?;
    let filter = device_filter(body.device_type.as_deref())?;
    let delay = body
        .delay
        .as_ref()
        .and_then(|delay| delay.as_i64())
        .filter(|delay| *delay >= 0)
        .map(|delay| Duration::from_millis(delay.unsigned_abs()))
        .ok_or_else(|| DispatchError::rejected(codes::INVALID_DELAY))?;
    let settings = dispatcher.settings();
    if let Some(unknown) = body
        .method
        .iter()
        .find(|method| !settings.allows_method(method))
    {
        return Err(DispatchError::rejected_with(codes::INVALID_METHOD, unknown.as_str()));
    }

    dispatcher.registry.for_each_device(|device| {
        if filter.matches(device.kind()) {
            device.delays_mut().replace(&body.method, delay);
        }
    })?;
    info!(
        target: DISPATCH_TARGET,
        delay_ms = delay.as_millis(),
        methods = ?body.method,
        "artificial delay updated"
    );
    Ok(success(dispatcher))
}

/// `SETPROFILE`: selects the sample profile; unknown ids fall back to the
/// default profile and still succeed.
pub(super) fn set_profile(
    dispatcher: &RequestDispatcher,
    request: DispatchRequest<'_>,
) -> Result<String, DispatchError> {
    let body: ProfileRequest = decode(require_body(&request)?)?;
    let selected = dispatcher
        .registry
        .set_profile(body.profile_id.as_deref().unwrap_or_default())?;
    info!(target: DISPATCH_TARGET, profile = %selected, "profile selected");
    Ok(success(dispatcher))
}
