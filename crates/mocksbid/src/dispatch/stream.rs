//! `STREAM` handler: multipart JPEG preview until the deadline.

use std::io::Write;
use std::time::{Duration, Instant};

use mocksbi_config::Purpose;
use tracing::{debug, warn};

use super::capture::TICK;
use super::dto::StreamRequest;
use super::errors::DispatchError;
use super::response::ResponseWriter;
use super::router::{
    DISPATCH_TARGET, DispatchRequest, Reply, RequestDispatcher, decode, require_body,
};
use crate::device::capture::ClaimId;
use crate::device::modality::{FrameStep, driver};
use crate::device::{DeviceKind, DeviceRegistry};
use crate::error_catalog::codes;

/// Streams preview frames for one device.
///
/// Failures before the preamble are returned for the success envelope.
/// Once the preamble is written the terminal status goes out as the final
/// multipart part instead.
pub(super) fn stream<W: Write>(
    dispatcher: &RequestDispatcher,
    request: DispatchRequest<'_>,
    writer: &mut ResponseWriter<'_, W>,
) -> Result<Reply, DispatchError> {
    let registry = dispatcher.registry.as_ref();
    if registry.purpose() != Purpose::Registration {
        return Err(DispatchError::rejected(codes::STREAM_NOT_REGISTRATION));
    }
    let body: StreamRequest = decode(require_body(&request)?)?;
    let device_id = body.device_id.as_deref().unwrap_or_default().trim();
    if device_id.is_empty() {
        return Err(DispatchError::rejected(codes::STREAM_DEVICE_ID_EMPTY));
    }
    let kind = registry
        .find_by_id(device_id)?
        .ok_or_else(|| DispatchError::rejected_with(codes::STREAM_DEVICE_NOT_FOUND, device_id))?;
    let sub_id = body
        .device_sub_id
        .as_ref()
        .and_then(|sub_id| sub_id.as_i64())
        .and_then(|value| u8::try_from(value).ok())
        .filter(|sub_id| kind.accepts_sub_id(*sub_id))
        .ok_or_else(|| DispatchError::rejected(codes::INVALID_SUB_ID))?;
    let timeout = body
        .timeout
        .as_ref()
        .and_then(|timeout| timeout.as_i64())
        .filter(|millis| *millis > 0)
        .map_or(dispatcher.settings().stream_timeout, |millis| {
            Duration::from_millis(millis.unsigned_abs())
        });

    let claim = registry
        .with_device(kind, |device| device.claim_stream(sub_id))?
        .ok_or_else(|| DispatchError::rejected(codes::STREAM_DEVICE_NOT_FOUND))?
        .map_err(DispatchError::rejected)?;
    let _claim = StreamClaim {
        registry,
        kind,
        claim,
    };
    debug!(
        target: DISPATCH_TARGET,
        device = %kind,
        sub_id,
        timeout_ms = timeout.as_millis(),
        "stream claimed"
    );

    dispatcher.apply_delay(kind, request.method)?;
    let deadline = request.arrived + timeout;
    writer.write_stream_preamble()?;

    let errors = &dispatcher.settings().errors;
    let status = match pump_frames(dispatcher, kind, claim, deadline, writer) {
        Ok(code) => errors.plain_json(code, ""),
        Err(error) => {
            warn!(
                target: DISPATCH_TARGET,
                device = %kind,
                error = %error,
                "stream failed"
            );
            errors.plain_json(codes::STREAM_FAILURE, &error.detail())
        }
    };
    if let Err(error) = writer.write_stream_status(&status) {
        debug!(
            target: DISPATCH_TARGET,
            error = %error,
            "client left before the stream status"
        );
    }
    Ok(Reply::Streamed)
}

/// Writes frames until the deadline passes or the session ends, returning
/// the terminal status code.
fn pump_frames<W: Write>(
    dispatcher: &RequestDispatcher,
    kind: DeviceKind,
    claim: ClaimId,
    deadline: Instant,
    writer: &mut ResponseWriter<'_, W>,
) -> Result<u16, DispatchError> {
    let registry = dispatcher.registry.as_ref();
    let clock = dispatcher.clock();
    let driver = driver(kind);
    let mut frames = 0_usize;

    loop {
        if clock.now() >= deadline {
            debug!(target: DISPATCH_TARGET, device = %kind, frames, "stream timed out");
            return Ok(codes::STREAM_TIMEOUT);
        }
        let step = registry.with_sensor(kind, |device| {
            device
                .stream_for(claim)
                .map(|session| driver.advance_preview_frame(session, registry.catalog()))
        })?;
        match step.flatten().transpose()? {
            None | Some(FrameStep::Ended) => {
                debug!(target: DISPATCH_TARGET, device = %kind, frames, "stream ended");
                return Ok(codes::SUCCESS);
            }
            Some(FrameStep::Frame(frame)) => {
                writer.write_frame(&frame)?;
                frames += 1;
            }
            Some(FrameStep::Pending) => {}
        }
        clock.sleep(TICK);
    }
}

/// Releases the device when the stream ends.
struct StreamClaim<'a> {
    registry: &'a DeviceRegistry,
    kind: DeviceKind,
    claim: ClaimId,
}

impl Drop for StreamClaim<'_> {
    fn drop(&mut self) {
        let claim = self.claim;
        let outcome = self
            .registry
            .with_device(self.kind, |device| device.end_stream(claim));
        if let Err(error) = outcome {
            warn!(
                target: DISPATCH_TARGET,
                device = %self.kind,
                error = %error,
                "failed to release stream"
            );
        }
    }
}
