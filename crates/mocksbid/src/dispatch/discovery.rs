//! `MOSIPDISC` and `MOSIPDINFO` handlers.

use serde_json::Value;
use tracing::warn;

use super::dto::DiscoveryRequest;
use super::errors::DispatchError;
use super::filter::DeviceFilter;
use super::router::{DISPATCH_TARGET, DispatchRequest, RequestDispatcher, decode};
use crate::device::DeviceKind;
use crate::device::payloads::{self, PayloadContext, Templates};
use crate::error_catalog::codes;

/// Lists discovery (or signed device-info) entries for matching devices.
///
/// Discovery requires a `type`; device info lists every device without one.
/// A device whose templates cannot be read is skipped.
pub(super) fn discover(
    dispatcher: &RequestDispatcher,
    request: DispatchRequest<'_>,
    info: bool,
) -> Result<String, DispatchError> {
    let body: DiscoveryRequest = decode(request.body.unwrap_or("{}"))?;
    let filter = match body.device_type.as_deref() {
        Some(value) => DeviceFilter::parse(value)
            .ok_or_else(|| DispatchError::rejected_with(codes::INVALID_TYPE, value))?,
        None if info => DeviceFilter::All,
        None => return Err(DispatchError::rejected(codes::INVALID_TYPE)),
    };

    let registry = dispatcher.registry.as_ref();
    let collaborators = &dispatcher.collaborators;
    let settings = dispatcher.settings();
    let timestamp = collaborators.clock.timestamp();
    let context = PayloadContext {
        callback_id: &settings.callback_id,
        purpose: registry.purpose(),
        timestamp: &timestamp,
    };

    let mut entries = Vec::new();
    for kind in registry.kinds().filter(|kind| filter.matches(*kind)) {
        dispatcher.apply_delay(kind, request.method)?;
        let Some((payload, digital_id)) = load_templates(dispatcher, kind, info) else {
            continue;
        };
        let templates = Templates {
            payload: &payload,
            digital_id: &digital_id,
        };
        let entry = registry.with_device(kind, |device| {
            if info {
                payloads::device_info_entry(
                    device,
                    templates,
                    context,
                    collaborators.signer.as_ref(),
                    &settings.errors,
                )
            } else {
                Ok(payloads::discovery_entry(
                    device,
                    templates,
                    context,
                    &settings.errors,
                ))
            }
        })?;
        if let Some(entry) = entry {
            entries.push(entry?);
        }
    }

    if entries.is_empty() {
        let code = if info {
            codes::NO_DEVICE_INFO
        } else {
            codes::NOTHING_DISCOVERED
        };
        return Err(DispatchError::rejected(code));
    }
    Ok(Value::Array(entries).to_string())
}

fn load_templates(
    dispatcher: &RequestDispatcher,
    kind: DeviceKind,
    info: bool,
) -> Option<(Value, Value)> {
    let catalog = dispatcher.registry.catalog();
    let payload = if info {
        catalog.device_info_template(kind)
    } else {
        catalog.discovery_template(kind)
    };
    match payload.and_then(|payload| Ok((payload, catalog.digital_id_template(kind)?))) {
        Ok(templates) => Some(templates),
        Err(error) => {
            warn!(
                target: DISPATCH_TARGET,
                device = %kind,
                error = %error,
                "device templates unavailable; omitting device"
            );
            None
        }
    }
}
