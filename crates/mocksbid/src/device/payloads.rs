//! Discovery and device-info payloads derived from a device's current state.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mocksbi_config::Purpose;
use serde_json::{Map, Value};

use super::modality::driver;
use super::session::{DeviceSession, DeviceStatus};
use crate::crypto::{CryptoError, Signer};
use crate::error_catalog::{ErrorCatalog, codes};

/// Values shared by every payload in one response.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PayloadContext<'a> {
    pub(crate) callback_id: &'a str,
    pub(crate) purpose: Purpose,
    pub(crate) timestamp: &'a str,
}

/// Canned templates for one device.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Templates<'a> {
    pub(crate) payload: &'a Value,
    pub(crate) digital_id: &'a Value,
}

/// Digital identity stamped for `device`.
pub(crate) fn digital_id(device: &DeviceSession, template: &Value, timestamp: &str) -> Value {
    driver(device.kind()).build_digital_id(template, timestamp)
}

/// One discovery entry.
///
/// The digital id is carried unsigned as base64url JSON, or blank while the
/// device is not registered.
pub(crate) fn discovery_entry(
    device: &DeviceSession,
    templates: Templates<'_>,
    context: PayloadContext<'_>,
    errors: &ErrorCatalog,
) -> Value {
    let digital = if device.status() == DeviceStatus::NotRegistered {
        String::new()
    } else {
        let stamped = digital_id(device, templates.digital_id, context.timestamp);
        URL_SAFE_NO_PAD.encode(stamped.to_string())
    };
    let mut fields = device_fields(device, templates.payload, context);
    fields.insert("digitalId".into(), Value::from(digital));
    fields.insert("error".into(), errors.error_value(codes::SUCCESS, ""));
    Value::Object(fields)
}

/// One device-info entry: `{deviceInfo, error}`.
///
/// Registered devices sign both the digital id and the info object.
/// Unregistered devices return base64url JSON with a blank digital id and
/// the not-registered error.
pub(crate) fn device_info_entry(
    device: &DeviceSession,
    templates: Templates<'_>,
    context: PayloadContext<'_>,
    signer: &dyn Signer,
    errors: &ErrorCatalog,
) -> Result<Value, CryptoError> {
    let mut fields = device_fields(device, templates.payload, context);
    let (device_info, error) = if device.status() == DeviceStatus::NotRegistered {
        fields.insert("digitalId".into(), Value::from(""));
        let encoded = URL_SAFE_NO_PAD.encode(Value::Object(fields).to_string());
        (encoded, errors.error_value(codes::NOT_REGISTERED, ""))
    } else {
        let stamped = digital_id(device, templates.digital_id, context.timestamp);
        let signed_id = signer.sign(&stamped)?;
        fields.insert("digitalId".into(), Value::from(signed_id));
        let signed = signer.sign(&Value::Object(fields))?;
        (signed, errors.error_value(codes::SUCCESS, ""))
    };
    let mut entry = Map::new();
    entry.insert("deviceInfo".into(), Value::from(device_info));
    entry.insert("error".into(), error);
    Ok(Value::Object(entry))
}

fn device_fields(
    device: &DeviceSession,
    template: &Value,
    context: PayloadContext<'_>,
) -> Map<String, Value> {
    let mut fields = template.as_object().cloned().unwrap_or_default();
    let sub_ids: Vec<Value> = device
        .kind()
        .sub_ids()
        .iter()
        .map(|sub_id| Value::from(sub_id.to_string()))
        .collect();
    fields.insert("deviceId".into(), Value::from(device.device_id()));
    fields.insert("deviceStatus".into(), Value::from(device.status().label()));
    fields.insert("deviceSubId".into(), Value::Array(sub_ids));
    fields.insert("callbackId".into(), Value::from(context.callback_id));
    fields.insert("purpose".into(), Value::from(context.purpose.to_string()));
    fields
}
