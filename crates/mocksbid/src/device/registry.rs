//! Registry of the emulated devices for the configured purpose.
//!
//! The registry owns one [`DeviceSession`] per device kind plus the single
//! sensor lock that serialises hardware access across every device. Callers
//! reach sessions through closures so guards never escape.
//!
//! Lock order is always sensor, then device.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use mocksbi_config::{DEFAULT_PROFILE, Purpose};
use tracing::{debug, warn};

use super::DEVICE_TARGET;
use super::catalog::DeviceCatalog;
use super::kind::DeviceKind;
use super::session::DeviceSession;

/// Error returned when a registry mutex is poisoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryPoisonedError;

impl fmt::Display for RegistryPoisonedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device registry mutex poisoned")
    }
}

impl std::error::Error for RegistryPoisonedError {}

/// Every device active for one purpose.
pub struct DeviceRegistry {
    purpose: Purpose,
    devices: BTreeMap<DeviceKind, Mutex<DeviceSession>>,
    sensor: Mutex<()>,
    profile: Mutex<String>,
    default_score: u8,
    catalog: Arc<dyn DeviceCatalog>,
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("purpose", &self.purpose)
            .field("kinds", &self.devices.keys().collect::<Vec<_>>())
            .field("default_score", &self.default_score)
            .finish_non_exhaustive()
    }
}

impl DeviceRegistry {
    /// Creates one ready device per kind active for `purpose`.
    ///
    /// Device ids come from each discovery template's `deviceId`; a missing
    /// or unreadable template falls back to the kind's default id.
    pub fn new(
        purpose: Purpose,
        catalog: Arc<dyn DeviceCatalog>,
        profile: impl Into<String>,
        default_score: u8,
    ) -> Self {
        let devices = DeviceKind::for_purpose(purpose)
            .iter()
            .map(|kind| {
                let device_id = configured_device_id(catalog.as_ref(), *kind);
                debug!(
                    target: DEVICE_TARGET,
                    kind = %kind,
                    device_id = %device_id,
                    "device registered"
                );
                (*kind, Mutex::new(DeviceSession::new(*kind, device_id)))
            })
            .collect();
        Self {
            purpose,
            devices,
            sensor: Mutex::new(()),
            profile: Mutex::new(normalise_profile(&profile.into())),
            default_score,
            catalog,
        }
    }

    #[must_use]
    pub const fn purpose(&self) -> Purpose {
        self.purpose
    }

    #[must_use]
    pub const fn default_score(&self) -> u8 {
        self.default_score
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn DeviceCatalog {
        self.catalog.as_ref()
    }

    /// Registered kinds in stable order.
    pub fn kinds(&self) -> impl Iterator<Item = DeviceKind> + '_ {
        self.devices.keys().copied()
    }

    /// Kind whose device id equals `device_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryPoisonedError`] if a device mutex is poisoned.
    pub fn find_by_id(&self, device_id: &str) -> Result<Option<DeviceKind>, RegistryPoisonedError> {
        let wanted = device_id.trim();
        for (kind, device) in &self.devices {
            let guard = device.lock().map_err(|_| RegistryPoisonedError)?;
            if guard.device_id() == wanted {
                return Ok(Some(*kind));
            }
        }
        Ok(None)
    }

    /// Runs `f` against the device for `kind`.
    ///
    /// Returns `Ok(None)` when the kind is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryPoisonedError`] if the device mutex is poisoned.
    pub fn with_device<F, R>(
        &self,
        kind: DeviceKind,
        f: F,
    ) -> Result<Option<R>, RegistryPoisonedError>
    where
        F: FnOnce(&mut DeviceSession) -> R,
    {
        let Some(device) = self.devices.get(&kind) else {
            return Ok(None);
        };
        let mut guard = device.lock().map_err(|_| RegistryPoisonedError)?;
        Ok(Some(f(&mut guard)))
    }

    /// Runs `f` for every device in kind order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryPoisonedError`] if a device mutex is poisoned.
    pub fn for_each_device<F>(&self, mut f: F) -> Result<(), RegistryPoisonedError>
    where
        F: FnMut(&mut DeviceSession),
    {
        for device in self.devices.values() {
            let mut guard = device.lock().map_err(|_| RegistryPoisonedError)?;
            f(&mut guard);
        }
        Ok(())
    }

    /// Runs one hardware-access step for `kind` under the sensor lock.
    ///
    /// The sensor lock is taken before the device lock and both are
    /// released when `f` returns or unwinds.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryPoisonedError`] if either mutex is poisoned.
    pub fn with_sensor<F, R>(
        &self,
        kind: DeviceKind,
        f: F,
    ) -> Result<Option<R>, RegistryPoisonedError>
    where
        F: FnOnce(&mut DeviceSession) -> R,
    {
        let _sensor = self.sensor.lock().map_err(|_| RegistryPoisonedError)?;
        self.with_device(kind, f)
    }

    /// Profile folder samples are read from.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryPoisonedError`] if the profile mutex is poisoned.
    pub fn profile(&self) -> Result<String, RegistryPoisonedError> {
        let guard = self.profile.lock().map_err(|_| RegistryPoisonedError)?;
        Ok(guard.clone())
    }

    /// Selects `profile`, reverting to the default when it is blank or has
    /// no folder. Returns the profile now in effect.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryPoisonedError`] if the profile mutex is poisoned.
    pub fn set_profile(&self, profile: &str) -> Result<String, RegistryPoisonedError> {
        let requested = profile.trim();
        let selected = if !requested.is_empty() && self.catalog.profile_exists(requested) {
            requested.to_owned()
        } else {
            if !requested.is_empty() {
                warn!(
                    target: DEVICE_TARGET,
                    profile = requested,
                    "unknown profile; reverting to default"
                );
            }
            DEFAULT_PROFILE.to_owned()
        };
        let mut guard = self.profile.lock().map_err(|_| RegistryPoisonedError)?;
        guard.clone_from(&selected);
        Ok(selected)
    }
}

fn configured_device_id(catalog: &dyn DeviceCatalog, kind: DeviceKind) -> String {
    match catalog.discovery_template(kind) {
        Ok(template) => template
            .get("deviceId")
            .and_then(|value| match value {
                serde_json::Value::String(text) if !text.trim().is_empty() => {
                    Some(text.trim().to_owned())
                }
                serde_json::Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| kind.default_device_id().to_owned()),
        Err(error) => {
            warn!(
                target: DEVICE_TARGET,
                kind = %kind,
                error = %error,
                "discovery template unavailable; using default device id"
            );
            kind.default_device_id().to_owned()
        }
    }
}

fn normalise_profile(profile: &str) -> String {
    let trimmed = profile.trim();
    if trimmed.is_empty() {
        DEFAULT_PROFILE.to_owned()
    } else {
        trimmed.to_owned()
    }
}
