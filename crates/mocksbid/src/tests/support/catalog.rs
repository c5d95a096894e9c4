//! In-memory [`DeviceCatalog`] used by unit and behaviour tests.
//!
//! Every device of the chosen purpose gets discovery, device-info and
//! digital-id templates, a preview frame per sub id, and a sample for every
//! subtype in the `Default` profile. Sample and frame reads pass through a
//! probe that counts overlapping calls, so tests can assert that hardware
//! access is serialised.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use mocksbi_config::{DEFAULT_PROFILE, Purpose};
use ring::agreement::{EphemeralPrivateKey, X25519};
use ring::rand::SystemRandom;
use serde_json::{Value, json};

use crate::device::{BioSubtype, CatalogError, DeviceCatalog, DeviceKind};

/// How long a probed read holds the hardware, widening the overlap window.
const HARDWARE_DWELL: Duration = Duration::from_millis(2);

/// Counts reads that overlap another read.
#[derive(Debug, Default)]
pub struct ReentrancyProbe {
    in_flight: AtomicUsize,
    violations: AtomicUsize,
    reads: AtomicUsize,
}

impl ReentrancyProbe {
    fn enter(&self) -> ProbeGuard<'_> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(HARDWARE_DWELL);
        ProbeGuard { probe: self }
    }

    /// Reads that started while another was still running.
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    /// Total probed reads.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

struct ProbeGuard<'a> {
    probe: &'a ReentrancyProbe,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Catalogue held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    purpose: Purpose,
    discovery: BTreeMap<DeviceKind, Value>,
    device_info: BTreeMap<DeviceKind, Value>,
    digital_ids: BTreeMap<DeviceKind, Value>,
    keys: BTreeMap<DeviceKind, Vec<u8>>,
    frames: BTreeMap<(DeviceKind, u8), Vec<u8>>,
    profiles: BTreeSet<String>,
    missing_samples: BTreeSet<(DeviceKind, BioSubtype)>,
    probe: ReentrancyProbe,
}

impl MemoryCatalog {
    /// Catalogue for the registration devices.
    pub fn registration() -> Self {
        Self::for_purpose(Purpose::Registration)
    }

    /// Catalogue for the authentication devices, with X25519 encryption keys.
    pub fn auth() -> Self {
        let mut catalog = Self::for_purpose(Purpose::Auth);
        let rng = SystemRandom::new();
        for kind in DeviceKind::for_purpose(Purpose::Auth) {
            let private = EphemeralPrivateKey::generate(&X25519, &rng).expect("x25519 key");
            let public = private.compute_public_key().expect("x25519 public key");
            catalog.keys.insert(*kind, public.as_ref().to_vec());
        }
        catalog
    }

    fn for_purpose(purpose: Purpose) -> Self {
        let mut catalog = Self {
            purpose,
            ..Self::default()
        };
        catalog.profiles.insert(DEFAULT_PROFILE.to_owned());
        for kind in DeviceKind::for_purpose(purpose) {
            let identity = json!({
                "deviceId": kind.default_device_id(),
                "deviceCode": format!("MOCK-{}", kind.folder()),
                "serviceVersion": "1.0.0",
                "specVersion": ["0.9.5"],
                "deviceProviderId": "MOCK",
            });
            catalog.discovery.insert(*kind, identity.clone());
            catalog.device_info.insert(*kind, identity);
            catalog.digital_ids.insert(
                *kind,
                json!({
                    "serialNo": format!("{}-0001", kind.folder()),
                    "make": "MOCK",
                    "model": "SBI",
                    "deviceProvider": "MOCK",
                }),
            );
            for sub_id in kind.sub_ids() {
                catalog
                    .frames
                    .insert((*kind, *sub_id), format!("jpeg:{kind}:{sub_id}").into_bytes());
            }
        }
        catalog
    }

    /// Replaces the discovery template of `kind`.
    pub fn with_discovery(mut self, kind: DeviceKind, template: Value) -> Self {
        self.discovery.insert(kind, template);
        self
    }

    /// Removes every template of `kind`, as if its folder were absent.
    pub fn without_templates(mut self, kind: DeviceKind) -> Self {
        self.discovery.remove(&kind);
        self.device_info.remove(&kind);
        self.digital_ids.remove(&kind);
        self
    }

    /// Adds a profile folder holding the same samples as the default one.
    pub fn with_profile(mut self, profile: &str) -> Self {
        self.profiles.insert(profile.to_owned());
        self
    }

    /// Drops the sample for one subtype in every profile.
    pub fn without_sample(mut self, kind: DeviceKind, subtype: BioSubtype) -> Self {
        self.missing_samples.insert((kind, subtype));
        self
    }

    /// Drops every preview frame.
    pub fn without_frames(mut self) -> Self {
        self.frames.clear();
        self
    }

    /// Purpose whose devices this catalogue describes.
    pub const fn purpose(&self) -> Purpose {
        self.purpose
    }

    pub fn probe(&self) -> &ReentrancyProbe {
        &self.probe
    }

    /// Canned bytes served for a sample.
    pub fn sample_bytes(profile: &str, kind: DeviceKind, subtype: BioSubtype) -> Vec<u8> {
        format!("iso:{profile}:{kind}:{subtype}").into_bytes()
    }

    fn template(
        templates: &BTreeMap<DeviceKind, Value>,
        kind: DeviceKind,
        name: &str,
    ) -> Result<Value, CatalogError> {
        templates
            .get(&kind)
            .cloned()
            .ok_or_else(|| CatalogError::Missing {
                path: format!("devices/{kind}/{name}").into(),
            })
    }
}

impl DeviceCatalog for MemoryCatalog {
    fn discovery_template(&self, kind: DeviceKind) -> Result<Value, CatalogError> {
        Self::template(&self.discovery, kind, "discovery.json")
    }

    fn device_info_template(&self, kind: DeviceKind) -> Result<Value, CatalogError> {
        Self::template(&self.device_info, kind, "device_info.json")
    }

    fn digital_id_template(&self, kind: DeviceKind) -> Result<Value, CatalogError> {
        Self::template(&self.digital_ids, kind, "digital_id.json")
    }

    fn encryption_key(&self, kind: DeviceKind) -> Result<Vec<u8>, CatalogError> {
        self.keys
            .get(&kind)
            .cloned()
            .ok_or_else(|| CatalogError::Missing {
                path: format!("devices/{kind}/encryption_key.txt").into(),
            })
    }

    fn preview_frame(&self, kind: DeviceKind, sub_id: u8) -> Result<Option<Vec<u8>>, CatalogError> {
        let _guard = self.probe.enter();
        Ok(self.frames.get(&(kind, sub_id)).cloned())
    }

    fn sample(
        &self,
        profile: &str,
        _purpose: Purpose,
        kind: DeviceKind,
        subtype: BioSubtype,
    ) -> Result<Option<Vec<u8>>, CatalogError> {
        let _guard = self.probe.enter();
        if !self.profiles.contains(profile) || self.missing_samples.contains(&(kind, subtype)) {
            return Ok(None);
        }
        Ok(Some(Self::sample_bytes(profile, kind, subtype)))
    }

    fn profile_exists(&self, profile: &str) -> bool {
        self.profiles.contains(profile)
    }
}
