//! Emulated device model.
//!
//! A [`DeviceRegistry`] holds one [`DeviceSession`] per device kind active
//! for the configured purpose. Sessions own the capture state for their
//! device; per-modality behaviour lives behind [`ModalityDriver`].

pub(crate) mod capture;
mod catalog;
mod clock;
mod kind;
pub(crate) mod modality;
pub(crate) mod payloads;
mod registry;
pub(crate) mod selector;
pub(crate) mod session;

pub use catalog::{CatalogError, DeviceCatalog, FileCatalog};
pub use clock::{Clock, SystemClock};
pub use kind::{BioSubtype, DeviceKind, Modality};
pub use modality::ModalityDriver;
pub use registry::{DeviceRegistry, RegistryPoisonedError};
pub use session::{DeviceSession, DeviceStatus};

pub(crate) const DEVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::device");
