//! Device `type` selection shared by discovery and the admin verbs.

use crate::device::{DeviceKind, Modality};

/// Umbrella `type` value selecting every device.
const DEVICE_GROUP: &str = "Biometric Device";

/// Which devices a request's `type` addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeviceFilter {
    All,
    Only(Modality),
}

impl DeviceFilter {
    /// Parses `type`; blank or unknown values are `None`.
    pub(super) fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(DEVICE_GROUP) {
            return Some(Self::All);
        }
        Modality::parse(value).map(Self::Only)
    }

    pub(super) fn matches(self, kind: DeviceKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(modality) => kind.modality() == modality,
        }
    }
}
