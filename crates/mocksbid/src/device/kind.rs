//! Device kinds, modalities and anatomical subtypes.

use std::fmt;

use mocksbi_config::Purpose;

/// Biometric category of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modality {
    /// Fingerprint scanners.
    Finger,
    /// Iris cameras.
    Iris,
    /// Face cameras.
    Face,
}

impl Modality {
    /// Wire label (`bioType`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Finger => "Finger",
            Self::Iris => "Iris",
            Self::Face => "Face",
        }
    }

    /// Parses a request `type` value, ignoring case and padding.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        [Self::Finger, Self::Iris, Self::Face]
            .into_iter()
            .find(|modality| modality.label().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Concrete emulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceKind {
    /// Four-finger slap scanner (registration).
    FingerSlap,
    /// Single-finger scanner (authentication).
    FingerSingle,
    /// Binocular iris camera (registration).
    IrisDouble,
    /// Monocular iris camera (authentication).
    IrisSingle,
    /// Face camera (both purposes).
    Face,
}

const REGISTRATION_KINDS: [DeviceKind; 3] =
    [DeviceKind::FingerSlap, DeviceKind::Face, DeviceKind::IrisDouble];
const AUTH_KINDS: [DeviceKind; 3] =
    [DeviceKind::FingerSingle, DeviceKind::Face, DeviceKind::IrisSingle];

impl DeviceKind {
    /// Kinds instantiated for `purpose`, in discovery order.
    #[must_use]
    pub const fn for_purpose(purpose: Purpose) -> &'static [Self] {
        match purpose {
            Purpose::Registration => &REGISTRATION_KINDS,
            Purpose::Auth => &AUTH_KINDS,
        }
    }

    #[must_use]
    pub const fn modality(self) -> Modality {
        match self {
            Self::FingerSlap | Self::FingerSingle => Modality::Finger,
            Self::IrisDouble | Self::IrisSingle => Modality::Iris,
            Self::Face => Modality::Face,
        }
    }

    /// Wire label of the sub-modality (`deviceSubType`).
    #[must_use]
    pub const fn sub_type_label(self) -> &'static str {
        match self {
            Self::FingerSlap => "Slap",
            Self::FingerSingle | Self::IrisSingle => "Single",
            Self::IrisDouble => "Double",
            Self::Face => "Full face",
        }
    }

    /// Folder name used by the device catalogue.
    #[must_use]
    pub const fn folder(self) -> &'static str {
        match self {
            Self::FingerSlap => "finger_slap",
            Self::FingerSingle => "finger_single",
            Self::IrisDouble => "iris_double",
            Self::IrisSingle => "iris_single",
            Self::Face => "face",
        }
    }

    /// Device id used when the discovery template does not carry one.
    #[must_use]
    pub const fn default_device_id(self) -> &'static str {
        match self {
            Self::FingerSlap | Self::FingerSingle => "1",
            Self::Face => "2",
            Self::IrisDouble | Self::IrisSingle => "3",
        }
    }

    /// Valid `deviceSubId` values.
    #[must_use]
    pub const fn sub_ids(self) -> &'static [u8] {
        match self {
            Self::FingerSlap | Self::IrisDouble => &[1, 2, 3],
            Self::Face => &[0, 1],
            Self::FingerSingle | Self::IrisSingle => &[0],
        }
    }

    #[must_use]
    pub fn accepts_sub_id(self, sub_id: u8) -> bool {
        self.sub_ids().contains(&sub_id)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.folder())
    }
}

/// Anatomically named sample position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BioSubtype {
    LeftIndex,
    LeftMiddle,
    LeftRing,
    LeftLittle,
    LeftThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightLittle,
    RightThumb,
    LeftIris,
    RightIris,
    Face,
    /// Synthetic tag selected by empty or unrecognised input.
    Unknown,
}

const TAGGED: [BioSubtype; 13] = [
    BioSubtype::LeftIndex,
    BioSubtype::LeftMiddle,
    BioSubtype::LeftRing,
    BioSubtype::LeftLittle,
    BioSubtype::LeftThumb,
    BioSubtype::RightIndex,
    BioSubtype::RightMiddle,
    BioSubtype::RightRing,
    BioSubtype::RightLittle,
    BioSubtype::RightThumb,
    BioSubtype::LeftIris,
    BioSubtype::RightIris,
    BioSubtype::Unknown,
];

impl BioSubtype {
    /// Wire tag (`bioSubType`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::LeftIndex => "Left IndexFinger",
            Self::LeftMiddle => "Left MiddleFinger",
            Self::LeftRing => "Left RingFinger",
            Self::LeftLittle => "Left LittleFinger",
            Self::LeftThumb => "Left Thumb",
            Self::RightIndex => "Right IndexFinger",
            Self::RightMiddle => "Right MiddleFinger",
            Self::RightRing => "Right RingFinger",
            Self::RightLittle => "Right LittleFinger",
            Self::RightThumb => "Right Thumb",
            Self::LeftIris => "Left",
            Self::RightIris => "Right",
            Self::Face => "",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parses a wire tag. Face has no tag of its own.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        TAGGED
            .into_iter()
            .find(|subtype| subtype.tag().eq_ignore_ascii_case(tag))
    }

    /// File stem of the canned sample for this subtype.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::LeftIndex => "left_index",
            Self::LeftMiddle => "left_middle",
            Self::LeftRing => "left_ring",
            Self::LeftLittle => "left_little",
            Self::LeftThumb => "left_thumb",
            Self::RightIndex => "right_index",
            Self::RightMiddle => "right_middle",
            Self::RightRing => "right_ring",
            Self::RightLittle => "right_little",
            Self::RightThumb => "right_thumb",
            Self::LeftIris => "left_iris",
            Self::RightIris => "right_iris",
            Self::Face => "face",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn is_finger(self) -> bool {
        matches!(
            self,
            Self::LeftIndex
                | Self::LeftMiddle
                | Self::LeftRing
                | Self::LeftLittle
                | Self::LeftThumb
                | Self::RightIndex
                | Self::RightMiddle
                | Self::RightRing
                | Self::RightLittle
                | Self::RightThumb
        )
    }

    #[must_use]
    pub const fn is_iris(self) -> bool {
        matches!(self, Self::LeftIris | Self::RightIris)
    }
}

impl fmt::Display for BioSubtype {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.file_stem())
    }
}
