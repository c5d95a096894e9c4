use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which family of devices the emulator exposes.
///
/// Registration devices capture multiple samples at once (finger slaps, both
/// irises, a face portrait) and support live preview streams. Authentication
/// devices capture single samples and encrypt every biometric value.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Purpose {
    /// Enrolment devices.
    #[default]
    Registration,
    /// Authentication devices.
    Auth,
}

impl Purpose {
    /// Folder name used for this purpose inside a profile.
    #[must_use]
    pub const fn folder(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Auth => "auth",
        }
    }

    /// Returns true when `label` names this purpose, ignoring case.
    #[must_use]
    pub fn matches(self, label: &str) -> bool {
        label.trim().eq_ignore_ascii_case(&self.to_string())
    }
}

/// Errors encountered while parsing a [`Purpose`] from text.
pub type PurposeParseError = strum::ParseError;
