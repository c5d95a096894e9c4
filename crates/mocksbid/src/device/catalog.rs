//! Canned device data: identity templates, preview frames and samples.

use std::fs;
use std::io;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use camino::{Utf8Path, Utf8PathBuf};
use mocksbi_config::Purpose;
use serde_json::Value;
use thiserror::Error;

use super::kind::{BioSubtype, DeviceKind};

/// Errors raised while reading canned device data.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A file existed but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// A required file is missing.
    #[error("missing catalogue entry {path}")]
    Missing { path: Utf8PathBuf },
    /// A JSON template could not be parsed.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A JSON template was not an object.
    #[error("template {path} must be a JSON object")]
    NotAnObject { path: Utf8PathBuf },
    /// An encoded key could not be decoded.
    #[error("invalid key encoding in {path}: {message}")]
    KeyEncoding { path: Utf8PathBuf, message: String },
}

/// Source of canned device data.
pub trait DeviceCatalog: Send + Sync {
    /// Discovery template for `kind`.
    fn discovery_template(&self, kind: DeviceKind) -> Result<Value, CatalogError>;

    /// Device-info template for `kind`.
    fn device_info_template(&self, kind: DeviceKind) -> Result<Value, CatalogError>;

    /// Digital-id template for `kind`.
    fn digital_id_template(&self, kind: DeviceKind) -> Result<Value, CatalogError>;

    /// Public key biometric values are encrypted for.
    fn encryption_key(&self, kind: DeviceKind) -> Result<Vec<u8>, CatalogError>;

    /// Preview frame for `sub_id`, or `None` when the device has no frame.
    fn preview_frame(&self, kind: DeviceKind, sub_id: u8) -> Result<Option<Vec<u8>>, CatalogError>;

    /// Sample for `subtype`, or `None` when the profile has no such file.
    fn sample(
        &self,
        profile: &str,
        purpose: Purpose,
        kind: DeviceKind,
        subtype: BioSubtype,
    ) -> Result<Option<Vec<u8>>, CatalogError>;

    /// Returns true when a profile folder named `profile` exists.
    fn profile_exists(&self, profile: &str) -> bool;
}

/// Catalogue backed by a directory tree.
///
/// ```text
/// <root>/devices/<kind>/{digital_id,discovery,device_info}.json
/// <root>/devices/<kind>/encryption_key.txt
/// <root>/stream/<kind>/<sub-id>.jpeg
/// <root>/profiles/<profile>/<purpose>/<kind>/<subtype>.iso
/// ```
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: Utf8PathBuf,
}

impl FileCatalog {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn device_file(&self, kind: DeviceKind, name: &str) -> Utf8PathBuf {
        self.root.join("devices").join(kind.folder()).join(name)
    }

    fn template(&self, kind: DeviceKind, name: &str) -> Result<Value, CatalogError> {
        let path = self.device_file(kind, name);
        let bytes = read_required(&path)?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|source| CatalogError::Json {
                path: path.clone(),
                source,
            })?;
        if value.is_object() {
            Ok(value)
        } else {
            Err(CatalogError::NotAnObject { path })
        }
    }
}

impl DeviceCatalog for FileCatalog {
    fn discovery_template(&self, kind: DeviceKind) -> Result<Value, CatalogError> {
        self.template(kind, "discovery.json")
    }

    fn device_info_template(&self, kind: DeviceKind) -> Result<Value, CatalogError> {
        self.template(kind, "device_info.json")
    }

    fn digital_id_template(&self, kind: DeviceKind) -> Result<Value, CatalogError> {
        self.template(kind, "digital_id.json")
    }

    fn encryption_key(&self, kind: DeviceKind) -> Result<Vec<u8>, CatalogError> {
        let path = self.device_file(kind, "encryption_key.txt");
        let bytes = read_required(&path)?;
        let text = String::from_utf8_lossy(&bytes);
        decode_key(text.trim()).map_err(|message| CatalogError::KeyEncoding { path, message })
    }

    fn preview_frame(&self, kind: DeviceKind, sub_id: u8) -> Result<Option<Vec<u8>>, CatalogError> {
        let path = self
            .root
            .join("stream")
            .join(kind.folder())
            .join(format!("{sub_id}.jpeg"));
        read_optional(&path)
    }

    fn sample(
        &self,
        profile: &str,
        purpose: Purpose,
        kind: DeviceKind,
        subtype: BioSubtype,
    ) -> Result<Option<Vec<u8>>, CatalogError> {
        let path = self
            .root
            .join("profiles")
            .join(profile)
            .join(purpose.folder())
            .join(kind.folder())
            .join(format!("{}.iso", subtype.file_stem()));
        read_optional(&path)
    }

    fn profile_exists(&self, profile: &str) -> bool {
        let profile = profile.trim();
        if profile.is_empty() || profile.contains(&['/', '\\'][..]) || profile == ".." {
            return false;
        }
        self.root.join("profiles").join(profile).is_dir()
    }
}

fn read_required(path: &Utf8Path) -> Result<Vec<u8>, CatalogError> {
    read_optional(path)?.ok_or_else(|| CatalogError::Missing {
        path: path.to_path_buf(),
    })
}

fn read_optional(path: &Utf8Path) -> Result<Option<Vec<u8>>, CatalogError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(CatalogError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Accepts URL-safe (unpadded) or standard base64.
fn decode_key(text: &str) -> Result<Vec<u8>, String> {
    URL_SAFE_NO_PAD
        .decode(text)
        .or_else(|_| STANDARD.decode(text))
        .map_err(|error| error.to_string())
}
