//! Per-modality capability drivers.
//!
//! Each [`DeviceKind`] has one driver. Drivers decide which subtypes a
//! capture request yields, stamp digital identities, and perform the
//! hardware-access step of the capture and stream loops. Shared behaviour
//! lives in the trait's default methods.

use mocksbi_config::Purpose;
use serde_json::{Map, Value};
use thiserror::Error;

use super::capture::{CaptureSession, SampleSlot};
use super::catalog::{CatalogError, DeviceCatalog};
use super::kind::{BioSubtype, DeviceKind};
use super::selector::SubtypeSelector;
use crate::error_catalog::codes;

const LEFT_SLAP: [BioSubtype; 4] = [
    BioSubtype::LeftIndex,
    BioSubtype::LeftMiddle,
    BioSubtype::LeftRing,
    BioSubtype::LeftLittle,
];
const RIGHT_SLAP: [BioSubtype; 4] = [
    BioSubtype::RightIndex,
    BioSubtype::RightMiddle,
    BioSubtype::RightRing,
    BioSubtype::RightLittle,
];
const THUMBS: [BioSubtype; 2] = [BioSubtype::LeftThumb, BioSubtype::RightThumb];
const LEFT_EYE: [BioSubtype; 1] = [BioSubtype::LeftIris];
const RIGHT_EYE: [BioSubtype; 1] = [BioSubtype::RightIris];
const BOTH_EYES: [BioSubtype; 2] = [BioSubtype::LeftIris, BioSubtype::RightIris];

/// Subtype and exception selection supplied by a capture request.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub sub_id: u8,
    pub count: usize,
    pub subtypes: &'a SubtypeSelector,
    pub exceptions: &'a SubtypeSelector,
}

/// Reasons a capture request's subtype selection is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("device sub id {0} is not supported")]
    SubId(u8),
    #[error("count {0} is not supported")]
    Count(usize),
    #[error("count {count} with {exceptions} exceptions does not cover {expected} subtypes")]
    SubtypeSet {
        count: usize,
        exceptions: usize,
        expected: usize,
    },
}

impl PlanError {
    /// Protocol error code for this rejection.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::SubId(_) => codes::INVALID_SUB_ID,
            Self::Count(_) => codes::INVALID_COUNT,
            Self::SubtypeSet { .. } => codes::INVALID_SUBTYPE_SET,
        }
    }
}

/// Where the capture step reads samples from.
#[derive(Clone, Copy)]
pub struct SampleSource<'a> {
    pub catalog: &'a dyn DeviceCatalog,
    pub profile: &'a str,
    pub purpose: Purpose,
    pub quality: u8,
}

/// Result of one stream tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStep {
    /// A preview frame to send.
    Frame(Vec<u8>),
    /// No frame is available this tick.
    Pending,
    /// A layered capture finished; the stream should end.
    Ended,
}

/// Capability interface implemented once per device kind.
pub trait ModalityDriver: Send + Sync {
    fn kind(&self) -> DeviceKind;

    /// Subtypes a capture yields, in response order.
    fn plan_subtypes(&self, request: &PlanRequest<'_>) -> Result<Vec<BioSubtype>, PlanError>;

    /// Stamps the digital-id template with this device's type and `timestamp`.
    fn build_digital_id(&self, template: &Value, timestamp: &str) -> Value {
        let mut fields = template.as_object().cloned().unwrap_or_else(Map::new);
        let kind = self.kind();
        fields.insert("type".into(), Value::from(kind.modality().label()));
        fields.insert("deviceSubType".into(), Value::from(kind.sub_type_label()));
        fields.insert("dateTime".into(), Value::from(timestamp));
        Value::Object(fields)
    }

    /// Loads every missing subtype and reports whether the capture completed.
    fn advance_capture(
        &self,
        session: &mut CaptureSession,
        source: SampleSource<'_>,
    ) -> Result<bool, CatalogError> {
        for subtype in session.missing_subtypes() {
            let slot = match source
                .catalog
                .sample(source.profile, source.purpose, self.kind(), subtype)?
            {
                Some(value) => SampleSlot::Captured {
                    value,
                    quality: source.quality,
                },
                None => SampleSlot::Unavailable,
            };
            session.record(subtype, slot);
        }
        Ok(session.complete_if_attempted())
    }

    /// Fetches the next preview frame, or reports that the stream has ended.
    fn advance_preview_frame(
        &self,
        session: &mut CaptureSession,
        catalog: &dyn DeviceCatalog,
    ) -> Result<FrameStep, CatalogError> {
        if session.capture_completed() && !session.capture_started() {
            return Ok(FrameStep::Ended);
        }
        Ok(catalog
            .preview_frame(self.kind(), session.sub_id())?
            .map_or(FrameStep::Pending, FrameStep::Frame))
    }
}

/// Driver for `kind`.
#[must_use]
pub fn driver(kind: DeviceKind) -> &'static dyn ModalityDriver {
    match kind {
        DeviceKind::FingerSlap => &FingerSlapDriver,
        DeviceKind::FingerSingle => &FingerSingleDriver,
        DeviceKind::IrisDouble => &IrisDoubleDriver,
        DeviceKind::IrisSingle => &IrisSingleDriver,
        DeviceKind::Face => &FaceDriver,
    }
}

/// A fixed group minus exceptions. `count + exceptions` must cover the group.
fn plan_group(
    group: &[BioSubtype],
    count: usize,
    exceptions: &SubtypeSelector,
) -> Result<Vec<BioSubtype>, PlanError> {
    if count == 0 || count > group.len() {
        return Err(PlanError::Count(count));
    }
    let excepted = exceptions.count_in(group);
    if count + excepted != group.len() {
        return Err(PlanError::SubtypeSet {
            count,
            exceptions: excepted,
            expected: group.len(),
        });
    }
    Ok(group
        .iter()
        .copied()
        .filter(|subtype| !exceptions.is_checked(*subtype))
        .collect())
}

/// Explicitly requested subtypes minus exceptions, or the unknown tag.
fn plan_selected(
    request: &PlanRequest<'_>,
    belongs: fn(BioSubtype) -> bool,
) -> Vec<BioSubtype> {
    let selected: Vec<BioSubtype> = request
        .subtypes
        .known()
        .filter(|subtype| belongs(*subtype) && !request.exceptions.is_checked(*subtype))
        .collect();
    if selected.is_empty() {
        vec![BioSubtype::Unknown]
    } else {
        selected
    }
}

struct FingerSlapDriver;

impl ModalityDriver for FingerSlapDriver {
    fn kind(&self) -> DeviceKind {
        DeviceKind::FingerSlap
    }

    fn plan_subtypes(&self, request: &PlanRequest<'_>) -> Result<Vec<BioSubtype>, PlanError> {
        let group: &[BioSubtype] = match request.sub_id {
            1 => &LEFT_SLAP,
            2 => &RIGHT_SLAP,
            3 => &THUMBS,
            other => return Err(PlanError::SubId(other)),
        };
        plan_group(group, request.count, request.exceptions)
    }
}

struct IrisDoubleDriver;

impl ModalityDriver for IrisDoubleDriver {
    fn kind(&self) -> DeviceKind {
        DeviceKind::IrisDouble
    }

    fn plan_subtypes(&self, request: &PlanRequest<'_>) -> Result<Vec<BioSubtype>, PlanError> {
        let group: &[BioSubtype] = match request.sub_id {
            1 => &LEFT_EYE,
            2 => &RIGHT_EYE,
            3 => &BOTH_EYES,
            other => return Err(PlanError::SubId(other)),
        };
        plan_group(group, request.count, request.exceptions)
    }
}

struct FaceDriver;

impl ModalityDriver for FaceDriver {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Face
    }

    fn plan_subtypes(&self, request: &PlanRequest<'_>) -> Result<Vec<BioSubtype>, PlanError> {
        if !self.kind().accepts_sub_id(request.sub_id) {
            return Err(PlanError::SubId(request.sub_id));
        }
        if request.count != 1 {
            return Err(PlanError::Count(request.count));
        }
        Ok(vec![BioSubtype::Face])
    }
}

struct FingerSingleDriver;

impl ModalityDriver for FingerSingleDriver {
    fn kind(&self) -> DeviceKind {
        DeviceKind::FingerSingle
    }

    fn plan_subtypes(&self, request: &PlanRequest<'_>) -> Result<Vec<BioSubtype>, PlanError> {
        if !self.kind().accepts_sub_id(request.sub_id) {
            return Err(PlanError::SubId(request.sub_id));
        }
        if request.count == 0 {
            return Err(PlanError::Count(request.count));
        }
        let selected = plan_selected(request, BioSubtype::is_finger);
        if selected.len() != request.count {
            return Err(PlanError::SubtypeSet {
                count: request.count,
                exceptions: request.exceptions.known().count(),
                expected: selected.len(),
            });
        }
        Ok(selected)
    }
}

struct IrisSingleDriver;

impl ModalityDriver for IrisSingleDriver {
    fn kind(&self) -> DeviceKind {
        DeviceKind::IrisSingle
    }

    fn plan_subtypes(&self, request: &PlanRequest<'_>) -> Result<Vec<BioSubtype>, PlanError> {
        if !self.kind().accepts_sub_id(request.sub_id) {
            return Err(PlanError::SubId(request.sub_id));
        }
        if request.count != 1 {
            return Err(PlanError::Count(request.count));
        }
        let selected = plan_selected(request, BioSubtype::is_iris);
        if selected.len() != 1 {
            return Err(PlanError::SubtypeSet {
                count: request.count,
                exceptions: request.exceptions.known().count(),
                expected: selected.len(),
            });
        }
        Ok(selected)
    }
}
