//! In-flight capture and stream state for one device.

use std::collections::BTreeMap;

use super::kind::BioSubtype;

/// Identifies one capture or stream claim on a device.
///
/// Every claim gets a fresh id, so a request can tell whether the session it
/// is polling is still the one it joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimId(u64);

impl ClaimId {
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Outcome of loading one subtype's canned sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSlot {
    /// The sample file was found.
    Captured { value: Vec<u8>, quality: u8 },
    /// The profile has no file for this subtype.
    Unavailable,
}

/// Samples gathered by a completed capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Recorded outcomes in plan order.
    pub samples: Vec<(BioSubtype, SampleSlot)>,
    pub requested_score: u8,
}

/// Mutable session owned by a busy device.
///
/// A session is created either by a stream (preview frames only) or by a
/// capture. A capture may later be layered onto a running stream session.
/// The creating claim owns the session and is the only one that tears it
/// down.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    sub_id: u8,
    owner: ClaimId,
    capture: Option<ClaimId>,
    plan: Vec<BioSubtype>,
    requested_score: u8,
    samples: BTreeMap<BioSubtype, SampleSlot>,
    stream_started: bool,
    capture_completed: bool,
}

impl CaptureSession {
    fn empty(sub_id: u8, owner: ClaimId) -> Self {
        Self {
            sub_id,
            owner,
            capture: None,
            plan: Vec::new(),
            requested_score: 0,
            samples: BTreeMap::new(),
            stream_started: false,
            capture_completed: false,
        }
    }

    /// Session for a live preview stream.
    #[must_use]
    pub fn for_stream(sub_id: u8, owner: ClaimId) -> Self {
        Self {
            stream_started: true,
            ..Self::empty(sub_id, owner)
        }
    }

    /// Session for a standalone capture.
    #[must_use]
    pub fn for_capture(sub_id: u8, owner: ClaimId, request: CapturePlan) -> Self {
        let mut session = Self::empty(sub_id, owner);
        session.begin_capture(owner, request);
        session
    }

    /// Starts a capture on this session, replacing any earlier results.
    pub fn begin_capture(&mut self, claim: ClaimId, request: CapturePlan) {
        self.capture = Some(claim);
        self.plan = request.subtypes;
        self.requested_score = request.requested_score;
        self.samples.clear();
        self.capture_completed = false;
    }

    #[must_use]
    pub const fn sub_id(&self) -> u8 {
        self.sub_id
    }

    /// Claim that created the session.
    #[must_use]
    pub const fn owner(&self) -> ClaimId {
        self.owner
    }

    /// Whether `claim` is the capture currently running on this session.
    #[must_use]
    pub fn is_capture(&self, claim: ClaimId) -> bool {
        self.capture == Some(claim)
    }

    #[must_use]
    pub const fn stream_started(&self) -> bool {
        self.stream_started
    }

    #[must_use]
    pub const fn capture_started(&self) -> bool {
        self.capture.is_some()
    }

    #[must_use]
    pub const fn capture_completed(&self) -> bool {
        self.capture_completed
    }

    /// Planned subtypes with no recorded outcome yet.
    #[must_use]
    pub fn missing_subtypes(&self) -> Vec<BioSubtype> {
        self.plan
            .iter()
            .copied()
            .filter(|subtype| !self.samples.contains_key(subtype))
            .collect()
    }

    pub fn record(&mut self, subtype: BioSubtype, slot: SampleSlot) {
        self.samples.insert(subtype, slot);
    }

    /// Marks the capture complete once every planned subtype was attempted.
    pub fn complete_if_attempted(&mut self) -> bool {
        if self.capture.is_some() && self.missing_subtypes().is_empty() {
            self.capture_completed = true;
        }
        self.capture_completed
    }

    /// Ends the capture phase, leaving any stream running.
    pub fn finish_capture(&mut self) {
        self.capture = None;
        self.capture_completed = true;
    }

    /// Recorded outcomes in plan order, with the score the caller asked for.
    #[must_use]
    pub fn outcome(&self) -> CaptureOutcome {
        let samples = self
            .plan
            .iter()
            .map(|subtype| {
                let slot = self
                    .samples
                    .get(subtype)
                    .cloned()
                    .unwrap_or(SampleSlot::Unavailable);
                (*subtype, slot)
            })
            .collect();
        CaptureOutcome {
            samples,
            requested_score: self.requested_score,
        }
    }
}

/// Validated capture parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePlan {
    pub subtypes: Vec<BioSubtype>,
    pub requested_score: u8,
}
