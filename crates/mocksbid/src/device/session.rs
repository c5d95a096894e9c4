//! Per-device identity, status and owned capture session.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use mocksbi_config::Purpose;
use strum::EnumString;

use super::capture::{CapturePlan, CaptureSession, ClaimId};
use super::kind::DeviceKind;
use crate::error_catalog::codes;

/// Device availability as reported to clients.
///
/// Admin input parses case-insensitively and accepts the wire labels as
/// well as kebab or snake case (`not-ready`, `Not Registered`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DeviceStatus {
    Ready,
    Busy,
    #[strum(
        serialize = "NotReady",
        serialize = "Not Ready",
        serialize = "not-ready",
        serialize = "not_ready"
    )]
    NotReady,
    #[strum(
        serialize = "NotRegistered",
        serialize = "Not Registered",
        serialize = "not-registered",
        serialize = "not_registered"
    )]
    NotRegistered,
}

impl DeviceStatus {
    /// Wire label (`deviceStatus`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Busy => "Busy",
            Self::NotReady => "Not Ready",
            Self::NotRegistered => "Not Registered",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Artificial latency per verb.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelayTable {
    delays: BTreeMap<String, Duration>,
}

impl DelayTable {
    /// Replaces the whole table with `delay` for each of `methods`.
    pub fn replace<S: AsRef<str>>(&mut self, methods: &[S], delay: Duration) {
        self.delays = methods
            .iter()
            .map(|method| (method.as_ref().trim().to_ascii_uppercase(), delay))
            .collect();
    }

    #[must_use]
    pub fn delay_for(&self, method: &str) -> Duration {
        self.delays
            .get(&method.trim().to_ascii_uppercase())
            .copied()
            .unwrap_or_default()
    }
}

/// How a capture request joins the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The device was idle; the capture owns the device.
    Fresh,
    /// The capture runs on top of an active stream.
    Layered,
}

/// A granted capture claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTicket {
    pub admission: Admission,
    pub claim: ClaimId,
}

/// One emulated device.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    kind: DeviceKind,
    device_id: String,
    status: DeviceStatus,
    delays: DelayTable,
    score_override: Option<u8>,
    claims: u64,
    capture: Option<CaptureSession>,
}

impl DeviceSession {
    pub fn new(kind: DeviceKind, device_id: impl Into<String>) -> Self {
        Self {
            kind,
            device_id: device_id.into(),
            status: DeviceStatus::Ready,
            delays: DelayTable::default(),
            score_override: None,
            claims: 0,
            capture: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub const fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn set_status(&mut self, status: DeviceStatus) {
        self.status = status;
    }

    #[must_use]
    pub const fn delays(&self) -> &DelayTable {
        &self.delays
    }

    pub fn delays_mut(&mut self) -> &mut DelayTable {
        &mut self.delays
    }

    /// Quality score reported for captured samples.
    #[must_use]
    pub fn quality_score(&self, default: u8) -> u8 {
        self.score_override.unwrap_or(default)
    }

    /// Sets or clears the quality-score override.
    pub fn set_score(&mut self, score: Option<u8>) {
        self.score_override = score;
    }

    /// Session of the capture holding `claim`, if it is still running.
    pub fn capture_for(&mut self, claim: ClaimId) -> Option<&mut CaptureSession> {
        self.capture
            .as_mut()
            .filter(|session| session.is_capture(claim))
    }

    /// Session of the stream holding `claim`, if it is still running.
    pub fn stream_for(&mut self, claim: ClaimId) -> Option<&mut CaptureSession> {
        self.capture
            .as_mut()
            .filter(|session| session.stream_started() && session.owner() == claim)
    }

    fn next_claim(&mut self) -> ClaimId {
        self.claims += 1;
        ClaimId::new(self.claims)
    }

    /// Decides whether a capture may start, without changing state.
    ///
    /// # Errors
    ///
    /// Returns the protocol error code for the device's current state.
    pub fn admit_capture(&self, purpose: Purpose) -> Result<Admission, u16> {
        match self.status {
            DeviceStatus::Ready => Ok(Admission::Fresh),
            DeviceStatus::NotRegistered => Err(codes::NOT_REGISTERED),
            DeviceStatus::NotReady => Err(codes::NOT_READY),
            DeviceStatus::Busy => match &self.capture {
                None => Err(codes::BUSY),
                Some(session) if session.capture_started() => Err(match purpose {
                    Purpose::Registration => codes::RCAPTURE_IN_PROGRESS,
                    Purpose::Auth => codes::CAPTURE_IN_PROGRESS,
                }),
                Some(session) if session.stream_started() && purpose == Purpose::Registration => {
                    Ok(Admission::Layered)
                }
                Some(_) => Err(codes::BUSY),
            },
        }
    }

    /// Claims the device for a capture.
    ///
    /// # Errors
    ///
    /// Returns the protocol error code when the device cannot take the
    /// capture, including a sub-id mismatch with a running stream.
    pub fn claim_capture(
        &mut self,
        purpose: Purpose,
        sub_id: u8,
        plan: CapturePlan,
    ) -> Result<CaptureTicket, u16> {
        let admission = self.admit_capture(purpose)?;
        if admission == Admission::Layered
            && self
                .capture
                .as_ref()
                .is_some_and(|session| session.sub_id() != sub_id)
        {
            return Err(codes::RCAPTURE_SUB_ID_MISMATCH);
        }
        let claim = self.next_claim();
        match admission {
            Admission::Fresh => {
                self.status = DeviceStatus::Busy;
                self.capture = Some(CaptureSession::for_capture(sub_id, claim, plan));
            }
            Admission::Layered => {
                let Some(session) = self.capture.as_mut() else {
                    return Err(codes::BUSY);
                };
                session.begin_capture(claim, plan);
            }
        }
        Ok(CaptureTicket { admission, claim })
    }

    /// Decides whether a stream may start, without changing state.
    ///
    /// # Errors
    ///
    /// Returns the protocol error code for the device's current state.
    pub const fn admit_stream(&self) -> Result<(), u16> {
        match self.status {
            DeviceStatus::Ready => Ok(()),
            DeviceStatus::NotRegistered => Err(codes::NOT_REGISTERED),
            DeviceStatus::NotReady => Err(codes::NOT_READY),
            DeviceStatus::Busy => Err(codes::BUSY),
        }
    }

    /// Claims the device for a preview stream.
    ///
    /// # Errors
    ///
    /// Returns the protocol error code for the device's current state.
    pub fn claim_stream(&mut self, sub_id: u8) -> Result<ClaimId, u16> {
        self.admit_stream()?;
        let claim = self.next_claim();
        self.status = DeviceStatus::Busy;
        self.capture = Some(CaptureSession::for_stream(sub_id, claim));
        Ok(claim)
    }

    /// Ends the capture holding `claim`.
    ///
    /// A standalone capture releases the device; a layered one leaves the
    /// stream to tear it down. A claim whose session has since been replaced
    /// changes nothing.
    pub fn end_capture(&mut self, claim: ClaimId) {
        let Some(session) = self.capture.as_mut() else {
            return;
        };
        if session.owner() == claim {
            self.release();
        } else if session.is_capture(claim) {
            session.finish_capture();
        }
    }

    /// Ends the stream holding `claim`, releasing the device.
    pub fn end_stream(&mut self, claim: ClaimId) {
        if self
            .capture
            .as_ref()
            .is_some_and(|session| session.owner() == claim)
        {
            self.release();
        }
    }

    fn release(&mut self) {
        self.capture = None;
        self.status = DeviceStatus::Ready;
    }
}
