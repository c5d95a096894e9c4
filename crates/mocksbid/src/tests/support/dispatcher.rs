//! Builds dispatchers over in-memory device data.

use std::sync::Arc;
use std::time::Duration;

use mocksbi_config::DEFAULT_PROFILE;

use crate::crypto::{Ed25519Signer, X25519Encryptor};
use crate::device::{Clock, DeviceCatalog, DeviceRegistry};
use crate::dispatch::{Collaborators, DispatchSettings, RequestDispatcher};
use crate::error_catalog::ErrorCatalog;

use super::catalog::MemoryCatalog;
use super::clock::FixedClock;
use super::reporter::RecordingHealthReporter;

/// Timestamp reported by test clocks.
pub const TEST_TIMESTAMP: &str = "2026-03-01T10:00:00Z";

/// Callback id advertised by test dispatchers.
pub const TEST_CALLBACK_ID: &str = "http://127.0.0.1:4501/";

/// Every verb the emulator understands, plus `OPTIONS`.
pub const ALL_METHODS: [&str; 11] = [
    "MOSIPDISC",
    "MOSIPDINFO",
    "GET",
    "CAPTURE",
    "RCAPTURE",
    "STREAM",
    "SETSTATUS",
    "SETSCORE",
    "SETDELAY",
    "SETPROFILE",
    "OPTIONS",
];

/// Dispatcher plus the doubles behind it.
pub struct TestDispatcher {
    pub dispatcher: RequestDispatcher,
    pub catalog: Arc<MemoryCatalog>,
    pub reporter: Arc<RecordingHealthReporter>,
    pub signer: Arc<Ed25519Signer>,
}

/// Builds a dispatcher whose purpose follows the catalogue's devices.
pub fn test_dispatcher(catalog: MemoryCatalog, methods: &[&str]) -> RequestDispatcher {
    build(catalog, methods).dispatcher
}

/// Like [`test_dispatcher`] but keeps handles on the doubles.
pub fn build(catalog: MemoryCatalog, methods: &[&str]) -> TestDispatcher {
    let purpose = catalog.purpose();
    let catalog = Arc::new(catalog);
    let registry = Arc::new(DeviceRegistry::new(
        purpose,
        Arc::clone(&catalog) as Arc<dyn DeviceCatalog>,
        DEFAULT_PROFILE,
        40,
    ));
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(TEST_TIMESTAMP));
    let signer = Arc::new(Ed25519Signer::generate().expect("signing key"));
    let reporter = Arc::new(RecordingHealthReporter::default());
    let collaborators = Collaborators {
        signer: Arc::clone(&signer) as _,
        encryptor: Arc::new(X25519Encryptor::new(Arc::clone(&clock))),
        clock,
        reporter: Arc::clone(&reporter) as _,
    };
    let settings = DispatchSettings {
        callback_id: TEST_CALLBACK_ID.to_owned(),
        cors_methods: methods.iter().map(|method| (*method).to_owned()).collect(),
        stream_timeout: Duration::from_millis(300),
        errors: ErrorCatalog::new("en"),
    };
    TestDispatcher {
        dispatcher: RequestDispatcher::new(registry, collaborators, settings),
        catalog,
        reporter,
        signer,
    }
}
