//! Structured health reporting for emulator lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use mocksbi_config::Config;

use crate::bootstrap::BootstrapError;
use crate::device::{DeviceKind, DeviceStatus};

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener has bound its port.
    fn listener_bound(&self, address: SocketAddr);

    /// Invoked when an admin request changes a device's status.
    fn device_status_changed(&self, kind: DeviceKind, status: DeviceStatus);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_bound(&self, address: SocketAddr) {
        (**self).listener_bound(address);
    }

    fn device_status_changed(&self, kind: DeviceKind, status: DeviceStatus) {
        (**self).device_status_changed(kind, status);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "mocksbid::health",
            event = "bootstrap_starting",
            "starting emulator bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "mocksbid::health",
            event = "bootstrap_succeeded",
            purpose = %config.purpose(),
            files_root = %config.files_root(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "emulator bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "mocksbid::health",
            event = "bootstrap_failed",
            error = %error,
            "emulator bootstrap failed"
        );
    }

    fn listener_bound(&self, address: SocketAddr) {
        tracing::info!(
            target: "mocksbid::health",
            event = "listener_bound",
            address = %address,
            "listener bound"
        );
    }

    fn device_status_changed(&self, kind: DeviceKind, status: DeviceStatus) {
        tracing::info!(
            target: "mocksbid::health",
            event = "device_status_changed",
            device = %kind,
            status = %status,
            "device status changed"
        );
    }
}
