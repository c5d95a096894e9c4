//! Mock SBI biometric device emulator.
//!
//! The emulator impersonates the fingerprint, iris and face devices of a
//! Secure Biometric Interface endpoint. Clients speak a line-oriented,
//! HTTP-flavoured protocol over raw TCP: the first token of the request line
//! is a custom verb (`MOSIPDISC`, `RCAPTURE`, `STREAM`, `SETSTATUS`, ...) and
//! the body is JSON. Each connection carries one request.
//!
//! Startup follows a fixed sequence:
//!
//! 1. configuration is layered from defaults, file, environment and flags
//!    (see [`mocksbi_config`]);
//! 2. structured telemetry is installed on stderr;
//! 3. the [`device::DeviceRegistry`] is built for the configured purpose
//!    from the canned data under `files_root`;
//! 4. the listener claims the first free port of the configured range and
//!    serves until a termination signal arrives.
//!
//! Health reporting hooks emit structured events at each stage so operators
//! can see which port was claimed and which devices changed state.

pub mod bootstrap;
pub mod crypto;
pub mod device;
mod dispatch;
mod error_catalog;
mod health;
mod process;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, SystemConfigLoader, bootstrap, bootstrap_with,
};
pub use dispatch::{RawRequest, RequestError, ResponseFramer, Verb, VerbFamily};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    Emulator, LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
