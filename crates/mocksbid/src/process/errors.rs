//! Defines the unified error surface for emulator launch and supervision.

use mocksbi_config::PortRangeError;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the emulator process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the emulator failed.
    #[error("emulator bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// The configured port range is empty.
    #[error("invalid port range: {source}")]
    PortRange {
        /// Underlying range error.
        #[source]
        source: PortRangeError,
    },
    /// Binding or running the listener failed.
    #[error("device listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<PortRangeError> for LaunchError {
    fn from(source: PortRangeError) -> Self {
        Self::PortRange { source }
    }
}

impl From<ListenerError> for LaunchError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
