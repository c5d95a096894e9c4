//! Emulator bootstrap orchestration.
//!
//! Bootstrap loads configuration, installs telemetry and assembles the
//! device registry and its collaborators. Binding the listener is left to
//! the process layer, which needs the bound port to build the dispatcher.

use std::sync::Arc;

use mocksbi_config::Config;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::{info, warn};

use crate::crypto::{CryptoError, Ed25519Signer, Signer, X25519Encryptor};
use crate::device::{Clock, DeviceCatalog, DeviceRegistry, FileCatalog, SystemClock};
use crate::dispatch::{Collaborators, DispatchSettings, RequestDispatcher, ResponseFramer};
use crate::error_catalog::ErrorCatalog;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the emulator configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The signing key could not be loaded or generated.
    #[error("failed to prepare signing key: {source}")]
    Signer {
        /// Underlying key error.
        #[source]
        source: CryptoError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    registry: Arc<DeviceRegistry>,
    collaborators: Collaborators,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry shared by every connection.
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Reporter receiving lifecycle events.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.collaborators.reporter
    }

    /// Response framing for a listener bound on `port`.
    #[must_use]
    pub fn framer(&self, port: u16) -> ResponseFramer {
        ResponseFramer::new(
            self.config.cors_header(),
            self.config.server_address(),
            port,
        )
    }

    /// Dispatcher for a listener bound on `port`.
    pub(crate) fn dispatcher(&self, port: u16) -> RequestDispatcher {
        let settings = DispatchSettings {
            callback_id: self.framer(port).callback_id(),
            cors_methods: self.config.cors_methods(),
            stream_timeout: self.config.stream_timeout(),
            errors: ErrorCatalog::new(self.config.locale()),
        };
        RequestDispatcher::new(
            Arc::clone(&self.registry),
            self.collaborators.clone(),
            settings,
        )
    }
}

/// Bootstraps the emulator against the file catalogue named by the
/// configuration.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or the signing
/// key cannot be prepared.
pub fn bootstrap(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    bootstrap_with(loader, reporter, file_catalog)
}

/// Bootstraps the emulator using the supplied collaborators.
///
/// `open_catalog` builds the device catalogue from the loaded configuration.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or the signing
/// key cannot be prepared. The reporter sees the failure first.
pub fn bootstrap_with<F>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    open_catalog: F,
) -> Result<Daemon, BootstrapError>
where
    F: FnOnce(&Config) -> Arc<dyn DeviceCatalog>,
{
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let signer = match load_signer(&config) {
        Ok(signer) => signer,
        Err(source) => {
            let error = BootstrapError::Signer { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(DeviceRegistry::new(
        config.purpose(),
        open_catalog(&config),
        config.profile(),
        config.default_quality_score(),
    ));
    let collaborators = Collaborators {
        signer,
        encryptor: Arc::new(X25519Encryptor::new(Arc::clone(&clock))),
        clock,
        reporter: Arc::clone(&reporter),
    };
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        registry,
        collaborators,
        telemetry,
    })
}

fn file_catalog(config: &Config) -> Arc<dyn DeviceCatalog> {
    let root = config.files_root();
    if !root.is_dir() {
        warn!(
            target: BOOTSTRAP_TARGET,
            files_root = %root,
            "device data root is missing; devices will report default identities"
        );
    }
    Arc::new(FileCatalog::new(root.to_path_buf()))
}

fn load_signer(config: &Config) -> Result<Arc<dyn Signer>, CryptoError> {
    let signer = match config.signing_key_path() {
        Some(path) => {
            info!(target: BOOTSTRAP_TARGET, key = %path, "loading signing key");
            Ed25519Signer::from_file(path)?
        }
        None => {
            info!(target: BOOTSTRAP_TARGET, "generating ephemeral signing key");
            Ed25519Signer::generate()?
        }
    };
    Ok(Arc::new(signer))
}
