//! Supervises emulator launch sequencing and runtime orchestration.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, Daemon, SystemConfigLoader, bootstrap};
use crate::dispatch::DispatchConnectionHandler;
use crate::health::HealthReporter;
use crate::transport::{ListenerHandle, SocketListener};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// A listener serving one bootstrapped emulator.
pub struct Emulator {
    address: SocketAddr,
    handle: ListenerHandle,
}

impl Emulator {
    /// Binds the first free port of the configured range and starts serving.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the range is invalid or no port binds.
    pub fn start(daemon: &Daemon) -> Result<Self, LaunchError> {
        let config = daemon.config();
        let listener =
            SocketListener::bind_in_range(config.server_address(), config.port_range()?)?;
        let address = listener.local_addr();
        daemon.reporter().listener_bound(address);

        let handler = DispatchConnectionHandler::new(
            daemon.dispatcher(address.port()),
            daemon.framer(address.port()),
        );
        let handle = listener.start(Arc::new(handler))?;
        Ok(Self { address, handle })
    }

    /// Address clients connect to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    ///
    /// Connections already handed to workers run to completion on their own.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Listener`] when the accept thread panicked.
    pub fn stop(self) -> Result<(), LaunchError> {
        self.handle.shutdown();
        self.handle.join()?;
        Ok(())
    }
}

/// Runs the emulator using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, binding or signal handling fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
    )
}

/// Runs the emulator with injected collaborators.
pub(crate) fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let daemon = bootstrap(loader, reporter)?;
    let emulator = Emulator::start(&daemon)?;
    info!(
        target: PROCESS_TARGET,
        address = %emulator.local_addr(),
        purpose = %daemon.config().purpose(),
        "emulator ready"
    );
    shutdown.wait()?;
    emulator.stop()?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
