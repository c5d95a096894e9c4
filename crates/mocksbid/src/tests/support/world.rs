//! BDD test world: a bootstrapped emulator serving an in-memory catalogue on
//! a loopback port, plus the responses scenarios collected from it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use mocksbi_config::Purpose;
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap, bootstrap_with};
use crate::device::{DeviceCatalog, DeviceKind, DeviceStatus};
use crate::process::{Emulator, LaunchError};

use super::catalog::MemoryCatalog;
use super::client::{self, WireResponse};
use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

/// One request a scenario sends, tagged so its response can be found later.
#[derive(Debug, Clone)]
pub struct LabelledRequest {
    pub label: String,
    pub verb: String,
    pub body: Option<String>,
    pub start_delay: Duration,
}

impl LabelledRequest {
    pub fn new(label: &str, verb: &str, body: Option<String>) -> Self {
        Self {
            label: label.to_owned(),
            verb: verb.to_owned(),
            body,
            start_delay: Duration::ZERO,
        }
    }

    /// Holds the request back by `delay` once its thread starts.
    #[must_use]
    pub fn delayed_by(self, delay: Duration) -> Self {
        Self {
            start_delay: delay,
            ..self
        }
    }
}

/// Scenario world shared across BDD steps.
pub struct EmulatorWorld {
    pub reporter: Arc<RecordingHealthReporter>,
    catalog: Arc<MemoryCatalog>,
    loader: Box<dyn ConfigLoader>,
    daemon: Option<Daemon>,
    emulator: Option<Emulator>,
    bootstrap_error: Option<BootstrapError>,
    launch_error: Option<LaunchError>,
    _port_blocker: Option<TcpListener>,
    file_tree: Option<TempDir>,
    responses: BTreeMap<String, WireResponse>,
    last: Option<WireResponse>,
}

impl EmulatorWorld {
    /// Builds a world for registration devices with a successful loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reporter: Arc::new(RecordingHealthReporter::default()),
            catalog: Arc::new(MemoryCatalog::registration()),
            loader: Box::new(TestConfigLoader::new(Purpose::Registration)),
            daemon: None,
            emulator: None,
            bootstrap_error: None,
            launch_error: None,
            _port_blocker: None,
            file_tree: None,
            responses: BTreeMap::new(),
            last: None,
        }
    }

    /// Switches the loader and catalogue to `purpose`.
    pub fn use_purpose(&mut self, purpose: Purpose) {
        self.catalog = Arc::new(match purpose {
            Purpose::Registration => MemoryCatalog::registration(),
            Purpose::Auth => MemoryCatalog::auth(),
        });
        self.loader = Box::new(TestConfigLoader::new(purpose));
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
    }

    /// Restricts the port range to a single port another socket already holds.
    pub fn occupy_only_port(&mut self, purpose: Purpose) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind blocker");
        let port = listener.local_addr().expect("blocker address").port();
        self._port_blocker = Some(listener);
        self.loader = Box::new(TestConfigLoader::new(purpose).with_ports(port, port));
    }

    /// Serves registration devices from a temporary files tree holding
    /// only `files`, each a path relative to the root and its contents.
    pub fn use_file_tree(&mut self, files: &[(&str, &str)]) {
        let tree = TempDir::new().expect("temporary files root");
        for (relative, contents) in files {
            let path = tree.path().join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create catalogue folder");
            }
            fs::write(&path, contents).expect("write catalogue file");
        }
        let root = Utf8PathBuf::from_path_buf(tree.path().to_path_buf()).expect("utf-8 temp path");
        self.loader = Box::new(TestConfigLoader::new(Purpose::Registration).with_files_root(root));
        self.file_tree = Some(tree);
    }

    /// Runs the bootstrap sequence once.
    ///
    /// A world with a files tree goes through the production catalogue;
    /// otherwise the in-memory catalogue is injected.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let result = if self.file_tree.is_some() {
            bootstrap(&*self.loader, self.reporter.clone())
        } else {
            let catalog = Arc::clone(&self.catalog);
            bootstrap_with(&*self.loader, self.reporter.clone(), move |_| {
                catalog as Arc<dyn DeviceCatalog>
            })
        };
        match result {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Bootstraps if needed, then binds and starts the listener.
    pub fn start(&mut self) {
        self.bootstrap();
        if self.emulator.is_some() || self.launch_error.is_some() {
            return;
        }
        let Some(daemon) = self.daemon.as_ref() else {
            return;
        };
        match Emulator::start(daemon) {
            Ok(emulator) => self.emulator = Some(emulator),
            Err(error) => self.launch_error = Some(error),
        }
    }

    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    #[must_use]
    pub fn launch_error(&self) -> Option<&LaunchError> {
        self.launch_error.as_ref()
    }

    #[must_use]
    pub fn daemon_started(&self) -> bool {
        self.daemon.is_some()
    }

    /// Address of the running emulator.
    ///
    /// # Panics
    ///
    /// Panics when the emulator has not started.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.emulator
            .as_ref()
            .map(Emulator::local_addr)
            .expect("emulator is not running")
    }

    /// Sends one request and records its response as the latest.
    pub fn send(&mut self, verb: &str, body: Option<&str>) -> WireResponse {
        let response = client::send(self.address(), verb, body).expect("request round trip");
        self.last = Some(response.clone());
        response
    }

    /// Sends raw bytes and records the response as the latest.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        let response = client::send_raw(self.address(), bytes).expect("raw round trip");
        self.last = Some(response);
    }

    /// Sends every request on its own thread and records the responses by
    /// label once all have completed.
    pub fn send_concurrently(&mut self, requests: Vec<LabelledRequest>) {
        let address = self.address();
        let workers: Vec<_> = requests
            .into_iter()
            .map(|request| {
                thread::spawn(move || {
                    thread::sleep(request.start_delay);
                    let response = client::send(address, &request.verb, request.body.as_deref())
                        .expect("concurrent round trip");
                    (request.label, response)
                })
            })
            .collect();
        for worker in workers {
            let (label, response) = worker.join().expect("client thread");
            self.responses.insert(label, response);
        }
    }

    /// Records `response` under `label`.
    pub fn remember(&mut self, label: &str, response: WireResponse) {
        self.responses.insert(label.to_owned(), response);
    }

    /// Response recorded for `label`.
    ///
    /// # Panics
    ///
    /// Panics when no such response was recorded.
    #[must_use]
    pub fn response(&self, label: &str) -> &WireResponse {
        self.responses
            .get(label)
            .unwrap_or_else(|| panic!("no response recorded for '{label}'"))
    }

    /// Latest response.
    ///
    /// # Panics
    ///
    /// Panics when nothing has been sent.
    #[must_use]
    pub fn last(&self) -> &WireResponse {
        self.last.as_ref().expect("no request has been sent")
    }

    #[must_use]
    pub fn catalog(&self) -> &MemoryCatalog {
        &self.catalog
    }

    /// Current status of `kind` in the running daemon's registry.
    #[must_use]
    pub fn device_status(&self, kind: DeviceKind) -> Option<DeviceStatus> {
        self.daemon
            .as_ref()?
            .registry()
            .with_device(kind, |device| device.status())
            .ok()
            .flatten()
    }
}

impl Default for EmulatorWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EmulatorWorld {
    fn drop(&mut self) {
        if let Some(emulator) = self.emulator.take()
            && let Err(error) = emulator.stop()
        {
            eprintln!("failed to stop emulator: {error}");
        }
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<EmulatorWorld> {
    RefCell::new(EmulatorWorld::new())
}
