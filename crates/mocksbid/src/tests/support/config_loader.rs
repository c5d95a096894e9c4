//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use mocksbi_config::{Config, Purpose};
use ortho_config::{OrthoConfig, OrthoError};

use crate::bootstrap::ConfigLoader;

/// Loader that binds an ephemeral loopback port for the chosen purpose.
#[derive(Debug, Clone)]
pub struct TestConfigLoader {
    config: Config,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new(purpose: Purpose) -> Self {
        Self {
            config: Config {
                server_address: "127.0.0.1".to_owned(),
                min_port: 0,
                max_port: 0,
                purpose,
                stream_timeout_ms: 500,
                ..Config::default()
            },
        }
    }

    /// Overrides the port range.
    #[must_use]
    pub fn with_ports(mut self, min: u16, max: u16) -> Self {
        self.config.min_port = min;
        self.config.max_port = max;
        self
    }

    /// Points the file catalogue at `root`.
    #[must_use]
    pub fn with_files_root(mut self, root: Utf8PathBuf) -> Self {
        self.config.files_root = root;
        self
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that intentionally fails by passing an unknown purpose.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("mocksbid"),
            OsString::from("--purpose"),
            OsString::from("sideways"),
        ];
        Config::load_from_iter(args)
    }
}
