//! Layered configuration for the mock SBI device emulator.
//!
//! Values are merged by `ortho_config` from built-in defaults, an optional
//! configuration file (`--config-path` or `MOCKSBI_CONFIG_PATH`), environment
//! variables prefixed with `MOCKSBI_`, and command-line flags, in that order.

mod defaults;
mod logging;
mod ports;
mod purpose;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CORS_METHODS, DEFAULT_LOCALE, DEFAULT_LOG_FILTER, DEFAULT_MAX_PORT, DEFAULT_MIN_PORT,
    DEFAULT_PROFILE, DEFAULT_QUALITY_SCORE, DEFAULT_SERVER_ADDRESS, DEFAULT_STREAM_TIMEOUT_MS,
    default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use ports::{PortRange, PortRangeError};
pub use purpose::{Purpose, PurposeParseError};

/// Resolved emulator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "MOCKSBI")]
pub struct Config {
    /// Host the listener binds and advertises in callback URLs.
    #[ortho_config(default = defaults::default_server_address())]
    #[serde(default = "defaults::default_server_address")]
    pub server_address: String,
    /// First port probed when searching for a free port.
    #[ortho_config(default = defaults::default_min_port())]
    #[serde(default = "defaults::default_min_port")]
    pub min_port: u16,
    /// Last port probed when searching for a free port.
    #[ortho_config(default = defaults::default_max_port())]
    #[serde(default = "defaults::default_max_port")]
    pub max_port: u16,
    /// Device family exposed by the emulator.
    #[ortho_config(default = defaults::default_purpose())]
    #[serde(default = "defaults::default_purpose")]
    pub purpose: Purpose,
    /// Comma-separated verb allow-list.
    #[ortho_config(default = defaults::default_cors_methods())]
    #[serde(default = "defaults::default_cors_methods")]
    pub cors_methods: String,
    /// Root directory of canned device data.
    #[ortho_config(default = defaults::default_files_root())]
    #[serde(default = "defaults::default_files_root")]
    pub files_root: Utf8PathBuf,
    /// Profile selected at startup.
    #[ortho_config(default = defaults::default_profile())]
    #[serde(default = "defaults::default_profile")]
    pub profile: String,
    /// Locale for error descriptions.
    #[ortho_config(default = defaults::default_locale())]
    #[serde(default = "defaults::default_locale")]
    pub locale: String,
    /// Quality score reported when no override has been set.
    #[ortho_config(default = defaults::default_quality_score())]
    #[serde(default = "defaults::default_quality_score")]
    pub default_quality_score: u8,
    /// Stream deadline in milliseconds when the request has none.
    #[ortho_config(default = defaults::default_stream_timeout_ms())]
    #[serde(default = "defaults::default_stream_timeout_ms")]
    pub stream_timeout_ms: u64,
    /// PKCS#8 Ed25519 signing key; generated at startup when absent.
    #[serde(default)]
    pub signing_key_path: Option<Utf8PathBuf>,
    /// Tracing filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: defaults::default_server_address(),
            min_port: defaults::default_min_port(),
            max_port: defaults::default_max_port(),
            purpose: defaults::default_purpose(),
            cors_methods: defaults::default_cors_methods(),
            files_root: defaults::default_files_root(),
            profile: defaults::default_profile(),
            locale: defaults::default_locale(),
            default_quality_score: defaults::default_quality_score(),
            stream_timeout_ms: defaults::default_stream_timeout_ms(),
            signing_key_path: None,
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl Config {
    /// Host the listener binds.
    #[must_use]
    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    /// Port scan range.
    ///
    /// # Errors
    ///
    /// Returns [`PortRangeError::Inverted`] when `min_port > max_port`.
    pub fn port_range(&self) -> Result<PortRange, PortRangeError> {
        PortRange::new(self.min_port, self.max_port)
    }

    /// Configured device purpose.
    #[must_use]
    pub const fn purpose(&self) -> Purpose {
        self.purpose
    }

    /// Raw allow-list as echoed in `Access-Control-Allow-Methods`.
    #[must_use]
    pub fn cors_header(&self) -> &str {
        &self.cors_methods
    }

    /// Normalised verb allow-list.
    #[must_use]
    pub fn cors_methods(&self) -> Vec<String> {
        self.cors_methods
            .split(',')
            .map(str::trim)
            .filter(|method| !method.is_empty())
            .map(str::to_ascii_uppercase)
            .collect()
    }

    /// Returns true when `verb` is on the allow-list.
    #[must_use]
    pub fn allows_method(&self, verb: &str) -> bool {
        self.cors_methods
            .split(',')
            .any(|method| method.trim().eq_ignore_ascii_case(verb.trim()))
    }

    /// Root of the canned-data tree.
    #[must_use]
    pub fn files_root(&self) -> &Utf8Path {
        &self.files_root
    }

    /// Startup profile.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Error message locale.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Quality score used without an override.
    #[must_use]
    pub const fn default_quality_score(&self) -> u8 {
        self.default_quality_score
    }

    /// Stream deadline applied when requests omit one.
    #[must_use]
    pub const fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_timeout_ms)
    }

    /// Optional signing key location.
    #[must_use]
    pub fn signing_key_path(&self) -> Option<&Utf8Path> {
        self.signing_key_path.as_deref()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
