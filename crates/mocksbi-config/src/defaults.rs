use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::purpose::Purpose;

/// Host the emulator binds when nothing else is configured.
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1";

/// First port probed by the listener.
pub const DEFAULT_MIN_PORT: u16 = 4501;

/// Last port probed by the listener.
pub const DEFAULT_MAX_PORT: u16 = 4600;

/// Verbs accepted by the connection worker and echoed in CORS headers.
pub const DEFAULT_CORS_METHODS: &str =
    "MOSIPDISC,MOSIPDINFO,GET,CAPTURE,RCAPTURE,STREAM,SETSTATUS,SETSCORE,SETDELAY,SETPROFILE,OPTIONS";

/// Profile folder used when none has been selected.
pub const DEFAULT_PROFILE: &str = "Default";

/// Locale used when rendering error messages.
pub const DEFAULT_LOCALE: &str = "en";

/// Quality score reported for captured samples without an override.
pub const DEFAULT_QUALITY_SCORE: u8 = 40;

/// Stream deadline applied when a request omits its own timeout.
pub const DEFAULT_STREAM_TIMEOUT_MS: u64 = 60_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned server address used where allocation is required (e.g. serde).
pub fn default_server_address() -> String {
    DEFAULT_SERVER_ADDRESS.to_owned()
}

/// Default lower bound of the port scan.
pub const fn default_min_port() -> u16 {
    DEFAULT_MIN_PORT
}

/// Default upper bound of the port scan.
pub const fn default_max_port() -> u16 {
    DEFAULT_MAX_PORT
}

/// Default device purpose.
pub const fn default_purpose() -> Purpose {
    Purpose::Registration
}

/// Owned CORS method list.
pub fn default_cors_methods() -> String {
    DEFAULT_CORS_METHODS.to_owned()
}

/// Root of the canned-data tree, relative to the working directory.
pub fn default_files_root() -> Utf8PathBuf {
    Utf8PathBuf::from("files")
}

/// Owned default profile name.
pub fn default_profile() -> String {
    DEFAULT_PROFILE.to_owned()
}

/// Owned default locale.
pub fn default_locale() -> String {
    DEFAULT_LOCALE.to_owned()
}

/// Default quality score.
pub const fn default_quality_score() -> u8 {
    DEFAULT_QUALITY_SCORE
}

/// Default stream timeout in milliseconds.
pub const fn default_stream_timeout_ms() -> u64 {
    DEFAULT_STREAM_TIMEOUT_MS
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
