//! Entry point for the `mocksbid` emulator binary.

use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    match mocksbid::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(launch_error) => {
            error!(
                target: concat!(env!("CARGO_PKG_NAME"), "::process"),
                error = %launch_error,
                "emulator terminated"
            );
            report_without_telemetry(&launch_error);
            ExitCode::FAILURE
        }
    }
}

/// Bootstrap failures can happen before the subscriber exists, so the error
/// is also written to stderr directly.
#[expect(clippy::print_stderr, reason = "telemetry may not be initialised yet")]
fn report_without_telemetry(launch_error: &mocksbid::LaunchError) {
    eprintln!("mocksbid: {launch_error}");
}
