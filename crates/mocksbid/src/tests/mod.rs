//! Test suites for the emulator daemon.

mod bootstrap_behaviour;
pub(crate) mod support;
