//! Test harness utilities shared by the unit and behavioural suites.

pub mod catalog;
pub mod client;
pub mod clock;
pub mod config_loader;
pub mod dispatcher;
pub mod reporter;
pub mod world;

pub use config_loader::TestConfigLoader;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{EmulatorWorld, LabelledRequest, world};
