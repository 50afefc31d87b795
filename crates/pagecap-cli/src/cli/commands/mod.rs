//! CLI command handlers, one command per file.

mod devices;
mod name;
mod run;

pub use devices::run_devices;
pub use name::run_name;
pub use run::{run_capture, RunOverrides};
