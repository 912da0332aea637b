//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, and the
//! subcommand runners.

pub mod app;
pub mod args;
pub mod presenter;

// Re-export commonly used types
pub use app::{run_devices, run_download, run_file, run_record, EXIT_ERROR, EXIT_SUCCESS};
pub use args::{Cli, Commands, ModelArgs, SaveArgs};
pub use presenter::Presenter;
