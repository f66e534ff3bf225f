//! Presentation layer for the exception-processing platform.
//!
//! CLI argument definitions and output formatting over a completed
//! [`output::formatter::RunReport`]. No business logic lives here — this
//! crate only renders what the application layer already decided.

pub mod cli;
pub mod output;
pub mod progress;

pub use cli::commands::{Cli, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use output::formatter::{OutputFormatter, RunReport};
pub use progress::reporter::{narrate, SimpleProgress, StageProgress};
