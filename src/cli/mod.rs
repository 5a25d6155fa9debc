//! Command line interface: arguments, console output and tables

pub mod args;
pub mod output;
pub mod table;

pub use args::{Args, Mode, VerbosityLevel};
pub use output::{ConsoleView, OutputFormatter};
