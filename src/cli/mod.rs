//! Command-line interface for revify.

mod commands;
mod render;

pub use commands::{is_verbose, run};
