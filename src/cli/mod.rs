//! Command-line interface
//!
//! This module contains the CLI commands and argument parsing, and the
//! interactive menu used by the client and demo commands.

pub mod commands;
pub mod menu;

pub use commands::{Command, Opt};
pub use menu::{display_keys, display_menu, run_menu, EXIT_CHOICE};
