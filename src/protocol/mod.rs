//! Text protocol handling.
//!
//! The command parser for the main loop plus the line formats the engine
//! writes back: unit and turn reports, and an event sink that streams battle
//! notifications to stdout.

pub mod parser;
pub mod report;

pub use parser::{parse_command, parse_hex, Command};
pub use report::{format_outcome, format_turn, format_unit, write_state, LineSink};
