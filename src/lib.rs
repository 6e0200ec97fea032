//! Hexfront rule engine library.
//!
//! Exposes the battlefield model, movement and combat resolution, the
//! computer opponent, and the text protocol for use by integration tests and
//! the binary entry points.

pub mod ai;
pub mod board;
pub mod config;
pub mod decision;
pub mod engine;
pub mod movement;
pub mod protocol;
pub mod resolve;
pub mod selfplay;
