//! Computer opponent: scoring heuristics and the per-unit action cycle.

pub mod controller;
pub mod heuristic;

pub use controller::Step;
pub use heuristic::{advance_score, approach_score, attack_score};
