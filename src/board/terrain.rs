//! Terrain cells.
//!
//! Each on-map hex carries one [`TerrainCell`]. Movement cost and defense
//! modifier are derived from the terrain kind plus the river/road flags by
//! [`TerrainCell::derive_stats`], which map generation runs once after every
//! flag has been laid down.

use serde::{Deserialize, Serialize};

use super::hex::HexCoord;

/// The base terrain of a hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainKind {
    OpenGround,
    Forest,
    Town,
    Ruins,
}

impl TerrainKind {
    /// Base movement cost and defense modifier before river/road adjustment.
    pub const fn base_stats(self) -> (i32, i32) {
        match self {
            TerrainKind::OpenGround => (1, 0),
            TerrainKind::Forest => (2, 2),
            TerrainKind::Town => (2, 1),
            TerrainKind::Ruins => (2, 1),
        }
    }

    /// Whether this terrain blocks ranged line of sight.
    pub const fn blocks_sight(self) -> bool {
        matches!(self, TerrainKind::Forest)
    }

    pub const fn label(self) -> &'static str {
        match self {
            TerrainKind::OpenGround => "Open Ground",
            TerrainKind::Forest => "Forest",
            TerrainKind::Town => "Town",
            TerrainKind::Ruins => "Ruins",
        }
    }
}

/// Terrain attributes of one hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCell {
    pub hex: HexCoord,
    pub kind: TerrainKind,
    pub move_cost: i32,
    pub defense_mod: i32,
    pub road: bool,
    pub river: bool,
    pub landmark: Option<String>,
    /// Reserved; no rule reads it yet.
    pub higher_ground: bool,
}

impl TerrainCell {
    /// Creates a cell with stats already derived for its kind.
    pub fn new(hex: HexCoord, kind: TerrainKind) -> Self {
        let mut cell = TerrainCell {
            hex,
            kind,
            move_cost: 1,
            defense_mod: 0,
            road: false,
            river: false,
            landmark: None,
            higher_ground: false,
        };
        cell.derive_stats();
        cell
    }

    /// Recomputes movement cost and defense modifier from kind and flags.
    ///
    /// A river without a road adds +1 cost and -1 defense.
    pub fn derive_stats(&mut self) {
        let (cost, defense) = self.kind.base_stats();
        self.move_cost = cost;
        self.defense_mod = defense;
        if self.river && !self.road {
            self.move_cost += 1;
            self.defense_mod -= 1;
        }
    }

    /// Human-readable description, e.g. `"Fooberg, Town, Road"`.
    pub fn describe(&self) -> String {
        let mut text = String::new();
        if let Some(name) = &self.landmark {
            text.push_str(name);
            text.push_str(", ");
        }
        text.push_str(self.kind.label());
        if self.river {
            text.push_str(", River");
        }
        if self.road {
            text.push_str(", Road");
        }
        text
    }
}
