//! Persistence shape of a battle.
//!
//! A [`BattleSnapshot`] holds everything needed to resume play: terrain,
//! platoons, locks, turn counters, score and the message log. Derived fields
//! (fighter totals, rank counts, lock flags, modifiers) are not stored; they
//! are recomputed on restore. Dice state is not part of the snapshot.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::catalog::UnitCatalog;
use super::hex::{Direction, HexCoord};
use super::map::{BattleMap, PathSegment};
use super::state::{Battle, BattleError, MeleeLock};
use super::terrain::TerrainCell;
use super::unit::{Side, Unit, UnitId, RANKS};
use crate::config::BattleConfig;

/// One platoon as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: UnitId,
    pub type_name: String,
    pub side: Side,
    pub hex: HexCoord,
    pub facing: Direction,
    pub ap: i32,
    pub broken: bool,
    pub free_attempt: bool,
    pub rank_pop: [i32; RANKS],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub cells: Vec<TerrainCell>,
    pub rivers: Vec<PathSegment>,
    pub roads: Vec<PathSegment>,
    pub units: Vec<UnitRecord>,
    pub locks: Vec<MeleeLock>,
    pub turn: u32,
    pub turn_limit: u32,
    pub active: Side,
    pub score: [u32; 2],
    pub log: Vec<String>,
    pub next_id: u32,
    #[serde(default)]
    pub selected: Option<UnitId>,
}

impl BattleSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn invalid(reason: impl Into<String>) -> BattleError {
    BattleError::InvalidSnapshot(reason.into())
}

impl Battle {
    /// Captures the current state.
    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            cells: self.map.cells().to_vec(),
            rivers: self.map.rivers().to_vec(),
            roads: self.map.roads().to_vec(),
            units: self
                .units
                .iter()
                .map(|u| UnitRecord {
                    id: u.id,
                    type_name: u.name().to_string(),
                    side: u.side,
                    hex: u.hex,
                    facing: u.facing,
                    ap: u.ap,
                    broken: u.broken,
                    free_attempt: u.free_attempt,
                    rank_pop: u.rank_pop,
                })
                .collect(),
            locks: self.locks.clone(),
            turn: self.turn,
            turn_limit: self.config.turn_limit,
            active: self.active,
            score: self.score,
            log: self.log.iter().cloned().collect(),
            next_id: self.next_id,
            selected: self.selected,
        }
    }

    /// Rebuilds a battle from a snapshot. Unit types are resolved by name in
    /// `catalog`; the stored turn limit overrides the one in `config`.
    pub fn restore(
        snapshot: BattleSnapshot,
        catalog: &UnitCatalog,
        mut config: BattleConfig,
    ) -> Result<Battle, BattleError> {
        let map = BattleMap::from_parts(snapshot.cells, snapshot.rivers, snapshot.roads)
            .ok_or_else(|| invalid("terrain cells do not cover the map"))?;
        config.turn_limit = snapshot.turn_limit;
        let mut battle = Battle::new(map, config);

        let mut ids = HashSet::new();
        for record in snapshot.units {
            let unit_type = catalog
                .get(&record.type_name)
                .ok_or_else(|| BattleError::UnknownUnitType(record.type_name.clone()))?
                .clone();
            if !record.hex.is_on_map() {
                return Err(BattleError::OffMap(record.hex));
            }
            if battle.is_occupied(record.hex) {
                return Err(BattleError::HexOccupied(record.hex));
            }
            if record.id.0 >= snapshot.next_id || !ids.insert(record.id) {
                return Err(invalid(format!("bad unit id {}", record.id)));
            }
            if record.facing >= 6 {
                return Err(invalid(format!("bad facing {} for unit {}", record.facing, record.id)));
            }
            if record.rank_pop.iter().any(|&p| p < 0 || p > unit_type.columns) {
                return Err(invalid(format!("bad ranks for unit {}", record.id)));
            }

            let mut unit = Unit::new(record.id, unit_type, record.side, record.hex, record.facing);
            unit.ap = record.ap;
            unit.broken = record.broken;
            unit.free_attempt = record.free_attempt;
            unit.rank_pop = record.rank_pop;
            unit.recount();
            battle.units.push(unit);
        }

        for lock in snapshot.locks {
            let (a, b) = lock.members();
            let sides = (battle.require(a)?.side, battle.require(b)?.side);
            if sides.0 == sides.1 {
                return Err(BattleError::SameSideLock(a, b));
            }
            let lock = MeleeLock::new(a, b);
            if !battle.locks.contains(&lock) {
                battle.locks.push(lock);
            }
        }
        battle.refresh_lock_flags();
        let ids: Vec<UnitId> = battle.units.iter().map(|u| u.id).collect();
        for id in ids {
            battle.apply_modifiers(id);
        }

        battle.turn = snapshot.turn.max(1);
        battle.active = snapshot.active;
        battle.score = snapshot.score;
        battle.next_id = snapshot.next_id;
        battle.selected = snapshot.selected.filter(|&id| battle.contains(id));
        for line in snapshot.log {
            battle.message(line);
        }
        battle.events.clear();
        battle.finished = battle.evaluate_end();
        tracing::debug!(units = battle.units.len(), turn = battle.turn, "battle restored");
        Ok(battle)
    }
}
