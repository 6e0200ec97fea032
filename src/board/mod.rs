//! Board representation and battle-state types.
//!
//! Contains hex geometry, terrain and map generation, line of sight, unit
//! templates and platoons, the unit catalog, and the battle aggregate with
//! its persistence snapshot.

pub mod catalog;
pub mod hex;
pub mod map;
pub mod sight;
pub mod snapshot;
pub mod state;
pub mod terrain;
pub mod unit;

pub use catalog::{CatalogError, UnitCatalog};
pub use hex::{Direction, HexCoord, HEX_COUNT, MAP_COLUMNS, MAP_ROWS};
pub use map::{BattleMap, MapKind, PathKind, PathSegment};
pub use sight::sight_blocked;
pub use snapshot::{BattleSnapshot, UnitRecord};
pub use state::{
    Action, Battle, BattleError, BattleEvent, BattleOutcome, EventSink, MeleeLock, Refusal,
};
pub use terrain::{TerrainCell, TerrainKind};
pub use unit::{Abilities, Ability, Side, Unit, UnitClass, UnitId, UnitType, Weight};
