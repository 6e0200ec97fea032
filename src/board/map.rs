//! Battle map and terrain generation.
//!
//! A [`BattleMap`] owns one [`TerrainCell`] per on-map hex, stored densely by
//! [`HexCoord::map_index`], plus the river and road segments used to lay the
//! linear features down. Two generators exist: a fixed scripted layout for
//! reproducible play and a random road network with an optional town.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::hex::{all_hexes, line, rotate, Direction, HexCoord, HEX_COUNT};
use super::terrain::{TerrainCell, TerrainKind};

/// Percent chance per step that a generated road turns.
const ROAD_TURN_CHANCE: u32 = 20;

/// Maximum number of turns a single generated road may take.
const ROAD_MAX_TURNS: u32 = 2;

/// Percent chance that a qualifying road junction becomes a town.
const TOWN_CHANCE: u32 = 60;

/// Map-edge hexes a first road may enter from.
const EDGE_HEXES: [HexCoord; 16] = [
    HexCoord::new(0, 0),
    HexCoord::new(0, 1),
    HexCoord::new(0, 2),
    HexCoord::new(0, 3),
    HexCoord::new(0, 4),
    HexCoord::new(0, 5),
    HexCoord::new(0, 6),
    HexCoord::new(0, 7),
    HexCoord::new(12, 6),
    HexCoord::new(12, 7),
    HexCoord::new(12, 8),
    HexCoord::new(12, 9),
    HexCoord::new(12, 10),
    HexCoord::new(12, 11),
    HexCoord::new(12, 12),
    HexCoord::new(12, 13),
];

const TOWN_NAMES: [&str; 8] = [
    "Fooberg", "Ashford", "Kettlebridge", "Marrowick", "Dunholt", "Greywater", "Oxley", "Stonemere",
];

/// Which linear feature a path segment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKind {
    River,
    Road,
}

/// A straight river or road segment between two hexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub from: HexCoord,
    pub to: HexCoord,
}

/// Selects the map generator used for a new battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    #[default]
    Scripted,
    Random,
}

impl MapKind {
    pub fn from_name(s: &str) -> Option<MapKind> {
        match s {
            "scripted" => Some(MapKind::Scripted),
            "random" => Some(MapKind::Random),
            _ => None,
        }
    }
}

/// The terrain of the whole battlefield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleMap {
    cells: Vec<TerrainCell>,
    rivers: Vec<PathSegment>,
    roads: Vec<PathSegment>,
}

impl BattleMap {
    /// A map covered entirely in open ground.
    pub fn open() -> Self {
        BattleMap {
            cells: all_hexes()
                .map(|h| TerrainCell::new(h, TerrainKind::OpenGround))
                .collect(),
            rivers: Vec::new(),
            roads: Vec::new(),
        }
    }

    /// Rebuilds a map from stored cells. Returns `None` unless the cells cover
    /// exactly the on-map hexes in map order.
    pub fn from_parts(
        cells: Vec<TerrainCell>,
        rivers: Vec<PathSegment>,
        roads: Vec<PathSegment>,
    ) -> Option<Self> {
        if cells.len() != HEX_COUNT {
            return None;
        }
        if cells
            .iter()
            .enumerate()
            .any(|(i, c)| c.hex.map_index() != Some(i))
        {
            return None;
        }
        Some(BattleMap { cells, rivers, roads })
    }

    /// Generates a map of the requested kind.
    pub fn generate(kind: MapKind, force_town: bool, rng: &mut impl Rng) -> Self {
        match kind {
            MapKind::Scripted => BattleMap::scripted(),
            MapKind::Random => BattleMap::random(force_town, rng),
        }
    }

    /// The fixed test layout: a town on a road junction, ruins, three forest
    /// groves, a river crossing the middle of the field and four roads.
    pub fn scripted() -> Self {
        let mut map = BattleMap::open();

        if let Some(town) = map.cell_mut(HexCoord::new(3, 4)) {
            town.kind = TerrainKind::Town;
            town.landmark = Some(TOWN_NAMES[0].to_string());
        }
        if let Some(ruins) = map.cell_mut(HexCoord::new(9, 8)) {
            ruins.kind = TerrainKind::Ruins;
        }

        for (hx, hy) in [(1, 3), (1, 4), (2, 4), (9, 10), (9, 9), (10, 9), (5, 7), (6, 7), (2, 2), (3, 2)] {
            map.set_terrain(HexCoord::new(hx, hy), TerrainKind::Forest);
        }

        map.add_path(HexCoord::new(12, 10), HexCoord::new(8, 6), PathKind::River);
        map.add_path(HexCoord::new(8, 6), HexCoord::new(2, 6), PathKind::River);
        map.add_path(HexCoord::new(2, 6), HexCoord::new(2, 8), PathKind::River);

        map.add_path(HexCoord::new(9, 4), HexCoord::new(3, 4), PathKind::Road);
        map.add_path(HexCoord::new(3, 4), HexCoord::new(3, 8), PathKind::Road);
        map.add_path(HexCoord::new(3, 4), HexCoord::new(0, 1), PathKind::Road);
        map.add_path(HexCoord::new(5, 4), HexCoord::new(9, 8), PathKind::Road);

        map.derive_all();
        map
    }

    /// Random layout: 0-3 roads (weighted toward fewer) and a town on the
    /// first qualifying junction.
    pub fn random(force_town: bool, rng: &mut impl Rng) -> Self {
        let mut map = BattleMap::open();

        let mut roads = rng.gen_range(0..=4u32);
        if roads > 0 {
            roads -= 1;
        }
        for _ in 0..roads {
            map.generate_road(rng);
        }
        map.generate_town(force_town, rng);

        map.derive_all();
        tracing::debug!(roads = map.roads.len(), "generated random map");
        map
    }

    pub fn cell(&self, hex: HexCoord) -> Option<&TerrainCell> {
        hex.map_index().map(|i| &self.cells[i])
    }

    fn cell_mut(&mut self, hex: HexCoord) -> Option<&mut TerrainCell> {
        match hex.map_index() {
            Some(i) => Some(&mut self.cells[i]),
            None => None,
        }
    }

    pub fn cells(&self) -> &[TerrainCell] {
        &self.cells
    }

    pub fn rivers(&self) -> &[PathSegment] {
        &self.rivers
    }

    pub fn roads(&self) -> &[PathSegment] {
        &self.roads
    }

    /// Movement cost to enter `hex`; `None` when off the map.
    pub fn move_cost(&self, hex: HexCoord) -> Option<i32> {
        self.cell(hex).map(|c| c.move_cost)
    }

    /// Terrain defense modifier of `hex`; zero when off the map.
    pub fn defense_mod(&self, hex: HexCoord) -> i32 {
        self.cell(hex).map_or(0, |c| c.defense_mod)
    }

    /// Whether terrain at `hex` blocks ranged sight. Off-map hexes never do.
    pub fn blocks_sight(&self, hex: HexCoord) -> bool {
        self.cell(hex).is_some_and(|c| c.kind.blocks_sight())
    }

    /// Replaces the terrain kind of one hex and re-derives its stats.
    pub fn set_terrain(&mut self, hex: HexCoord, kind: TerrainKind) {
        if let Some(cell) = self.cell_mut(hex) {
            cell.kind = kind;
            cell.derive_stats();
        }
    }

    /// Records a river or road segment and flags every hex on the line
    /// between its endpoints.
    pub fn add_path(&mut self, from: HexCoord, to: HexCoord, kind: PathKind) {
        let segment = PathSegment { from, to };
        match kind {
            PathKind::River => self.rivers.push(segment),
            PathKind::Road => self.roads.push(segment),
        }
        for (hx, hy) in line(from.hx, from.hy, to.hx, to.hy) {
            if let Some(cell) = self.cell_mut(HexCoord::new(hx, hy)) {
                match kind {
                    PathKind::River => cell.river = true,
                    PathKind::Road => cell.road = true,
                }
            }
        }
    }

    /// Derives movement and defense stats for every cell. Must run after all
    /// river and road flags are set.
    pub fn derive_all(&mut self) {
        for cell in &mut self.cells {
            cell.derive_stats();
        }
    }

    fn is_road(&self, hex: HexCoord) -> bool {
        self.cell(hex).is_some_and(|c| c.road)
    }

    /// Lays one road as a biased random walk. The first road enters from a
    /// map edge heading inward; later roads branch off an existing road hex.
    fn generate_road(&mut self, rng: &mut impl Rng) {
        let (start, mut dir) = if self.roads.is_empty() {
            let start = EDGE_HEXES[rng.gen_range(0..EDGE_HEXES.len())];
            (start, inward_direction(start))
        } else {
            let road_hexes: Vec<HexCoord> = self
                .cells
                .iter()
                .filter(|c| c.road)
                .map(|c| c.hex)
                .collect();
            let Some(&start) = road_hexes.choose(rng) else {
                return;
            };
            let mut dirs: Vec<Direction> = (0..6).collect();
            dirs.shuffle(rng);
            let branch = dirs.into_iter().find(|&d| {
                let next = start.neighbor(d);
                next.is_on_map() && !self.is_road(next)
            });
            match branch {
                Some(d) => (start, d),
                None => return,
            }
        };

        let mut segment_start = start;
        let mut current = start;
        let mut turns = 0;
        loop {
            if turns < ROAD_MAX_TURNS
                && current.hx != segment_start.hx
                && current.hy != segment_start.hy
                && rng.gen_range(1..=100) <= ROAD_TURN_CHANCE
            {
                turns += 1;
                self.add_path(segment_start, current, PathKind::Road);
                segment_start = current;
                dir = rotate(dir, if rng.gen_bool(0.5) { -1 } else { 1 });
            }

            let next = current.neighbor(dir);
            if !next.is_on_map() {
                self.add_path(segment_start, current, PathKind::Road);
                return;
            }
            current = next;
        }
    }

    /// Turns the first road hex with more than two adjacent road hexes into
    /// a named town, on a chance roll unless `force` is set.
    fn generate_town(&mut self, force: bool, rng: &mut impl Rng) {
        let candidates: Vec<HexCoord> = self
            .cells
            .iter()
            .filter(|c| c.road)
            .map(|c| c.hex)
            .collect();
        for hex in candidates {
            let adjacent_roads = hex.neighbors_on_map().filter(|n| self.is_road(*n)).count();
            if adjacent_roads <= 2 {
                continue;
            }
            if force || rng.gen_range(1..=100) <= TOWN_CHANCE {
                let name = TOWN_NAMES[rng.gen_range(0..TOWN_NAMES.len())];
                if let Some(cell) = self.cell_mut(hex) {
                    cell.kind = TerrainKind::Town;
                    cell.landmark = Some(name.to_string());
                }
                return;
            }
        }
    }
}

/// Heading toward the middle of the map from an edge hex.
fn inward_direction(edge: HexCoord) -> Direction {
    let row = edge.hy - edge.hx.div_euclid(2);
    let lower_half = row < 4;
    match (lower_half, edge.hx) {
        (true, 0..=3) => 1,
        (true, 4..=8) => 0,
        (true, _) => 5,
        (false, 0..=3) => 2,
        (false, 4..=8) => 3,
        (false, _) => 4,
    }
}
