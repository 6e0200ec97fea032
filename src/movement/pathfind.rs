//! A* pathfinding over the battle map.
//!
//! Each hex enters the search at most once: the first time it is reached
//! fixes its cost and parent. The open set pops the lowest `f`, and among
//! equal `f` the node inserted first, so paths are reproducible.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::board::hex::HexCoord;
use crate::board::map::BattleMap;
use crate::board::state::{Battle, BattleError};
use crate::board::unit::UnitId;

/// Heuristic weight per hex of remaining distance.
const HEURISTIC_PER_HEX: i32 = 4;

/// A route excluding the start hex, with its total movement cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub hexes: Vec<HexCoord>,
    pub cost: i32,
}

struct Node {
    hex: HexCoord,
    g: i32,
    parent: Option<usize>,
}

/// Finds the cheapest-first route from `start` to `goal` avoiding `blocked`.
/// Returns `None` when the open set is exhausted.
pub fn find_path(
    map: &BattleMap,
    start: HexCoord,
    goal: HexCoord,
    blocked: &HashSet<HexCoord>,
) -> Option<Path> {
    let mut nodes = vec![Node {
        hex: start,
        g: 0,
        parent: None,
    }];
    let mut seen: HashMap<HexCoord, usize> = HashMap::from([(start, 0)]);
    let mut open = BinaryHeap::new();
    open.push(Reverse((start.distance(goal) * HEURISTIC_PER_HEX, 0usize)));

    while let Some(Reverse((_, index))) = open.pop() {
        if nodes[index].hex == goal {
            return Some(retrace(&nodes, index));
        }
        let (hex, g) = (nodes[index].hex, nodes[index].g);

        for next in hex.neighbors() {
            if blocked.contains(&next) || seen.contains_key(&next) {
                continue;
            }
            let Some(cost) = map.move_cost(next) else {
                continue;
            };
            let node_g = g + cost;
            let id = nodes.len();
            nodes.push(Node {
                hex: next,
                g: node_g,
                parent: Some(index),
            });
            seen.insert(next, id);
            open.push(Reverse((node_g + next.distance(goal) * HEURISTIC_PER_HEX, id)));
        }
    }
    None
}

fn retrace(nodes: &[Node], end: usize) -> Path {
    let mut hexes = Vec::new();
    let mut at = end;
    while let Some(parent) = nodes[at].parent {
        hexes.push(nodes[at].hex);
        at = parent;
    }
    hexes.reverse();
    Path {
        hexes,
        cost: nodes[end].g,
    }
}

impl Battle {
    /// Hexes a unit cannot path through: every enemy, and friends that are
    /// broken or melee locked.
    pub fn blocked_hexes(&self, id: UnitId) -> Result<HashSet<HexCoord>, BattleError> {
        let side = self.require(id)?.side;
        Ok(self
            .units
            .iter()
            .filter(|u| u.side != side || u.broken || u.melee_locked)
            .map(|u| u.hex)
            .collect())
    }

    /// Route for a unit to `goal`. The destination itself must be empty.
    pub fn path_for(&self, id: UnitId, goal: HexCoord) -> Result<Option<Path>, BattleError> {
        let start = self.require(id)?.hex;
        if self.is_occupied(goal) || !goal.is_on_map() {
            return Ok(None);
        }
        let blocked = self.blocked_hexes(id)?;
        let path = find_path(&self.map, start, goal, &blocked);
        tracing::debug!(unit = %id, %goal, cost = path.as_ref().map(|p| p.cost), "path search");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::state::tests::open_battle;
    use crate::board::terrain::TerrainKind;
    use crate::board::unit::tests::infantry;
    use crate::board::unit::Side;

    #[test]
    fn straight_line_on_open_ground() {
        let map = BattleMap::open();
        let path = find_path(&map, HexCoord::new(2, 2), HexCoord::new(2, 5), &HashSet::new()).unwrap();
        assert_eq!(
            path.hexes,
            vec![HexCoord::new(2, 3), HexCoord::new(2, 4), HexCoord::new(2, 5)]
        );
        assert_eq!(path.cost, 3);
    }

    #[test]
    fn cost_counts_entered_terrain() {
        let mut map = BattleMap::open();
        map.set_terrain(HexCoord::new(2, 3), TerrainKind::Forest);
        let mut blocked = HashSet::new();
        blocked.insert(HexCoord::new(1, 2));
        blocked.insert(HexCoord::new(3, 3));
        blocked.insert(HexCoord::new(1, 3));
        blocked.insert(HexCoord::new(3, 4));
        let path = find_path(&map, HexCoord::new(2, 2), HexCoord::new(2, 4), &blocked).unwrap();
        assert_eq!(path.hexes, vec![HexCoord::new(2, 3), HexCoord::new(2, 4)]);
        assert_eq!(path.cost, 3);
    }

    #[test]
    fn goes_around_blocked_hex() {
        let map = BattleMap::open();
        let mut blocked = HashSet::new();
        blocked.insert(HexCoord::new(2, 3));
        let path = find_path(&map, HexCoord::new(2, 2), HexCoord::new(2, 4), &blocked).unwrap();
        assert_eq!(path.hexes.len(), 3);
        assert_eq!(path.cost, 3);
        assert!(!path.hexes.contains(&HexCoord::new(2, 3)));
        assert_eq!(path.hexes.last(), Some(&HexCoord::new(2, 4)));
    }

    #[test]
    fn enclosed_goal_has_no_path() {
        let map = BattleMap::open();
        let goal = HexCoord::new(6, 6);
        let blocked: HashSet<HexCoord> = goal.neighbors().into_iter().collect();
        assert_eq!(find_path(&map, HexCoord::new(1, 1), goal, &blocked), None);
    }

    #[test]
    fn enemies_and_engaged_friends_block() {
        let mut battle = open_battle();
        let mover = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let friend = battle.spawn(infantry(), Side::First, HexCoord::new(5, 6), 0).unwrap();
        let enemy = battle.spawn(infantry(), Side::Second, HexCoord::new(8, 8), 3).unwrap();
        let broken = battle.spawn(infantry(), Side::First, HexCoord::new(2, 2), 0).unwrap();
        battle.unit_mut(broken).unwrap().broken = true;

        let blocked = battle.blocked_hexes(mover).unwrap();
        assert!(blocked.contains(&HexCoord::new(8, 8)));
        assert!(blocked.contains(&HexCoord::new(2, 2)));
        assert!(!blocked.contains(&HexCoord::new(5, 6)));

        battle.create_lock(friend, enemy).unwrap();
        let blocked = battle.blocked_hexes(mover).unwrap();
        assert!(blocked.contains(&HexCoord::new(5, 6)));
    }

    #[test]
    fn occupied_destination_has_no_path() {
        let mut battle = open_battle();
        let mover = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        battle.spawn(infantry(), Side::First, HexCoord::new(5, 7), 0).unwrap();
        assert_eq!(battle.path_for(mover, HexCoord::new(5, 7)).unwrap(), None);
        assert_eq!(battle.path_for(mover, HexCoord::new(5, 5)).unwrap(), None);
        let path = battle.path_for(mover, HexCoord::new(5, 8)).unwrap().unwrap();
        assert_eq!(path.cost, 3);
    }
}
