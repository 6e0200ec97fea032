//! Line of sight.
//!
//! Two regimes, picked by the angle between the projected centers. A
//! horizontal line (0° or 180°) runs exactly along a hex spine, the seam
//! between two rows of hexes, and passes between a pair of flanking hexes at
//! every step; it is only blocked where both flanks block. Any other line is
//! traced between the projected hex centers and blocked by the first blocking
//! hex it crosses, ignoring the two end hexes.

use super::hex::{line, HexCoord};
use super::map::BattleMap;

/// Spine directions as `(net step, first move, second move)`. Walking a spine
/// repeats `first`, `second`, `first`: the two intermediate hexes flank the
/// spine and the third lands back on it.
/// Only the `(2, 1)` steps project to a horizontal line; the other diagonal
/// steps land at 45° multiples and are traced.
const SPINES: [((i32, i32), (i32, i32), (i32, i32)); 2] = [
    ((2, 1), (1, 1), (0, -1)),
    ((-2, -1), (-1, -1), (0, 1)),
];

/// The spine `from` -> `to` lies on, if any.
fn spine_between(from: HexCoord, to: HexCoord) -> Option<usize> {
    let (dx, dy) = (to.hx - from.hx, to.hy - from.hy);
    SPINES.iter().position(|&((sx, sy), _, _)| {
        let steps = dx / sx;
        steps > 0 && dx == sx * steps && dy == sy * steps
    })
}

/// Hexes crossed by the straight line between two projected centers, in
/// order and without repeats.
pub fn traced_hexes(from: HexCoord, to: HexCoord) -> Vec<HexCoord> {
    let (x1, y1) = from.center();
    let (x2, y2) = to.center();
    let mut hexes: Vec<HexCoord> = Vec::new();
    for (x, y) in line(x1, y1, x2, y2) {
        let hex = HexCoord::from_point(x, y);
        if !hexes.contains(&hex) {
            hexes.push(hex);
        }
    }
    hexes
}

fn spine_blocked(map: &BattleMap, from: HexCoord, to: HexCoord, spine: usize) -> bool {
    let (_, (ax, ay), (bx, by)) = SPINES[spine];
    let mut at = from;
    for _ in 0..from.distance(to) {
        let first = HexCoord::new(at.hx + ax, at.hy + ay);
        let second = HexCoord::new(first.hx + bx, first.hy + by);
        if map.blocks_sight(first) && map.blocks_sight(second) {
            return true;
        }
        at = HexCoord::new(second.hx + ax, second.hy + ay);
        if at == to {
            return false;
        }
        if map.blocks_sight(at) {
            return true;
        }
    }
    false
}

/// Returns true if terrain blocks sight between `from` and `to`.
pub fn sight_blocked(map: &BattleMap, from: HexCoord, to: HexCoord) -> bool {
    if from == to {
        return false;
    }
    if let Some(spine) = spine_between(from, to) {
        return spine_blocked(map, from, to, spine);
    }
    traced_hexes(from, to)
        .into_iter()
        .filter(|&h| h != from && h != to)
        .any(|h| map.blocks_sight(h))
}
