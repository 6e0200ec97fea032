//! Hex coordinate geometry.
//!
//! Axial coordinates `(hx, hy)` on a parallelogram-shaped map of 13 columns by
//! 8 rows. Directions are numbered 0-5 clockwise starting from "up". Every
//! function here is pure.
//!
//! Some operations (facing toward distant hexes, line of sight) work in a
//! projected character-cell space where each hex center sits at
//! `(9 * hx + 7, 46 - 6 * hy + 3 * hx)`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of hex columns on the battle map.
pub const MAP_COLUMNS: i32 = 13;

/// Number of hexes in each map column.
pub const MAP_ROWS: i32 = 8;

/// Total number of hexes on the map.
pub const HEX_COUNT: usize = (MAP_COLUMNS * MAP_ROWS) as usize;

/// Coordinate delta for each of the six directions, clockwise from up.
pub const DIRECTION_OFFSETS: [(i32, i32); 6] = [(0, 1), (1, 1), (1, 0), (0, -1), (-1, -1), (-1, 0)];

/// A hex facing or neighbour direction in `0..6`.
pub type Direction = u8;

/// Rotates a direction by `delta` hexsides, wrapping modulo 6.
pub fn rotate(dir: Direction, delta: i32) -> Direction {
    (dir as i32 + delta).rem_euclid(6) as Direction
}

/// An axial hex coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexCoord {
    pub hx: i32,
    pub hy: i32,
}

impl HexCoord {
    pub const fn new(hx: i32, hy: i32) -> Self {
        HexCoord { hx, hy }
    }

    /// Returns the adjacent hex in the given direction. The result may be off the map.
    pub fn neighbor(self, dir: Direction) -> HexCoord {
        let (dx, dy) = DIRECTION_OFFSETS[dir as usize % 6];
        HexCoord::new(self.hx + dx, self.hy + dy)
    }

    /// Returns all six adjacent hexes in direction order.
    pub fn neighbors(self) -> [HexCoord; 6] {
        let mut out = [self; 6];
        for (dir, slot) in out.iter_mut().enumerate() {
            *slot = self.neighbor(dir as Direction);
        }
        out
    }

    /// Adjacent hexes that lie on the map.
    pub fn neighbors_on_map(self) -> impl Iterator<Item = HexCoord> {
        self.neighbors().into_iter().filter(|h| h.is_on_map())
    }

    /// Hex distance: `max(|dx|, |dy|, |dy - dx|)`.
    pub fn distance(self, other: HexCoord) -> i32 {
        let dx = other.hx - self.hx;
        let dy = other.hy - self.hy;
        dx.abs().max(dy.abs()).max((dy - dx).abs())
    }

    /// Returns the direction a unit at `self` must face to look at `other`.
    ///
    /// Adjacent hexes map exactly onto one of the six offsets. Distant hexes
    /// are bucketed by the projected angle into 60 degree sectors.
    pub fn direction_to(self, other: HexCoord) -> Direction {
        if self.distance(other) == 1 {
            let delta = (other.hx - self.hx, other.hy - self.hy);
            if let Some(dir) = DIRECTION_OFFSETS.iter().position(|&d| d == delta) {
                return dir as Direction;
            }
        }
        match projected_degrees(self, other) {
            0..=59 => 1,
            60..=119 => 0,
            120..=179 => 5,
            180..=239 => 4,
            240..=299 => 3,
            _ => 2,
        }
    }

    /// Parallelogram bound test for the battle map.
    pub fn is_on_map(self) -> bool {
        (0..MAP_COLUMNS).contains(&self.hx)
            && (0..MAP_ROWS).contains(&(self.hy - self.hx.div_euclid(2)))
    }

    /// Dense index of an on-map hex, column-major.
    pub fn map_index(self) -> Option<usize> {
        if !self.is_on_map() {
            return None;
        }
        let row = self.hy - self.hx.div_euclid(2);
        Some((self.hx * MAP_ROWS + row) as usize)
    }

    /// Inverse of [`HexCoord::map_index`].
    pub fn from_map_index(index: usize) -> HexCoord {
        let hx = index as i32 / MAP_ROWS;
        let row = index as i32 % MAP_ROWS;
        HexCoord::new(hx, row + hx.div_euclid(2))
    }

    /// Projected center of the hex.
    pub fn center(self) -> (i32, i32) {
        (9 * self.hx + 7, 46 - 6 * self.hy + 3 * self.hx)
    }

    /// Returns the hex whose projected cell block contains the point `(x, y)`.
    pub fn from_point(x: i32, y: i32) -> HexCoord {
        let hx = (x - 1).div_euclid(9);
        let hy = (48 + 3 * hx - y).div_euclid(6);
        HexCoord::new(hx, hy)
    }

    /// All hexes within `radius` of `self`, in map order.
    pub fn within(self, radius: i32) -> Vec<HexCoord> {
        all_hexes().filter(|h| self.distance(*h) <= radius).collect()
    }

    /// All hexes exactly `radius` away from `self`, in map order.
    pub fn ring(self, radius: i32) -> Vec<HexCoord> {
        all_hexes().filter(|h| self.distance(*h) == radius).collect()
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.hx, self.hy)
    }
}

/// Iterates every on-map hex in column-major order.
pub fn all_hexes() -> impl Iterator<Item = HexCoord> {
    (0..HEX_COUNT).map(HexCoord::from_map_index)
}

/// Angle from `a` to `b` in projected space, in whole degrees rounded up,
/// measured counter-clockwise from the positive x axis.
pub fn projected_degrees(a: HexCoord, b: HexCoord) -> i32 {
    let (x1, y1) = a.center();
    let (x2, y2) = b.center();
    let (dx, dy) = ((x2 - x1) as f64, (y2 - y1) as f64);
    let rads = (-dy).atan2(dx).rem_euclid(std::f64::consts::TAU);
    rads.to_degrees().ceil() as i32
}

/// Bresenham's line between two integer points, inclusive of both ends and
/// ordered from `(x1, y1)` to `(x2, y2)`.
pub fn line(x1: i32, y1: i32, x2: i32, y2: i32) -> Vec<(i32, i32)> {
    let (mut x1, mut y1, mut x2, mut y2) = (x1, y1, x2, y2);
    let steep = (y2 - y1).abs() > (x2 - x1).abs();
    if steep {
        std::mem::swap(&mut x1, &mut y1);
        std::mem::swap(&mut x2, &mut y2);
    }
    let reversed = x1 > x2;
    if reversed {
        std::mem::swap(&mut x1, &mut x2);
        std::mem::swap(&mut y1, &mut y2);
    }

    let dx = x2 - x1;
    let dy = (y2 - y1).abs();
    let ystep = if y1 < y2 { 1 } else { -1 };
    let mut error = dx / 2;
    let mut y = y1;

    let mut points = Vec::with_capacity(dx as usize + 1);
    for x in x1..=x2 {
        points.push(if steep { (y, x) } else { (x, y) });
        error -= dy;
        if error < 0 {
            y += ystep;
            error += dx;
        }
    }

    if reversed {
        points.reverse();
    }
    points
}
