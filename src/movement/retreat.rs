//! Involuntary movement: friendliest-hex choice and broken-unit retreat.

use crate::board::hex::HexCoord;
use crate::board::state::{Action, Battle, BattleError};
use crate::board::unit::{Side, UnitId};

/// Furthest a broken unit will look for a safe hex.
pub const RETREAT_RADIUS: i32 = 5;

impl Battle {
    /// Adjacent friends minus adjacent enemies around `hex`, for `side`.
    pub fn friendliness(&self, hex: HexCoord, side: Side) -> i32 {
        hex.neighbors()
            .into_iter()
            .filter_map(|n| self.unit_at(n))
            .map(|u| if u.side == side { 1 } else { -1 })
            .sum()
    }

    /// Picks uniformly among the highest-scoring candidates by
    /// [`Battle::friendliness`].
    pub fn friendliest_hex(&mut self, candidates: &[HexCoord], side: Side) -> Option<HexCoord> {
        let scored: Vec<(i32, HexCoord)> = candidates
            .iter()
            .map(|&h| (self.friendliness(h, side), h))
            .collect();
        let best = scored.iter().map(|(s, _)| *s).max()?;
        let top: Vec<HexCoord> = scored
            .into_iter()
            .filter(|(s, _)| *s == best)
            .map(|(_, h)| h)
            .collect();
        self.dice.choose(&top).copied()
    }

    fn has_unbroken_enemy_adjacent(&self, hex: HexCoord, side: Side) -> bool {
        !self.adjacent_enemies(hex, side, true).is_empty()
    }

    /// Moves a broken unit away from unbroken enemies.
    ///
    /// Does nothing and returns `false` when no unbroken enemy is adjacent.
    /// Otherwise searches rings of increasing radius for empty hexes with no
    /// unbroken enemy next to them and walks to the friendliest reachable
    /// one for free. A unit with nowhere to go is destroyed. Returns `true`
    /// whenever a retreat was required.
    pub fn retreat_move(&mut self, id: UnitId) -> Result<bool, BattleError> {
        let (hex, side, name) = {
            let unit = self.require(id)?;
            (unit.hex, unit.side, unit.name().to_string())
        };
        if !self.has_unbroken_enemy_adjacent(hex, side) {
            return Ok(false);
        }
        self.break_locks(id);

        for radius in 1..=RETREAT_RADIUS {
            let mut candidates: Vec<HexCoord> = hex
                .ring(radius)
                .into_iter()
                .filter(|&h| !self.is_occupied(h) && !self.has_unbroken_enemy_adjacent(h, side))
                .collect();

            while let Some(dest) = self.friendliest_hex(&candidates, side) {
                if self.path_for(id, dest)?.is_some() {
                    match self.move_path(id, dest, true)? {
                        Action::Performed => {
                            self.message(format!("{} retreats.", name));
                            return Ok(true);
                        }
                        Action::Refused(why) => {
                            tracing::debug!(unit = %id, %dest, reason = %why, "retreat move refused");
                        }
                    }
                }
                candidates.retain(|&h| h != dest);
            }
        }

        self.message(format!("{} cannot retreat.", name));
        self.destroy(id);
        Ok(true)
    }
}
