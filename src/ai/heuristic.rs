//! Scoring functions for the AI controller.
//!
//! All scores are plain integers; higher is better. Nothing here touches
//! battle state, so the controller can score every candidate before acting.

use crate::board::hex::HexCoord;
use crate::board::unit::Unit;

/// Weight per action point left over after an approach move.
pub const AP_LEFT_WEIGHT: i32 = 30;

/// Weight per point of terrain defense at the destination.
pub const COVER_WEIGHT: i32 = 20;

/// Proximity base: each enemy contributes this minus its distance.
pub const PROXIMITY_BASE: i32 = 40;

/// 100 times the attacker's attack value over the defender's effective
/// defense. Melee value is used when the attacker has one, ranged value
/// otherwise. A unit with no attack at all scores -1.
pub fn attack_score(attacker: &Unit, defender: &Unit) -> i32 {
    let base = if attacker.melee() > 0 {
        attacker.melee()
    } else if attacker.ranged() > 0 {
        attacker.ranged()
    } else {
        return -1;
    };
    let defense = defender.effective_defense().max(1);
    (base + attacker.attack_mod) * 100 / defense
}

/// Score for moving next to an enemy and attacking it: the attack score plus
/// a bonus for leftover AP and for cover at the destination.
pub fn approach_score(attack: i32, ap_left: i32, cover: i32) -> i32 {
    attack + AP_LEFT_WEIGHT * ap_left + COVER_WEIGHT * cover
}

/// Sum over enemies of `40 - distance`, halved (rounding down) for broken
/// enemies.
pub fn advance_score<'a>(hex: HexCoord, enemies: impl IntoIterator<Item = &'a Unit>) -> i32 {
    enemies
        .into_iter()
        .map(|enemy| {
            let proximity = PROXIMITY_BASE - hex.distance(enemy.hex);
            if enemy.broken {
                proximity / 2
            } else {
                proximity
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::unit::tests::infantry;
    use crate::board::unit::{Side, UnitId};
    use std::sync::Arc;

    fn unit(id: u32, hex: HexCoord) -> Unit {
        Unit::new(UnitId(id), infantry(), Side::Second, hex, 0)
    }

    #[test]
    fn attack_score_uses_effective_values() {
        let a = unit(1, HexCoord::new(0, 0));
        let mut d = unit(2, HexCoord::new(0, 1));
        assert_eq!(attack_score(&a, &d), 160);
        d.defense_mod = 2;
        assert_eq!(attack_score(&a, &d), 114);
    }

    #[test]
    fn no_attack_scores_negative() {
        let mut t = (*infantry()).clone();
        t.melee = 0;
        t.ranged = 0;
        let a = Unit::new(UnitId(1), Arc::new(t), Side::First, HexCoord::new(0, 0), 0);
        let d = unit(2, HexCoord::new(0, 1));
        assert_eq!(attack_score(&a, &d), -1);
    }

    #[test]
    fn broken_enemies_count_half() {
        let hex = HexCoord::new(5, 5);
        let mut near = unit(1, HexCoord::new(5, 7));
        let far = unit(2, HexCoord::new(10, 5));
        assert_eq!(advance_score(hex, [&near, &far]), 38 + 35);
        near.broken = true;
        assert_eq!(advance_score(hex, [&near, &far]), 19 + 35);
    }

    #[test]
    fn approach_rewards_ap_and_cover() {
        assert_eq!(approach_score(160, 2, 0), 220);
        assert_eq!(approach_score(160, 1, 2), 230);
    }
}
