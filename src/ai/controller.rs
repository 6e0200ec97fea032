//! Computer-controlled side.
//!
//! Each unit of the active side, in shuffled order, repeats an action cycle
//! until it reports that nothing more can be done, it breaks, it is
//! destroyed, or the per-unit cycle limit runs out.

use crate::board::hex::HexCoord;
use crate::board::sight::sight_blocked;
use crate::board::state::{Action, Battle, BattleError};
use crate::board::unit::UnitId;
use crate::decision::Decider;

use super::heuristic::{advance_score, approach_score, attack_score};

/// Result of one action cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The unit acted and may act again.
    Continue,
    /// Nothing further is possible this turn.
    Finished,
}

impl Battle {
    /// Picks the highest-scoring target, breaking ties uniformly at random.
    fn best_target(&mut self, id: UnitId, candidates: &[UnitId]) -> Result<Option<UnitId>, BattleError> {
        let attacker = self.require(id)?;
        let scored: Vec<(i32, UnitId)> = candidates
            .iter()
            .filter_map(|&t| self.unit(t).map(|d| (attack_score(attacker, d), t)))
            .collect();
        let Some(best) = scored.iter().map(|(s, _)| *s).max() else {
            return Ok(None);
        };
        let top: Vec<UnitId> = scored.into_iter().filter(|(s, _)| *s == best).map(|(_, t)| t).collect();
        Ok(self.dice.choose(&top).copied())
    }

    /// One action cycle for an AI-controlled unit.
    pub fn ai_step(&mut self, id: UnitId, decider: &mut dyn Decider) -> Result<Step, BattleError> {
        let unit = self.require(id)?;
        if unit.ap < 1 {
            return Ok(Step::Finished);
        }
        let (locked, melee, ranged) = (unit.melee_locked, unit.melee(), unit.ranged());

        if locked {
            let partners = self.lock_partners(id);
            if partners.is_empty() {
                return Err(BattleError::LockWithoutPartner(id));
            }
            let Some(target) = self.best_target(id, &partners)? else {
                return Ok(Step::Finished);
            };
            let hex = self.require(target)?.hex;
            let action = self.initiate_attack(id, hex, decider)?;
            return Ok(if action.is_performed() { Step::Continue } else { Step::Finished });
        }

        if melee > 0 {
            if let Some((dest, target)) = self.best_approach(id)? {
                if dest != self.require(id)?.hex {
                    if let Action::Refused(why) = self.move_path(id, dest, false)? {
                        tracing::debug!(unit = %id, %dest, reason = %why, "approach move refused");
                        return Ok(Step::Finished);
                    }
                }
                if self.require(id)?.ap > 0 && self.contains(target) {
                    if let Action::Refused(why) = self.melee_attack(id, target, decider)? {
                        tracing::debug!(unit = %id, %target, reason = %why, "approach attack refused");
                    }
                }
                return Ok(Step::Finished);
            }
        } else if ranged > 0 {
            if let Some(target) = self.best_shot(id)? {
                let action = self.ranged_attack(id, target, decider)?;
                if action.is_performed() {
                    return Ok(Step::Continue);
                }
            }
        }

        self.ai_advance(id)?;
        Ok(Step::Finished)
    }

    /// Best hex from which to attack an enemy this turn, paired with that
    /// enemy. The unit's own hex counts when it is already adjacent.
    fn best_approach(&mut self, id: UnitId) -> Result<Option<(HexCoord, UnitId)>, BattleError> {
        let (side, here, ap) = {
            let unit = self.require(id)?;
            (unit.side, unit.hex, unit.ap)
        };
        let mut scored: Vec<(i32, HexCoord, UnitId)> = Vec::new();

        for enemy in self.units.iter().filter(|u| u.side != side) {
            let attack = attack_score(self.require(id)?, enemy);
            for hex in enemy.hex.neighbors_on_map() {
                let cost = if hex == here {
                    0
                } else if self.is_occupied(hex) {
                    continue;
                } else {
                    match self.path_for(id, hex)? {
                        Some(path) => path.cost,
                        None => continue,
                    }
                };
                if cost > ap - 1 {
                    continue;
                }
                let score = approach_score(attack, ap - cost, self.map.defense_mod(hex));
                scored.push((score, hex, enemy.id));
            }
        }

        let Some(best) = scored.iter().map(|(s, _, _)| *s).max() else {
            return Ok(None);
        };
        let top: Vec<(HexCoord, UnitId)> = scored
            .into_iter()
            .filter(|(s, _, _)| *s == best)
            .map(|(_, h, t)| (h, t))
            .collect();
        Ok(self.dice.choose(&top).copied())
    }

    /// Best enemy within range and clear line of sight.
    fn best_shot(&mut self, id: UnitId) -> Result<Option<UnitId>, BattleError> {
        let unit = self.require(id)?;
        let (side, here, range) = (unit.side, unit.hex, unit.unit_type.range);
        let targets: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.side != side && here.distance(u.hex) <= range)
            .filter(|u| !sight_blocked(&self.map, here, u.hex))
            .map(|u| u.id)
            .collect();
        self.best_target(id, &targets)
    }

    /// Moves toward the enemy: scores every empty hex within AP range by
    /// proximity to enemies and walks to the best one it can afford.
    pub fn ai_advance(&mut self, id: UnitId) -> Result<bool, BattleError> {
        let (side, here, ap) = {
            let unit = self.require(id)?;
            (unit.side, unit.hex, unit.ap)
        };
        let mut scored: Vec<(i32, HexCoord)> = here
            .within(ap)
            .into_iter()
            .filter(|&h| !self.is_occupied(h))
            .map(|h| (advance_score(h, self.units.iter().filter(|u| u.side != side)), h))
            .collect();
        self.dice.shuffle(&mut scored);
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, dest) in scored {
            let affordable = self.path_for(id, dest)?.is_some_and(|p| p.cost <= ap);
            if affordable && self.move_path(id, dest, false)?.is_performed() {
                return Ok(true);
            }
        }
        tracing::debug!(unit = %id, "no reachable advance destination");
        Ok(false)
    }

    /// Runs the AI for every unit of the active side. Does not end the turn.
    pub fn run_side_turn(&mut self, decider: &mut dyn Decider) -> Result<(), BattleError> {
        let mut order = self.side_units(self.active);
        self.dice.shuffle(&mut order);
        let cycles = self.config.ai_cycles_per_unit;

        for id in order {
            self.selected = Some(id);
            for _ in 0..cycles {
                if self.is_over() {
                    return Ok(());
                }
                match self.unit(id) {
                    Some(u) if !u.broken => {}
                    _ => break,
                }
                if self.ai_step(id, decider)? == Step::Finished {
                    break;
                }
            }
        }
        self.selected = None;
        tracing::debug!(side = %self.active, "AI side turn complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::state::tests::open_battle;
    use crate::board::unit::tests::infantry;
    use crate::board::unit::{Side, UnitType};
    use crate::decision::Policy;
    use std::sync::Arc;

    fn archers() -> Arc<UnitType> {
        let mut t = (*infantry()).clone();
        t.name = "Test Archers".to_string();
        t.melee = 0;
        t.ranged = 7;
        t.range = 5;
        Arc::new(t)
    }

    #[test]
    fn idle_without_ap() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        battle.spawn(infantry(), Side::Second, HexCoord::new(5, 7), 3).unwrap();
        battle.unit_mut(a).unwrap().ap = 0;
        assert_eq!(battle.ai_step(a, &mut Policy::Ai).unwrap(), Step::Finished);
        assert_eq!(battle.unit(a).unwrap().hex, HexCoord::new(5, 5));
    }

    #[test]
    fn melee_unit_closes_and_attacks() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 4), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        battle.dice.script(&[6, 6, 6, 6]);
        let step = battle.ai_step(a, &mut Policy::Ai).unwrap();
        assert_eq!(step, Step::Finished);
        let unit = battle.unit(a).unwrap();
        assert_eq!(unit.hex.distance(HexCoord::new(5, 6)), 1);
        assert_eq!(unit.ap, 1);
        assert!(battle.is_locked(a, b));
    }

    #[test]
    fn approach_attack_ends_the_units_cycle() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 4), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        battle.dice.script(&[6, 6, 6, 6]);
        battle.run_side_turn(&mut Policy::Ai).unwrap();
        // one move and one attack, no second attack from the fresh lock
        assert_eq!(battle.unit(a).unwrap().ap, 1);
        assert!(battle.is_locked(a, b));
    }

    #[test]
    fn locked_unit_attacks_its_partner() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        battle.spawn(infantry(), Side::Second, HexCoord::new(4, 5), 3).unwrap();
        battle.create_lock(a, b).unwrap();
        battle.dice.script(&[6, 6, 6, 6]);
        assert_eq!(battle.ai_step(a, &mut Policy::Ai).unwrap(), Step::Continue);
        assert_eq!(battle.unit(a).unwrap().ap, 2);
        assert_eq!(battle.locks().len(), 1);
    }

    #[test]
    fn distant_melee_unit_advances() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(1, 1), 0).unwrap();
        battle.spawn(infantry(), Side::Second, HexCoord::new(11, 6), 3).unwrap();
        assert_eq!(battle.ai_step(a, &mut Policy::Ai).unwrap(), Step::Finished);
        let unit = battle.unit(a).unwrap();
        assert!(unit.hex.distance(HexCoord::new(11, 6)) < HexCoord::new(1, 1).distance(HexCoord::new(11, 6)));
    }

    #[test]
    fn archers_shoot_when_they_can() {
        let mut battle = open_battle();
        let a = battle.spawn(archers(), Side::First, HexCoord::new(5, 2), 0).unwrap();
        battle.spawn(infantry(), Side::Second, HexCoord::new(5, 5), 3).unwrap();
        battle.dice.script(&[6, 6, 6, 6]);
        assert_eq!(battle.ai_step(a, &mut Policy::Ai).unwrap(), Step::Continue);
        let unit = battle.unit(a).unwrap();
        assert_eq!(unit.hex, HexCoord::new(5, 2));
        assert_eq!(unit.ap, 2);
    }

    #[test]
    fn side_turn_leaves_state_consistent() {
        let mut battle = open_battle();
        for hx in 3..7 {
            battle.spawn(infantry(), Side::First, HexCoord::new(hx, 3), 0).unwrap();
            battle.spawn(infantry(), Side::Second, HexCoord::new(hx, 7), 3).unwrap();
        }
        battle.run_side_turn(&mut Policy::Ai).unwrap();
        battle.validate_locks().unwrap();
        for unit in battle.units() {
            assert_eq!(unit.fighters, unit.rank_pop.iter().sum::<i32>());
            assert!(unit.effective_defense() >= 2);
        }
    }
}
