//! Melee attacks.
//!
//! A melee attack binds attacker and defender in a lock (if they were not
//! already), resolves one attack and at most one counterattack, checks both
//! units for casualties, then applies at most one follow-up: a forced fall
//! back for archers caught in melee, or the single pending morale test.

use crate::board::state::{Action, Battle, BattleError, Refusal};
use crate::board::unit::{Ability, UnitClass, UnitId};
use crate::decision::Decider;

use super::combat::{AttackFlags, Outcome};

impl Battle {
    /// Melee attack from `id` on the adjacent enemy `target`.
    pub fn melee_attack(
        &mut self,
        id: UnitId,
        target: UnitId,
        decider: &mut dyn Decider,
    ) -> Result<Action, BattleError> {
        let attacker = self.require(id)?;
        let (attacker_name, attacker_locked) = (attacker.name().to_string(), attacker.melee_locked);
        let charges = attacker.has(Ability::Charge);
        let polearms = attacker.has(Ability::Polearms);
        let defender = self.require(target)?;
        let (defender_name, defender_hex, defender_locked) =
            (defender.name().to_string(), defender.hex, defender.melee_locked);
        let defender_polearms = defender.has(Ability::Polearms);
        let defender_cavalry = defender.class() == UnitClass::Cavalry;

        let already_locked = self.is_locked(id, target);
        if attacker_locked && !already_locked {
            return Ok(self.refuse(Refusal::NotInMelee));
        }
        let free_ap = self.config.free_ap;
        if !self.require_mut(id)?.spend_ap(1, free_ap) {
            return Ok(self.refuse(Refusal::AttackAp));
        }

        let mut turn_to_face = false;
        let mut charge = false;
        if !already_locked {
            turn_to_face = !defender_locked;
            self.create_lock(id, target)?;

            if charges && self.map.defense_mod(defender_hex) <= 0 && !defender_polearms {
                self.message("Charge bonus!");
                charge = true;
            }
            if polearms && defender_cavalry {
                self.message("Polearm bonus!");
                charge = true;
            }
        }

        self.face(id, defender_hex);
        self.message(format!("{} attacks {}", attacker_name, defender_name));

        let flags = AttackFlags {
            charge,
            ..AttackFlags::default()
        };
        let outcome = self.roll_attack(id, target, flags)?;
        let hits = outcome.hits();
        self.apply_hits(target, hits);

        let mut own_hits = 0;
        let mut attacker_test = false;
        if outcome == Outcome::Counter {
            self.message(format!("{} counterattacks!", defender_name));
            let counter = AttackFlags {
                counter: true,
                ..AttackFlags::default()
            };
            let reply = self.roll_attack(target, id, counter)?;
            own_hits = reply.hits();
            attacker_test = matches!(reply, Outcome::HitsWithMoraleTest { .. });
            self.apply_hits(id, own_hits);
        }

        if hits > 0 {
            self.unit_check(target)?;
        }
        if own_hits > 0 {
            self.unit_check(id)?;
        }

        let Some(defender) = self.unit(target) else {
            return Ok(Action::Performed);
        };
        if defender.broken {
            return Ok(Action::Performed);
        }
        let defender_shoots = defender.ranged() > 0;
        let attacker_fights = self.unit(id).is_some_and(|u| u.melee() > 0);

        if hits > 0 && attacker_fights && defender_shoots {
            self.message(format!("{} must fall back.", defender_name));
            self.fall_back_test(target, id, true, decider)?;
        } else if matches!(outcome, Outcome::HitsWithMoraleTest { .. }) {
            self.fall_back_test(target, id, false, decider)?;
        } else if attacker_test && self.contains(id) {
            self.fall_back_test(id, target, false, decider)?;
        }

        if turn_to_face {
            if let (Some(a), Some(d)) = (self.unit(id), self.unit(target)) {
                if a.hex.distance(d.hex) == 1 {
                    let attacker_hex = a.hex;
                    self.face(target, attacker_hex);
                }
            }
        }
        Ok(Action::Performed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::hex::HexCoord;
    use crate::board::state::tests::open_battle;
    use crate::board::unit::tests::infantry;
    use crate::board::unit::{Abilities, Side, UnitType, Weight};
    use crate::decision::Policy;
    use std::sync::Arc;

    fn cavalry(abilities: Abilities) -> Arc<UnitType> {
        let mut t = (*infantry()).clone();
        t.name = "Test Cavalry".to_string();
        t.class = UnitClass::Cavalry;
        t.weight = Weight::Heavy;
        t.columns = 5;
        t.abilities = abilities;
        Arc::new(t)
    }

    #[test]
    fn attack_locks_and_applies_hits() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 0).unwrap();
        // attack 8 rolls 3, defense 5 rolls 9: (8-3)+(9-5)+1 = 10 hits
        battle.dice.script(&[1, 2, 4, 5, 1, 1]);
        let action = battle.melee_attack(a, b, &mut Policy::Never).unwrap();
        assert!(action.is_performed());
        assert!(battle.is_locked(a, b));
        assert_eq!(battle.unit(a).unwrap().ap, 2);
        let d = battle.unit(b).unwrap();
        assert_eq!(d.fighters, 11);
        assert_eq!(d.rank_pop, [7, 4, 0]);
        // the defender was unengaged, so it turns to face its attacker
        assert_eq!(d.facing, 3);
    }

    #[test]
    fn locked_attacker_must_target_its_partner() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        let c = battle.spawn(infantry(), Side::Second, HexCoord::new(6, 6), 3).unwrap();
        battle.create_lock(a, b).unwrap();
        let action = battle.melee_attack(a, c, &mut Policy::Never).unwrap();
        assert_eq!(action, Action::Refused(Refusal::NotInMelee));
        assert_eq!(battle.unit(a).unwrap().ap, 3);
    }

    #[test]
    fn attack_needs_ap() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        battle.unit_mut(a).unwrap().ap = 0;
        let action = battle.melee_attack(a, b, &mut Policy::Never).unwrap();
        assert_eq!(action, Action::Refused(Refusal::AttackAp));
        assert!(!battle.is_locked(a, b));
    }

    #[test]
    fn failed_attack_draws_counter() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        // attack fails (12 > 8), defense holds (3 <= 5): counter
        // counter: attack 8 rolls 4, defense 5 rolls 7: (8-4)+(7-5)+1 = 7
        battle.dice.script(&[6, 6, 1, 2, 2, 2, 3, 4]);
        battle.melee_attack(a, b, &mut Policy::Never).unwrap();
        assert_eq!(battle.unit(b).unwrap().fighters, 21);
        let attacker = battle.unit(a).unwrap();
        assert_eq!(attacker.rank_pop, [7, 7, 0]);
        assert_eq!(attacker.fighters, 14);
        assert_eq!(attacker.current_ranks, 2);
        assert_eq!(attacker.attack_mod, -1);
    }

    #[test]
    fn charge_bonus_on_open_ground() {
        let mut battle = open_battle();
        let charger = cavalry(Abilities::empty().with(Ability::Charge));
        let a = battle.spawn(charger, Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        // attack 8+2 = 10 rolls 10, defense 5 rolls 6: (10-10)+(6-5)+1 = 2
        battle.dice.script(&[5, 5, 2, 4]);
        battle.melee_attack(a, b, &mut Policy::Never).unwrap();
        assert!(battle.log().any(|l| l == "Charge bonus!"));
        assert_eq!(battle.unit(b).unwrap().fighters, 19);
    }

    #[test]
    fn polearms_deny_the_charge() {
        let mut battle = open_battle();
        let charger = cavalry(Abilities::empty().with(Ability::Charge));
        let mut pikes = (*infantry()).clone();
        pikes.abilities = Abilities::empty().with(Ability::Polearms);
        let a = battle.spawn(charger, Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(Arc::new(pikes), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        battle.dice.script(&[6, 6, 6, 6]);
        battle.melee_attack(a, b, &mut Policy::Never).unwrap();
        assert!(!battle.log().any(|l| l == "Charge bonus!"));
    }

    #[test]
    fn archers_hit_in_melee_fall_back() {
        let mut battle = open_battle();
        let mut archer = (*infantry()).clone();
        archer.name = "Test Archers".to_string();
        archer.melee = 0;
        archer.ranged = 7;
        archer.range = 5;
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(Arc::new(archer), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        // attack 8 rolls 7, defense 5 rolls 7: (8-7)+(7-5)+1 = 4 hits, no doubles
        battle.dice.script(&[3, 4, 3, 4]);
        battle.melee_attack(a, b, &mut Policy::Always).unwrap();

        let archers = battle.unit(b).unwrap();
        assert_eq!(archers.fighters, 17);
        assert_eq!(archers.ap, 0);
        assert_eq!(archers.hex.distance(HexCoord::new(5, 5)), 2);
        // pursuit accepted: the attacker follows and the lock is re-formed
        assert_eq!(battle.unit(a).unwrap().hex, HexCoord::new(5, 6));
        assert!(battle.is_locked(a, b));
    }
}
