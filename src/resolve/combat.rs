//! Combat resolution.
//!
//! An attack is resolved in two steps. [`assemble`] turns the two platoons
//! and the attack flags into an [`Engagement`]: final attack and defense
//! values plus whether a counterattack is possible at all. [`resolve`] then
//! compares one attack roll and one defense roll against those values and
//! yields a tagged [`Outcome`]. `resolve` is pure, so any pair of rolls can
//! be checked directly.

use crate::board::state::{Battle, BattleError};
use crate::board::unit::{Ability, Unit, UnitId};

use super::dice::Roll2d6;

/// Highest attack value after all modifiers.
pub const MAX_ATTACK: i32 = 11;

/// Ranged attacks lose one point per hex beyond this distance.
pub const FULL_STRENGTH_RANGE: i32 = 2;

/// Bonus for a charge or a polearm first strike.
pub const CHARGE_BONUS: i32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttackFlags {
    pub ranged: bool,
    /// This attack is itself a counterattack.
    pub counter: bool,
    /// Interference: hits are halved, rounding up, minimum one.
    pub half: bool,
    pub charge: bool,
}

/// Final values for one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    pub attack_value: i32,
    pub defense_value: i32,
    /// A failed attack against a successful defense triggers a counter.
    pub counter_allowed: bool,
    pub defender_broken: bool,
    pub half: bool,
    /// Points lost to range.
    pub range_penalty: i32,
    pub shield_bonus: bool,
}

/// What an attack achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoEffect,
    Hits { n: i32 },
    /// The defender strikes back.
    Counter,
    /// Hits, and the defender must test morale or fall back.
    HitsWithMoraleTest { n: i32 },
}

impl Outcome {
    pub fn hits(self) -> i32 {
        match self {
            Outcome::Hits { n } | Outcome::HitsWithMoraleTest { n } => n,
            Outcome::NoEffect | Outcome::Counter => 0,
        }
    }
}

/// Builds the attack and defense values for `attacker` striking `defender`.
pub fn assemble(attacker: &Unit, defender: &Unit, flags: AttackFlags) -> Engagement {
    let mut range_penalty = 0;
    let mut attack_value = if flags.ranged {
        range_penalty = (attacker.hex.distance(defender.hex) - FULL_STRENGTH_RANGE).max(0);
        attacker.ranged() + attacker.attack_mod - range_penalty
    } else {
        let bonus = if flags.charge { CHARGE_BONUS } else { 0 };
        attacker.melee() + attacker.attack_mod + bonus
    };
    attack_value = attack_value.min(MAX_ATTACK);

    let mut defense_value = defender.effective_defense();
    let shield_bonus = defender.has(Ability::Shields) && defender.is_in_front(attacker.hex);
    if shield_bonus {
        defense_value += 1;
    }

    let counter_allowed = !flags.ranged
        && !flags.counter
        && defender.melee() > 0
        && !defender.broken
        && defender.is_in_front(attacker.hex);

    Engagement {
        attack_value,
        defense_value,
        counter_allowed,
        defender_broken: defender.broken,
        half: flags.half,
        range_penalty,
        shield_bonus,
    }
}

fn halve(hits: i32, half: bool) -> i32 {
    if half {
        ((hits + 1) / 2).max(1)
    } else {
        hits
    }
}

/// Compares the rolls against the engagement values.
pub fn resolve(e: &Engagement, attack: Roll2d6, defense: Roll2d6) -> Outcome {
    let attack_roll = attack.total();
    let defense_roll = defense.total();
    let attack_ok = attack_roll <= e.attack_value;
    let defense_ok = defense_roll <= e.defense_value;

    match (attack_ok, defense_ok) {
        (false, false) => Outcome::NoEffect,
        (false, true) => {
            if e.counter_allowed {
                Outcome::Counter
            } else {
                Outcome::NoEffect
            }
        }
        (true, false) => {
            let hits = halve((e.attack_value - attack_roll) + (defense_roll - e.defense_value) + 1, e.half);
            if defense.doubles() && !e.defender_broken {
                Outcome::HitsWithMoraleTest { n: hits }
            } else {
                Outcome::Hits { n: hits }
            }
        }
        (true, true) => {
            let margin = (e.attack_value - attack_roll) - (e.defense_value - defense_roll);
            if margin > 0 {
                Outcome::Hits {
                    n: halve(margin, e.half),
                }
            } else {
                Outcome::NoEffect
            }
        }
    }
}

impl Battle {
    /// Assembles, rolls and resolves one attack. Exactly one pair of dice is
    /// rolled for each side. Nothing is applied to either unit.
    pub fn roll_attack(
        &mut self,
        attacker: UnitId,
        defender: UnitId,
        flags: AttackFlags,
    ) -> Result<Outcome, BattleError> {
        let engagement = assemble(self.require(attacker)?, self.require(defender)?, flags);
        if engagement.range_penalty > 0 {
            self.message(format!(
                "Ranged attack value at -{} for range.",
                engagement.range_penalty
            ));
        }
        if engagement.shield_bonus {
            self.message("Shield bonus!");
        }

        let attack = self.dice.roll_2d6();
        let defense = self.dice.roll_2d6();
        let outcome = resolve(&engagement, attack, defense);
        tracing::debug!(
            %attacker,
            %defender,
            attack_value = engagement.attack_value,
            defense_value = engagement.defense_value,
            attack_roll = attack.total(),
            defense_roll = defense.total(),
            ?outcome,
            "attack resolved"
        );

        self.message(format!(
            "Attack {} rolls {}, defense {} rolls {}: {}",
            engagement.attack_value,
            attack.total(),
            engagement.defense_value,
            defense.total(),
            describe(outcome)
        ));
        Ok(outcome)
    }
}

fn describe(outcome: Outcome) -> String {
    match outcome {
        Outcome::NoEffect => "No Effect".to_string(),
        Outcome::Counter => "Counterattack!".to_string(),
        Outcome::Hits { n } | Outcome::HitsWithMoraleTest { n } => format!("{} Hits", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::hex::HexCoord;
    use crate::board::unit::tests::infantry;
    use crate::board::unit::{Abilities, Side, UnitType};
    use std::sync::Arc;

    fn engagement(attack_value: i32, defense_value: i32) -> Engagement {
        Engagement {
            attack_value,
            defense_value,
            counter_allowed: true,
            defender_broken: false,
            half: false,
            range_penalty: 0,
            shield_bonus: false,
        }
    }

    fn unit_at(id: u32, unit_type: Arc<UnitType>, side: Side, hex: HexCoord, facing: u8) -> Unit {
        Unit::new(UnitId(id), unit_type, side, hex, facing)
    }

    #[test]
    fn attack_succeeds_defense_fails() {
        let outcome = resolve(&engagement(8, 6), Roll2d6(2, 3), Roll2d6(4, 5));
        assert_eq!(outcome, Outcome::Hits { n: 7 });
    }

    #[test]
    fn both_fail_is_no_effect() {
        let outcome = resolve(&engagement(5, 5), Roll2d6(4, 5), Roll2d6(4, 6));
        assert_eq!(outcome, Outcome::NoEffect);
    }

    #[test]
    fn failed_attack_against_good_defense_counters() {
        let e = engagement(5, 6);
        assert_eq!(resolve(&e, Roll2d6(6, 6), Roll2d6(1, 2)), Outcome::Counter);

        let e = Engagement {
            counter_allowed: false,
            ..e
        };
        assert_eq!(resolve(&e, Roll2d6(6, 6), Roll2d6(1, 2)), Outcome::NoEffect);
    }

    #[test]
    fn doubles_on_failed_defense_force_morale_test() {
        let e = engagement(8, 5);
        assert_eq!(
            resolve(&e, Roll2d6(3, 3), Roll2d6(4, 4)),
            Outcome::HitsWithMoraleTest { n: 6 }
        );

        let broken = Engagement {
            defender_broken: true,
            ..e
        };
        assert_eq!(resolve(&broken, Roll2d6(3, 3), Roll2d6(4, 4)), Outcome::Hits { n: 6 });
    }

    #[test]
    fn both_succeed_compares_margins() {
        let e = engagement(9, 6);
        // attack margin 5, defense margin 2
        assert_eq!(resolve(&e, Roll2d6(2, 2), Roll2d6(2, 2)), Outcome::Hits { n: 3 });
        // attack margin 1, defense margin 3
        assert_eq!(resolve(&e, Roll2d6(4, 4), Roll2d6(1, 2)), Outcome::NoEffect);
    }

    #[test]
    fn half_hits_round_up_with_minimum_one() {
        let e = Engagement {
            half: true,
            ..engagement(8, 6)
        };
        assert_eq!(resolve(&e, Roll2d6(2, 3), Roll2d6(4, 5)), Outcome::Hits { n: 4 });
        let e = Engagement {
            half: true,
            ..engagement(9, 6)
        };
        // margin 1 halves to 1
        assert_eq!(resolve(&e, Roll2d6(3, 4), Roll2d6(2, 3)), Outcome::Hits { n: 1 });
    }

    #[test]
    fn assemble_caps_attack_and_adds_charge() {
        let mut strong = (*infantry()).clone();
        strong.melee = 10;
        let a = unit_at(1, Arc::new(strong), Side::First, HexCoord::new(5, 5), 0);
        let d = unit_at(2, infantry(), Side::Second, HexCoord::new(5, 6), 3);
        let flags = AttackFlags {
            charge: true,
            ..AttackFlags::default()
        };
        let e = assemble(&a, &d, flags);
        assert_eq!(e.attack_value, MAX_ATTACK);
        assert_eq!(e.defense_value, 5);
        assert!(e.counter_allowed);
    }

    #[test]
    fn assemble_ranged_penalty_and_no_counter() {
        let mut archer = (*infantry()).clone();
        archer.melee = 0;
        archer.ranged = 7;
        archer.range = 5;
        let a = unit_at(1, Arc::new(archer), Side::First, HexCoord::new(5, 2), 0);
        let d = unit_at(2, infantry(), Side::Second, HexCoord::new(5, 6), 3);
        let flags = AttackFlags {
            ranged: true,
            ..AttackFlags::default()
        };
        let e = assemble(&a, &d, flags);
        assert_eq!(e.range_penalty, 2);
        assert_eq!(e.attack_value, 5);
        assert!(!e.counter_allowed);
    }

    #[test]
    fn shields_only_help_to_the_front() {
        let mut shielded = (*infantry()).clone();
        shielded.abilities = Abilities::empty().with(Ability::Shields);
        let shielded = Arc::new(shielded);
        let a = unit_at(1, infantry(), Side::First, HexCoord::new(5, 5), 0);

        let facing_attacker = unit_at(2, shielded.clone(), Side::Second, HexCoord::new(5, 6), 3);
        let e = assemble(&a, &facing_attacker, AttackFlags::default());
        assert_eq!(e.defense_value, 6);
        assert!(e.shield_bonus);

        let facing_away = unit_at(3, shielded, Side::Second, HexCoord::new(5, 6), 0);
        let e = assemble(&a, &facing_away, AttackFlags::default());
        assert_eq!(e.defense_value, 5);
        assert!(!e.counter_allowed);
    }
}
