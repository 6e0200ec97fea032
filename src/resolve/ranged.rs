//! Ranged attacks.

use crate::board::sight::sight_blocked;
use crate::board::state::{Action, Battle, BattleError, Refusal};
use crate::board::unit::UnitId;
use crate::decision::Decider;

use super::combat::{AttackFlags, Outcome};

impl Battle {
    /// Fires on `target`. Needs range, a clear line of sight and 1 AP. A
    /// target engaged with someone else only takes half hits. There is never
    /// a counterattack.
    pub fn ranged_attack(
        &mut self,
        id: UnitId,
        target: UnitId,
        decider: &mut dyn Decider,
    ) -> Result<Action, BattleError> {
        let attacker = self.require(id)?;
        let (attacker_name, from, ranged, range, attacker_locked) = (
            attacker.name().to_string(),
            attacker.hex,
            attacker.ranged(),
            attacker.unit_type.range,
            attacker.melee_locked,
        );
        let defender = self.require(target)?;
        let (defender_name, to, defender_locked) =
            (defender.name().to_string(), defender.hex, defender.melee_locked);

        if ranged < 1 {
            return Ok(self.refuse(Refusal::NoRangedAttack));
        }
        let shared_lock = self.is_locked(id, target);
        if attacker_locked && !shared_lock {
            return Ok(self.refuse(Refusal::NotInMelee));
        }
        let distance = from.distance(to);
        if distance > range {
            return Ok(self.refuse(Refusal::OutOfRange(distance)));
        }
        let half = defender_locked && !shared_lock;
        if sight_blocked(&self.map, from, to) {
            return Ok(self.refuse(Refusal::SightBlocked));
        }
        let free_ap = self.config.free_ap;
        if !self.require_mut(id)?.spend_ap(1, free_ap) {
            return Ok(self.refuse(Refusal::AttackAp));
        }

        if half {
            self.message("Target in melee, hits halved.");
        }
        self.message(format!("{} does a ranged attack on {}", attacker_name, defender_name));
        self.face(id, to);

        let flags = AttackFlags {
            ranged: true,
            half,
            ..AttackFlags::default()
        };
        let outcome = self.roll_attack(id, target, flags)?;
        let hits = outcome.hits();
        if hits > 0 {
            self.apply_hits(target, hits);
            self.unit_check(target)?;
        }

        let still_steady = self.unit(target).is_some_and(|u| !u.broken);
        if still_steady && matches!(outcome, Outcome::HitsWithMoraleTest { .. }) {
            self.fall_back_test(target, id, false, decider)?;
        }
        Ok(Action::Performed)
    }
}
