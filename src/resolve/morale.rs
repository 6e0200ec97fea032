//! Casualty checks, morale tests and breaking free of melee.

use crate::board::state::{Action, Battle, BattleError, Refusal};
use crate::board::unit::{Side, UnitClass, UnitId};
use crate::decision::{Decider, Prompt};

impl Battle {
    /// Post-damage bookkeeping: recounts fighters, destroys an empty unit,
    /// refreshes modifiers and calls for a break test at half strength.
    pub fn unit_check(&mut self, id: UnitId) -> Result<(), BattleError> {
        let unit = self.require_mut(id)?;
        unit.recount();
        if unit.fighters < 1 {
            self.destroy(id);
            return Ok(());
        }
        self.apply_modifiers(id);
        if self.require(id)?.at_half_strength() {
            self.break_test(id)?;
        }
        Ok(())
    }

    /// 2d6 against morale. A steady unit that fails breaks and retreats; a
    /// unit that was already broken is destroyed.
    pub fn break_test(&mut self, id: UnitId) -> Result<(), BattleError> {
        let (name, morale, broken) = {
            let unit = self.require(id)?;
            (unit.name().to_string(), unit.unit_type.morale, unit.broken)
        };
        let roll = self.dice.roll_2d6();
        if roll.total() <= morale {
            self.message(format!("{} passes its Morale test.", name));
            return Ok(());
        }

        self.break_locks(id);
        if broken {
            self.message(format!("{} fails its Morale test and routs.", name));
            self.destroy(id);
            return Ok(());
        }
        self.message(format!("{} fails its Morale test and breaks!", name));
        self.require_mut(id)?.broken = true;
        tracing::info!(unit = %id, name = %name, "unit broken");
        self.retreat_move(id)?;
        Ok(())
    }

    /// Morale test forcing `id` back one hex away from `threat`. With `auto`
    /// the unit falls back without rolling.
    ///
    /// A unit that falls back loses its remaining action points. When the
    /// threat was adjacent and is not held by another lock, its side may
    /// pursue into the vacated hex and renew the lock.
    pub fn fall_back_test(
        &mut self,
        id: UnitId,
        threat: UnitId,
        auto: bool,
        decider: &mut dyn Decider,
    ) -> Result<(), BattleError> {
        let (name, hex, side, morale) = {
            let unit = self.require(id)?;
            (unit.name().to_string(), unit.hex, unit.side, unit.unit_type.morale)
        };
        let (threat_name, threat_hex, threat_side) = {
            let t = self.require(threat)?;
            (t.name().to_string(), t.hex, t.side)
        };

        if !auto {
            let roll = self.dice.roll_2d6();
            if roll.total() <= morale {
                self.message(format!("{} passes its Morale test.", name));
                return Ok(());
            }
            self.message(format!("{} fails its Morale test.", name));
        }

        let candidates: Vec<_> = self
            .require(id)?
            .rear_hexes(hex.direction_to(threat_hex))
            .into_iter()
            .filter(|&h| !self.is_occupied(h))
            .collect();
        if candidates.is_empty() {
            self.message(format!("{} cannot fall back.", name));
            return Ok(());
        }

        self.break_locks(id);
        let can_pursue = hex.distance(threat_hex) == 1 && !self.require(threat)?.melee_locked;
        let Some(dest) = self.friendliest_hex(&candidates, side) else {
            return Ok(());
        };
        self.relocate(id, dest);
        self.require_mut(id)?.ap = 0;
        self.message(format!("{} falls back.", name));

        if can_pursue && decider.confirm(threat_side, &Prompt::Pursue { pursuer: threat, target: id }) {
            self.relocate(threat, hex);
            self.face(threat, dest);
            self.create_lock(id, threat)?;
            self.message(format!("{} pursues.", threat_name));
        }
        Ok(())
    }

    /// One attempt per turn, as the unit's first action, to disengage from
    /// melee. Costs 1 AP. Cavalry held only by infantry always succeeds;
    /// otherwise 2d6 must not exceed skill minus the number of locks.
    pub fn free_attempt(&mut self, id: UnitId) -> Result<Action, BattleError> {
        let unit = self.require(id)?;
        let name = unit.name().to_string();
        if unit.broken {
            return Ok(self.refuse(Refusal::Broken(name)));
        }
        if unit.free_attempt {
            return Ok(self.refuse(Refusal::AlreadyAttempted(name)));
        }
        if !unit.melee_locked {
            return Ok(self.refuse(Refusal::NotLocked(name)));
        }
        if unit.ap < unit.max_ap() {
            return Ok(self.refuse(Refusal::NotFirstAction));
        }
        let (class, skill) = (unit.class(), unit.unit_type.skill);
        let free_ap = self.config.free_ap;
        if !self.require_mut(id)?.spend_ap(1, free_ap) {
            return Ok(self.refuse(Refusal::FreeAttemptAp));
        }
        self.require_mut(id)?.free_attempt = true;

        let partners = self.lock_partners(id);
        let infantry_only = partners
            .iter()
            .all(|&p| self.unit(p).is_some_and(|u| u.class() == UnitClass::Infantry));
        if class == UnitClass::Cavalry && infantry_only {
            self.break_locks(id);
            self.message(format!("{} breaks out of melee combat.", name));
            return Ok(Action::Performed);
        }

        let target = skill - partners.len() as i32;
        let roll = self.dice.roll_2d6();
        self.message(format!("Skill roll is {},{} (needs {} or less)", roll.0, roll.1, target));
        if roll.total() > target {
            self.message("Skill roll unsuccessful, unit remains in melee.");
        } else {
            self.message("Skill roll successful, unit is free to move.");
            self.break_locks(id);
        }
        Ok(Action::Performed)
    }

    /// Start-of-turn recovery for `side`: broken units next to an unbroken
    /// enemy retreat; the rest roll 2d6 against morale to rally.
    pub(crate) fn recover_broken(&mut self, side: Side) {
        let broken: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.side == side && u.broken)
            .map(|u| u.id)
            .collect();

        for id in broken {
            if !self.contains(id) {
                continue;
            }
            match self.retreat_move(id) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(unit = %id, error = %err, "retreat failed");
                    continue;
                }
            }
            let Some(unit) = self.unit(id) else {
                continue;
            };
            let (name, morale) = (unit.name().to_string(), unit.unit_type.morale);
            let roll = self.dice.roll_2d6();
            if roll.total() <= morale {
                if let Some(unit) = self.unit_mut(id) {
                    unit.broken = false;
                }
                self.message(format!("{} has recovered from being broken.", name));
            } else {
                self.message(format!("{} remains broken.", name));
            }
        }
    }
}
