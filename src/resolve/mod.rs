//! Attack and morale resolution.
//!
//! `combat` holds the pure attack resolver; `melee`, `ranged` and `morale`
//! apply its outcomes to the battle.

pub mod combat;
pub mod dice;
pub mod melee;
pub mod morale;
pub mod ranged;

pub use combat::{assemble, resolve, AttackFlags, Engagement, Outcome};
pub use dice::{Dice, Roll2d6};

use crate::board::hex::HexCoord;
use crate::board::state::{Action, Battle, BattleError, Refusal};
use crate::board::unit::UnitId;
use crate::decision::Decider;

impl Battle {
    /// Player attack intent on `hex`: melee when adjacent and able to fight
    /// hand to hand, ranged otherwise.
    pub fn initiate_attack(
        &mut self,
        id: UnitId,
        hex: HexCoord,
        decider: &mut dyn Decider,
    ) -> Result<Action, BattleError> {
        let attacker = self.require(id)?;
        if attacker.broken {
            let name = attacker.name().to_string();
            return Ok(self.refuse(Refusal::Broken(name)));
        }
        let (side, from, melee) = (attacker.side, attacker.hex, attacker.melee());
        let Some(target) = self.unit_at(hex) else {
            return Ok(self.refuse(Refusal::NoTarget));
        };
        if target.side == side {
            return Ok(self.refuse(Refusal::FriendlyTarget));
        }
        let target = target.id;

        if melee < 1 || from.distance(hex) > 1 {
            self.ranged_attack(id, target, decider)
        } else {
            self.melee_attack(id, target, decider)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::state::tests::open_battle;
    use crate::board::unit::tests::infantry;
    use crate::board::unit::Side;
    use crate::decision::Policy;

    #[test]
    fn attack_on_empty_or_friendly_hex() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        battle.spawn(infantry(), Side::First, HexCoord::new(5, 6), 0).unwrap();
        assert_eq!(
            battle.initiate_attack(a, HexCoord::new(6, 6), &mut Policy::Never).unwrap(),
            Action::Refused(Refusal::NoTarget)
        );
        assert_eq!(
            battle.initiate_attack(a, HexCoord::new(5, 6), &mut Policy::Never).unwrap(),
            Action::Refused(Refusal::FriendlyTarget)
        );
    }

    #[test]
    fn distant_target_needs_a_ranged_attack() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 2), 0).unwrap();
        battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        assert_eq!(
            battle.initiate_attack(a, HexCoord::new(5, 6), &mut Policy::Never).unwrap(),
            Action::Refused(Refusal::NoRangedAttack)
        );
    }

    #[test]
    fn adjacent_target_is_meleed() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        battle.dice.script(&[6, 6, 6, 6]);
        assert!(battle.initiate_attack(a, HexCoord::new(5, 6), &mut Policy::Never).unwrap().is_performed());
        assert!(battle.is_locked(a, b));
    }
}
