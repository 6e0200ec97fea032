//! Unit movement.
//!
//! Voluntary movement (pivoting, stepping forward, swapping places with a
//! friend, walking a path) plus the pathfinder and the involuntary retreat
//! rules it shares with morale resolution.

pub mod pathfind;
pub mod retreat;

pub use pathfind::{find_path, Path};

use crate::board::hex::HexCoord;
use crate::board::state::{Action, Battle, BattleError, BattleEvent, Refusal};
use crate::board::unit::UnitId;
use crate::decision::{Decider, Prompt};

impl Battle {
    /// Refuses movement for broken or melee-locked units.
    fn movement_refusal(&self, id: UnitId) -> Result<Option<Refusal>, BattleError> {
        let unit = self.require(id)?;
        if unit.broken {
            return Ok(Some(Refusal::Broken(unit.name().to_string())));
        }
        if unit.melee_locked {
            return Ok(Some(Refusal::MeleeLocked(unit.name().to_string())));
        }
        Ok(None)
    }

    /// Pivots a unit in place by `delta` hexsides.
    pub fn rotate(&mut self, id: UnitId, delta: i32) -> Result<Action, BattleError> {
        if let Some(refusal) = self.movement_refusal(id)? {
            return Ok(self.refuse(refusal));
        }
        let unit = self.require_mut(id)?;
        unit.turn(delta);
        let facing = unit.facing;
        self.events.push(BattleEvent::UnitFaced { id, facing });
        Ok(Action::Performed)
    }

    /// Steps one hex in the facing direction. A friendly unit in the way is
    /// offered a position swap.
    pub fn move_forward(&mut self, id: UnitId, decider: &mut dyn Decider) -> Result<Action, BattleError> {
        if let Some(refusal) = self.movement_refusal(id)? {
            return Ok(self.refuse(refusal));
        }
        let unit = self.require(id)?;
        let side = unit.side;
        let dest = unit.hex.neighbor(unit.facing);
        let Some(cost) = self.map.move_cost(dest) else {
            return Ok(self.refuse(Refusal::OffMap));
        };

        if let Some(other) = self.unit_at(dest) {
            if other.side == side {
                let partner = other.id;
                return self.swap(id, partner, decider);
            }
            return Ok(self.refuse(Refusal::EnemyInHex));
        }

        let free_ap = self.config.free_ap;
        if !self.require_mut(id)?.spend_ap(cost, free_ap) {
            return Ok(self.refuse(Refusal::MoveAp(cost)));
        }
        self.relocate(id, dest);
        Ok(Action::Performed)
    }

    /// Trades hexes with a friendly unit. Both must be free to move, both
    /// must afford entering the other's hex, and the owning side must confirm.
    pub fn swap(
        &mut self,
        id: UnitId,
        partner: UnitId,
        decider: &mut dyn Decider,
    ) -> Result<Action, BattleError> {
        let (side, here, ap) = {
            let unit = self.require(id)?;
            (unit.side, unit.hex, unit.ap)
        };
        let other = self.require(partner)?;
        let (there, partner_ap, partner_broken, partner_locked) =
            (other.hex, other.ap, other.broken, other.melee_locked);
        if partner_broken {
            return Ok(self.refuse(Refusal::PartnerBroken));
        }
        if partner_locked {
            return Ok(self.refuse(Refusal::PartnerInMelee));
        }

        let cost_in = self.map.move_cost(there).ok_or(BattleError::OffMap(there))?;
        let cost_out = self.map.move_cost(here).ok_or(BattleError::OffMap(here))?;
        if ap < cost_in {
            return Ok(self.refuse(Refusal::MoveAp(cost_in)));
        }
        if partner_ap < cost_out {
            return Ok(self.refuse(Refusal::PartnerAp(cost_out)));
        }

        if !decider.confirm(side, &Prompt::Swap { unit: id, partner }) {
            return Ok(self.refuse(Refusal::SwapCanceled));
        }

        self.message("Swap successful!");
        let free_ap = self.config.free_ap;
        self.require_mut(id)?.spend_ap(cost_in, free_ap);
        self.require_mut(partner)?.spend_ap(cost_out, free_ap);
        self.relocate(id, there);
        self.relocate(partner, here);
        Ok(Action::Performed)
    }

    /// Walks a unit along the cheapest path to `dest`, facing each step.
    /// With `free_move` the path costs no action points.
    pub fn move_path(&mut self, id: UnitId, dest: HexCoord, free_move: bool) -> Result<Action, BattleError> {
        let path = match self.path_for(id, dest)? {
            Some(path) if !path.hexes.is_empty() => path,
            _ => return Ok(self.refuse(Refusal::NoPath)),
        };
        if !free_move {
            let free_ap = self.config.free_ap;
            if !self.require_mut(id)?.spend_ap(path.cost, free_ap) {
                return Ok(self.refuse(Refusal::MoveAp(path.cost)));
            }
        }
        for hex in path.hexes {
            self.face(id, hex);
            self.relocate(id, hex);
        }
        Ok(Action::Performed)
    }

    /// Player move-to intent: a paid path move for a unit free to move.
    pub fn move_to(&mut self, id: UnitId, dest: HexCoord) -> Result<Action, BattleError> {
        if let Some(refusal) = self.movement_refusal(id)? {
            return Ok(self.refuse(refusal));
        }
        self.move_path(id, dest, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::state::tests::open_battle;
    use crate::board::terrain::TerrainKind;
    use crate::board::unit::tests::infantry;
    use crate::board::unit::Side;
    use crate::decision::Policy;

    #[test]
    fn rotate_wraps_and_refuses_when_locked() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        assert!(battle.rotate(a, -1).unwrap().is_performed());
        assert_eq!(battle.unit(a).unwrap().facing, 5);

        let b = battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        battle.create_lock(a, b).unwrap();
        let action = battle.rotate(a, 1).unwrap();
        assert_eq!(action, Action::Refused(Refusal::MeleeLocked("Test Infantry".into())));
        assert_eq!(battle.unit(a).unwrap().facing, 5);
    }

    #[test]
    fn move_forward_pays_terrain_cost() {
        let mut battle = open_battle();
        battle.map.set_terrain(HexCoord::new(5, 6), TerrainKind::Forest);
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let action = battle.move_forward(a, &mut Policy::Never).unwrap();
        assert!(action.is_performed());
        let unit = battle.unit(a).unwrap();
        assert_eq!(unit.hex, HexCoord::new(5, 6));
        assert_eq!(unit.ap, 1);
        assert_eq!(unit.defense_mod, 2);

        let action = battle.move_forward(a, &mut Policy::Never).unwrap();
        assert!(action.is_performed());
        let action = battle.move_forward(a, &mut Policy::Never).unwrap();
        assert_eq!(action, Action::Refused(Refusal::MoveAp(1)));
        assert_eq!(battle.unit(a).unwrap().ap, 0);
    }

    #[test]
    fn move_forward_off_map_or_into_enemy() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(0, 7), 0).unwrap();
        assert_eq!(battle.move_forward(a, &mut Policy::Never).unwrap(), Action::Refused(Refusal::OffMap));

        let b = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        battle.spawn(infantry(), Side::Second, HexCoord::new(5, 6), 3).unwrap();
        assert_eq!(battle.move_forward(b, &mut Policy::Never).unwrap(), Action::Refused(Refusal::EnemyInHex));
        assert_eq!(battle.unit(b).unwrap().hex, HexCoord::new(5, 5));
    }

    #[test]
    fn swap_requires_confirmation() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::First, HexCoord::new(5, 6), 0).unwrap();

        let action = battle.move_forward(a, &mut Policy::Never).unwrap();
        assert_eq!(action, Action::Refused(Refusal::SwapCanceled));
        assert_eq!(battle.unit(a).unwrap().ap, 3);

        let action = battle.move_forward(a, &mut Policy::Always).unwrap();
        assert!(action.is_performed());
        assert_eq!(battle.unit(a).unwrap().hex, HexCoord::new(5, 6));
        assert_eq!(battle.unit(b).unwrap().hex, HexCoord::new(5, 5));
        assert_eq!(battle.unit(a).unwrap().ap, 2);
        assert_eq!(battle.unit(b).unwrap().ap, 2);
    }

    #[test]
    fn swap_checks_partner_ap() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let b = battle.spawn(infantry(), Side::First, HexCoord::new(5, 6), 0).unwrap();
        battle.unit_mut(b).unwrap().ap = 0;
        let action = battle.move_forward(a, &mut Policy::Always).unwrap();
        assert_eq!(action, Action::Refused(Refusal::PartnerAp(1)));
    }

    #[test]
    fn move_path_faces_each_step() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(5, 5), 0).unwrap();
        let action = battle.move_path(a, HexCoord::new(7, 6), false).unwrap();
        assert!(action.is_performed());
        let unit = battle.unit(a).unwrap();
        assert_eq!(unit.hex, HexCoord::new(7, 6));
        assert_eq!(unit.ap, 1);
        assert_eq!(unit.facing, 2);
    }

    #[test]
    fn move_path_without_ap_is_refused() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(2, 2), 0).unwrap();
        let action = battle.move_path(a, HexCoord::new(2, 7), false).unwrap();
        assert_eq!(action, Action::Refused(Refusal::MoveAp(5)));
        assert_eq!(battle.unit(a).unwrap().hex, HexCoord::new(2, 2));

        let action = battle.move_path(a, HexCoord::new(2, 7), true).unwrap();
        assert!(action.is_performed());
        assert_eq!(battle.unit(a).unwrap().ap, 3);
    }

    #[test]
    fn move_to_refuses_broken_units() {
        let mut battle = open_battle();
        let a = battle.spawn(infantry(), Side::First, HexCoord::new(2, 2), 0).unwrap();
        battle.unit_mut(a).unwrap().broken = true;
        let action = battle.move_to(a, HexCoord::new(2, 3)).unwrap();
        assert_eq!(action, Action::Refused(Refusal::Broken("Test Infantry".into())));
    }
}
