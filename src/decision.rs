//! Decision boundary.
//!
//! The rules occasionally need a yes/no answer from one side: whether to
//! swap places with a friendly platoon, and whether to pursue an enemy that
//! fell back. Those questions go through a [`Decider`], which may be a human
//! front end or a fixed policy. Player intents come back in as [`Intent`]s.

use crate::board::hex::HexCoord;
use crate::board::state::{Action, Battle, BattleError, Refusal};
use crate::board::unit::{Side, UnitId};

/// A yes/no question put to one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// `unit` wants to trade hexes with the friendly `partner`.
    Swap { unit: UnitId, partner: UnitId },
    /// `target` fell back; `pursuer` may follow into the vacated hex.
    Pursue { pursuer: UnitId, target: UnitId },
}

impl Prompt {
    /// The question as shown to a player.
    pub fn question(&self, battle: &Battle) -> String {
        let name = |id: UnitId| battle.unit(id).map_or("?", |u| u.name()).to_string();
        match *self {
            Prompt::Swap { partner, .. } => format!("Attempt position swap with {}?", name(partner)),
            Prompt::Pursue { target, .. } => format!("Pursue {}? (No AP cost)", name(target)),
        }
    }
}

pub trait Decider {
    fn confirm(&mut self, side: Side, prompt: &Prompt) -> bool;
}

impl<F> Decider for F
where
    F: FnMut(Side, &Prompt) -> bool,
{
    fn confirm(&mut self, side: Side, prompt: &Prompt) -> bool {
        self(side, prompt)
    }
}

/// Fixed answers to prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Always,
    Never,
    /// Accepts every pursuit and never starts a swap.
    Ai,
}

impl Policy {
    pub fn from_name(s: &str) -> Option<Policy> {
        match s {
            "yes" | "always" => Some(Policy::Always),
            "no" | "never" => Some(Policy::Never),
            "ai" => Some(Policy::Ai),
            _ => None,
        }
    }
}

impl Decider for Policy {
    fn confirm(&mut self, _side: Side, prompt: &Prompt) -> bool {
        match self {
            Policy::Always => true,
            Policy::Never => false,
            Policy::Ai => matches!(prompt, Prompt::Pursue { .. }),
        }
    }
}

/// Routes each prompt to the policy of the side being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerSide(pub [Policy; 2]);

impl Decider for PerSide {
    fn confirm(&mut self, side: Side, prompt: &Prompt) -> bool {
        self.0[side.index()].confirm(side, prompt)
    }
}

/// Something a player asks one of their platoons to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Pivot by a number of hexsides, clockwise when positive.
    Rotate(i32),
    MoveForward,
    MoveTo(HexCoord),
    Attack(HexCoord),
    FreeAttempt,
}

impl Battle {
    /// Carries out an intent for the active side. Acting for the inactive
    /// side, or after the battle has ended, is refused.
    pub fn perform(
        &mut self,
        id: UnitId,
        intent: Intent,
        decider: &mut dyn Decider,
    ) -> Result<Action, BattleError> {
        let unit = self.require(id)?;
        if self.is_over() {
            return Ok(self.refuse(Refusal::BattleOver));
        }
        if unit.side != self.active_side() {
            let name = unit.name().to_string();
            return Ok(self.refuse(Refusal::NotActive(name)));
        }
        self.selected = Some(id);
        match intent {
            Intent::Rotate(delta) => self.rotate(id, delta),
            Intent::MoveForward => self.move_forward(id, decider),
            Intent::MoveTo(hex) => self.move_to(id, hex),
            Intent::Attack(hex) => self.initiate_attack(id, hex, decider),
            Intent::FreeAttempt => self.free_attempt(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_policy_pursues_but_never_swaps() {
        let swap = Prompt::Swap {
            unit: UnitId(1),
            partner: UnitId(2),
        };
        let pursue = Prompt::Pursue {
            pursuer: UnitId(1),
            target: UnitId(2),
        };
        let mut ai = Policy::Ai;
        assert!(!ai.confirm(Side::First, &swap));
        assert!(ai.confirm(Side::First, &pursue));
    }

    #[test]
    fn per_side_routes_by_side() {
        let prompt = Prompt::Swap {
            unit: UnitId(1),
            partner: UnitId(2),
        };
        let mut decider = PerSide([Policy::Always, Policy::Never]);
        assert!(decider.confirm(Side::First, &prompt));
        assert!(!decider.confirm(Side::Second, &prompt));
    }

    #[test]
    fn closures_are_deciders() {
        let mut asked = Vec::new();
        let mut decider = |side: Side, _: &Prompt| {
            asked.push(side);
            true
        };
        let prompt = Prompt::Pursue {
            pursuer: UnitId(3),
            target: UnitId(4),
        };
        assert!(decider.confirm(Side::Second, &prompt));
        assert_eq!(asked, vec![Side::Second]);
    }

    #[test]
    fn policy_names() {
        assert_eq!(Policy::from_name("yes"), Some(Policy::Always));
        assert_eq!(Policy::from_name("no"), Some(Policy::Never));
        assert_eq!(Policy::from_name("ai"), Some(Policy::Ai));
        assert_eq!(Policy::from_name("maybe"), None);
    }
}
