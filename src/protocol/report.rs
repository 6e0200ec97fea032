//! Line-oriented state reports.
//!
//! Formats units, turn state and battle outcomes as single protocol lines,
//! and provides [`LineSink`], an [`EventSink`] that writes each notification
//! as one line.

use std::io::{self, Write};

use crate::board::state::{Battle, BattleOutcome, EventSink};
use crate::board::unit::{Side, Unit, UnitId};

/// `unit <id> <side> <hex> f<facing> ap <ap> fighters <n>/<max> [broken] [locked] <name>`
pub fn format_unit(unit: &Unit) -> String {
    let mut line = format!(
        "unit {} {} {} f{} ap {} fighters {}/{}",
        unit.id,
        unit.side.index() + 1,
        unit.hex,
        unit.facing,
        unit.ap,
        unit.fighters,
        unit.max_fighters()
    );
    if unit.broken {
        line.push_str(" broken");
    }
    if unit.melee_locked {
        line.push_str(" locked");
    }
    line.push(' ');
    line.push_str(unit.name());
    line
}

pub fn format_outcome(outcome: BattleOutcome) -> String {
    match outcome {
        BattleOutcome::Victory(side) => format!("over winner {}", side.index() + 1),
        BattleOutcome::Draw => "over draw".to_string(),
    }
}

/// `turn <n>/<limit> active <side> score <a> <b>`, or the outcome line once
/// the battle has ended.
pub fn format_turn(battle: &Battle) -> String {
    if let Some(outcome) = battle.outcome() {
        return format_outcome(outcome);
    }
    format!(
        "turn {}/{} active {} score {} {}",
        battle.turn(),
        battle.turn_limit(),
        battle.active_side().index() + 1,
        battle.score(Side::First),
        battle.score(Side::Second)
    )
}

/// Writes the full state: turn line, one line per unit, one per lock, then
/// `stateok`.
pub fn write_state<W: Write>(battle: &Battle, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", format_turn(battle))?;
    for unit in battle.units() {
        writeln!(out, "{}", format_unit(unit))?;
    }
    for lock in battle.locks() {
        let (a, b) = lock.members();
        writeln!(out, "lock {} {}", a, b)?;
    }
    if let Some(id) = battle.selected() {
        writeln!(out, "selected {}", id)?;
    }
    writeln!(out, "stateok")
}

/// Writes battle notifications as protocol lines: `log <text>` for
/// messages, a unit line (or `gone <id>`) for unit changes, and the turn
/// line for battle state changes.
///
/// The sink interface cannot fail, so the first write error is kept and
/// reported by [`LineSink::finish`].
pub struct LineSink<'a, W: Write> {
    out: &'a mut W,
    error: Option<io::Error>,
}

impl<'a, W: Write> LineSink<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        LineSink { out, error: None }
    }

    fn line(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.out, "{}", text) {
            self.error = Some(err);
        }
    }

    pub fn finish(self) -> io::Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<W: Write> EventSink for LineSink<'_, W> {
    fn on_message(&mut self, text: &str) {
        self.line(&format!("log {}", text));
    }

    fn on_unit_changed(&mut self, id: UnitId, unit: Option<&Unit>) {
        let text = match unit {
            Some(u) => format_unit(u),
            None => format!("gone {}", id),
        };
        self.line(&text);
    }

    fn on_battle_state_changed(&mut self, battle: &Battle) {
        self.line(&format_turn(battle));
    }
}
