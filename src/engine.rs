//! Engine state management.
//!
//! Holds the unit catalog, engine options and the current battle, and
//! executes protocol commands against it. After every command the battle's
//! queued events are streamed to the output as protocol lines.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::board::catalog::{CatalogError, UnitCatalog};
use crate::board::map::MapKind;
use crate::board::snapshot::BattleSnapshot;
use crate::board::state::{Action, Battle, BattleError};
use crate::board::unit::{Side, UnitId};
use crate::config::BattleConfig;
use crate::decision::{Intent, PerSide, Policy};
use crate::protocol::report::{format_turn, write_state, LineSink};

/// Failures while executing a command.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no battle in progress")]
    NoBattle,

    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Holds the mutable state of the engine between commands.
pub struct Engine {
    pub battle: Option<Battle>,
    pub options: HashMap<String, String>,
    catalog: UnitCatalog,
}

impl Engine {
    /// Creates an engine with the built-in unit catalog and no battle.
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Engine::with_catalog(UnitCatalog::builtin()?))
    }

    pub fn with_catalog(catalog: UnitCatalog) -> Self {
        Engine {
            battle: None,
            options: HashMap::new(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Sets an engine option. Takes effect at the next `newgame`, except
    /// `Confirm` and `AiSide` which apply immediately.
    pub fn set_option(&mut self, name: String, value: Option<String>) {
        self.options.insert(name, value.unwrap_or_default());
    }

    fn option<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.options.get(name).and_then(|v| v.parse().ok())
    }

    /// Battle configuration built from the defaults and the current options.
    pub fn config(&self) -> BattleConfig {
        let mut config = BattleConfig::default();
        if let Some(limit) = self.option("TurnLimit") {
            config.turn_limit = limit;
        }
        if let Some(seed) = self.option("Seed") {
            config.seed = Some(seed);
        }
        if let Some(v) = self.options.get("FreeAp") {
            config.free_ap = v.is_empty() || v == "true";
        }
        if let Some(kind) = self.options.get("Map").and_then(|v| MapKind::from_name(v)) {
            config.map = kind;
        }
        config
    }

    /// Whether the AI plays `side`. `AiSide` is `none`, `1`, `2` or `both`;
    /// the default is `2`.
    pub fn ai_controls(&self, side: Side) -> bool {
        match self.options.get("AiSide").map(String::as_str).unwrap_or("2") {
            "both" => true,
            "1" => side == Side::First,
            "2" => side == Side::Second,
            _ => false,
        }
    }

    /// Answers prompts: AI sides use the AI policy, human sides the
    /// `Confirm` option (default `yes`).
    pub fn decider(&self) -> PerSide {
        let human = self
            .options
            .get("Confirm")
            .and_then(|v| Policy::from_name(v))
            .unwrap_or(Policy::Always);
        let policy = |side| if self.ai_controls(side) { Policy::Ai } else { human };
        PerSide([policy(Side::First), policy(Side::Second)])
    }

    fn battle_mut(&mut self) -> Result<&mut Battle, EngineError> {
        self.battle.as_mut().ok_or(EngineError::NoBattle)
    }

    /// Streams queued battle events to `out`.
    fn flush<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        if let Some(battle) = self.battle.as_mut() {
            let mut sink = LineSink::new(out);
            battle.flush_events(&mut sink);
            sink.finish()?;
        }
        Ok(())
    }

    /// Handles the handshake: writes id, options and `hexfrontok`.
    pub fn handle_hello<W: Write>(&self, out: &mut W) -> Result<(), EngineError> {
        writeln!(out, "id name hexfront")?;
        writeln!(out, "option name TurnLimit type spin default 8 min 1 max 99")?;
        writeln!(out, "option name Seed type string default <entropy>")?;
        writeln!(out, "option name FreeAp type check default false")?;
        writeln!(out, "option name Map type combo default scripted var scripted var random")?;
        writeln!(out, "option name Confirm type combo default yes var yes var no")?;
        writeln!(out, "option name AiSide type combo default 2 var none var 1 var 2 var both")?;
        writeln!(out, "hexfrontok")?;
        out.flush()?;
        Ok(())
    }

    pub fn handle_isready<W: Write>(&self, out: &mut W) -> Result<(), EngineError> {
        writeln!(out, "readyok")?;
        out.flush()?;
        Ok(())
    }

    /// Starts the standard battle. If the AI plays the first side it moves
    /// straight away.
    pub fn new_game<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        let battle = Battle::standard(&self.catalog, self.config())?;
        tracing::info!(units = battle.units().len(), "new battle");
        self.battle = Some(battle);
        self.flush(out)?;
        self.play_ai_sides(out)?;
        self.report_turn(out)
    }

    pub fn handle_state<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        let battle = self.battle.as_ref().ok_or(EngineError::NoBattle)?;
        write_state(battle, out)?;
        out.flush()?;
        Ok(())
    }

    pub fn handle_select<W: Write>(&mut self, id: UnitId, out: &mut W) -> Result<(), EngineError> {
        self.battle_mut()?.select(id)?;
        writeln!(out, "selected {}", id)?;
        out.flush()?;
        Ok(())
    }

    pub fn handle_next<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        match self.battle_mut()?.select_next() {
            Some(id) => writeln!(out, "selected {}", id)?,
            None => writeln!(out, "selected none")?,
        }
        out.flush()?;
        Ok(())
    }

    /// Carries out a player intent and reports `ok` or `refused <reason>`.
    pub fn handle_act<W: Write>(&mut self, id: UnitId, intent: Intent, out: &mut W) -> Result<(), EngineError> {
        let mut decider = self.decider();
        let action = self.battle_mut()?.perform(id, intent, &mut decider)?;
        self.flush(out)?;
        match action {
            Action::Performed => writeln!(out, "ok")?,
            Action::Refused(reason) => writeln!(out, "refused {}", reason)?,
        }
        out.flush()?;
        Ok(())
    }

    /// Ends the active side's turn, then lets the AI play any AI-controlled
    /// sides that follow.
    pub fn handle_end_turn<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        self.battle_mut()?.end_turn();
        self.flush(out)?;
        self.play_ai_sides(out)?;
        self.report_turn(out)
    }

    /// Plays the active side with the AI regardless of `AiSide`, then ends
    /// its turn.
    pub fn handle_ai<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        let mut decider = self.decider();
        let battle = self.battle_mut()?;
        if !battle.is_over() {
            battle.run_side_turn(&mut decider)?;
            battle.end_turn();
        }
        self.flush(out)?;
        self.play_ai_sides(out)?;
        self.report_turn(out)
    }

    /// Plays AI-controlled sides until a human side is active or the battle
    /// ends.
    fn play_ai_sides<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        let mut decider = self.decider();
        // Both sides may be AI-controlled; the turn limit bounds the loop.
        loop {
            let battle = self.battle.as_ref().ok_or(EngineError::NoBattle)?;
            let (over, side) = (battle.is_over(), battle.active_side());
            if over || !self.ai_controls(side) {
                return Ok(());
            }
            let battle = self.battle_mut()?;
            battle.run_side_turn(&mut decider)?;
            battle.end_turn();
            self.flush(out)?;
        }
    }

    fn report_turn<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        let battle = self.battle.as_ref().ok_or(EngineError::NoBattle)?;
        writeln!(out, "{}", format_turn(battle))?;
        out.flush()?;
        Ok(())
    }

    /// Writes `snapshot <json>`.
    pub fn handle_save<W: Write>(&mut self, out: &mut W) -> Result<(), EngineError> {
        let battle = self.battle.as_ref().ok_or(EngineError::NoBattle)?;
        writeln!(out, "snapshot {}", battle.snapshot().to_json()?)?;
        out.flush()?;
        Ok(())
    }

    /// Replaces the current battle with a restored snapshot.
    pub fn handle_load<W: Write>(&mut self, json: &str, out: &mut W) -> Result<(), EngineError> {
        let snapshot = BattleSnapshot::from_json(json)?;
        let battle = Battle::restore(snapshot, &self.catalog, self.config())?;
        self.battle = Some(battle);
        self.report_turn(out)
    }
}
