//! Battle state.
//!
//! [`Battle`] is the aggregate root of one engagement: the terrain, every
//! platoon on the field, the melee locks between them, the turn counters, the
//! score and the bounded message log. Rule modules (`movement`, `resolve`,
//! `ai`) extend it with further `impl Battle` blocks; this module owns the
//! bookkeeping they all share.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalog::UnitCatalog;
use super::hex::{Direction, HexCoord};
use super::map::BattleMap;
use super::unit::{Side, Unit, UnitClass, UnitId, UnitType};
use crate::config::BattleConfig;
use crate::resolve::dice::Dice;

/// Defects in a request to the core: the caller asked for something that
/// cannot exist, as opposed to a legal request the rules turn down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BattleError {
    #[error("unknown unit type: '{0}'")]
    UnknownUnitType(String),

    #[error("no unit with id {0}")]
    UnknownUnit(UnitId),

    #[error("hex {0} is off the map")]
    OffMap(HexCoord),

    #[error("hex {0} is already occupied")]
    HexOccupied(HexCoord),

    #[error("unit {0} is flagged as melee locked but has no lock partner")]
    LockWithoutPartner(UnitId),

    #[error("units {0} and {1} are on the same side and cannot be locked")]
    SameSideLock(UnitId, UnitId),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Why a legal request was turned down. The display text is what the battle
/// log shows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    #[error("{0} is broken.")]
    Broken(String),
    #[error("{0} is melee locked.")]
    MeleeLocked(String),
    #[error("Destination is off the map.")]
    OffMap,
    #[error("Enemy unit in target hex.")]
    EnemyInHex,
    #[error("Not enough AP to move ({0} required).")]
    MoveAp(i32),
    #[error("Target platoon is Broken.")]
    PartnerBroken,
    #[error("Target platoon is in melee combat.")]
    PartnerInMelee,
    #[error("Target platoon has insufficient AP to attempt swap ({0} required).")]
    PartnerAp(i32),
    #[error("Swap canceled.")]
    SwapCanceled,
    #[error("No path possible!")]
    NoPath,
    #[error("No enemy unit in target hex.")]
    NoTarget,
    #[error("Cannot attack a friendly unit.")]
    FriendlyTarget,
    #[error("Target not part of melee combat, cannot attack.")]
    NotInMelee,
    #[error("Not enough AP to attack (1 required).")]
    AttackAp,
    #[error("Attacker does not have a ranged attack.")]
    NoRangedAttack,
    #[error("Target is out of range ({0} hexes).")]
    OutOfRange(i32),
    #[error("Line of Sight is blocked.")]
    SightBlocked,
    #[error("Must attempt as first action of turn.")]
    NotFirstAction,
    #[error("Not enough AP (1 required).")]
    FreeAttemptAp,
    #[error("{0} has already tried to break free this turn.")]
    AlreadyAttempted(String),
    #[error("{0} is not in melee combat.")]
    NotLocked(String),
    #[error("{0} is not on the active side.")]
    NotActive(String),
    #[error("The battle is over.")]
    BattleOver,
}

/// Result of a player or AI intent that was structurally valid.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Action {
    Performed,
    Refused(Refusal),
}

impl Action {
    pub fn is_performed(&self) -> bool {
        matches!(self, Action::Performed)
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            Action::Performed => None,
            Action::Refused(r) => Some(r),
        }
    }
}

/// An unordered pair of opposing platoons bound in melee.
///
/// Members are stored in id order, so `MeleeLock::new(a, b) ==
/// MeleeLock::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeleeLock {
    a: UnitId,
    b: UnitId,
}

impl MeleeLock {
    pub fn new(x: UnitId, y: UnitId) -> Self {
        if x <= y {
            MeleeLock { a: x, b: y }
        } else {
            MeleeLock { a: y, b: x }
        }
    }

    pub fn members(self) -> (UnitId, UnitId) {
        (self.a, self.b)
    }

    pub fn involves(self, id: UnitId) -> bool {
        self.a == id || self.b == id
    }

    /// The other member, if `id` is one of the pair.
    pub fn partner(self, id: UnitId) -> Option<UnitId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// How a finished battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    Victory(Side),
    Draw,
}

/// Discrete state changes a presentation layer can render at its own pace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleEvent {
    Message(String),
    UnitSpawned { id: UnitId },
    UnitMoved { id: UnitId, from: HexCoord, to: HexCoord },
    UnitFaced { id: UnitId, facing: Direction },
    HitsApplied { id: UnitId, hits: i32 },
    UnitDestroyed { id: UnitId },
    LockFormed { a: UnitId, b: UnitId },
    LocksBroken { id: UnitId },
    TurnChanged { turn: u32, side: Side },
    BattleEnded(BattleOutcome),
}

/// Receiver for [`BattleEvent`]s. Notifications are fire-and-forget.
pub trait EventSink {
    fn on_message(&mut self, text: &str);

    /// `unit` is `None` once the platoon has been removed.
    fn on_unit_changed(&mut self, id: UnitId, unit: Option<&Unit>);

    fn on_battle_state_changed(&mut self, battle: &Battle);
}

/// Standard scenario: template name, hex and facing per side.
const STANDARD_FIRST: [(&str, (i32, i32)); 7] = [
    ("Hearthguard", (5, 3)),
    ("Hearthguard", (6, 3)),
    ("Hearthguard", (7, 4)),
    ("Longbowmen", (5, 2)),
    ("Longbowmen", (7, 3)),
    ("Knights", (4, 2)),
    ("Knights", (8, 4)),
];

const STANDARD_SECOND: [(&str, (i32, i32)); 7] = [
    ("Ghouls", (5, 8)),
    ("Ghouls", (6, 9)),
    ("Ghouls", (7, 9)),
    ("Skeleton Archers", (5, 9)),
    ("Skeleton Archers", (7, 10)),
    ("Knightmares", (4, 8)),
    ("Knightmares", (8, 10)),
];

#[derive(Debug, Clone)]
pub struct Battle {
    pub(crate) map: BattleMap,
    pub(crate) units: Vec<Unit>,
    pub(crate) locks: Vec<MeleeLock>,
    pub(crate) log: VecDeque<String>,
    pub(crate) events: Vec<BattleEvent>,
    pub(crate) selected: Option<UnitId>,
    pub(crate) turn: u32,
    pub(crate) active: Side,
    pub(crate) score: [u32; 2],
    pub(crate) next_id: u32,
    pub(crate) finished: Option<BattleOutcome>,
    pub(crate) config: BattleConfig,
    pub dice: Dice,
}

impl Battle {
    /// An empty battle on `map`: turn 1, first side active.
    pub fn new(map: BattleMap, config: BattleConfig) -> Self {
        let dice = match config.seed {
            Some(seed) => Dice::seeded(seed),
            None => Dice::from_entropy(),
        };
        Battle::with_dice(map, config, dice)
    }

    /// An empty battle on a map generated per `config`. Map generation draws
    /// from the battle's own dice.
    pub fn generate(config: BattleConfig) -> Self {
        let mut dice = match config.seed {
            Some(seed) => Dice::seeded(seed),
            None => Dice::from_entropy(),
        };
        let map = BattleMap::generate(config.map, config.force_town, dice.rng());
        Battle::with_dice(map, config, dice)
    }

    fn with_dice(map: BattleMap, config: BattleConfig, dice: Dice) -> Self {
        Battle {
            map,
            units: Vec::new(),
            locks: Vec::new(),
            log: VecDeque::with_capacity(config.log_capacity),
            events: Vec::new(),
            selected: None,
            turn: 1,
            active: Side::First,
            score: [0, 0],
            next_id: 1,
            finished: None,
            config,
            dice,
        }
    }

    /// The standard engagement: three heavy infantry, two archer platoons and
    /// two heavy cavalry per side, facing each other across the field.
    pub fn standard(catalog: &UnitCatalog, config: BattleConfig) -> Result<Self, BattleError> {
        let mut battle = Battle::generate(config);
        for (name, (hx, hy)) in STANDARD_FIRST {
            battle.spawn_named(catalog, name, Side::First, HexCoord::new(hx, hy), 0)?;
        }
        for (name, (hx, hy)) in STANDARD_SECOND {
            battle.spawn_named(catalog, name, Side::Second, HexCoord::new(hx, hy), 3)?;
        }
        battle.announce_turn();
        Ok(battle)
    }

    pub fn map(&self) -> &BattleMap {
        &self.map
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn require(&self, id: UnitId) -> Result<&Unit, BattleError> {
        self.unit(id).ok_or(BattleError::UnknownUnit(id))
    }

    pub(crate) fn require_mut(&mut self, id: UnitId) -> Result<&mut Unit, BattleError> {
        self.unit_mut(id).ok_or(BattleError::UnknownUnit(id))
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.unit(id).is_some()
    }

    pub fn unit_at(&self, hex: HexCoord) -> Option<&Unit> {
        self.units.iter().find(|u| u.hex == hex)
    }

    pub fn is_occupied(&self, hex: HexCoord) -> bool {
        self.unit_at(hex).is_some()
    }

    /// Ids of a side's platoons, in battle order.
    pub fn side_units(&self, side: Side) -> Vec<UnitId> {
        self.units.iter().filter(|u| u.side == side).map(|u| u.id).collect()
    }

    /// Enemies of `side` adjacent to `hex`, optionally ignoring broken ones.
    pub fn adjacent_enemies(&self, hex: HexCoord, side: Side, unbroken_only: bool) -> Vec<UnitId> {
        hex.neighbors_on_map()
            .filter_map(|n| self.unit_at(n))
            .filter(|u| u.side != side && !(unbroken_only && u.broken))
            .map(|u| u.id)
            .collect()
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn turn_limit(&self) -> u32 {
        self.config.turn_limit
    }

    pub fn active_side(&self) -> Side {
        self.active
    }

    pub fn score(&self, side: Side) -> u32 {
        self.score[side.index()]
    }

    pub fn selected(&self) -> Option<UnitId> {
        self.selected
    }

    pub fn locks(&self) -> &[MeleeLock] {
        &self.locks
    }

    /// The message log, oldest first.
    pub fn log(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.finished
    }

    pub fn is_over(&self) -> bool {
        self.finished.is_some()
    }

    /// Places a new platoon. The hex must be on the map and empty.
    pub fn spawn(
        &mut self,
        unit_type: Arc<UnitType>,
        side: Side,
        hex: HexCoord,
        facing: Direction,
    ) -> Result<UnitId, BattleError> {
        if !hex.is_on_map() {
            return Err(BattleError::OffMap(hex));
        }
        if self.is_occupied(hex) {
            return Err(BattleError::HexOccupied(hex));
        }
        let id = UnitId(self.next_id);
        self.next_id += 1;
        let mut unit = Unit::new(id, unit_type, side, hex, facing);
        unit.apply_modifiers(self.map.defense_mod(hex), 0);
        tracing::debug!(unit = %id, name = unit.name(), %hex, side = %side, "spawned unit");
        self.units.push(unit);
        self.events.push(BattleEvent::UnitSpawned { id });
        Ok(id)
    }

    /// Places a new platoon of the named catalog type.
    pub fn spawn_named(
        &mut self,
        catalog: &UnitCatalog,
        name: &str,
        side: Side,
        hex: HexCoord,
        facing: Direction,
    ) -> Result<UnitId, BattleError> {
        let unit_type = catalog
            .get(name)
            .ok_or_else(|| BattleError::UnknownUnitType(name.to_string()))?
            .clone();
        self.spawn(unit_type, side, hex, facing)
    }

    /// Appends a line to the message log, evicting the oldest line when full.
    pub fn message(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(message = %text, "battle log");
        if self.config.log_capacity == 0 {
            return;
        }
        while self.log.len() >= self.config.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(text.clone());
        self.events.push(BattleEvent::Message(text));
    }

    /// Logs a refusal and wraps it as the action result.
    pub(crate) fn refuse(&mut self, refusal: Refusal) -> Action {
        self.message(refusal.to_string());
        Action::Refused(refusal)
    }

    pub fn is_locked(&self, a: UnitId, b: UnitId) -> bool {
        self.locks.contains(&MeleeLock::new(a, b))
    }

    pub fn lock_count(&self, id: UnitId) -> usize {
        self.locks.iter().filter(|l| l.involves(id)).count()
    }

    /// Every unit sharing a lock with `id`.
    pub fn lock_partners(&self, id: UnitId) -> Vec<UnitId> {
        self.locks.iter().filter_map(|l| l.partner(id)).collect()
    }

    /// Binds two opposing platoons in melee. Creating an existing lock is a
    /// no-op.
    pub fn create_lock(&mut self, a: UnitId, b: UnitId) -> Result<(), BattleError> {
        let side_a = self.require(a)?.side;
        let side_b = self.require(b)?.side;
        if side_a == side_b {
            return Err(BattleError::SameSideLock(a, b));
        }
        let lock = MeleeLock::new(a, b);
        if self.locks.contains(&lock) {
            return Ok(());
        }
        self.locks.push(lock);
        self.refresh_lock_flags();
        self.apply_modifiers(a);
        self.apply_modifiers(b);
        tracing::debug!(%a, %b, "melee lock formed");
        self.events.push(BattleEvent::LockFormed { a, b });
        Ok(())
    }

    /// Removes every lock involving `id`.
    pub fn break_locks(&mut self, id: UnitId) {
        let partners = self.lock_partners(id);
        if partners.is_empty() {
            return;
        }
        self.locks.retain(|l| !l.involves(id));
        self.refresh_lock_flags();
        self.apply_modifiers(id);
        for partner in partners {
            self.apply_modifiers(partner);
        }
        tracing::debug!(unit = %id, "melee locks broken");
        self.events.push(BattleEvent::LocksBroken { id });
    }

    /// Recomputes every unit's cached melee-locked flag from the lock set.
    pub(crate) fn refresh_lock_flags(&mut self) {
        let locks = &self.locks;
        for unit in &mut self.units {
            unit.melee_locked = locks.iter().any(|l| l.involves(unit.id));
        }
    }

    /// Recomputes one unit's modifiers from its hex and lock count.
    pub fn apply_modifiers(&mut self, id: UnitId) {
        let locks = self.lock_count(id);
        let Some(hex) = self.unit(id).map(|u| u.hex) else {
            return;
        };
        let terrain = self.map.defense_mod(hex);
        if let Some(unit) = self.unit_mut(id) {
            unit.apply_modifiers(terrain, locks);
        }
    }

    /// Moves a unit to `to` and re-derives its terrain modifiers.
    pub(crate) fn relocate(&mut self, id: UnitId, to: HexCoord) {
        let Some(unit) = self.unit_mut(id) else {
            return;
        };
        let from = unit.hex;
        unit.hex = to;
        self.apply_modifiers(id);
        self.events.push(BattleEvent::UnitMoved { id, from, to });
    }

    /// Turns a unit to face `target`.
    pub(crate) fn face(&mut self, id: UnitId, target: HexCoord) {
        let Some(unit) = self.unit_mut(id) else {
            return;
        };
        let before = unit.facing;
        unit.face(target);
        let facing = unit.facing;
        if facing != before {
            self.events.push(BattleEvent::UnitFaced { id, facing });
        }
    }

    /// Removes fighters from a unit, rearmost rank first.
    pub fn apply_hits(&mut self, id: UnitId, hits: i32) {
        if hits < 1 {
            return;
        }
        let Some(unit) = self.unit_mut(id) else {
            return;
        };
        unit.take_damage(hits);
        let text = format!("{} suffers {} hits", unit.name(), hits);
        tracing::debug!(unit = %id, hits, "hits applied");
        self.message(text);
        self.events.push(BattleEvent::HitsApplied { id, hits });
    }

    /// Removes a unit from the battle, dissolving its locks and awarding the
    /// opposing side 1 point for infantry or 2 for anything else.
    pub fn destroy(&mut self, id: UnitId) {
        let Some(index) = self.units.iter().position(|u| u.id == id) else {
            return;
        };
        let (name, side, class) = {
            let u = &self.units[index];
            (u.name().to_string(), u.side, u.class())
        };
        self.message(format!("{} has been destroyed!", name));
        self.break_locks(id);
        self.units.retain(|u| u.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        let value = match class {
            UnitClass::Infantry => 1,
            UnitClass::Cavalry | UnitClass::Artillery => 2,
        };
        self.score[side.opponent().index()] += value;
        tracing::info!(unit = %id, name = %name, side = %side, "unit destroyed");
        self.events.push(BattleEvent::UnitDestroyed { id });
        self.check_end();
    }

    /// Selects a unit for the presentation layer.
    pub fn select(&mut self, id: UnitId) -> Result<(), BattleError> {
        self.require(id)?;
        self.selected = Some(id);
        Ok(())
    }

    /// Selects the active side's next unit after the current selection,
    /// wrapping, or its first unit if nothing of that side is selected.
    pub fn select_next(&mut self) -> Option<UnitId> {
        let mine = self.side_units(self.active);
        let next = match self.selected.and_then(|s| mine.iter().position(|&id| id == s)) {
            Some(i) => mine.get((i + 1) % mine.len()).copied(),
            None => mine.first().copied(),
        };
        self.selected = next;
        next
    }

    fn announce_turn(&mut self) {
        let text = format!(
            "Turn {}/{}, Player {} is active",
            self.turn,
            self.config.turn_limit,
            self.active.index() + 1
        );
        self.message(text);
        self.events.push(BattleEvent::TurnChanged {
            turn: self.turn,
            side: self.active,
        });
    }

    /// Hands play to the other side. After the second side the turn counter
    /// advances. The newly active side's units are refreshed and its broken
    /// units try to recover. Returns the outcome once the battle is over.
    pub fn end_turn(&mut self) -> Option<BattleOutcome> {
        if self.finished.is_some() {
            return self.finished;
        }
        match self.active {
            Side::First => self.active = Side::Second,
            Side::Second => {
                self.turn += 1;
                self.active = Side::First;
            }
        }
        self.selected = None;
        let active = self.active;
        for unit in self.units.iter_mut().filter(|u| u.side == active) {
            unit.reset_turn();
        }
        tracing::info!(turn = self.turn, side = %active, "turn changed");
        self.announce_turn();

        if self.check_end().is_none() {
            self.recover_broken(active);
        }
        self.finished
    }

    /// The outcome the current state implies, if the battle is over.
    pub(crate) fn evaluate_end(&self) -> Option<BattleOutcome> {
        let first = self.units.iter().any(|u| u.side == Side::First);
        let second = self.units.iter().any(|u| u.side == Side::Second);
        match (first, second) {
            (false, false) => Some(BattleOutcome::Draw),
            (true, false) => Some(BattleOutcome::Victory(Side::First)),
            (false, true) => Some(BattleOutcome::Victory(Side::Second)),
            (true, true) if self.turn > self.config.turn_limit => {
                let [a, b] = self.score;
                Some(match a.cmp(&b) {
                    std::cmp::Ordering::Greater => BattleOutcome::Victory(Side::First),
                    std::cmp::Ordering::Less => BattleOutcome::Victory(Side::Second),
                    std::cmp::Ordering::Equal => BattleOutcome::Draw,
                })
            }
            (true, true) => None,
        }
    }

    /// Records the end of the battle the first time it is detected.
    pub(crate) fn check_end(&mut self) -> Option<BattleOutcome> {
        if self.finished.is_some() {
            return self.finished;
        }
        let outcome = self.evaluate_end()?;
        self.finished = Some(outcome);
        let text = match outcome {
            BattleOutcome::Victory(side) => format!("The battle is over: Player {} wins.", side.index() + 1),
            BattleOutcome::Draw => "The battle is over: a draw.".to_string(),
        };
        self.message(text);
        tracing::info!(?outcome, turn = self.turn, "battle ended");
        self.events.push(BattleEvent::BattleEnded(outcome));
        self.finished
    }

    /// Pending events, oldest first.
    pub fn pending_events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Drains queued events into `sink`.
    pub fn flush_events(&mut self, sink: &mut dyn EventSink) {
        let events = std::mem::take(&mut self.events);
        for event in events {
            match event {
                BattleEvent::Message(text) => sink.on_message(&text),
                BattleEvent::UnitSpawned { id }
                | BattleEvent::UnitMoved { id, .. }
                | BattleEvent::UnitFaced { id, .. }
                | BattleEvent::HitsApplied { id, .. }
                | BattleEvent::UnitDestroyed { id }
                | BattleEvent::LocksBroken { id } => sink.on_unit_changed(id, self.unit(id)),
                BattleEvent::LockFormed { a, b } => {
                    sink.on_unit_changed(a, self.unit(a));
                    sink.on_unit_changed(b, self.unit(b));
                }
                BattleEvent::TurnChanged { .. } | BattleEvent::BattleEnded(_) => {
                    sink.on_battle_state_changed(self)
                }
            }
        }
    }

    /// Checks that every cached melee flag has a matching lock.
    pub fn validate_locks(&self) -> Result<(), BattleError> {
        for unit in &self.units {
            if unit.melee_locked && self.lock_count(unit.id) == 0 {
                return Err(BattleError::LockWithoutPartner(unit.id));
            }
        }
        Ok(())
    }
}
