//! Unit types and platoons.
//!
//! A [`UnitType`] is a read-only catalog template shared between every
//! platoon of that type. A [`Unit`] is one platoon on the battlefield: its
//! side, position, facing, action points, morale state and the fighters left
//! in each of its three ranks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::hex::{rotate, Direction, HexCoord};

/// Number of fighter ranks in every platoon.
pub const RANKS: usize = 3;

/// Lowest effective defense a unit can be reduced to by modifiers.
pub const MIN_DEFENSE: i32 = 2;

/// One of the two opposing forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub const fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }

    pub fn from_index(i: usize) -> Option<Side> {
        match i {
            0 => Some(Side::First),
            1 => Some(Side::Second),
            _ => None,
        }
    }

    pub const fn opponent(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Light or heavy troops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weight {
    Light,
    Heavy,
}

/// Broad troop class, which sets action points and some combat rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitClass {
    Infantry,
    Cavalry,
    Artillery,
}

/// Special abilities the combat rules know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// +2 attack when first engaging cavalry; negates enemy charges.
    Polearms,
    /// +1 defense against attacks from the front arc.
    Shields,
    /// Ignores the defense penalty for fighting several enemies at once.
    Mobility,
    /// +2 attack when first engaging a defender on open terrain.
    Charge,
}

impl Ability {
    const ALL: [Ability; 4] = [Ability::Polearms, Ability::Shields, Ability::Mobility, Ability::Charge];

    const fn bit(self) -> u8 {
        match self {
            Ability::Polearms => 1,
            Ability::Shields => 1 << 1,
            Ability::Mobility => 1 << 2,
            Ability::Charge => 1 << 3,
        }
    }
}

/// A fixed set of [`Ability`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Ability>", into = "Vec<Ability>")]
pub struct Abilities(u8);

impl Abilities {
    pub const fn empty() -> Self {
        Abilities(0)
    }

    pub const fn with(self, ability: Ability) -> Self {
        Abilities(self.0 | ability.bit())
    }

    pub const fn contains(self, ability: Ability) -> bool {
        self.0 & ability.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Ability> {
        Ability::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl From<Vec<Ability>> for Abilities {
    fn from(list: Vec<Ability>) -> Self {
        list.into_iter().fold(Abilities::empty(), Abilities::with)
    }
}

impl From<Abilities> for Vec<Ability> {
    fn from(set: Abilities) -> Self {
        set.iter().collect()
    }
}

/// Catalog entry describing one kind of platoon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    pub name: String,
    pub faction: u8,
    pub weight: Weight,
    pub class: UnitClass,
    pub glyph: char,
    pub melee: i32,
    pub ranged: i32,
    pub range: i32,
    pub defense: i32,
    pub skill: i32,
    pub morale: i32,
    /// Fighters per rank.
    pub columns: i32,
    #[serde(default)]
    pub portrait: Option<String>,
    #[serde(default)]
    pub abilities: Abilities,
    pub points_cost: u32,
    #[serde(default)]
    pub description: String,
}

impl UnitType {
    /// Action points per turn: artillery 2, infantry 3, light cavalry 5,
    /// heavy cavalry 4.
    pub const fn max_ap(&self) -> i32 {
        match (self.class, self.weight) {
            (UnitClass::Artillery, _) => 2,
            (UnitClass::Infantry, _) => 3,
            (UnitClass::Cavalry, Weight::Light) => 5,
            (UnitClass::Cavalry, Weight::Heavy) => 4,
        }
    }

    pub const fn has(&self, ability: Ability) -> bool {
        self.abilities.contains(ability)
    }
}

/// Stable identifier for a platoon within one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A platoon on the battlefield.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub unit_type: Arc<UnitType>,
    pub side: Side,
    pub hex: HexCoord,
    pub facing: Direction,
    pub ap: i32,
    pub broken: bool,
    /// Cached: the unit appears in at least one melee lock.
    pub melee_locked: bool,
    /// Already tried to break out of melee this turn.
    pub free_attempt: bool,
    pub attack_mod: i32,
    pub defense_mod: i32,
    /// Fighters left in each rank, front rank first.
    pub rank_pop: [i32; RANKS],
    pub fighters: i32,
    pub current_ranks: i32,
}

impl Unit {
    /// A fresh, full-strength platoon with a full action point budget.
    pub fn new(id: UnitId, unit_type: Arc<UnitType>, side: Side, hex: HexCoord, facing: Direction) -> Self {
        let columns = unit_type.columns;
        let ap = unit_type.max_ap();
        Unit {
            id,
            unit_type,
            side,
            hex,
            facing: facing % 6,
            ap,
            broken: false,
            melee_locked: false,
            free_attempt: false,
            attack_mod: 0,
            defense_mod: 0,
            rank_pop: [columns; RANKS],
            fighters: columns * RANKS as i32,
            current_ranks: RANKS as i32,
        }
    }

    pub fn name(&self) -> &str {
        &self.unit_type.name
    }

    pub fn max_ap(&self) -> i32 {
        self.unit_type.max_ap()
    }

    pub fn max_fighters(&self) -> i32 {
        self.unit_type.columns * RANKS as i32
    }

    pub fn melee(&self) -> i32 {
        self.unit_type.melee
    }

    pub fn ranged(&self) -> i32 {
        self.unit_type.ranged
    }

    pub fn class(&self) -> UnitClass {
        self.unit_type.class
    }

    pub fn has(&self, ability: Ability) -> bool {
        self.unit_type.has(ability)
    }

    /// Defense after modifiers; never below [`MIN_DEFENSE`] once modifiers
    /// have been applied.
    pub fn effective_defense(&self) -> i32 {
        self.unit_type.defense + self.defense_mod
    }

    /// Deducts `cost` action points if the unit has them. With `free_ap` the
    /// check still applies but nothing is deducted.
    pub fn spend_ap(&mut self, cost: i32, free_ap: bool) -> bool {
        if self.ap < cost {
            return false;
        }
        if !free_ap {
            self.ap -= cost;
        }
        true
    }

    /// Start-of-turn refresh.
    pub fn reset_turn(&mut self) {
        self.ap = self.max_ap();
        self.free_attempt = false;
    }

    /// Rotates facing by `delta` hexsides.
    pub fn turn(&mut self, delta: i32) {
        self.facing = rotate(self.facing, delta);
    }

    /// Turns to face `target`.
    pub fn face(&mut self, target: HexCoord) {
        if target != self.hex {
            self.facing = self.hex.direction_to(target);
        }
    }

    /// Removes fighters starting from the rearmost populated rank, draining
    /// each rank to zero before moving forward.
    pub fn take_damage(&mut self, damage: i32) {
        let mut remaining = damage.max(0);
        for pop in self.rank_pop.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            if *pop > remaining {
                *pop -= remaining;
                return;
            }
            remaining -= *pop;
            *pop = 0;
        }
    }

    /// Recomputes the fighter total and populated rank count from the ranks.
    pub fn recount(&mut self) {
        self.fighters = self.rank_pop.iter().sum();
        let columns = self.unit_type.columns.max(1);
        self.current_ranks = (self.fighters + columns - 1) / columns;
    }

    /// True once casualties have reached half strength.
    pub fn at_half_strength(&self) -> bool {
        self.fighters <= self.max_fighters() / 2
    }

    /// Recomputes attack and defense modifiers from scratch.
    ///
    /// `terrain_defense` is the defense modifier of the occupied hex and
    /// `locks` the number of melee locks the unit is part of.
    pub fn apply_modifiers(&mut self, terrain_defense: i32, locks: usize) {
        self.attack_mod = 0;
        self.defense_mod = terrain_defense;

        if self.current_ranks < RANKS as i32 {
            self.attack_mod -= 1;
        }
        if self.current_ranks == 1 {
            self.defense_mod -= 1;
        }
        if !self.has(Ability::Mobility) && locks > 1 {
            self.defense_mod -= locks as i32 - 1;
        }

        self.defense_mod = self.defense_mod.max(MIN_DEFENSE - self.unit_type.defense);
    }

    /// Whether `hex` lies in this unit's front arc (facing and the two
    /// hexsides either side of it).
    pub fn is_in_front(&self, hex: HexCoord) -> bool {
        let base = self.hex.direction_to(hex);
        let relative = rotate(base, -(self.facing as i32));
        matches!(relative, 5 | 0 | 1)
    }

    /// The on-map hexes behind the unit relative to a threat in `threat_dir`.
    pub fn rear_hexes(&self, threat_dir: Direction) -> Vec<HexCoord> {
        (2..=4)
            .map(|turn| self.hex.neighbor(rotate(threat_dir, turn)))
            .filter(|h| h.is_on_map())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn infantry() -> Arc<UnitType> {
        Arc::new(UnitType {
            name: "Test Infantry".to_string(),
            faction: 0,
            weight: Weight::Heavy,
            class: UnitClass::Infantry,
            glyph: 'i',
            melee: 8,
            ranged: 0,
            range: 0,
            defense: 5,
            skill: 8,
            morale: 7,
            columns: 7,
            portrait: None,
            abilities: Abilities::empty(),
            points_cost: 100,
            description: String::new(),
        })
    }

    fn unit() -> Unit {
        Unit::new(UnitId(1), infantry(), Side::First, HexCoord::new(5, 5), 0)
    }

    #[test]
    fn max_ap_by_class() {
        let mut t = (*infantry()).clone();
        assert_eq!(t.max_ap(), 3);
        t.class = UnitClass::Artillery;
        assert_eq!(t.max_ap(), 2);
        t.class = UnitClass::Cavalry;
        assert_eq!(t.max_ap(), 4);
        t.weight = Weight::Light;
        assert_eq!(t.max_ap(), 5);
    }

    #[test]
    fn new_unit_is_full_strength() {
        let u = unit();
        assert_eq!(u.rank_pop, [7, 7, 7]);
        assert_eq!(u.fighters, 21);
        assert_eq!(u.current_ranks, 3);
        assert_eq!(u.ap, 3);
    }

    #[test]
    fn spend_ap_refuses_without_mutation() {
        let mut u = unit();
        assert!(!u.spend_ap(4, false));
        assert_eq!(u.ap, 3);
        assert!(u.spend_ap(2, false));
        assert_eq!(u.ap, 1);
        assert!(u.spend_ap(1, true));
        assert_eq!(u.ap, 1);
    }

    #[test]
    fn damage_drains_rear_rank_first() {
        let mut u = unit();
        u.take_damage(5);
        assert_eq!(u.rank_pop, [7, 7, 2]);
        u.take_damage(4);
        assert_eq!(u.rank_pop, [7, 5, 0]);
        u.take_damage(30);
        assert_eq!(u.rank_pop, [0, 0, 0]);
    }

    #[test]
    fn exact_rank_damage_empties_rank() {
        let mut u = unit();
        u.take_damage(7);
        assert_eq!(u.rank_pop, [7, 7, 0]);
    }

    #[test]
    fn recount_tracks_ranks() {
        let mut u = unit();
        u.take_damage(11);
        u.recount();
        assert_eq!(u.fighters, 10);
        assert_eq!(u.current_ranks, 2);
        assert!(u.at_half_strength());
    }

    #[test]
    fn modifiers_for_lost_ranks_and_locks() {
        let mut u = unit();
        u.apply_modifiers(1, 0);
        assert_eq!((u.attack_mod, u.defense_mod), (0, 1));

        u.take_damage(14);
        u.recount();
        u.apply_modifiers(0, 3);
        assert_eq!(u.attack_mod, -1);
        // one rank left: -1, three locks: -2
        assert_eq!(u.defense_mod, -3);
        assert_eq!(u.effective_defense(), 2);
    }

    #[test]
    fn defense_clamped_to_minimum() {
        let mut u = unit();
        u.take_damage(20);
        u.recount();
        u.apply_modifiers(-1, 4);
        assert_eq!(u.effective_defense(), MIN_DEFENSE);
    }

    #[test]
    fn mobility_ignores_lock_penalty() {
        let mut t = (*infantry()).clone();
        t.abilities = t.abilities.with(Ability::Mobility);
        let mut u = Unit::new(UnitId(2), Arc::new(t), Side::First, HexCoord::new(5, 5), 0);
        u.apply_modifiers(0, 3);
        assert_eq!(u.defense_mod, 0);
    }

    #[test]
    fn front_arc() {
        let u = unit();
        let h = u.hex;
        assert!(u.is_in_front(h.neighbor(0)));
        assert!(u.is_in_front(h.neighbor(1)));
        assert!(u.is_in_front(h.neighbor(5)));
        assert!(!u.is_in_front(h.neighbor(2)));
        assert!(!u.is_in_front(h.neighbor(3)));
        assert!(!u.is_in_front(h.neighbor(4)));
    }

    #[test]
    fn rear_hexes_oppose_threat() {
        let u = unit();
        let rear = u.rear_hexes(0);
        assert_eq!(rear, vec![u.hex.neighbor(2), u.hex.neighbor(3), u.hex.neighbor(4)]);
    }

    #[test]
    fn abilities_serialize_as_list() {
        let set = Abilities::empty().with(Ability::Shields).with(Ability::Charge);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["Shields","Charge"]"#);
        let back: Abilities = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
