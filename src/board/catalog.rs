//! Unit-type catalog.
//!
//! An ordered, read-only list of [`UnitType`] templates, loaded once from
//! JSON before any battle is built. Platoons hold an `Arc` to their template;
//! the catalog never hands out mutable access.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::unit::UnitType;

/// The stock roster shipped with the crate.
const BUILTIN_UNITS: &str = include_str!("../../data/units.json");

/// Errors that can occur while loading a unit catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse unit catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate unit type name: '{0}'")]
    DuplicateName(String),

    #[error("unit type '{0}' must have at least one column")]
    NoColumns(String),
}

/// Ordered collection of unit templates.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    types: Vec<Arc<UnitType>>,
}

impl UnitCatalog {
    /// Builds a catalog from templates, rejecting duplicate names and
    /// zero-column types.
    pub fn new(types: Vec<UnitType>) -> Result<Self, CatalogError> {
        let mut out: Vec<Arc<UnitType>> = Vec::with_capacity(types.len());
        for t in types {
            if t.columns < 1 {
                return Err(CatalogError::NoColumns(t.name));
            }
            if out.iter().any(|existing| existing.name == t.name) {
                return Err(CatalogError::DuplicateName(t.name));
            }
            out.push(Arc::new(t));
        }
        Ok(UnitCatalog { types: out })
    }

    /// The stock two-faction roster.
    pub fn builtin() -> Result<Self, CatalogError> {
        UnitCatalog::from_json_str(BUILTIN_UNITS)
    }

    /// Loads a catalog from a JSON array of unit types.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let types: Vec<UnitType> = serde_json::from_str(json)?;
        UnitCatalog::new(types)
    }

    /// Loads a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        UnitCatalog::from_json_str(&data)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Looks up a template by exact name.
    pub fn get(&self, name: &str) -> Option<&Arc<UnitType>> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Template at a catalog position.
    pub fn at(&self, index: usize) -> Option<&Arc<UnitType>> {
        self.types.get(index)
    }

    /// Position of a template in the catalog.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|t| t.name == name)
    }

    /// Index of the next template of the same faction after `index`, wrapping.
    pub fn next_in_faction(&self, index: usize) -> Option<usize> {
        let faction = self.types.get(index)?.faction;
        let n = self.types.len();
        (1..=n)
            .map(|step| (index + step) % n)
            .find(|&i| self.types[i].faction == faction)
    }

    /// Templates belonging to one faction, in catalog order.
    pub fn faction(&self, faction: u8) -> impl Iterator<Item = &Arc<UnitType>> {
        self.types.iter().filter(move |t| t.faction == faction)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<UnitType>> {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::unit::{Ability, UnitClass, Weight};

    #[test]
    fn builtin_catalog_loads() {
        let catalog = UnitCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 10);
        let knights = catalog.get("Knights").unwrap();
        assert_eq!(knights.class, UnitClass::Cavalry);
        assert_eq!(knights.weight, Weight::Heavy);
        assert_eq!(knights.max_ap(), 4);
        assert!(knights.has(Ability::Charge));
        assert!(knights.has(Ability::Shields));
        assert!(!knights.has(Ability::Polearms));
    }

    #[test]
    fn lookup_missing_name() {
        let catalog = UnitCatalog::builtin().unwrap();
        assert!(catalog.get("Dragons").is_none());
        assert_eq!(catalog.index_of("Longbowmen"), Some(2));
    }

    #[test]
    fn faction_navigation_wraps() {
        let catalog = UnitCatalog::builtin().unwrap();
        assert_eq!(catalog.faction(0).count(), 5);
        assert_eq!(catalog.faction(1).count(), 5);
        // Noble Riders (4) -> Hearthguard (0)
        assert_eq!(catalog.next_in_faction(4), Some(0));
        // Ghouls (5) -> Skeletal Host (6)
        assert_eq!(catalog.next_in_faction(5), Some(6));
        assert_eq!(catalog.next_in_faction(99), None);
    }

    #[test]
    fn duplicate_names_rejected() {
        let catalog = UnitCatalog::builtin().unwrap();
        let t = (**catalog.get("Ghouls").unwrap()).clone();
        let err = UnitCatalog::new(vec![t.clone(), t]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(name) if name == "Ghouls"));
    }

    #[test]
    fn bad_json_is_reported() {
        let err = UnitCatalog::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
    }
}
