//! Species schema: the single source of truth for species identity and column order.

use crate::error::{Result, SurveyError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A validated mapping from species identifier to its column position.
///
/// Built once when the survey table is loaded and shared by every downstream
/// stage, so iteration order and species identity never drift between the
/// wide table, the long table, and the richness calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSchema {
    /// Species identifiers in column order.
    species: Vec<String>,
    /// Reverse lookup from identifier to column index.
    index: HashMap<String, usize>,
}

impl SpeciesSchema {
    /// Create a schema from species identifiers in column order.
    ///
    /// Fails with `DuplicateSpecies` if an identifier appears twice.
    pub fn new(species: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(species.len());
        for (i, id) in species.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(SurveyError::DuplicateSpecies(id.clone()));
            }
        }
        Ok(Self { species, index })
    }

    /// Number of species columns.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Check if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Species identifiers in column order.
    pub fn species_ids(&self) -> &[String] {
        &self.species
    }

    /// Column index for a species identifier.
    pub fn index_of(&self, species: &str) -> Option<usize> {
        self.index.get(species).copied()
    }

    /// Check if a species identifier is present.
    pub fn contains(&self, species: &str) -> bool {
        self.index.contains_key(species)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_basic() {
        let schema = SpeciesSchema::new(vec![
            "Pieris rapae".to_string(),
            "Bombus terrestris".to_string(),
        ])
        .unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.index_of("Pieris rapae"), Some(0));
        assert_eq!(schema.index_of("Bombus terrestris"), Some(1));
        assert_eq!(schema.index_of("unknown"), None);
        assert!(schema.contains("Pieris rapae"));
    }

    #[test]
    fn test_schema_duplicate() {
        let result = SpeciesSchema::new(vec!["a".to_string(), "a".to_string()]);
        assert!(matches!(result, Err(SurveyError::DuplicateSpecies(_))));
    }

    #[test]
    fn test_schema_empty() {
        let schema = SpeciesSchema::new(Vec::new()).unwrap();
        assert!(schema.is_empty());
        assert_eq!(schema.len(), 0);
    }
}
