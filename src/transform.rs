//! Wide-to-long reshaping with trait joins.

use crate::data::{Observation, ObservationTable, SurveyTable, TraitTable};
use crate::error::{Result, SurveyError};

/// Reshape the wide survey table into one row per (site, method, species),
/// joining each row to the trait table.
///
/// The output has exactly `n_rows * n_species` observations. `size` is the
/// arithmetic mean of the species' minimum and maximum size estimates. A
/// species column without a matching trait record fails with
/// [`SurveyError::Join`] rather than being dropped: it signals a
/// data-integrity problem between the two input files.
pub fn to_long(survey: &SurveyTable, traits: &TraitTable) -> Result<ObservationTable> {
    let species_ids = survey.schema().species_ids();

    // Validate the join up front so a broken trait table fails before any
    // rows are emitted.
    let sizes: Vec<f64> = species_ids
        .iter()
        .map(|species| {
            traits
                .mean_size(species)
                .ok_or_else(|| SurveyError::Join {
                    species: species.clone(),
                })
        })
        .collect::<Result<_>>()?;

    let mut observations = Vec::with_capacity(survey.n_rows() * species_ids.len());
    for row in survey.rows() {
        for (col, species) in species_ids.iter().enumerate() {
            observations.push(Observation {
                site: row.site.clone(),
                method: row.method.clone(),
                species: species.clone(),
                count: row.counts[col],
                size: sizes[col],
            });
        }
    }

    Ok(ObservationTable::new(observations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SizeRange, SpeciesSchema, SurveyRow};
    use approx::assert_relative_eq;

    fn create_survey() -> SurveyTable {
        let schema =
            SpeciesSchema::new(vec!["sp_A".to_string(), "sp_B".to_string()]).unwrap();
        SurveyTable::new(
            schema,
            vec![
                SurveyRow {
                    site: "meadow".to_string(),
                    method: "Malaise".to_string(),
                    counts: vec![3, 0],
                },
                SurveyRow {
                    site: "meadow".to_string(),
                    method: "Pollard Walk".to_string(),
                    counts: vec![1, 2],
                },
            ],
        )
        .unwrap()
    }

    fn create_traits() -> TraitTable {
        TraitTable::new(vec![
            ("sp_A".to_string(), SizeRange { min: 4.0, max: 6.0 }),
            ("sp_B".to_string(), SizeRange { min: 10.0, max: 12.0 }),
        ])
        .unwrap()
    }

    #[test]
    fn test_row_count_is_r_times_s() {
        let long = to_long(&create_survey(), &create_traits()).unwrap();
        assert_eq!(long.len(), 2 * 2);
    }

    #[test]
    fn test_join_carries_size() {
        let long = to_long(&create_survey(), &create_traits()).unwrap();

        let first = &long.observations()[0];
        assert_eq!(first.site, "meadow");
        assert_eq!(first.method, "Malaise");
        assert_eq!(first.species, "sp_A");
        assert_eq!(first.count, 3);
        assert_relative_eq!(first.size, 5.0);

        // Every emitted row has a finite, positive size.
        assert!(long
            .observations()
            .iter()
            .all(|o| o.size.is_finite() && o.size > 0.0));
    }

    #[test]
    fn test_totals_preserved() {
        let survey = create_survey();
        let long = to_long(&survey, &create_traits()).unwrap();

        assert_eq!(long.total_for("meadow", "Malaise"), 3);
        assert_eq!(long.total_for("meadow", "Pollard Walk"), 3);
    }

    #[test]
    fn test_missing_trait_is_join_error() {
        let traits = TraitTable::new(vec![(
            "sp_A".to_string(),
            SizeRange { min: 4.0, max: 6.0 },
        )])
        .unwrap();

        let result = to_long(&create_survey(), &traits);
        match result {
            Err(SurveyError::Join { species }) => assert_eq!(species, "sp_B"),
            other => panic!("expected Join error, got {:?}", other.map(|t| t.len())),
        }
    }
}
