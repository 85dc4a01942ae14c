//! Species richness: count of species present at least once in a rowset.

use crate::data::{CrowdRecord, SurveyRow, SurveyTable};
use std::collections::BTreeSet;

/// Richness of a set of survey rows: the number of species columns whose
/// sum across the rows is strictly positive.
///
/// Pure function of its inputs; an empty rowset has richness 0.
pub fn richness(rows: &[&SurveyRow], n_species: usize) -> usize {
    let mut present = vec![false; n_species];
    for row in rows {
        for (col, &count) in row.counts.iter().enumerate() {
            if count > 0 {
                present[col] = true;
            }
        }
    }
    present.iter().filter(|&&p| p).count()
}

/// Observed richness per collection method, in sorted method order.
pub fn observed_richness_by_method(table: &SurveyTable) -> Vec<(String, usize)> {
    table
        .methods()
        .into_iter()
        .map(|method| {
            let rows = table.rows_for_method(&method);
            let r = richness(&rows, table.n_species());
            (method, r)
        })
        .collect()
}

/// The analogous statistic for crowd-sourced sightings: distinct species
/// identifiers in the rowset (each row is a single presence).
pub fn unique_species(records: &[&CrowdRecord]) -> usize {
    let set: BTreeSet<&str> = records.iter().map(|r| r.species.as_str()).collect();
    set.len()
}
