//! Wide-format survey table: one row per (site, collection method) pair.

use crate::data::SpeciesSchema;
use crate::error::{Result, SurveyError};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Metadata column holding the site identifier.
pub const SITE_COLUMN: &str = "site";
/// Metadata column holding the collection method.
pub const METHOD_COLUMN: &str = "method";

/// One survey record: a site visited with one collection method, with
/// per-species abundance counts indexed by the table's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyRow {
    /// Site identifier.
    pub site: String,
    /// Collection method (e.g., "Malaise" or "Pollard Walk").
    pub method: String,
    /// Abundance counts, one per species column in schema order.
    pub counts: Vec<u64>,
}

impl SurveyRow {
    /// Total individuals counted in this record.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// A wide survey table with a validated species schema.
///
/// Immutable after construction: filtering operations return a new table.
#[derive(Debug, Clone)]
pub struct SurveyTable {
    schema: SpeciesSchema,
    rows: Vec<SurveyRow>,
    /// Rows dropped at load time for missing site/method metadata.
    n_dropped: usize,
}

impl SurveyTable {
    /// Create a table from a schema and rows, validating count-vector lengths.
    pub fn new(schema: SpeciesSchema, rows: Vec<SurveyRow>) -> Result<Self> {
        for row in &rows {
            if row.counts.len() != schema.len() {
                return Err(SurveyError::DimensionMismatch {
                    expected: schema.len(),
                    actual: row.counts.len(),
                });
            }
        }
        Ok(Self {
            schema,
            rows,
            n_dropped: 0,
        })
    }

    /// Load a survey table from a TSV file.
    ///
    /// Expected format: a header row containing `site`, `method`, and one
    /// column per species; data rows with the site identifier, collection
    /// method, and integer counts.
    ///
    /// Rows with an empty or `NA` site or method are dropped silently (the
    /// count is available via [`n_dropped`](Self::n_dropped)). A count value
    /// that does not parse as a non-negative integer is a hard error.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_tsv_with_metadata(path, &[])
    }

    /// Load a survey table, treating `extra_metadata` columns as metadata
    /// rather than species counts (they are carried past, not parsed).
    pub fn from_tsv_with_metadata<P: AsRef<Path>>(
        path: P,
        extra_metadata: &[&str],
    ) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let site_idx = headers
            .iter()
            .position(|h| h == SITE_COLUMN)
            .ok_or_else(|| SurveyError::MissingColumn(SITE_COLUMN.to_string()))?;
        let method_idx = headers
            .iter()
            .position(|h| h == METHOD_COLUMN)
            .ok_or_else(|| SurveyError::MissingColumn(METHOD_COLUMN.to_string()))?;

        // Everything that is not metadata is a species column.
        let mut species_cols: Vec<(usize, String)> = Vec::new();
        for (i, name) in headers.iter().enumerate() {
            if i == site_idx || i == method_idx || extra_metadata.contains(&name) {
                continue;
            }
            species_cols.push((i, name.to_string()));
        }

        let schema = SpeciesSchema::new(
            species_cols.iter().map(|(_, name)| name.clone()).collect(),
        )?;

        let mut rows = Vec::new();
        let mut n_dropped = 0;

        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let site = record.get(site_idx).unwrap_or("").trim();
            let method = record.get(method_idx).unwrap_or("").trim();

            if is_missing(site) || is_missing(method) {
                n_dropped += 1;
                continue;
            }

            let mut counts = Vec::with_capacity(species_cols.len());
            for (col_idx, col_name) in &species_cols {
                let raw = record.get(*col_idx).unwrap_or("").trim();
                let value: u64 = raw.parse().map_err(|_| SurveyError::InvalidCount {
                    value: raw.to_string(),
                    row: row_idx,
                    column: col_name.clone(),
                })?;
                counts.push(value);
            }

            rows.push(SurveyRow {
                site: site.to_string(),
                method: method.to_string(),
                counts,
            });
        }

        if rows.is_empty() {
            return Err(SurveyError::EmptyData(
                "No usable rows in survey table".to_string(),
            ));
        }

        Ok(Self {
            schema,
            rows,
            n_dropped,
        })
    }

    /// The species schema.
    pub fn schema(&self) -> &SpeciesSchema {
        &self.schema
    }

    /// All survey rows.
    pub fn rows(&self) -> &[SurveyRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of species columns.
    pub fn n_species(&self) -> usize {
        self.schema.len()
    }

    /// Rows dropped at load time for missing metadata.
    pub fn n_dropped(&self) -> usize {
        self.n_dropped
    }

    /// Distinct collection methods, sorted.
    pub fn methods(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.method.as_str()).collect();
        set.into_iter().map(String::from).collect()
    }

    /// Distinct site identifiers, sorted.
    pub fn sites(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.site.as_str()).collect();
        set.into_iter().map(String::from).collect()
    }

    /// Rows collected with a specific method.
    pub fn rows_for_method(&self, method: &str) -> Vec<&SurveyRow> {
        self.rows.iter().filter(|r| r.method == method).collect()
    }

    /// Restrict the table to sites surveyed under every collection method.
    ///
    /// The kept site set is the intersection of the site sets observed under
    /// each distinct method value; a site missing any method is excluded from
    /// every downstream computation. Returns a new table.
    pub fn retain_paired_sites(&self) -> Self {
        let methods = self.methods();
        let mut paired: Option<HashSet<&str>> = None;

        for method in &methods {
            let sites: HashSet<&str> = self
                .rows
                .iter()
                .filter(|r| &r.method == method)
                .map(|r| r.site.as_str())
                .collect();
            paired = Some(match paired {
                Some(acc) => acc.intersection(&sites).copied().collect(),
                None => sites,
            });
        }

        let paired = paired.unwrap_or_default();
        let rows: Vec<SurveyRow> = self
            .rows
            .iter()
            .filter(|r| paired.contains(r.site.as_str()))
            .cloned()
            .collect();

        Self {
            schema: self.schema.clone(),
            rows,
            n_dropped: self.n_dropped,
        }
    }
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "NA" || value == "na"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "site\tmethod\tsp_A\tsp_B\tsp_C").unwrap();
        writeln!(file, "meadow\tMalaise\t3\t0\t1").unwrap();
        writeln!(file, "meadow\tPollard Walk\t0\t2\t0").unwrap();
        writeln!(file, "forest\tMalaise\t1\t1\t0").unwrap();
        writeln!(file, "forest\tPollard Walk\t0\t0\t0").unwrap();
        writeln!(file, "bog\tPollard Walk\t5\t0\t0").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_survey() {
        let file = create_test_tsv();
        let table = SurveyTable::from_tsv(file.path()).unwrap();

        assert_eq!(table.n_rows(), 5);
        assert_eq!(table.n_species(), 3);
        assert_eq!(table.schema().species_ids(), &["sp_A", "sp_B", "sp_C"]);
        assert_eq!(table.methods(), vec!["Malaise", "Pollard Walk"]);
        assert_eq!(table.sites(), vec!["bog", "forest", "meadow"]);
        assert_eq!(table.rows()[0].counts, vec![3, 0, 1]);
    }

    #[test]
    fn test_missing_metadata_dropped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "site\tmethod\tsp_A").unwrap();
        writeln!(file, "meadow\tMalaise\t3").unwrap();
        writeln!(file, "\tMalaise\t1").unwrap();
        writeln!(file, "forest\tNA\t2").unwrap();
        file.flush().unwrap();

        let table = SurveyTable::from_tsv(file.path()).unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.n_dropped(), 2);
    }

    #[test]
    fn test_invalid_count_is_hard_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "site\tmethod\tsp_A").unwrap();
        writeln!(file, "meadow\tMalaise\tthree").unwrap();
        file.flush().unwrap();

        let result = SurveyTable::from_tsv(file.path());
        assert!(matches!(result, Err(SurveyError::InvalidCount { .. })));
    }

    #[test]
    fn test_retain_paired_sites() {
        let file = create_test_tsv();
        let table = SurveyTable::from_tsv(file.path()).unwrap();
        let paired = table.retain_paired_sites();

        // "bog" only has a Pollard Walk row, so it must vanish entirely.
        assert_eq!(paired.n_rows(), 4);
        assert_eq!(paired.sites(), vec!["forest", "meadow"]);
        assert!(paired.rows().iter().all(|r| r.site != "bog"));
    }

    #[test]
    fn test_extra_metadata_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "site\tmethod\tdate\tsp_A\tsp_B").unwrap();
        writeln!(file, "meadow\tMalaise\t2023-06-01\t3\t2").unwrap();
        file.flush().unwrap();

        let table = SurveyTable::from_tsv_with_metadata(file.path(), &["date"]).unwrap();
        assert_eq!(table.n_species(), 2);
        assert_eq!(table.schema().species_ids(), &["sp_A", "sp_B"]);
    }

    #[test]
    fn test_missing_required_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "location\tmethod\tsp_A").unwrap();
        writeln!(file, "meadow\tMalaise\t3").unwrap();
        file.flush().unwrap();

        let result = SurveyTable::from_tsv(file.path());
        assert!(matches!(result, Err(SurveyError::MissingColumn(_))));
    }

    #[test]
    fn test_row_total() {
        let file = create_test_tsv();
        let table = SurveyTable::from_tsv(file.path()).unwrap();
        assert_eq!(table.rows()[0].total(), 4);
        assert_eq!(table.rows()[3].total(), 0);
    }
}
