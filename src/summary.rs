//! Observed-vs-bootstrapped richness summaries for the report renderer.

use crate::bootstrap::{bootstrap_richness_by_method, BootstrapConfig};
use crate::data::SurveyTable;
use crate::error::Result;
use crate::richness::richness;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One summary row: observed and bootstrapped richness for a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichnessSummary {
    /// Group label (collection method).
    pub group: String,
    /// Number of survey rows in the group.
    pub n_rows: usize,
    /// Observed richness of the group.
    pub observed: usize,
    /// Mean of the bootstrap distribution.
    pub boot_mean: f64,
    /// Standard deviation of the bootstrap distribution.
    pub boot_sd: f64,
    /// 2.5% quantile of the bootstrap distribution.
    pub lower: f64,
    /// 97.5% quantile of the bootstrap distribution.
    pub upper: f64,
    /// Number of bootstrap iterations.
    pub iterations: usize,
}

/// Bootstrap richness per collection method and pair each distribution with
/// the group's observed richness.
pub fn summarize_methods(
    table: &SurveyTable,
    config: &BootstrapConfig,
) -> Result<Vec<RichnessSummary>> {
    let groups = bootstrap_richness_by_method(table, config)?;

    Ok(groups
        .into_iter()
        .map(|(method, sample)| {
            let rows = table.rows_for_method(&method);
            let observed = richness(&rows, table.n_species());
            RichnessSummary {
                group: method,
                n_rows: rows.len(),
                observed,
                boot_mean: sample.mean(),
                boot_sd: sample.std_dev(),
                lower: sample.quantile(0.025),
                upper: sample.quantile(0.975),
                iterations: sample.len(),
            }
        })
        .collect())
}

/// Write summary rows as TSV.
pub fn write_summary_tsv<W: Write>(rows: &[RichnessSummary], mut writer: W) -> Result<()> {
    writeln!(
        writer,
        "group\tn_rows\tobserved\tboot_mean\tboot_sd\tlower\tupper\titerations"
    )?;
    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{}",
            row.group,
            row.n_rows,
            row.observed,
            row.boot_mean,
            row.boot_sd,
            row.lower,
            row.upper,
            row.iterations
        )?;
    }
    Ok(())
}
