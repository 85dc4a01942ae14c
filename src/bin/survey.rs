//! Survey richness analysis CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use survey_richness::bootstrap::{
    bootstrap_crowd_species, bootstrap_richness_by_method, BootstrapConfig,
};
use survey_richness::compare::compare_bootstrap;
use survey_richness::config::AnalysisConfig;
use survey_richness::data::{CrowdTable, SurveyTable, TraitTable};
use survey_richness::error::{Result, SurveyError};
use survey_richness::model::{fit_lmm, LmmConfig, ModelSpec};
use survey_richness::richness::observed_richness_by_method;
use survey_richness::summary::{summarize_methods, write_summary_tsv};
use survey_richness::transform::to_long;

/// Species richness analysis for paired field surveys
#[derive(Parser)]
#[command(name = "survey")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Optional YAML configuration file
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Observed richness per collection method
    Richness {
        /// Path to the wide survey TSV
        #[arg(short, long)]
        survey: PathBuf,
    },
    /// Bootstrap richness distributions per collection method
    Bootstrap {
        #[arg(short, long)]
        survey: PathBuf,

        /// Number of bootstrap iterations (overrides config)
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Random seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Write the full draws as JSON to this path
        #[arg(long)]
        draws: Option<PathBuf>,
    },
    /// Bootstrap unique-species counts from crowd observations
    Crowd {
        /// Path to the crowd observation TSV
        #[arg(short, long)]
        observations: PathBuf,

        #[arg(short, long)]
        iterations: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Fit the mixed model: abundance ~ method [+ size [+ interaction]] + (1 | site)
    Model {
        #[arg(short, long)]
        survey: PathBuf,

        /// Path to the species trait TSV
        #[arg(short, long)]
        traits: PathBuf,

        /// Include the body-size covariate
        #[arg(long)]
        size: bool,

        /// Include the method x size interaction
        #[arg(long)]
        interaction: bool,
    },
    /// Bootstrap both methods and run a Welch test between them
    Compare {
        #[arg(short, long)]
        survey: PathBuf,

        #[arg(short, long)]
        iterations: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AnalysisConfig::from_yaml(path)?,
        None => AnalysisConfig::default(),
    };

    match cli.command {
        Commands::Richness { survey } => {
            let table = load_survey(&survey)?;
            println!("method\tn_rows\trichness");
            for (method, richness) in observed_richness_by_method(&table) {
                let n = table.rows_for_method(&method).len();
                println!("{}\t{}\t{}", config.display_label(&method), n, richness);
            }
        }
        Commands::Bootstrap {
            survey,
            iterations,
            seed,
            draws,
        } => {
            let table = load_survey(&survey)?;
            let boot = override_bootstrap(&config, iterations, seed);
            let summaries = summarize_methods(&table, &boot)?;
            write_summary_tsv(&summaries, std::io::stdout().lock())?;

            if let Some(path) = draws {
                let groups = bootstrap_richness_by_method(&table, &boot)?;
                let file = std::fs::File::create(path)?;
                serde_json::to_writer_pretty(file, &groups)?;
            }
        }
        Commands::Crowd {
            observations,
            iterations,
            seed,
        } => {
            let table = CrowdTable::from_tsv(&observations)?;
            eprintln!(
                "Loaded {} sightings ({} dropped)",
                table.len(),
                table.n_dropped()
            );
            let boot = override_bootstrap(&config, iterations, seed);
            let sample = bootstrap_crowd_species(&table, &boot)?;
            println!("observed\tboot_mean\tboot_sd\tlower\tupper\titerations");
            println!(
                "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{}",
                table.unique_species(),
                sample.mean(),
                sample.std_dev(),
                sample.quantile(0.025),
                sample.quantile(0.975),
                sample.len()
            );
        }
        Commands::Model {
            survey,
            traits,
            size,
            interaction,
        } => {
            let table = load_survey(&survey)?;
            let trait_table = TraitTable::from_tsv(&traits)?;
            let long = to_long(&table, &trait_table)?;
            let spec = if size || interaction {
                ModelSpec {
                    size_covariate: size || interaction,
                    interaction,
                }
            } else {
                config.model
            };

            let fit = fit_lmm(&long, &spec, &LmmConfig::default())?;
            println!("term\testimate\tstd_error\tt\tp_value");
            for effect in &fit.fixed_effects {
                println!(
                    "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
                    effect.name,
                    effect.estimate,
                    effect.std_error,
                    effect.t_statistic,
                    effect.p_value
                );
            }
            eprintln!(
                "tau2 = {:.4}, sigma2 = {:.4}, ICC = {:.3}, converged in {} iterations",
                fit.tau2, fit.sigma2, fit.icc, fit.iterations
            );
        }
        Commands::Compare {
            survey,
            iterations,
            seed,
        } => {
            let table = load_survey(&survey)?;
            let boot = override_bootstrap(&config, iterations, seed);
            let groups = bootstrap_richness_by_method(&table, &boot)?;
            if groups.len() != 2 {
                return Err(SurveyError::InvalidParameter(format!(
                    "compare expects exactly 2 collection methods, found {}",
                    groups.len()
                )));
            }

            let test = compare_bootstrap(&groups[0].1, &groups[1].1)?;
            println!("group_a\tgroup_b\tmean_a\tmean_b\tt\tdf\tp_value");
            println!(
                "{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.1}\t{:.4}",
                config.display_label(&groups[0].0),
                config.display_label(&groups[1].0),
                test.mean_a,
                test.mean_b,
                test.statistic,
                test.df,
                test.p_value
            );
        }
    }

    Ok(())
}

/// Load the survey table and restrict it to sites covered by every method.
fn load_survey(path: &PathBuf) -> Result<SurveyTable> {
    let table = SurveyTable::from_tsv(path)?;
    if table.n_dropped() > 0 {
        eprintln!("Dropped {} rows with missing metadata", table.n_dropped());
    }
    let paired = table.retain_paired_sites();
    if paired.n_rows() < table.n_rows() {
        eprintln!(
            "Excluded {} rows from sites not covered by every method",
            table.n_rows() - paired.n_rows()
        );
    }
    Ok(paired)
}

fn override_bootstrap(
    config: &AnalysisConfig,
    iterations: Option<usize>,
    seed: Option<u64>,
) -> BootstrapConfig {
    let mut boot = config.bootstrap.clone();
    if let Some(iterations) = iterations {
        boot.iterations = iterations;
    }
    if let Some(seed) = seed {
        boot.seed = seed;
    }
    boot
}
