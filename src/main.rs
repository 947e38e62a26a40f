use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use grove_io::{AfmReader, CaseWriter};
use grove_split::{FeatureMatrix, RankedFeature, SplitCriterion, SplitterConfig, SurveyConfig};

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Split search, shuffled contrasts and feature ranking over annotated feature matrices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Append shuffled contrast copies of features and write the result
    Contrast {
        /// Path to the input AFM file (plain, gzip or single-entry zip)
        #[arg(long)]
        data: PathBuf,

        /// Path of the AFM file to write
        #[arg(long)]
        output: PathBuf,

        /// Number of contrasts to add, drawn from random source features
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        n: Option<usize>,

        /// Add one contrast per original feature
        #[arg(long)]
        all: bool,
    },

    /// Fill missing values (mean for numeric, mode for categorical) and write the result
    Impute {
        /// Path to the input AFM file (plain, gzip or single-entry zip)
        #[arg(long)]
        data: PathBuf,

        /// Path of the AFM file to write
        #[arg(long)]
        output: PathBuf,
    },

    /// Rank features by how often and how strongly they split the target
    Rank {
        /// Path to the input AFM file (plain, gzip or single-entry zip)
        #[arg(long)]
        data: PathBuf,

        /// Name of the target feature
        #[arg(long)]
        target: String,

        /// Number of bootstrap rounds
        #[arg(long, default_value_t = 100)]
        rounds: usize,

        /// Reject splits that do not beat their shuffled contrast
        #[arg(long, default_value_t = false)]
        vet: bool,

        /// Score each round's winner on its out-of-bag cases
        #[arg(long, default_value_t = false)]
        eval_oob: bool,

        /// Minimum cases on each side of a split
        #[arg(long, default_value_t = 1)]
        min_leaf_size: usize,

        /// Candidate features sampled per round (all if not set)
        #[arg(long)]
        mtry: Option<usize>,

        /// Shuffled contrasts appended before ranking
        #[arg(long, default_value_t = 0)]
        contrasts: usize,

        /// Use entropy instead of Gini for categorical targets
        #[arg(long, default_value_t = false)]
        entropy: bool,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct RewriteOutput {
    output: PathBuf,
    n_features: usize,
    n_cases: usize,
    added_contrasts: usize,
    imputed_cells: usize,
}

#[derive(Serialize)]
struct RankOutput<'a> {
    target: &'a str,
    n_cases: usize,
    n_rounds: usize,
    n_split_rounds: usize,
    contrast_ceiling: f64,
    significant: Vec<&'a str>,
    ranked: &'a [RankedFeature],
}

fn read_matrix(data: &Path) -> Result<FeatureMatrix> {
    let matrix = AfmReader::new(data)
        .read()
        .with_context(|| format!("failed to read {}", data.display()))?;
    info!(
        n_features = matrix.n_features(),
        n_cases = matrix.n_cases(),
        "matrix loaded"
    );
    Ok(matrix)
}

fn write_matrix(matrix: &FeatureMatrix, output: &Path) -> Result<()> {
    CaseWriter::new(output)
        .write_all(matrix)
        .with_context(|| format!("failed to write {}", output.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);

    match cli.command {
        Command::Contrast {
            data,
            output,
            n,
            all,
        } => {
            let mut matrix = read_matrix(&data)?;
            let before = matrix.n_features();
            if all {
                matrix.contrast_all(&mut rng);
            } else {
                matrix.add_contrasts(n.unwrap_or(0), &mut rng);
            }
            write_matrix(&matrix, &output)?;

            let result = RewriteOutput {
                output,
                n_features: matrix.n_features(),
                n_cases: matrix.n_cases(),
                added_contrasts: matrix.n_features() - before,
                imputed_cells: 0,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Impute { data, output } => {
            let mut matrix = read_matrix(&data)?;
            let imputed = matrix.impute_missing();
            info!(imputed, "missing values filled");
            write_matrix(&matrix, &output)?;

            let result = RewriteOutput {
                output,
                n_features: matrix.n_features(),
                n_cases: matrix.n_cases(),
                added_contrasts: 0,
                imputed_cells: imputed,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Rank {
            data,
            target,
            rounds,
            vet,
            eval_oob,
            min_leaf_size,
            mtry,
            contrasts,
            entropy,
        } => {
            let mut matrix = read_matrix(&data)?;
            if contrasts > 0 {
                matrix.add_contrasts(contrasts, &mut rng);
            }

            let target_index = matrix
                .index_of(&target)
                .with_context(|| format!("target feature {target:?} not found"))?;
            let criterion = if entropy {
                SplitCriterion::Entropy
            } else {
                SplitCriterion::Gini
            };

            let splitter = SplitterConfig::new(min_leaf_size)?
                .with_vet(vet)
                .with_eval_oob(eval_oob);
            let config = SurveyConfig::new(rounds)?
                .with_seed(cli.seed)
                .with_candidates_per_round(mtry)
                .with_splitter(splitter);

            let result = config
                .survey(&matrix, target_index, criterion)
                .context("feature ranking failed")?;

            let output = RankOutput {
                target: result.target(),
                n_cases: matrix.n_cases(),
                n_rounds: result.n_rounds(),
                n_split_rounds: result.n_split_rounds(),
                contrast_ceiling: result.contrast_ceiling(),
                significant: result.significant().iter().map(|r| r.name.as_str()).collect(),
                ranked: result.ranked(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
