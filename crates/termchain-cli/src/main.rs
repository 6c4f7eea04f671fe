use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use termchain_core::{ConfigManager, DifficultyTier, LoggingConfig, Term, TermChainConfig, TermId};
use termchain_game::{
    BatchRequest, DistractorGenerator, GameAssembler, GameRequest, RouteGenerator, RouteRequest,
};
use termchain_graph::{GraphCache, JsonTermRepository};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "termchain")]
#[command(about = "Term-chain CLI - route, distractor and game generation over seed data", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Directory holding terms.json and edges.json
    #[arg(long, global = true, env = "TERMCHAIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Explicit config file instead of the default search path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a route
    Route {
        /// Number of terms in the route
        #[arg(short, long)]
        length: Option<usize>,

        /// easy, normal (or standard), hard
        #[arg(short, long, default_value = "normal")]
        difficulty: DifficultyTier,

        #[arg(short, long)]
        seed: Option<u64>,

        /// Pin the first term
        #[arg(long)]
        start: Option<TermId>,

        #[arg(long)]
        max_start_retries: Option<usize>,

        #[arg(long)]
        max_same_start_retries: Option<usize>,
    },

    /// Sample wrong answers for a correct term
    Distractors {
        /// The correct answer
        correct: TermId,

        /// Already visited terms (comma-separated)
        #[arg(long, value_delimiter = ',')]
        visited: Vec<TermId>,

        #[arg(short, long, default_value = "normal")]
        difficulty: DifficultyTier,

        #[arg(short, long)]
        count: Option<usize>,

        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Assemble a full game
    Game {
        #[arg(short, long)]
        length: Option<usize>,

        #[arg(short, long, default_value = "normal")]
        difficulty: DifficultyTier,

        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Pre-generate complete games, exits non-zero when fewer than requested were found
    Batch {
        /// Number of complete games to collect
        #[arg(short, long, default_value_t = 50)]
        count: usize,

        #[arg(short, long)]
        length: Option<usize>,

        #[arg(short, long, default_value = "easy")]
        difficulty: DifficultyTier,

        #[arg(short, long)]
        seed: Option<u64>,

        /// Walk attempts before giving up (default: 500 per game)
        #[arg(long)]
        max_attempts: Option<usize>,
    },

    /// Data quality report, exits non-zero when the graph is not playable
    Check,

    /// Snapshot statistics
    Stats,
}

#[derive(Serialize)]
struct RouteResult {
    difficulty: DifficultyTier,
    target_length: usize,
    length: usize,
    complete: bool,
    terms: Vec<TermSummary>,
}

#[derive(Serialize)]
struct TermSummary {
    id: TermId,
    name: String,
    tier: u8,
}

impl From<&Term> for TermSummary {
    fn from(term: &Term) -> Self {
        Self {
            id: term.id,
            name: term.name.clone(),
            tier: term.tier,
        }
    }
}

#[derive(Serialize)]
struct StatsResult {
    data_dir: String,
    snapshot_version: u64,
    loaded_at: String,
    terms: usize,
    edges: usize,
    eligible_easy: usize,
    eligible_normal: usize,
    eligible_hard: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok((output, success)) => {
            print_output(&cli.output, &output)?;
            if !success {
                std::process::exit(2);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<(serde_json::Value, bool)> {
    // The configured subscriber depends on the config, so loading logs through a
    // stderr bootstrap subscriber instead.
    let config = tracing::subscriber::with_default(bootstrap_subscriber(), || load_config(cli))?;
    init_tracing(&config.logging);
    execute_command(cli, &config).await
}

fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

fn load_config(cli: &Cli) -> Result<TermChainConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_path(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;

    let mut config = manager.config().clone();
    if let Some(dir) = &cli.data_dir {
        config.data.data_dir = dir.clone();
    }
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "termchain={0},termchain_core={0},termchain_graph={0},termchain_game={0}",
            logging.level
        ))
    });
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so `--output json` stays machine readable.
    match logging.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "compact" => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn load_cache(config: &TermChainConfig) -> Result<Arc<GraphCache>> {
    let repository = Arc::new(JsonTermRepository::new(&config.data.data_dir));
    let data_dir = repository.data_dir().display().to_string();
    let cache = GraphCache::initialize(repository)
        .await
        .with_context(|| format!("Failed to load term graph from {}", data_dir))?;
    info!("Term graph loaded from {}", data_dir);
    Ok(cache)
}

/// Runs the command, returning its output and whether it succeeded.
async fn execute_command(cli: &Cli, config: &TermChainConfig) -> Result<(serde_json::Value, bool)> {
    let cache = load_cache(config).await?;

    match &cli.command {
        Commands::Route {
            length,
            difficulty,
            seed,
            start,
            max_start_retries,
            max_same_start_retries,
        } => {
            let mut request =
                RouteRequest::new(length.unwrap_or(config.route.default_length), *difficulty);
            request.seed = *seed;
            request.start = *start;
            request.max_start_retries = *max_start_retries;
            request.max_same_start_retries = *max_same_start_retries;

            let generator = RouteGenerator::new(Arc::clone(&cache), config.route);
            let route = generator
                .generate_route(&request)
                .context("Failed to generate route")?;

            let snapshot = cache.snapshot()?;
            let result = RouteResult {
                difficulty: route.difficulty,
                target_length: route.target_length,
                length: route.len(),
                complete: route.is_complete(),
                terms: route
                    .as_slice()
                    .iter()
                    .filter_map(|id| snapshot.term(*id))
                    .map(TermSummary::from)
                    .collect(),
            };
            Ok((serde_json::to_value(result)?, true))
        }

        Commands::Distractors {
            correct,
            visited,
            difficulty,
            count,
            seed,
        } => {
            let generator = DistractorGenerator::new(Arc::clone(&cache));
            let ids = generator
                .generate_distractors(
                    *correct,
                    visited,
                    *difficulty,
                    count.unwrap_or(config.distractor.count),
                    *seed,
                )
                .context("Failed to generate distractors")?;

            let snapshot = cache.snapshot()?;
            let distractors: Vec<TermSummary> = ids
                .iter()
                .filter_map(|id| snapshot.term(*id))
                .map(TermSummary::from)
                .collect();
            Ok((
                serde_json::json!({
                    "correct": correct,
                    "difficulty": difficulty,
                    "distractors": distractors,
                }),
                true,
            ))
        }

        Commands::Game {
            length,
            difficulty,
            seed,
        } => {
            let assembler = GameAssembler::from_config(cache, config);
            let plan = assembler
                .start_game(&GameRequest {
                    difficulty: *difficulty,
                    target_length: *length,
                    seed: *seed,
                })
                .context("Failed to assemble game")?;
            Ok((serde_json::to_value(plan)?, true))
        }

        Commands::Batch {
            count,
            length,
            difficulty,
            seed,
            max_attempts,
        } => {
            let mut request = BatchRequest::new(
                *count,
                length.unwrap_or(config.route.default_length),
                *difficulty,
            );
            request.seed = *seed;
            request.max_attempts = *max_attempts;

            let assembler = GameAssembler::from_config(cache, config);
            let batch = assembler
                .generate_batch(&request)
                .context("Failed to generate batch")?;
            let filled = !batch.stats.is_exhausted();
            Ok((serde_json::to_value(batch)?, filled))
        }

        Commands::Check => {
            let report = cache.snapshot()?.quality_report();
            for issue in report.issues() {
                eprintln!("{} {}", "Issue:".yellow().bold(), issue);
            }
            let playable = report.is_playable();
            Ok((serde_json::to_value(report)?, playable))
        }

        Commands::Stats => {
            let snapshot = cache.snapshot()?;
            let eligible = |tier: DifficultyTier| snapshot.terms_by_max_tier(tier.max_tier()).len();
            let result = StatsResult {
                data_dir: config.data.data_dir.display().to_string(),
                snapshot_version: snapshot.version(),
                loaded_at: snapshot.loaded_at().to_rfc3339(),
                terms: snapshot.term_count(),
                edges: snapshot.edge_count(),
                eligible_easy: eligible(DifficultyTier::Easy),
                eligible_normal: eligible(DifficultyTier::Normal),
                eligible_hard: eligible(DifficultyTier::Hard),
            };
            Ok((serde_json::to_value(result)?, true))
        }
    }
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value, 0)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}{}: {}", indent, key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}{}: {}", indent, key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{}{}: {}", indent, key_colored, val_colored);
                    }
                    serde_json::Value::Array(arr) if arr.iter().all(|v| !v.is_object()) => {
                        println!("{}{}: {}", indent, key_colored, val);
                    }
                    _ => {
                        println!("{}{}:", indent, key_colored);
                        print_pretty(val, depth + 1)?;
                    }
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{}{}{}:", indent, "Item ".cyan(), (i + 1).to_string().yellow());
                print_pretty(item, depth + 1)?;
            }
        }
        _ => {
            println!("{}{}", indent, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data_dir() -> String {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../data")
            .display()
            .to_string()
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli =
            Cli::try_parse_from(["termchain", "--config", "/nonexistent/termchain.toml", "stats"])
                .unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load configuration"));
    }

    #[tokio::test]
    async fn config_errors_flow_through_run() {
        let cli =
            Cli::try_parse_from(["termchain", "--config", "/nonexistent/termchain.toml", "stats"])
                .unwrap();
        let err = run(&cli).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load configuration"));
    }

    #[tokio::test]
    async fn batch_reports_plans_and_stats() {
        let data_dir = sample_data_dir();
        let cli = Cli::try_parse_from([
            "termchain",
            "--data-dir",
            data_dir.as_str(),
            "batch",
            "--count",
            "2",
            "--length",
            "5",
            "--difficulty",
            "hard",
            "--seed",
            "5",
        ])
        .unwrap();
        let mut config = TermChainConfig::default();
        config.data.data_dir = PathBuf::from(&data_dir);

        let (output, filled) = execute_command(&cli, &config).await.unwrap();
        assert!(filled);
        assert_eq!(output["stats"]["requested"], 2);
        assert_eq!(output["stats"]["generated"], 2);
        let plans = output["plans"].as_array().unwrap();
        assert_eq!(plans.len(), 2);
        for plan in plans {
            assert_eq!(plan["route"].as_array().map(Vec::len), Some(5));
        }
    }

    #[tokio::test]
    async fn batch_reports_shortfall() {
        let data_dir = sample_data_dir();
        let cli = Cli::try_parse_from([
            "termchain",
            "batch",
            "--count",
            "1",
            "--length",
            "40",
            "--max-attempts",
            "3",
        ])
        .unwrap();
        let mut config = TermChainConfig::default();
        config.data.data_dir = PathBuf::from(&data_dir);

        let (output, filled) = execute_command(&cli, &config).await.unwrap();
        assert!(!filled);
        assert_eq!(output["stats"]["attempts"], 3);
        assert_eq!(output["stats"]["generated"], 0);
    }
}
