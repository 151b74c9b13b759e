use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use shelfwise_ai::{ChatClient, CompletionClient};
use shelfwise_catalog::{
    CatalogClient, FileMetadataReader, HeuristicPolicy, Prompter, ResolutionPipeline, Resolver, StdinPrompter,
};
use shelfwise_core::config::RenameConfirmation;
use shelfwise_core::file_import::scan_directory;
use shelfwise_core::{AppConfig, DisambiguationStrategy, ExitCode, parse_filename};

mod organize;

use organize::{Confirmer, Organizer};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "shelfwise",
    about = "Organize ebook files into named folders with catalog metadata",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting SHELFWISE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr. RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and organize every book file in a directory.
    Organize {
        /// Directory to scan (defaults to library.books_dir).
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Where book folders are created (defaults to library.output_dir).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Show the planned renames without touching any file.
        #[arg(long)]
        dry_run: bool,
        /// Tie-breaking strategy (defaults to preferences.strategy).
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },

    /// Show what the filename alone says about a book.
    Parse { filename: String },

    /// Search the catalog and print the resolved record as JSON.
    Search {
        query: String,
        /// Expected author, used to break ties.
        #[arg(long)]
        author: Option<String>,
        /// Skip the detail page.
        #[arg(long)]
        no_detail: bool,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file location.
    Path,
    /// Write the default configuration.
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Interactive,
    Heuristic,
    Arbiter,
}

impl From<StrategyArg> for DisambiguationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Interactive => DisambiguationStrategy::Interactive,
            StrategyArg::Heuristic => DisambiguationStrategy::Heuristic,
            StrategyArg::Arbiter => DisambiguationStrategy::Arbiter,
        }
    }
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let json_output = cli.json || std::env::var("SHELFWISE_JSON").as_deref() == Ok("1");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid config {}: {e}", AppConfig::config_path().display());
            std::process::exit(ExitCode::InvalidArgs as i32);
        }
    };

    match cli.command {
        // ── Organize ───────────────────────────────────────────────────────
        Commands::Organize {
            dir,
            output,
            dry_run,
            strategy,
        } => {
            let books_dir = dir.unwrap_or_else(|| config.books_dir());
            let output_dir = output.unwrap_or_else(|| config.output_dir());
            let strategy = strategy.map(Into::into).unwrap_or(config.preferences.strategy);

            let files = match scan_directory(&books_dir, &config.library.supported_formats) {
                Ok(files) => files,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(ExitCode::FileSystemError as i32);
                }
            };
            info!(dir = %books_dir.display(), count = files.len(), ?strategy, dry_run, "starting organize run");
            if files.is_empty() {
                println!("No book files in {}", books_dir.display());
                return Ok(());
            }

            let console: Arc<dyn Prompter> = Arc::new(StdinPrompter);
            let pipeline = build_pipeline(&config, strategy, console.clone())?;
            let confirmer = build_confirmer(&config, console.clone());

            let organizer = Organizer {
                config: &config,
                pipeline: &pipeline,
                confirmer: &confirmer,
                console: console.as_ref(),
                output_dir,
                dry_run,
            };
            let report = organizer.run(&files).await;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "organized": report.organized,
                        "bare_renamed": report.bare_renamed,
                        "skipped": report.skipped,
                        "failed": report.failed,
                        "dry_run": dry_run,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("\n{report}");
            }
            if report.failed > 0 {
                std::process::exit(ExitCode::GeneralError as i32);
            }
        }

        // ── Parse ──────────────────────────────────────────────────────────
        Commands::Parse { filename } => {
            let tokens = parse_filename(&filename);
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":tokens,"meta":{"duration_ms":start.elapsed().as_millis()}}))?;
            } else {
                let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
                println!("author:    {}", show(&tokens.author));
                println!("title:     {}", show(&tokens.title));
                println!("year:      {}", show(&tokens.year));
                println!("extension: {}", tokens.extension);
            }
        }

        // ── Search ─────────────────────────────────────────────────────────
        Commands::Search {
            query,
            author,
            no_detail,
        } => {
            let resolver = build_resolver(&config, config.preferences.strategy, Arc::new(StdinPrompter));
            let catalog = CatalogClient::new(&config.network, &config.catalog, resolver)?;
            let fetch_detail = config.catalog.fetch_detail && !no_detail;
            let record = catalog
                .search(&query, author.as_deref(), fetch_detail, config.catalog.min_similarity)
                .await;
            let dur = start.elapsed().as_millis();

            match record {
                Some(record) if json_output => {
                    print_json(&serde_json::json!({"status":"ok","data":record,"meta":{"duration_ms":dur}}))?;
                }
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => {
                    if json_output {
                        print_json(&serde_json::json!({"status":"error","error":"not_found","message":format!("No catalog match for {query}"),"meta":{"duration_ms":dur}}))?;
                    } else {
                        eprintln!("No catalog match for: {query}");
                    }
                    std::process::exit(ExitCode::GeneralError as i32);
                }
            }
        }

        // ── Config ─────────────────────────────────────────────────────────
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":config,"meta":{"duration_ms":start.elapsed().as_millis()}}))?;
                } else {
                    print!("{}", config.to_toml_string()?);
                }
            }
            ConfigAction::Path => {
                let path = AppConfig::config_path();
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"path":path,"exists":path.exists()}}))?;
                } else {
                    println!("{}", path.display());
                }
            }
            ConfigAction::Init { force } => {
                let path = AppConfig::config_path();
                if path.exists() && !force {
                    eprintln!("Config already exists: {} (use --force to overwrite)", path.display());
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
                AppConfig::default()
                    .save_to(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote default config to {}", path.display());
            }
        },
    }

    Ok(())
}

// ─── Setup ───────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let default = if verbose > 0 { "shelfwise=debug" } else { "shelfwise=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Reasoning-service client, or `None` when no key is configured.
fn arbiter_client(config: &AppConfig) -> Option<Arc<dyn CompletionClient>> {
    match ChatClient::new(&config.ai, config.ai_api_key()) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "reasoning service unavailable");
            None
        }
    }
}

fn build_resolver(config: &AppConfig, strategy: DisambiguationStrategy, console: Arc<dyn Prompter>) -> Resolver {
    let fallback = HeuristicPolicy::from_preferences(&config.preferences);
    match strategy {
        DisambiguationStrategy::Interactive => Resolver::Interactive(console),
        DisambiguationStrategy::Heuristic => Resolver::Heuristic(fallback),
        DisambiguationStrategy::Arbiter => match arbiter_client(config) {
            Some(client) => Resolver::Arbiter { client, fallback },
            None => {
                warn!("falling back to the heuristic strategy");
                Resolver::Heuristic(fallback)
            }
        },
    }
}

fn build_pipeline(
    config: &AppConfig,
    strategy: DisambiguationStrategy,
    console: Arc<dyn Prompter>,
) -> Result<ResolutionPipeline> {
    let resolver = build_resolver(config, strategy, console.clone());
    let catalog = CatalogClient::new(&config.network, &config.catalog, resolver)?;
    let pipeline = ResolutionPipeline::new(catalog, Arc::new(FileMetadataReader));
    Ok(match strategy {
        DisambiguationStrategy::Interactive => pipeline.with_prompter(console),
        _ => pipeline,
    })
}

fn build_confirmer(config: &AppConfig, console: Arc<dyn Prompter>) -> Confirmer {
    match config.preferences.confirm_renames {
        RenameConfirmation::Ask => Confirmer::Ask(console),
        RenameConfirmation::Auto => Confirmer::Auto,
        RenameConfirmation::Arbiter => match arbiter_client(config) {
            Some(client) => Confirmer::Arbiter(client),
            None => {
                warn!("asking the operator to confirm renames instead");
                Confirmer::Ask(console)
            }
        },
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
