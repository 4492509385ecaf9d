//! Prefrontal - command line entry point
//!
//! Runs missions through the leader/worker/inspector team, prints the static
//! roster, and checks oracle output files against a response schema.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use prefrontal_core::{
    allocation_requires_selector,
    config::DEFAULT_CONFIG_FILE,
    orchestration::{parse, validate, ParsedResponse, SchemaKind},
    HttpOracle, Oracle, Orchestrator, PrefrontalConfig, ScriptedOracle,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prefrontal")]
#[command(about = "Leader/worker/inspector agent coordination", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one mission and print its report as JSON
    Run {
        /// Mission description
        mission: String,

        /// Environment context line (repeatable)
        #[arg(long = "context")]
        context: Vec<String>,

        /// Answer from a JSON script instead of the HTTP oracle
        #[arg(long)]
        script: Option<PathBuf>,
    },

    /// Print the configured roster
    Roster,

    /// Check an oracle response file against a schema
    Validate {
        /// Schema kind (e.g. task-decomposition, worker-reflection)
        kind: SchemaKind,

        /// File holding the raw oracle response
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Quiet the HTTP stack below our own level
    let filter = EnvFilter::new(format!(
        "prefrontal={lvl},prefrontal_core={lvl},ractor=warn,reqwest=warn,hyper=warn",
        lvl = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Prefrontal v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run {
            mission,
            context,
            script,
        } => {
            let config = PrefrontalConfig::load(Some(&cli.config))?;

            let oracle: Arc<dyn Oracle> = match script {
                Some(path) => {
                    info!("Answering from script {}", path.display());
                    Arc::new(ScriptedOracle::from_file(&path)?)
                }
                None => Arc::new(HttpOracle::new(config.oracle.clone())?),
            };

            let mut orchestrator = Orchestrator::new(&config, oracle).await?;
            let outcome = orchestrator.execute_mission(&mission, context).await;

            if let Ok(Some(level)) = orchestrator.allocation_level().await {
                info!(
                    "Allocation level {}: action selector {}",
                    level,
                    if allocation_requires_selector(level) { "required" } else { "skipped" }
                );
            }
            orchestrator.shutdown().await;

            let report = outcome?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Roster => {
            let config = PrefrontalConfig::load(Some(&cli.config))?;
            let roster = &config.roster;

            println!("Leader:    {}", roster.leader);
            println!("Inspector: {}", roster.inspector);
            println!("Pipeline:  {}", roster.pipeline);
            println!("Workers:");
            for worker in &roster.workers {
                println!("  {:<10} {}", worker.id.to_string(), worker.expertise.title);
                println!("  {:<10} {}", "", worker.expertise.detail);
            }
            Ok(())
        }
        Commands::Validate { kind, file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            match parse(&raw) {
                ParsedResponse::Malformed { reason } => {
                    bail!("{}: malformed response ({})", file.display(), reason)
                }
                ParsedResponse::Object(value) => {
                    if !validate(kind, &value) {
                        bail!("{}: does not satisfy {}", file.display(), kind);
                    }
                    println!("{}: valid {}", file.display(), kind);
                    Ok(())
                }
            }
        }
    }
}
