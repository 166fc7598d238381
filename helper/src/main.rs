//! Command-line entry point: every native-messaging job is also reachable
//! as a subcommand, plus `host` to serve the stdio protocol itself.

use anyhow::Result;
use clap::{Parser, Subcommand};
use lexishift_helper::engine::HelperEngine;
use lexishift_helper::native;
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lexishift_helper",
    about = "LexiShift helper: rule generation, learning-set jobs and the native messaging host",
    version
)]
struct Cli {
    /// Override the data directory (default: the platform data root).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Profile to operate on.
    #[arg(long, global = true, default_value = "default")]
    profile: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the native-messaging protocol on stdin/stdout.
    Host,
    /// Print the helper status file.
    Status,
    /// List configured profiles.
    Profiles,
    /// Print the resolved data directory.
    DataDir,
    /// Generate a ruleset from a dictionary.
    Rulegen {
        pair: String,
        /// Dictionary file; defaults to the pair's pack under
        /// language_packs/.
        #[arg(long)]
        dictionary: Option<PathBuf>,
        #[arg(long)]
        frequency_db: Option<PathBuf>,
    },
    /// Bootstrap a learning set for a pair.
    SrsInit {
        pair: String,
        #[arg(long)]
        top_n: Option<i64>,
        #[arg(long)]
        initial_active: Option<i64>,
    },
    /// Plan a set change without executing it.
    SrsPlan {
        pair: String,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        objective: Option<String>,
        #[arg(long)]
        top_n: Option<i64>,
        #[arg(long)]
        initial_active: Option<i64>,
    },
    /// Run an admission refresh for a pair.
    SrsRefresh { pair: String },
    /// Remove learning data, for one pair or everything.
    SrsReset {
        #[arg(long)]
        pair: Option<String>,
    },
    /// Grade an item: again, hard, good or easy.
    Feedback {
        pair: String,
        lemma: String,
        rating: String,
    },
    /// Log a passive exposure.
    Exposure { pair: String, lemma: String },
    /// Print the runtime diagnostics for a pair.
    Diagnostics { pair: String },
    /// Print the rulegen snapshot for a pair.
    Snapshot { pair: String },
    /// Print the generated ruleset for a pair.
    Ruleset { pair: String },
}

fn print_payload(payload: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let engine = match &cli.data_dir {
        Some(dir) => HelperEngine::with_root(dir.clone(), &cli.profile)?,
        None => HelperEngine::new(Some(cli.profile.clone()))?,
    };

    match cli.command {
        Command::Host => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            native::serve(&engine, &mut stdin.lock(), &mut stdout.lock())?;
            Ok(())
        }
        Command::Status => print_payload(engine.status()?),
        Command::Profiles => print_payload(engine.profiles()?),
        Command::DataDir => {
            println!("{}", engine.data_root().display());
            Ok(())
        }
        Command::Rulegen {
            pair,
            dictionary,
            frequency_db,
        } => print_payload(engine.run_rulegen_job(&pair, dictionary, frequency_db)?),
        Command::SrsInit {
            pair,
            top_n,
            initial_active,
        } => print_payload(engine.initialize_srs_set(&pair, top_n, initial_active)?),
        Command::SrsPlan {
            pair,
            strategy,
            objective,
            top_n,
            initial_active,
        } => {
            let request = serde_json::json!({
                "pair": pair,
                "strategy": strategy,
                "objective": objective,
                "set_top_n": top_n,
                "initial_active_count": initial_active,
            });
            print_payload(engine.plan_srs_set(request)?)
        }
        Command::SrsRefresh { pair } => print_payload(engine.refresh_srs_set(&pair)?),
        Command::SrsReset { pair } => print_payload(engine.reset_srs_data(pair.as_deref())?),
        Command::Feedback {
            pair,
            lemma,
            rating,
        } => print_payload(engine.record_feedback(&pair, &lemma, &rating)?),
        Command::Exposure { pair, lemma } => print_payload(engine.record_exposure(&pair, &lemma)?),
        Command::Diagnostics { pair } => print_payload(engine.srs_diagnostics(&pair)?),
        Command::Snapshot { pair } => print_payload(engine.load_snapshot(&pair)?),
        Command::Ruleset { pair } => print_payload(engine.load_ruleset(&pair)?),
    }
}

fn main() {
    // logs go to stderr; stdout carries frames or JSON payloads
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}