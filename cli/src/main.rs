//! `maestro`: inspect and maintain the step cache and checkpoint stores.
//!
//! Store paths and cache settings come from the environment, `.env` and
//! `~/.config/maestro/config.toml` (see the `config` crate).

mod logging;

use clap::{Args as ClapArgs, Parser, Subcommand};
use cli::CacheQuery;
use maestro::Stores;

#[derive(Parser, Debug)]
#[command(name = "maestro")]
#[command(about = "Inspect the Maestro step cache and run checkpoints")]
struct Args {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Step cache operations
    #[command(subcommand)]
    Cache(CacheCmd),
    /// Checkpoint store operations
    #[command(subcommand)]
    Checkpoint(CheckpointCmd),
    /// Print the effective settings
    Settings,
}

#[derive(Subcommand, Debug)]
enum CacheCmd {
    /// Look up the first live entry matching a prompt and scope
    Get(CacheGetArgs),
    /// Remove every cache entry
    Clear,
}

#[derive(ClapArgs, Debug)]
struct CacheGetArgs {
    /// Words the stored prompt must contain
    prompt: String,
    #[arg(long)]
    node: Option<String>,
    #[arg(long)]
    feature: Option<String>,
    /// Comma-separated competitor names
    #[arg(long)]
    competitors: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    session: Option<String>,
}

#[derive(Subcommand, Debug)]
enum CheckpointCmd {
    /// List snapshots of a thread, oldest first
    List {
        thread_id: String,
        /// Checkpoint namespace, e.g. `competitorSubgraph`
        #[arg(long)]
        ns: Option<String>,
        /// Keep only the newest N snapshots
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the latest snapshot of a thread with its state
    Show {
        thread_id: String,
        #[arg(long)]
        ns: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_config::load_and_apply("maestro", None).ok();
    let args = Args::parse();
    let log_guard = match logging::init(args.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: logging: {e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        drop(log_guard);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = env_config::Settings::from_env()?;
    let output = match args.cmd {
        Command::Settings => cli::settings_summary(&settings),
        Command::Cache(cmd) => {
            let stores = Stores::open(&settings)?;
            match cmd {
                CacheCmd::Get(a) => {
                    let query = CacheQuery {
                        prompt: a.prompt,
                        node_name: a.node,
                        feature: a.feature,
                        competitors: a.competitors,
                        user_id: a.user,
                        session_id: a.session,
                    };
                    cli::cache_get(&stores, &query).await?
                }
                CacheCmd::Clear => cli::cache_clear(&stores).await?,
            }
        }
        Command::Checkpoint(cmd) => {
            let stores = Stores::open(&settings)?;
            match cmd {
                CheckpointCmd::List {
                    thread_id,
                    ns,
                    limit,
                } => cli::checkpoint_list(&stores, &thread_id, ns.as_deref(), limit).await?,
                CheckpointCmd::Show { thread_id, ns } => {
                    cli::checkpoint_show(&stores, &thread_id, ns.as_deref()).await?
                }
            }
        }
    };

    let text = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");
    Ok(())
}
