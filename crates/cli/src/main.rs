//! outdial command-line tool
//!
//! ```text
//! outdial call --to +919876543210   # dispatch the outbound agent to dial a number
//! outdial trunk update              # push SIP provider settings onto the outbound trunk
//! ```
//!
//! Settings are read from the environment after loading `.env.local` and `.env`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use outdial_call_engine::config::AgentConfig;
use outdial_call_engine::dispatch::{CallDispatcher, DispatchError};
use outdial_call_engine::livekit::LiveKitApi;
use outdial_call_engine::trunk::TrunkUpdate;
use outdial_infra_common::logging::{log_welcome, parse_log_level, setup_logging, LoggingConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Place outbound AI agent calls via LiveKit", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Make an outbound call via the agent
    Call {
        /// The phone number to call (e.g., +91...)
        #[arg(long)]
        to: String,
    },

    /// Outbound SIP trunk maintenance
    Trunk {
        #[command(subcommand)]
        action: TrunkAction,
    },
}

#[derive(Subcommand, Debug)]
enum TrunkAction {
    /// Update address, credentials and numbers of the configured trunk
    Update,
}

/// Load the env files from `env_dir`, then parse `argv`.
///
/// Flags with an `env` fallback such as `--log-level` only see values from
/// `.env.local` and `.env` when the files are loaded first.
fn bootstrap<I, T>(env_dir: &Path, argv: I) -> Result<(Args, Vec<PathBuf>), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let loaded = AgentConfig::load_env_files_in(env_dir);
    let args = Args::try_parse_from(argv)?;
    Ok((args, loaded))
}

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let mut config = LoggingConfig::new(parse_log_level(&args.log_level)?, "outdial");
    if args.json {
        config = config.with_json();
    }
    setup_logging(config)?;
    log_welcome("outdial", env!("CARGO_PKG_VERSION"));
    Ok(())
}

async fn place_call(config: AgentConfig, to: &str) -> Result<(), DispatchError> {
    if !config.outbound.enabled {
        return Err(DispatchError::Disabled);
    }
    let api = LiveKitApi::new(&config.livekit).map_err(|e| DispatchError::MissingConfig(e.to_string()))?;
    let receipt = CallDispatcher::new(config, api).dispatch(to).await?;

    println!("\nCall dispatched successfully.");
    println!("Dispatch ID: {}", receipt.dispatch_id);
    println!("Agent Name: {}", receipt.agent_name);
    println!("Session Room: {}", receipt.room_name);
    println!("{}", "-".repeat(40));
    println!("The agent is now joining the room and will dial the number.");
    Ok(())
}

async fn update_trunk(config: AgentConfig) -> anyhow::Result<()> {
    let update = TrunkUpdate::from_config(&config)?;
    let api = LiveKitApi::new(&config.livekit)?;
    let trunk = update
        .apply(&api)
        .await
        .with_context(|| format!("Failed to update trunk {}", update.trunk_id()))?;
    info!("Trunk {} now serves {:?}", trunk.sip_trunk_id, trunk.numbers);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let (args, env_files) = match bootstrap(Path::new("."), std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };
    if let Err(e) = init_logging(&args) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::from(70);
    }
    for path in &env_files {
        debug!("Loaded environment from {}", path.display());
    }

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::from(78);
        }
    };

    match args.command {
        Command::Call { to } => match place_call(config, &to).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("❌ {}", e);
                ExitCode::from(e.exit_code())
            }
        },
        Command::Trunk {
            action: TrunkAction::Update,
        } => match update_trunk(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("❌ {:#}", e);
                ExitCode::from(69)
            }
        },
    }
}
