//! tagvault - read, write and password-protect NFC tags.
//!
//! ```bash
//! tagvault --simulate --tag DEVICE_TAG read
//! tagvault write '{"deviceId":"DEV-0001"}'
//! tagvault lock 1234 --json
//! tagvault demo
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tagvault_core::TagResponse;
use tagvault_hardware::TagBackend;
use tagvault_security::{AnyTagBackend, TagVaultConfig};
use tagvault_simulator::TagFixture;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod demo;

#[derive(Parser, Debug)]
#[command(name = "tagvault", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use simulated tags instead of a reader
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    simulate: bool,

    /// Simulated tag to operate on
    #[arg(long, global = true)]
    tag: Option<String>,

    /// Print the result as JSON
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    json: bool,

    /// Log filter when RUST_LOG is unset (trace, debug, info, warn, error, or a directive)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the tag's content
    Read,

    /// Write a JSON payload to the tag
    Write {
        /// Payload as JSON text; anything else is written as a JSON string
        payload: String,
    },

    /// Erase the tag's content
    Format,

    /// Password-protect the tag
    Lock {
        /// At least 4 characters
        password: String,
    },

    /// Remove password protection
    Unlock { password: String },

    /// Report whether the tag is locked
    Status,

    /// List the simulated tags
    Tags,

    /// Walk through write, lock, unlock and read on a simulated tag
    Demo,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn load_config(cli: &Cli) -> Result<TagVaultConfig> {
    let mut config = match &cli.config {
        Some(path) => TagVaultConfig::from_json_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => TagVaultConfig::default(),
    };
    if cli.simulate || matches!(cli.command, Command::Demo) {
        config.simulator.enabled = true;
    }
    Ok(config)
}

#[derive(Serialize)]
struct TagList {
    tags: Vec<TagFixture>,
}

/// Print `result` and report whether it succeeded.
fn report<T: Serialize>(
    json: bool,
    result: tagvault_core::Result<T>,
    describe: impl FnOnce(&T) -> String,
) -> Result<bool> {
    let success = result.is_ok();
    if json {
        let response = TagResponse::from(result);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        match &result {
            Ok(data) => println!("{}", describe(data)),
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(success)
}

async fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli)?;
    let backend = AnyTagBackend::from_config(&config).context("failed to start tag backend")?;
    debug!(backend = backend.name(), command = ?cli.command, "Backend ready");

    if let Some(tag) = &cli.tag {
        backend
            .simulator()
            .context("--tag needs the simulator (pass --simulate)")?
            .select_tag(tag)?;
    }

    let json = cli.json;
    match cli.command {
        Command::Read => report(json, backend.read_tag().await, |read| {
            match &read.content {
                Some(content) => format!("{}: {content}", read.tag_id),
                None => format!("{}: (blank)", read.tag_id),
            }
        }),
        Command::Write { payload } => {
            let value = serde_json::from_str(&payload)
                .unwrap_or_else(|_| serde_json::Value::String(payload));
            report(json, backend.write_tag(&value).await, |_| {
                "Tag written".to_string()
            })
        }
        Command::Format => report(json, backend.format_tag().await, |_| {
            "Tag formatted".to_string()
        }),
        Command::Lock { password } => report(json, backend.lock_tag(&password).await, |out| {
            format!("Tag locked ({})", out.lock_type)
        }),
        Command::Unlock { password } => {
            report(json, backend.unlock_tag(&password).await, |out| {
                match &out.restored_content {
                    Some(content) => format!("Tag unlocked ({}): {content}", out.lock_type),
                    None => format!("Tag unlocked ({})", out.lock_type),
                }
            })
        }
        Command::Status => report(json, backend.is_tag_locked().await, |status| {
            match status.lock_type {
                Some(lock_type) => format!("Locked ({lock_type})"),
                None => "Unlocked".to_string(),
            }
        }),
        Command::Tags => {
            let simulator = backend
                .simulator()
                .context("tags are only listed for the simulator (pass --simulate)")?;
            let tags = simulator
                .available_tag_ids()
                .iter()
                .filter_map(|id| simulator.get_tag(id))
                .collect();
            report(json, Ok(TagList { tags }), |list| {
                list.tags
                    .iter()
                    .map(|f| {
                        format!(
                            "{:<14} {:<22} {:>4} bytes{}{}",
                            f.id,
                            f.technology.to_string(),
                            f.max_size,
                            if f.writable { "" } else { ", read-only" },
                            if f.locked { ", locked" } else { "" },
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Demo => demo::run(&backend, json).await,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let success = run(cli).await?;
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
