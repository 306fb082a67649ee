//! sshconf command-line entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sshconf::commands::{self, Command};
use sshconf::config::{Settings, FORMAT_ENV, STORAGE_ENV};
use sshconf::store::Format;

#[derive(Parser)]
#[command(
    name = "sshconf",
    about = "Store, merge and show SSH host and group profiles",
    version
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Store file (default: ~/.sshconf/storage)
    #[arg(long, global = true, env = STORAGE_ENV)]
    storage: Option<PathBuf>,

    /// Format used when writing the store: json, msgpack or csv
    #[arg(long, global = true, env = FORMAT_ENV, default_value = "json")]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

/// Initialize logging
///
/// `RUST_LOG` applies unless `-v` is given; the default level is `warn`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::resolve(cli.storage, cli.format)
        .context("Failed to locate the profile store")?;
    tracing::debug!("Using store {:?} ({})", settings.storage, settings.format);

    let output = commands::run(&settings, cli.command)
        .with_context(|| format!("Store {:?}", settings.storage))?;
    print!("{output}");
    Ok(())
}
