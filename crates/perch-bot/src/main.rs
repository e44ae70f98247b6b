//! Perch
//!
//! Connects to the configured channel and runs every plugin unit linked into
//! this binary.
//!
//! # Usage
//!
//! ```bash
//! perch                      # run, writing perch.toml on first start
//! perch init                 # write a default perch.toml
//! perch plugins              # list the linked plugin units
//! perch --profile production run
//! ```

// Linked for its plugin unit.
extern crate perch_plugin_greet;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perch::core::plugin::linked_units;
use perch::runtime::PerchRuntime;
use perch::runtime::config::{CONFIG_FILE_NAME, LogLevel, write_default_config};
use perch::runtime::logging::LoggingBuilder;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "perch", version, about = "Perch - a plugin-driven chat client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file.
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Overrides `logging.level` (trace, debug, info, warn, error).
    #[arg(long, global = true, value_parser = LogLevel::from_str)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and run until Ctrl+C (default).
    Run,
    /// Write a default configuration file.
    Init,
    /// List the plugin units linked into this binary.
    Plugins,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.config, cli.profile, cli.log_level).await,
        Commands::Init => {
            LoggingBuilder::new().init();
            write_default_config(&cli.config)
                .with_context(|| format!("cannot write {}", cli.config.display()))?;
            info!("Please edit {} with your settings", cli.config.display());
            Ok(())
        }
        Commands::Plugins => {
            let mut units: Vec<_> = linked_units().collect();
            units.sort_by_key(|u| u.id);
            for unit in units {
                let compat = if unit.is_compatible() { "" } else { " (incompatible)" };
                println!("{}{compat}", unit.id);
                for factory in unit.factories {
                    println!("  plugin  {}", factory.type_name);
                }
                for symbol in unit.exports {
                    println!("  export  {}", symbol.name);
                }
            }
            Ok(())
        }
    }
}

async fn run(config: &Path, profile: Option<String>, log_level: Option<LogLevel>) -> Result<()> {
    if !config.exists() {
        LoggingBuilder::new().init();
        write_default_config(config)
            .with_context(|| format!("cannot write {}", config.display()))?;
        error!(
            "No configuration found. Please edit {} with your settings and start again",
            config.display()
        );
        return Ok(());
    }

    let mut builder = PerchRuntime::builder().config_file(config);
    if let Some(profile) = profile {
        builder = builder.profile(profile);
    }
    if let Some(level) = log_level {
        builder = builder.set("logging.level", level);
    }

    let runtime = builder.build()?;
    runtime.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["perch"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE_NAME));
        assert_eq!(cli.log_level, None);
    }

    #[test]
    fn test_log_level_is_validated() {
        let cli = Cli::try_parse_from(["perch", "--log-level", "debug", "run"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));

        assert!(Cli::try_parse_from(["perch", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn test_greet_unit_is_linked() {
        assert!(linked_units().any(|unit| unit.id == "greet"));
    }
}
