//! # Records Configuration Validator
//!
//! Command-line tool for validating `records-config.yaml` across environments and printing the
//! effective settings every named circuit would run with.

use clap::{Parser, Subcommand};
use records_core::config::{ConfigManager, RecordsConfig};
use records_core::constants::circuits;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate records configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format (table, json)
    #[arg(long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the whole configuration
    All,

    /// Show the effective settings of every named circuit
    Circuits,

    /// Validate every known environment in turn
    Environments,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Circuits) => show_circuits(&cli),
        Some(Commands::Environments) => validate_environments(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            process::exit(1);
        }
    }
}

fn load(cli: &Cli, environment: &str) -> Result<RecordsConfig, Box<dyn std::error::Error>> {
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment)?;
    Ok(manager.config().clone())
}

fn validate_all_config(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 Validating Records Configuration");
    println!("Environment: {}", cli.environment);
    if let Some(config_dir) = &cli.config_dir {
        println!("Config Directory: {}", config_dir.display());
    }
    println!();

    let config = match load(cli, &cli.environment) {
        Ok(config) => {
            println!("✅ Configuration loaded and validated");
            config
        }
        Err(e) => {
            println!("❌ Failed to load configuration: {e}");
            return Err(e);
        }
    };

    println!(
        "   database: max_connections={} min_connections={} acquire_timeout={}s",
        config.database.max_connections,
        config.database.min_connections,
        config.database.acquire_timeout_seconds
    );
    println!("   pagination: page_size={}", config.pagination.page_size);
    println!(
        "   circuit_breakers: enabled={} overrides={}",
        config.circuit_breakers.enabled,
        config.circuit_breakers.component_configs.len()
    );

    for name in config.circuit_breakers.component_configs.keys() {
        if !circuits::ALL.contains(&name.as_str()) {
            println!("⚠️  component_configs.{name} does not match any record operation circuit");
        }
    }

    Ok(())
}

fn show_circuits(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(cli, &cli.environment)?;
    let effective: Vec<_> = circuits::ALL
        .iter()
        .map(|name| (*name, config.circuit_breakers.config_for_component(name)))
        .collect();

    if cli.format == "json" {
        let as_map: serde_json::Map<String, serde_json::Value> = effective
            .iter()
            .map(|(name, component)| Ok((name.to_string(), serde_json::to_value(component)?)))
            .collect::<Result<_, serde_json::Error>>()?;
        println!("{}", serde_json::to_string_pretty(&as_map)?);
        return Ok(());
    }

    println!(
        "{:<22} {:>10} {:>10} {:>8} {:>8} {:>12}",
        "circuit", "timeout_ms", "max_conc", "err_%", "volume", "sleep_ms"
    );
    for (name, component) in effective {
        println!(
            "{:<22} {:>10} {:>10} {:>8} {:>8} {:>12}",
            name,
            component.timeout_ms,
            component.max_concurrent_requests,
            component.error_percent_threshold,
            component.request_volume_threshold,
            component.sleep_window_ms
        );
    }

    Ok(())
}

fn validate_environments(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut failures = 0;

    for environment in ["development", "test", "production"] {
        match load(cli, environment) {
            Ok(_) => println!("✅ {environment}"),
            Err(e) => {
                failures += 1;
                println!("❌ {environment}: {e}");
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} environment(s) failed validation").into());
    }
    Ok(())
}
