//! `avlos-codegen`: generate firmware and client code from a device spec.
//!
//! Usage:
//!   avlos-codegen --spec <device.yaml> --config <avlos_config.yaml> [--dry-run] [--parallel]
//!
//! Relative output paths in the config resolve against the config's directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use avlos_codegen_lib::{writer, Dispatcher, RunConfig};

/// Avlos code generator.
#[derive(Parser, Debug)]
#[command(name = "avlos-codegen", about = "Generate device protocol code from a YAML spec")]
struct Cli {
    /// Device spec file.
    #[arg(short = 's', long = "spec")]
    spec: PathBuf,

    /// Generator config file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// List the files that would be written without touching disk.
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Run generators concurrently.
    #[arg(long = "parallel")]
    parallel: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let tree = avlos_parser::from_path(&cli.spec)
        .with_context(|| format!("loading device spec {}", cli.spec.display()))?;
    let config = RunConfig::load(&cli.config)?;
    let endpoints = tree.endpoints();
    info!("device '{}': {} endpoints", tree.name(), endpoints.len());

    let dispatcher = Dispatcher::default();
    info!("available generators: {}", dispatcher.generator_names().join(", "));
    let outcome = if cli.parallel {
        dispatcher.run_parallel(&tree, &endpoints, &config)
    } else {
        dispatcher.run(&tree, &endpoints, &config)
    };
    let code = outcome.into_result()?;

    if cli.dry_run {
        for file in &code.files {
            println!("{}", file.path.display());
        }
        return Ok(());
    }

    let written = writer::write_all(&code.files)?;
    info!("wrote {} files", written);
    Ok(())
}
