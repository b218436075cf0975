pub mod bronze;
pub mod cli;
pub mod columns;
pub mod config;
pub mod destination;
pub mod error;
pub mod io_utils;
pub mod load;
pub mod table;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("bronze_customers", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    // Variables from .env only fill gaps; the real environment wins.
    let dotenv = dotenvy::dotenv();
    init_logging();
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {path:?}");
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest(args) => handle_ingest(&args),
        Commands::Load(args) => handle_load(&args),
        Commands::Run(args) => handle_run(&args),
    }
}

fn handle_ingest(args: &cli::IngestArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    ingest_and_report(&config::DataConfig::from(&args.data), encoding)
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let config = cli::pipeline_config(&args.data, &args.destination);
    load_and_report(&config, args.dry_run)
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let config = cli::pipeline_config(&args.data, &args.destination);
    info!("Running ingest and load for {:?}", config.data.root);
    ingest_and_report(&config.data, encoding)?;
    load_and_report(&config, args.dry_run)
}

fn ingest_and_report(
    config: &config::DataConfig,
    encoding: &'static encoding_rs::Encoding,
) -> Result<()> {
    let summary = bronze::ingest(config, encoding)?;
    println!(
        "Bronze file generated successfully: {} ({} row(s))",
        summary.bronze_path.display(),
        summary.rows()
    );
    table::print_table(&summary.table);
    Ok(())
}

fn load_and_report(config: &config::PipelineConfig, dry_run: bool) -> Result<()> {
    let inserted = load::execute(config, dry_run)?;
    let target = format!("{}.{}", config.destination.schema, config.destination.table);
    if dry_run {
        println!("Dry run complete: {inserted} row(s) validated for {target}");
    } else {
        println!("Loaded {inserted} row(s) into {target} successfully");
    }
    Ok(())
}
