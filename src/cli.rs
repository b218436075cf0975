use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_BRONZE_FILE, DEFAULT_DATA_DIR, DEFAULT_DB_HOST, DEFAULT_DB_PORT, DEFAULT_RAW_FILE,
    DEFAULT_SCHEMA, DEFAULT_TABLE, DataConfig, DestinationConfig, PipelineConfig,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean raw customer CSVs into a bronze layer and load them into PostgreSQL",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean the raw customer CSV into the bronze CSV
    Ingest(IngestArgs),
    /// Load the bronze CSV into the destination table
    Load(LoadArgs),
    /// Run ingest followed by load
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct DataArgs {
    /// Root directory holding the raw/ and bronze/ folders
    #[arg(long = "data-dir", env = "DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
    /// File name of the raw customer CSV under <data-dir>/raw
    #[arg(long = "raw-file", env = "RAW_FILE", default_value = DEFAULT_RAW_FILE)]
    pub raw_file: String,
    /// File name of the bronze CSV under <data-dir>/bronze
    #[arg(long = "bronze-file", env = "BRONZE_FILE", default_value = DEFAULT_BRONZE_FILE)]
    pub bronze_file: String,
}

#[derive(Debug, Args)]
pub struct DestinationArgs {
    /// Destination schema, created when missing
    #[arg(long = "db-schema", env = "DB_SCHEMA", default_value = DEFAULT_SCHEMA)]
    pub schema: String,
    /// Destination table, created when missing
    #[arg(long = "db-table", env = "DB_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,
    /// PostgreSQL host
    #[arg(long = "db-host", env = "DB_HOST", default_value = DEFAULT_DB_HOST)]
    pub host: String,
    /// PostgreSQL port
    #[arg(long = "db-port", env = "DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    pub port: u16,
    /// Database name
    #[arg(long = "db-name", env = "DB_NAME")]
    pub database: Option<String>,
    /// Database user
    #[arg(long = "db-user", env = "DB_USER")]
    pub user: Option<String>,
    /// Database password
    #[arg(long = "db-password", env = "DB_PASS", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Character encoding of the raw file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub data: DataArgs,
    #[command(flatten)]
    pub destination: DestinationArgs,
    /// Load into an in-memory table instead of connecting to PostgreSQL
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,
    #[command(flatten)]
    pub destination: DestinationArgs,
    /// Character encoding of the raw file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Load into an in-memory table instead of connecting to PostgreSQL
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl From<&DataArgs> for DataConfig {
    fn from(args: &DataArgs) -> Self {
        Self {
            root: args.data_dir.clone(),
            raw_file: args.raw_file.clone(),
            bronze_file: args.bronze_file.clone(),
        }
    }
}

impl From<&DestinationArgs> for DestinationConfig {
    fn from(args: &DestinationArgs) -> Self {
        Self {
            schema: args.schema.clone(),
            table: args.table.clone(),
            host: args.host.clone(),
            port: args.port,
            database: args.database.clone(),
            user: args.user.clone(),
            password: args.password.clone(),
        }
    }
}

pub fn pipeline_config(data: &DataArgs, destination: &DestinationArgs) -> PipelineConfig {
    PipelineConfig {
        data: data.into(),
        destination: destination.into(),
    }
}
