//! Plain configuration handed to the ingest and load operations.
//!
//! The CLI fills these from flags and environment variables; library callers
//! and tests can build them directly or start from `Default`.

use std::path::PathBuf;

use crate::error::LoadError;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_RAW_FILE: &str = "customers.csv";
pub const DEFAULT_BRONZE_FILE: &str = "bronze_customers.csv";
pub const DEFAULT_SCHEMA: &str = "bronze";
pub const DEFAULT_TABLE: &str = "customers";
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;

/// PostgreSQL truncates identifiers beyond this many bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub destination: DestinationConfig,
}

#[derive(Debug, Clone)]
pub struct DataConfig {
    pub root: PathBuf,
    pub raw_file: String,
    pub bronze_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_DATA_DIR),
            raw_file: DEFAULT_RAW_FILE.to_string(),
            bronze_file: DEFAULT_BRONZE_FILE.to_string(),
        }
    }
}

impl DataConfig {
    /// `<root>/raw/<raw_file>`
    pub fn raw_path(&self) -> PathBuf {
        self.root.join("raw").join(&self.raw_file)
    }

    /// `<root>/bronze/<bronze_file>`
    pub fn bronze_path(&self) -> PathBuf {
        self.root.join("bronze").join(&self.bronze_file)
    }
}

#[derive(Debug, Clone)]
pub struct DestinationConfig {
    pub schema: String,
    pub table: String,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            table: DEFAULT_TABLE.to_string(),
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            database: None,
            user: None,
            password: None,
        }
    }
}

impl DestinationConfig {
    pub fn target(&self) -> Result<TableRef, LoadError> {
        TableRef::new(&self.schema, &self.table)
    }

    /// Connection target without credentials, for logs and error messages.
    pub fn describe(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user.as_deref().unwrap_or("<default>"),
            self.host,
            self.port,
            self.database.as_deref().unwrap_or("<default>")
        )
    }

    pub fn postgres_config(&self) -> postgres::Config {
        let mut config = postgres::Config::new();
        config.host(&self.host).port(self.port);
        if let Some(database) = &self.database {
            config.dbname(database);
        }
        if let Some(user) = &self.user {
            config.user(user);
        }
        if let Some(password) = &self.password {
            config.password(password);
        }
        config
    }
}

/// A validated `<schema>.<table>` pair that is safe to splice into DDL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    schema: String,
    table: String,
}

impl TableRef {
    pub fn new(schema: &str, table: &str) -> Result<Self, LoadError> {
        Ok(Self {
            schema: validate_identifier(schema)?,
            table: validate_identifier(table)?,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema(), self.table())
    }
}

fn validate_identifier(value: &str) -> Result<String, LoadError> {
    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    let valid_rest = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid_start && valid_rest && value.len() <= MAX_IDENTIFIER_LEN {
        Ok(value.to_string())
    } else {
        Err(LoadError::InvalidIdentifier(value.to_string()))
    }
}
