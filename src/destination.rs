//! Where bronze rows end up.
//!
//! A [`Destination`] hands out a [`Batch`], one unit of work that provisions
//! the target and stages inserts. Nothing is visible until [`Batch::commit`];
//! dropping a batch discards it. [`PgDestination`] maps a batch onto a
//! PostgreSQL transaction, [`MemoryDestination`] keeps everything in process
//! for dry runs.

use std::collections::{HashMap, HashSet};

use log::debug;
use postgres::{Client, NoTls, Statement, Transaction};

use crate::{
    config::{DestinationConfig, TableRef},
    error::LoadError,
};

/// One row of the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRow {
    pub customer_name: Option<String>,
    pub age: Option<i32>,
    pub city: Option<String>,
}

pub trait Destination {
    type Pending<'a>: Batch
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Pending<'_>, LoadError>;
}

pub trait Batch {
    /// Creates the target's schema unless it already exists.
    fn create_schema(&mut self, target: &TableRef) -> Result<(), LoadError>;
    /// Creates the target table unless it already exists. Never alters an existing table.
    fn create_table(&mut self, target: &TableRef) -> Result<(), LoadError>;
    /// Stages one row. `row` is its 1-based position, used in errors.
    fn insert(
        &mut self,
        target: &TableRef,
        row: usize,
        values: &CustomerRow,
    ) -> Result<(), LoadError>;
    fn commit(self) -> Result<(), LoadError>;
}

pub fn create_schema_sql(target: &TableRef) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {};", target.schema())
}

pub fn create_table_sql(target: &TableRef) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    customer_name TEXT,\n    age INT,\n    city TEXT\n);",
        target.qualified()
    )
}

pub fn insert_sql(target: &TableRef) -> String {
    format!(
        "INSERT INTO {} (customer_name, age, city) VALUES ($1, $2, $3);",
        target.qualified()
    )
}

pub struct PgDestination {
    client: Client,
}

impl PgDestination {
    pub fn connect(config: &DestinationConfig) -> Result<Self, LoadError> {
        let client = config
            .postgres_config()
            .connect(NoTls)
            .map_err(|source| LoadError::Connection {
                target: config.describe(),
                source,
            })?;
        Ok(Self { client })
    }

    pub fn close(self) -> Result<(), LoadError> {
        self.client.close().map_err(LoadError::Close)
    }
}

impl Destination for PgDestination {
    type Pending<'a>
        = PgBatch<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<PgBatch<'_>, LoadError> {
        let transaction = self
            .client
            .transaction()
            .map_err(|err| LoadError::Destination(format!("starting transaction: {err}")))?;
        Ok(PgBatch {
            transaction,
            insert: None,
        })
    }
}

pub struct PgBatch<'a> {
    transaction: Transaction<'a>,
    insert: Option<(TableRef, Statement)>,
}

impl PgBatch<'_> {
    fn insert_statement(&mut self, target: &TableRef) -> Result<Statement, LoadError> {
        if let Some((prepared_for, statement)) = &self.insert {
            if prepared_for == target {
                return Ok(statement.clone());
            }
        }
        let statement = self
            .transaction
            .prepare(&insert_sql(target))
            .map_err(|err| LoadError::Provision(target.qualified(), err))?;
        self.insert = Some((target.clone(), statement.clone()));
        Ok(statement)
    }
}

impl Batch for PgBatch<'_> {
    fn create_schema(&mut self, target: &TableRef) -> Result<(), LoadError> {
        let sql = create_schema_sql(target);
        debug!("{sql}");
        self.transaction
            .batch_execute(&sql)
            .map_err(|err| LoadError::Provision(target.schema().to_string(), err))
    }

    fn create_table(&mut self, target: &TableRef) -> Result<(), LoadError> {
        let sql = create_table_sql(target);
        debug!("{sql}");
        self.transaction
            .batch_execute(&sql)
            .map_err(|err| LoadError::Provision(target.qualified(), err))
    }

    fn insert(
        &mut self,
        target: &TableRef,
        row: usize,
        values: &CustomerRow,
    ) -> Result<(), LoadError> {
        let statement = self.insert_statement(target)?;
        self.transaction
            .execute(
                &statement,
                &[&values.customer_name, &values.age, &values.city],
            )
            .map(|_| ())
            .map_err(|source| LoadError::Insert { row, source })
    }

    fn commit(self) -> Result<(), LoadError> {
        self.transaction.commit().map_err(LoadError::Commit)
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    schemas: HashSet<String>,
    tables: HashMap<TableRef, Vec<CustomerRow>>,
}

/// In-process destination with the same idempotent, all-or-nothing behavior
/// as the PostgreSQL one.
#[derive(Debug, Default)]
pub struct MemoryDestination {
    state: MemoryState,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.state.schemas.contains(schema)
    }

    pub fn rows(&self, target: &TableRef) -> Option<&[CustomerRow]> {
        self.state.tables.get(target).map(Vec::as_slice)
    }
}

impl Destination for MemoryDestination {
    type Pending<'a>
        = MemoryBatch<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<MemoryBatch<'_>, LoadError> {
        let staged = self.state.clone();
        Ok(MemoryBatch {
            committed: &mut self.state,
            staged,
        })
    }
}

pub struct MemoryBatch<'a> {
    committed: &'a mut MemoryState,
    staged: MemoryState,
}

impl Batch for MemoryBatch<'_> {
    fn create_schema(&mut self, target: &TableRef) -> Result<(), LoadError> {
        self.staged.schemas.insert(target.schema().to_string());
        Ok(())
    }

    fn create_table(&mut self, target: &TableRef) -> Result<(), LoadError> {
        if !self.staged.schemas.contains(target.schema()) {
            return Err(LoadError::Destination(format!(
                "schema \"{}\" does not exist",
                target.schema()
            )));
        }
        self.staged.tables.entry(target.clone()).or_default();
        Ok(())
    }

    fn insert(
        &mut self,
        target: &TableRef,
        _row: usize,
        values: &CustomerRow,
    ) -> Result<(), LoadError> {
        let table = self.staged.tables.get_mut(target).ok_or_else(|| {
            LoadError::Destination(format!(
                "relation \"{}\" does not exist",
                target.qualified()
            ))
        })?;
        table.push(values.clone());
        Ok(())
    }

    fn commit(self) -> Result<(), LoadError> {
        *self.committed = self.staged;
        Ok(())
    }
}
