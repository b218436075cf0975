//! Bronze → destination load.
//!
//! The bronze file is read back as text, `age` is re-parsed, blank text is
//! mapped to NULL, and every row is inserted in file order inside a single
//! batch that is committed once.

use anyhow::{Context, Result};
use log::info;

use crate::{
    columns::CanonicalField,
    config::{PipelineConfig, TableRef},
    destination::{Batch, CustomerRow, Destination, MemoryDestination, PgDestination},
    error::LoadError,
    io_utils::{self, ReadOptions},
    table::Table,
};

/// Re-parses a bronze age. Missing or non-numeric text becomes `None`; a
/// number that does not fit a 32-bit integer after truncation is an error.
pub fn parse_age(value: Option<&str>, row: usize) -> Result<Option<i32>, LoadError> {
    let Some(text) = value.map(str::trim).filter(|text| !text.is_empty()) else {
        return Ok(None);
    };
    let Ok(parsed) = text.parse::<f64>() else {
        return Ok(None);
    };
    if parsed.is_nan() {
        return Ok(None);
    }
    let truncated = parsed.trunc();
    if !truncated.is_finite()
        || truncated < f64::from(i32::MIN)
        || truncated > f64::from(i32::MAX)
    {
        return Err(LoadError::AgeNotCastable {
            row,
            value: text.to_string(),
        });
    }
    Ok(Some(truncated as i32))
}

/// Empty or whitespace-only text becomes `None`; anything else is kept as is.
pub fn blank_to_null(value: Option<&str>) -> Option<String> {
    value
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Selects the canonical columns of a bronze table and converts each row.
/// Columns other than `customer_name`, `age` and `city` are ignored.
pub fn prepare_rows(table: &Table) -> Result<Vec<CustomerRow>, LoadError> {
    let ages = table
        .column(CanonicalField::Age.name())
        .ok_or(LoadError::MissingColumn(CanonicalField::Age.name()))?;
    let names = table.column(CanonicalField::CustomerName.name());
    let cities = table.column(CanonicalField::City.name());

    ages.iter()
        .enumerate()
        .map(|(idx, age)| {
            Ok(CustomerRow {
                customer_name: blank_to_null(cell(names.as_deref(), idx)),
                age: parse_age(*age, idx + 1)?,
                city: blank_to_null(cell(cities.as_deref(), idx)),
            })
        })
        .collect()
}

fn cell<'a>(column: Option<&[Option<&'a str>]>, idx: usize) -> Option<&'a str> {
    column.and_then(|values| values[idx])
}

/// Provisions `target` and inserts every bronze row as one unit of work.
/// Returns the number of rows inserted.
pub fn load<D>(table: &Table, destination: &mut D, target: &TableRef) -> Result<usize, LoadError>
where
    D: Destination,
{
    let rows = prepare_rows(table)?;

    let mut batch = destination.begin()?;
    batch.create_schema(target)?;
    batch.create_table(target)?;
    for (idx, row) in rows.iter().enumerate() {
        batch.insert(target, idx + 1, row)?;
    }
    batch.commit()?;

    Ok(rows.len())
}

/// Loads `<root>/bronze/<bronze_file>` into the configured table. With
/// `dry_run` the rows go to an in-memory destination instead of PostgreSQL.
pub fn execute(config: &PipelineConfig, dry_run: bool) -> Result<usize> {
    let target = config.destination.target()?;
    let bronze_path = config.data.bronze_path();
    info!("Reading bronze customers from {bronze_path:?}");
    let table = io_utils::read_table(&bronze_path, ReadOptions::default())?;

    if dry_run {
        let mut destination = MemoryDestination::new();
        let inserted = load(&table, &mut destination, &target)
            .with_context(|| format!("Dry-run load into {}", target.qualified()))?;
        info!(
            "Dry run: {inserted} row(s) would be inserted into {}",
            target.qualified()
        );
        return Ok(inserted);
    }

    info!("Connecting to {}", config.destination.describe());
    let mut destination = PgDestination::connect(&config.destination)?;
    let outcome = load(&table, &mut destination, &target);
    let closed = destination.close();
    let inserted =
        outcome.with_context(|| format!("Loading {bronze_path:?} into {}", target.qualified()))?;
    closed?;

    info!("Inserted {inserted} row(s) into {}", target.qualified());
    Ok(inserted)
}
