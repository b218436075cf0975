//! Raw → bronze transformation.
//!
//! Headers are standardized and resolved to canonical names, `customer_name`
//! and `city` are cleaned as free text, and `age` is coerced to a bounded
//! nullable integer. Columns outside the alias table pass through untouched.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    columns::{CanonicalField, resolve_header},
    config::DataConfig,
    error::IngestError,
    io_utils::{self, ReadOptions},
    table::Table,
    transform::string_ops::{normalize_whitespace, remove_accents, title_case},
};

pub const MIN_AGE: i32 = 0;
pub const MAX_AGE: i32 = 120;

/// Cleans a free-text field: whitespace-normalized, accent-free, title-cased.
/// Blank input yields `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let normalized = normalize_whitespace(value?)?;
    Some(title_case(&remove_accents(&normalized)))
}

/// Parses an age as a number truncated toward zero, keeping it only when it
/// falls within `MIN_AGE..=MAX_AGE`.
pub fn clean_age(value: Option<&str>) -> Option<i32> {
    let normalized = normalize_whitespace(value?)?;
    let parsed = normalized.parse::<f64>().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    let truncated = parsed.trunc();
    if truncated < f64::from(MIN_AGE) || truncated > f64::from(MAX_AGE) {
        return None;
    }
    Some(truncated as i32)
}

/// Applies header standardization, alias resolution and field cleaning to a
/// raw table. Fails when a canonical field is missing or mapped twice.
pub fn transform(raw: &Table) -> Result<Table, IngestError> {
    let mut headers = Vec::with_capacity(raw.headers.len());
    let mut roles: Vec<Option<CanonicalField>> = Vec::with_capacity(raw.headers.len());
    for original in &raw.headers {
        let (name, field) = resolve_header(original);
        if let Some(field) = field {
            if let Some(existing) = roles.iter().position(|role| *role == Some(field)) {
                return Err(IngestError::DuplicateColumn {
                    canonical: field.name(),
                    first: raw.headers[existing].clone(),
                    second: original.clone(),
                });
            }
        }
        debug!("Column '{original}' -> '{name}'");
        headers.push(name);
        roles.push(field);
    }

    for field in CanonicalField::ALL {
        if !roles.contains(&Some(field)) {
            return Err(IngestError::MissingColumn(field.name()));
        }
    }

    let rows = raw
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&roles)
                .map(|(cell, role)| clean_cell(cell.as_deref(), *role))
                .collect()
        })
        .collect();

    Ok(Table { headers, rows })
}

fn clean_cell(value: Option<&str>, role: Option<CanonicalField>) -> Option<String> {
    match role {
        Some(CanonicalField::CustomerName | CanonicalField::City) => clean_text(value),
        Some(CanonicalField::Age) => clean_age(value).map(|age| age.to_string()),
        None => value.map(str::to_string),
    }
}

#[derive(Debug)]
pub struct IngestSummary {
    pub bronze_path: PathBuf,
    pub table: Table,
}

impl IngestSummary {
    pub fn rows(&self) -> usize {
        self.table.row_count()
    }
}

/// Reads `<root>/raw/<raw_file>`, transforms it, and writes the bronze file.
pub fn ingest(config: &DataConfig, encoding: &'static Encoding) -> Result<IngestSummary> {
    let raw_path = config.raw_path();
    let bronze_path = config.bronze_path();
    if !raw_path.is_file() {
        return Err(IngestError::RawFileNotFound(raw_path).into());
    }
    info!("Reading raw customers from {raw_path:?}");

    let raw = io_utils::read_table(
        &raw_path,
        ReadOptions {
            encoding,
            skip_initial_space: true,
        },
    )?;
    let table = transform(&raw).with_context(|| format!("Transforming {raw_path:?}"))?;

    ensure_parent_dir(&bronze_path)?;
    io_utils::write_table(&bronze_path, &table)?;
    info!(
        "Wrote {} bronze row(s) across {} column(s) to {bronze_path:?}",
        table.row_count(),
        table.headers.len()
    );

    Ok(IngestSummary { bronze_path, table })
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating bronze directory {parent:?}"))?;
    }
    Ok(())
}
