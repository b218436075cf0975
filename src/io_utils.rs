//! CSV reading and writing for the raw and bronze files.
//!
//! All file I/O in the pipeline flows through this module:
//!
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Missing values**: empty fields and conventional NA markers read as `None`.
//! - **Leading spaces**: optionally dropped after each delimiter before the
//!   CSV tokenizer sees them, so ` "a, b"` still reads as one quoted field.
//! - **Shape**: short rows are padded with missing values; long rows are rejected.
//! - **Quoting**: output uses `QuoteStyle::Necessary`, so missing values are
//!   written as bare empty fields.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::table::Table;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

/// Field contents that are read as a missing value.
pub const MISSING_SENTINELS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub encoding: &'static Encoding,
    /// Ignore spaces that directly follow a delimiter.
    pub skip_initial_space: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: UTF_8,
            skip_initial_space: false,
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn is_missing(value: &str) -> bool {
    MISSING_SENTINELS.contains(&value)
}

pub fn open_csv_reader<R>(reader: R) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(DEFAULT_CSV_DELIMITER)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn read_table(path: &Path, options: ReadOptions) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    read_table_from(BufReader::new(file), options)
        .with_context(|| format!("Reading CSV from {path:?}"))
}

pub fn read_table_from<R>(reader: R, options: ReadOptions) -> Result<Table>
where
    R: Read,
{
    if options.skip_initial_space {
        collect_table(open_csv_reader(SkipInitialSpace::new(reader)), options.encoding)
    } else {
        collect_table(open_csv_reader(reader), options.encoding)
    }
}

fn collect_table<R>(mut reader: csv::Reader<R>, encoding: &'static Encoding) -> Result<Table>
where
    R: Read,
{
    let header_record = reader.byte_headers().context("Reading header row")?.clone();
    if header_record.is_empty() {
        bail!("No columns to parse from input");
    }
    let headers = header_record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect::<Result<Vec<_>>>()?;

    let mut table = Table::new(headers);
    let width = table.headers.len();
    for (idx, record) in reader.byte_records().enumerate() {
        let line = idx + 2;
        let record = record.with_context(|| format!("Reading row {line}"))?;
        if record.len() > width {
            bail!(
                "Row {line} has {} field(s) but the header has {width}",
                record.len()
            );
        }
        let mut values = decode_record(&record, encoding)?;
        values.resize(width, None);
        table.rows.push(values);
    }
    Ok(table)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Decodes every field, mapping missing-value sentinels to `None`.
pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<Option<String>>> {
    record
        .iter()
        .map(|field| {
            let text = decode_bytes(field, encoding)?;
            Ok((!is_missing(&text)).then_some(text))
        })
        .collect()
}

/// Where the byte stream sits relative to CSV fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    /// A quote inside a quoted field: either an escaped `""` or the closing quote.
    QuoteInQuoted,
}

impl FieldState {
    /// Advances over `byte` and reports whether it should be kept.
    fn advance(&mut self, byte: u8) -> bool {
        let is_boundary = matches!(byte, b'\n' | b'\r') || byte == DEFAULT_CSV_DELIMITER;
        let (next, keep) = match (*self, byte) {
            (FieldState::Start, b' ') => (FieldState::Start, false),
            (FieldState::Start, b'"') => (FieldState::Quoted, true),
            (FieldState::Quoted, b'"') => (FieldState::QuoteInQuoted, true),
            (FieldState::Quoted, _) => (FieldState::Quoted, true),
            (FieldState::QuoteInQuoted, b'"') => (FieldState::Quoted, true),
            (_, _) if is_boundary => (FieldState::Start, true),
            (_, _) => (FieldState::Unquoted, true),
        };
        *self = next;
        keep
    }
}

/// Drops spaces at the start of every unquoted field position, i.e. after a
/// delimiter or line break outside quotes.
pub struct SkipInitialSpace<R> {
    inner: R,
    state: FieldState,
}

impl<R> SkipInitialSpace<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            state: FieldState::Start,
        }
    }
}

impl<R> Read for SkipInitialSpace<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let read = self.inner.read(buf)?;
            if read == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for idx in 0..read {
                let byte = buf[idx];
                if self.state.advance(byte) {
                    buf[kept] = byte;
                    kept += 1;
                }
            }
            // A chunk made only of skipped spaces is not end of input.
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    write_table_to(BufWriter::new(file), table)
        .with_context(|| format!("Writing CSV to {path:?}"))
}

pub fn write_table_to<W>(writer: W, table: &Table) -> Result<()>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    let mut writer = builder.from_writer(writer);
    writer
        .write_record(table.headers.iter())
        .context("Writing output headers")?;
    for (idx, row) in table.rows.iter().enumerate() {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}
