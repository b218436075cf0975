use std::borrow::Cow;
use std::fmt::Write as _;

/// Marker shown in previews for missing cells.
pub const MISSING_MARKER: &str = "<NA>";

/// In-memory rows under named columns. `None` is a missing value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Builds a table from string literals, treating empty strings as missing.
    pub fn from_literals(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column in row order; missing cells stay `None`.
    pub fn column<'a>(&'a self, name: &str) -> Option<Vec<Option<&'a str>>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).and_then(|cell| cell.as_deref()))
                .collect(),
        )
    }
}

/// Renders a table with a leading row-position column, in the style of a
/// dataframe printout.
pub fn render_table(table: &Table) -> String {
    let mut headers = Vec::with_capacity(table.headers.len() + 1);
    headers.push(String::new());
    headers.extend(table.headers.iter().cloned());

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut cells = Vec::with_capacity(row.len() + 1);
            cells.push(idx.to_string());
            cells.extend(
                row.iter()
                    .map(|cell| cell.as_deref().unwrap_or(MISSING_MARKER).to_string()),
            );
            cells
        })
        .collect::<Vec<_>>();

    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&headers, &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(table: &Table) {
    print!("{}", render_table(table));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate().take(widths.len()) {
        let sanitized = sanitize_cell(value);
        let padding = widths[idx].saturating_sub(display_width(&sanitized));
        let mut cell = sanitized.into_owned();
        cell.push_str(&" ".repeat(padding));
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(
            value
                .chars()
                .map(|ch| match ch {
                    '\n' | '\r' | '\t' => ' ',
                    other => other,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(value)
    }
}
