//! Header standardization and the fixed alias table.
//!
//! Raw headers are first reduced to a standardized form (`Customer Name` →
//! `customer_name`), then looked up against a closed set of aliases that map
//! onto the three canonical customer fields.

use std::{fmt, sync::LazyLock};

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]").expect("static identifier pattern"));

/// Lowercases, collapses whitespace to `_`, and removes anything outside
/// `[a-z0-9_]`. Applying it twice yields the same result as applying it once.
pub fn standardize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let collapsed = WHITESPACE_RUN.replace_all(&lowered, " ");
    let underscored = collapsed.replace(' ', "_");
    DISALLOWED.replace_all(&underscored, "").into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    CustomerName,
    Age,
    City,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 3] = [
        CanonicalField::CustomerName,
        CanonicalField::Age,
        CanonicalField::City,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::CustomerName => "customer_name",
            CanonicalField::Age => "age",
            CanonicalField::City => "city",
        }
    }

    /// Resolves a standardized header to its canonical field, if it is a known alias.
    pub fn from_alias(standardized: &str) -> Option<Self> {
        match standardized {
            "customer_name" | "customername" => Some(CanonicalField::CustomerName),
            "age" | "idade" => Some(CanonicalField::Age),
            "city" | "cidade" => Some(CanonicalField::City),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Standardizes a header then replaces recognized aliases with canonical names.
pub fn resolve_header(raw: &str) -> (String, Option<CanonicalField>) {
    let standardized = standardize_column_name(raw);
    match CanonicalField::from_alias(&standardized) {
        Some(field) => (field.name().to_string(), Some(field)),
        None => (standardized, None),
    }
}
