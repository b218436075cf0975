mod common;

use bronze_customers::{
    bronze::{ingest, transform},
    config::{DestinationConfig, PipelineConfig, TableRef},
    destination::{
        Batch, CustomerRow, Destination, MemoryBatch, MemoryDestination, create_schema_sql,
        create_table_sql, insert_sql,
    },
    error::LoadError,
    io_utils::{self, ReadOptions},
    load::{self, blank_to_null, parse_age, prepare_rows},
    table::Table,
};
use common::{THREE_ROW_RAW, TestWorkspace};
use encoding_rs::UTF_8;

fn target() -> TableRef {
    TableRef::new("bronze", "customers").expect("valid identifiers")
}

fn row(name: Option<&str>, age: Option<i32>, city: Option<&str>) -> CustomerRow {
    CustomerRow {
        customer_name: name.map(str::to_string),
        age,
        city: city.map(str::to_string),
    }
}

fn bronze_table(rows: &[&[&str]]) -> Table {
    Table::from_literals(&["customer_name", "age", "city"], rows)
}

/// Memory destination whose batches reject the insert at a given row.
struct FailingDestination {
    inner: MemoryDestination,
    fail_at: usize,
}

struct FailingBatch<'a> {
    inner: MemoryBatch<'a>,
    fail_at: usize,
}

impl Destination for FailingDestination {
    type Pending<'a>
        = FailingBatch<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<FailingBatch<'_>, LoadError> {
        Ok(FailingBatch {
            inner: self.inner.begin()?,
            fail_at: self.fail_at,
        })
    }
}

impl Batch for FailingBatch<'_> {
    fn create_schema(&mut self, target: &TableRef) -> Result<(), LoadError> {
        self.inner.create_schema(target)
    }

    fn create_table(&mut self, target: &TableRef) -> Result<(), LoadError> {
        self.inner.create_table(target)
    }

    fn insert(
        &mut self,
        target: &TableRef,
        row: usize,
        values: &CustomerRow,
    ) -> Result<(), LoadError> {
        if row == self.fail_at {
            return Err(LoadError::Destination(format!(
                "row {row} violates a constraint"
            )));
        }
        self.inner.insert(target, row, values)
    }

    fn commit(self) -> Result<(), LoadError> {
        self.inner.commit()
    }
}

#[test]
fn parse_age_maps_non_numeric_to_none() {
    assert_eq!(parse_age(Some("30"), 1).unwrap(), Some(30));
    assert_eq!(parse_age(Some(" 42.7 "), 1).unwrap(), Some(42));
    assert_eq!(parse_age(Some("abc"), 1).unwrap(), None);
    assert_eq!(parse_age(Some("nan"), 1).unwrap(), None);
    assert_eq!(parse_age(Some("  "), 1).unwrap(), None);
    assert_eq!(parse_age(None, 1).unwrap(), None);
}

#[test]
fn parse_age_rejects_values_outside_int_range() {
    let err = parse_age(Some("1e12"), 7).expect_err("too large");
    match err {
        LoadError::AgeNotCastable { row, value } => {
            assert_eq!(row, 7);
            assert_eq!(value, "1e12");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(parse_age(Some("-inf"), 1).is_err());
}

#[test]
fn blank_to_null_only_clears_whitespace() {
    assert_eq!(blank_to_null(Some("")), None);
    assert_eq!(blank_to_null(Some(" \t ")), None);
    assert_eq!(blank_to_null(Some(" Ana ")).as_deref(), Some(" Ana "));
    assert_eq!(blank_to_null(None), None);
}

#[test]
fn prepare_rows_maps_blank_text_and_bad_ages_to_null() {
    let table = Table {
        headers: vec!["customer_name".into(), "age".into(), "city".into()],
        rows: vec![
            vec![Some("Ana".into()), Some("30".into()), Some("".into())],
            vec![Some("   ".into()), Some("abc".into()), Some("Recife".into())],
        ],
    };
    let rows = prepare_rows(&table).expect("prepare");
    assert_eq!(
        rows,
        vec![
            row(Some("Ana"), Some(30), None),
            row(None, None, Some("Recife")),
        ]
    );
}

#[test]
fn prepare_rows_ignores_extra_columns_and_tolerates_missing_text_columns() {
    let table = Table::from_literals(
        &["phone", "age", "customer_name"],
        &[&["555", "19", "Bia"]],
    );
    let rows = prepare_rows(&table).expect("prepare");
    assert_eq!(rows, vec![row(Some("Bia"), Some(19), None)]);
}

#[test]
fn prepare_rows_requires_age_column() {
    let table = Table::from_literals(&["customer_name", "city"], &[&["Ana", "Recife"]]);
    assert!(matches!(
        prepare_rows(&table),
        Err(LoadError::MissingColumn("age"))
    ));
}

#[test]
fn load_provisions_and_inserts_in_source_order() {
    let table = bronze_table(&[
        &["Ana", "30", "Sao Paulo"],
        &["Bia", "", "Recife"],
        &["Caio", "61", ""],
    ]);
    let mut destination = MemoryDestination::new();
    let inserted = load::load(&table, &mut destination, &target()).expect("load");

    assert_eq!(inserted, 3);
    assert!(destination.has_schema("bronze"));
    assert_eq!(
        destination.rows(&target()).expect("table exists"),
        &[
            row(Some("Ana"), Some(30), Some("Sao Paulo")),
            row(Some("Bia"), None, Some("Recife")),
            row(Some("Caio"), Some(61), None),
        ]
    );
}

#[test]
fn repeated_provisioning_keeps_existing_rows() {
    let mut destination = MemoryDestination::new();
    load::load(&bronze_table(&[&["Ana", "30", "Recife"]]), &mut destination, &target())
        .expect("first load");
    load::load(&bronze_table(&[]), &mut destination, &target()).expect("empty load");
    load::load(&bronze_table(&[&["Bia", "40", "Natal"]]), &mut destination, &target())
        .expect("second load");

    assert_eq!(
        destination.rows(&target()).expect("table exists"),
        &[
            row(Some("Ana"), Some(30), Some("Recife")),
            row(Some("Bia"), Some(40), Some("Natal")),
        ]
    );
}

#[test]
fn failed_insert_leaves_destination_untouched() {
    let mut destination = FailingDestination {
        inner: MemoryDestination::new(),
        fail_at: 2,
    };
    let table = bronze_table(&[&["Ana", "30", "Recife"], &["Bia", "40", "Natal"]]);
    let err = load::load(&table, &mut destination, &target()).expect_err("insert fails");

    assert!(matches!(err, LoadError::Destination(_)));
    assert!(!destination.inner.has_schema("bronze"));
    assert!(destination.inner.rows(&target()).is_none());
}

#[test]
fn uncastable_age_aborts_before_any_insert() {
    let mut destination = MemoryDestination::new();
    load::load(&bronze_table(&[&["Ana", "30", "Recife"]]), &mut destination, &target())
        .expect("seed");

    let table = bronze_table(&[&["Bia", "40", "Natal"], &["Caio", "inf", "Natal"]]);
    let err = load::load(&table, &mut destination, &target()).expect_err("inf age");
    assert!(matches!(err, LoadError::AgeNotCastable { row: 2, .. }));
    assert_eq!(destination.rows(&target()).expect("table exists").len(), 1);
}

#[test]
fn raw_row_round_trips_to_destination_row() {
    let workspace = TestWorkspace::new();
    let raw = Table::from_literals(
        &["CustomerName", "Idade", "Cidade"],
        &[&["ana", "30", "sao paulo"]],
    );
    let bronze_path = workspace.path().join("bronze.csv");
    io_utils::write_table(&bronze_path, &transform(&raw).expect("transform")).expect("write");
    let bronze = io_utils::read_table(&bronze_path, ReadOptions::default()).expect("read");

    let mut destination = MemoryDestination::new();
    load::load(&bronze, &mut destination, &target()).expect("load");
    assert_eq!(
        destination.rows(&target()).expect("table exists"),
        &[row(Some("Ana"), Some(30), Some("Sao Paulo"))]
    );
}

#[test]
fn three_row_scenario_loads_three_rows_in_order() {
    let workspace = TestWorkspace::new();
    workspace.write_raw(THREE_ROW_RAW);
    let summary = ingest(&workspace.data_config(), UTF_8).expect("ingest");
    assert_eq!(summary.rows(), 3);

    let bronze = io_utils::read_table(&summary.bronze_path, ReadOptions::default()).expect("read");
    let mut destination = MemoryDestination::new();
    let inserted = load::load(&bronze, &mut destination, &target()).expect("load");

    assert_eq!(inserted, 3);
    assert_eq!(
        destination.rows(&target()).expect("table exists"),
        &[
            row(Some("Maria Souza"), None, Some("Rio De Janeiro")),
            row(Some("Joao Da Silva"), Some(42), Some("Sao Paulo")),
            row(Some("Ana"), Some(30), None),
        ]
    );
}

#[test]
fn execute_dry_run_counts_bronze_rows() {
    let workspace = TestWorkspace::new();
    workspace.write_raw(THREE_ROW_RAW);
    ingest(&workspace.data_config(), UTF_8).expect("ingest");

    let inserted = load::execute(&workspace.pipeline_config(), true).expect("dry run");
    assert_eq!(inserted, 3);
}

#[test]
fn execute_rejects_unsafe_identifiers_before_touching_files() {
    let workspace = TestWorkspace::new();
    let config = PipelineConfig {
        data: workspace.data_config(),
        destination: DestinationConfig {
            table: "customers; DROP TABLE x".to_string(),
            ..DestinationConfig::default()
        },
    };
    let err = load::execute(&config, true).expect_err("bad table name");
    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::InvalidIdentifier(_))
    ));
}

#[test]
fn execute_fails_when_bronze_file_is_missing() {
    let workspace = TestWorkspace::new();
    let err = load::execute(&workspace.pipeline_config(), true).expect_err("no bronze file");
    assert!(format!("{err:#}").contains("Opening input file"));
}

#[test]
fn ddl_matches_destination_schema() {
    assert_eq!(create_schema_sql(&target()), "CREATE SCHEMA IF NOT EXISTS bronze;");
    assert_eq!(
        create_table_sql(&target()),
        "CREATE TABLE IF NOT EXISTS bronze.customers (\n    customer_name TEXT,\n    age INT,\n    city TEXT\n);"
    );
    assert_eq!(
        insert_sql(&target()),
        "INSERT INTO bronze.customers (customer_name, age, city) VALUES ($1, $2, $3);"
    );
}
