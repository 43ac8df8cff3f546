//! Statement builders for the Postgres writers.
//!
//! Table and column names come from the static schema tables and are always
//! emitted as quoted identifiers, since the target tables use mixed case.

use crate::schema::DatasetSchema;
use crate::utils::constants::STAGING_TABLE_PREFIX;
use crate::utils::request_id::sanitize_label;

/// Postgres identifiers are truncated past this length.
const MAX_IDENTIFIER_LEN: usize = 63;

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `staging_<table>_<label>_<seq>`, unique per file within a run.
pub fn staging_table_name(table: &str, label: &str, sequence: u64) -> String {
    let mut name = format!(
        "{}{}_{}_{}",
        STAGING_TABLE_PREFIX,
        sanitize_label(table),
        sanitize_label(label),
        sequence
    );
    if name.len() > MAX_IDENTIFIER_LEN {
        let suffix = format!("_{}", sequence);
        name.truncate(MAX_IDENTIFIER_LEN - suffix.len());
        name.push_str(&suffix);
    }
    name
}

/// Empty, unindexed copy of the target's shape, gone at transaction end.
pub fn create_staging_sql(staging: &str, table: &str) -> String {
    format!(
        "CREATE TEMP TABLE {} (LIKE {} INCLUDING DEFAULTS) ON COMMIT DROP",
        quote_ident(staging),
        quote_ident(table)
    )
}

pub fn copy_sql(staging: &str, columns: &[&str]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER true)",
        quote_ident(staging),
        column_list(columns)
    )
}

fn conflict_clause(schema: &'static DatasetSchema) -> String {
    let updates = schema.update_columns();
    if updates.is_empty() {
        return format!("ON CONFLICT ({}) DO NOTHING", column_list(schema.primary_key));
    }
    let assignments = updates
        .iter()
        .map(|c| format!("{0} = EXCLUDED.{0}", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "ON CONFLICT ({}) DO UPDATE SET {}",
        column_list(schema.primary_key),
        assignments
    )
}

/// Set-based upsert from a staging table; last write wins per key.
pub fn merge_sql(schema: &'static DatasetSchema, staging: &str, restrict_to_parent: bool) -> String {
    let columns = column_list(&schema.column_names());
    let filter = match schema.parent {
        Some(parent) if restrict_to_parent => format!(
            " WHERE {col} IN (SELECT {col} FROM {parent})",
            col = quote_ident(parent.column),
            parent = quote_ident(parent.parent_table)
        ),
        _ => String::new(),
    };

    format!(
        "INSERT INTO {table} ({columns}) SELECT {columns} FROM {staging}{filter} {conflict}",
        table = quote_ident(schema.table),
        columns = columns,
        staging = quote_ident(staging),
        filter = filter,
        conflict = conflict_clause(schema)
    )
}

pub fn drop_staging_sql(staging: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(staging))
}

/// Single-row upsert with one positional parameter per column.
pub fn upsert_sql(schema: &'static DatasetSchema) -> String {
    let names = schema.column_names();
    let placeholders = (1..=names.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({}) {}",
        quote_ident(schema.table),
        column_list(&names),
        placeholders,
        conflict_clause(schema)
    )
}

/// DDL for the permanent table, derived from the field table.
pub fn create_table_sql(schema: &'static DatasetSchema) -> String {
    let mut definitions: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| {
            let not_null = if schema.primary_key.contains(&c.name) {
                " NOT NULL"
            } else {
                ""
            };
            format!("{} {}{}", quote_ident(c.name), c.column_type.sql_type(), not_null)
        })
        .collect();
    definitions.push(format!("PRIMARY KEY ({})", column_list(schema.primary_key)));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_ident(schema.table),
        definitions.join(",\n    ")
    )
}

pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_ident(table))
}
