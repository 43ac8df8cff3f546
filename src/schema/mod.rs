//! Static field tables for each dataset kind.
//!
//! Each table is declared once, by hand, and checked by the tests in this
//! module: target names are unique, follow the camel-case naming rule, and
//! every key column exists.

pub mod observation;
pub mod station;

use crate::models::{Column, ColumnType, Derivation, DerivedField, FieldDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Hourly observations, loaded through staging table + bulk copy.
    Observation,
    /// Station metadata, loaded through batched upserts.
    Station,
}

impl DatasetKind {
    pub fn schema(&self) -> &'static DatasetSchema {
        match self {
            DatasetKind::Observation => observation::schema(),
            DatasetKind::Station => station::schema(),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Observation => write!(f, "observation"),
            DatasetKind::Station => write!(f, "station"),
        }
    }
}

/// Restricts a merge to keys already present in a parent table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentFilter {
    pub column: &'static str,
    pub parent_table: &'static str,
}

pub struct DatasetSchema {
    pub kind: DatasetKind,
    pub table: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub derived: &'static [DerivedField],
    pub primary_key: &'static [&'static str],
    /// Source columns deliberately ignored.
    pub dropped: &'static [&'static str],
    pub parent: Option<ParentFilter>,
    columns: OnceLock<Vec<Column>>,
}

impl DatasetSchema {
    pub(crate) const fn new(
        kind: DatasetKind,
        table: &'static str,
        fields: &'static [FieldDescriptor],
        derived: &'static [DerivedField],
        primary_key: &'static [&'static str],
        dropped: &'static [&'static str],
        parent: Option<ParentFilter>,
    ) -> Self {
        Self {
            kind,
            table,
            fields,
            derived,
            primary_key,
            dropped,
            parent,
            columns: OnceLock::new(),
        }
    }

    /// Target columns in their fixed staging order: descriptor order, with
    /// derived fields replacing a same-named descriptor in place or appended.
    pub fn columns(&'static self) -> &'static [Column] {
        self.columns.get_or_init(|| {
            let mut columns: Vec<Column> = self
                .fields
                .iter()
                .map(|f| Column {
                    name: f.target_name,
                    column_type: f.column_type(),
                })
                .collect();

            for derived in self.derived {
                let column = Column {
                    name: derived.target_name,
                    column_type: derived.column_type,
                };
                match columns.iter_mut().find(|c| c.name == derived.target_name) {
                    Some(existing) => *existing = column,
                    None => columns.push(column),
                }
            }
            columns
        })
    }

    pub fn column_names(&'static self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.name).collect()
    }

    pub fn column_index(&'static self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name == name)
    }

    pub fn column_type(&'static self, name: &str) -> Option<ColumnType> {
        self.columns()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    /// Indices of the primary key columns within `columns()`.
    pub fn key_indices(&'static self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|k| self.column_index(k))
            .collect()
    }

    /// Source columns the primary key is derived from.
    pub fn key_sources(&self) -> Vec<&'static str> {
        self.derived
            .iter()
            .filter(|d| self.primary_key.contains(&d.target_name))
            .filter_map(|d| match d.derivation {
                Derivation::StationId { source_column } | Derivation::HourStamp { source_column } => {
                    Some(source_column)
                }
                Derivation::OpenWhenNull { .. } => None,
            })
            .collect()
    }

    /// Non-key columns, overwritten from the incoming row on conflict.
    pub fn update_columns(&'static self) -> Vec<&'static str> {
        self.columns()
            .iter()
            .map(|c| c.name)
            .filter(|name| !self.primary_key.contains(name))
            .collect()
    }

    /// Every source column the schema knows, described or dropped.
    pub fn known_sources(&self) -> HashSet<&'static str> {
        let mut known: HashSet<&'static str> =
            self.fields.iter().map(|f| f.source_column).collect();
        known.extend(self.dropped.iter().copied());
        for derived in self.derived {
            match derived.derivation {
                Derivation::StationId { source_column } | Derivation::HourStamp { source_column } => {
                    known.insert(source_column);
                }
                Derivation::OpenWhenNull { .. } => {}
            }
        }
        known
    }

    /// Compare a file header against the field table.
    pub fn check_header<S: AsRef<str>>(&self, header: &[S]) -> HeaderCheck {
        let known = self.known_sources();
        let present: HashSet<&str> = header.iter().map(|h| h.as_ref()).collect();

        let unknown = header
            .iter()
            .map(|h| h.as_ref().to_string())
            .filter(|h| !known.contains(h.as_str()))
            .collect();
        let missing = self
            .fields
            .iter()
            .map(|f| f.source_column)
            .filter(|s| !present.contains(s))
            .map(str::to_string)
            .collect();

        HeaderCheck { unknown, missing }
    }
}

impl fmt::Debug for DatasetSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetSchema")
            .field("kind", &self.kind)
            .field("table", &self.table)
            .field("fields", &self.fields.len())
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// Result of matching a file header against a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCheck {
    /// Header columns with no descriptor and not explicitly dropped.
    pub unknown: Vec<String>,
    /// Described source columns absent from the header (read as null).
    pub missing: Vec<String>,
}

impl HeaderCheck {
    pub fn is_exact(&self) -> bool {
        self.unknown.is_empty() && self.missing.is_empty()
    }
}

/// Camel-case a source column name: `NUM_POSTE` -> `numPoste`,
/// `UV_INDICE` -> `uvIndice`, `DXI3S` -> `dxi3S`.
///
/// Words split on any non-alphanumeric character and on letter/digit
/// boundaries; the first word is lower-cased, the rest capitalized.
pub fn to_target_name(source: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;

    for ch in source.chars() {
        if !ch.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != current_is_digit {
            words.push(std::mem::take(&mut current));
        }
        current_is_digit = is_digit;
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = String::with_capacity(source.len());
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}
