use serde::{Deserialize, Serialize};

/// Declared type of a source column, driving value sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Date,
}

/// Storage type of a target column.
///
/// Source columns map onto the first four variants; `Boolean` only exists
/// for derived columns such as the station open/closed flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Timestamp,
    Boolean,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Timestamp => "TIMESTAMP(3)",
            ColumnType::Boolean => "BOOLEAN",
        }
    }
}

impl From<FieldType> for ColumnType {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => ColumnType::Text,
            FieldType::Int => ColumnType::Integer,
            FieldType::Float => ColumnType::Float,
            FieldType::Date => ColumnType::Timestamp,
        }
    }
}

/// One source column -> target column mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub source_column: &'static str,
    pub target_name: &'static str,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub const fn new(
        source_column: &'static str,
        target_name: &'static str,
        field_type: FieldType,
    ) -> Self {
        Self {
            source_column,
            target_name,
            field_type,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.field_type.into()
    }
}

/// How a derived column is computed from the raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Trimmed and left-padded to an 8 character station identifier.
    StationId { source_column: &'static str },
    /// `YYYYMMDDHH` digits turned into an hourly UTC timestamp.
    HourStamp { source_column: &'static str },
    /// True when the referenced target column is null.
    OpenWhenNull { target_name: &'static str },
}

/// A column computed after the generic pass; overrides any generic value
/// assigned under the same target name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedField {
    pub target_name: &'static str,
    pub column_type: ColumnType,
    pub derivation: Derivation,
}

impl DerivedField {
    pub const fn new(
        target_name: &'static str,
        column_type: ColumnType,
        derivation: Derivation,
    ) -> Self {
        Self {
            target_name,
            column_type,
            derivation,
        }
    }
}

/// A target column of the permanent table, in staging order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}
