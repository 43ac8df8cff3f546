use crate::models::field::Column;
use crate::models::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Read access to one raw delimited record by source column name.
pub trait RawRecord {
    fn field(&self, column: &str) -> Option<&str>;
}

impl RawRecord for HashMap<String, String> {
    fn field(&self, column: &str) -> Option<&str> {
        self.get(column).map(String::as_str)
    }
}

impl RawRecord for HashMap<&str, &str> {
    fn field(&self, column: &str) -> Option<&str> {
        self.get(column).copied()
    }
}

impl RawRecord for [(&str, &str)] {
    fn field(&self, column: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == column).map(|(_, v)| *v)
    }
}

/// A normalized row: one value per target column, in the schema's fixed
/// column order. Every column is present; absent data is `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    columns: &'static [Column],
    values: Vec<Value>,
}

impl CanonicalRecord {
    pub(crate) fn new(columns: &'static [Column], values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, target_name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.name == target_name)
            .map(|i| &self.values[i])
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static Column, &Value)> {
        self.columns.iter().zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column.name, value)?;
        }
        map.end()
    }
}
