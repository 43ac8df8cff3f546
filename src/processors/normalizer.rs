use crate::models::{CanonicalRecord, Derivation, RawRecord, Value};
use crate::schema::{DatasetKind, DatasetSchema};
use crate::utils::sanitize::{parse_hour_stamp, sanitize, station_id_or_empty};
use std::collections::HashMap;

/// Maps raw delimited records onto a schema's canonical column order.
///
/// Holds no mutable state, so one normalizer can be shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct RecordNormalizer {
    schema: &'static DatasetSchema,
}

impl RecordNormalizer {
    pub fn new(schema: &'static DatasetSchema) -> Self {
        Self { schema }
    }

    pub fn for_kind(kind: DatasetKind) -> Self {
        Self::new(kind.schema())
    }

    pub fn schema(&self) -> &'static DatasetSchema {
        self.schema
    }

    /// Generic pass over the field table, then derived fields on top.
    pub fn normalize<R: RawRecord + ?Sized>(&self, raw: &R) -> CanonicalRecord {
        let columns = self.schema.columns();
        let mut values = vec![Value::Null; columns.len()];

        // Field i always lands in column i; derived fields only replace or append.
        for (i, field) in self.schema.fields.iter().enumerate() {
            values[i] = sanitize(raw.field(field.source_column), field.field_type);
        }

        for derived in self.schema.derived {
            let Some(index) = self.schema.column_index(derived.target_name) else {
                continue;
            };
            values[index] = match derived.derivation {
                Derivation::StationId { source_column } => {
                    Value::Text(station_id_or_empty(raw.field(source_column)))
                }
                Derivation::HourStamp { source_column } => raw
                    .field(source_column)
                    .and_then(parse_hour_stamp)
                    .map_or(Value::Null, Value::Timestamp),
                Derivation::OpenWhenNull { target_name } => {
                    let closed = self
                        .schema
                        .column_index(target_name)
                        .map(|i| !values[i].is_null())
                        .unwrap_or(false);
                    Value::Bool(!closed)
                }
            };
        }

        CanonicalRecord::new(columns, values)
    }

    /// True when every primary key column carries a usable value.
    pub fn has_valid_key(&self, record: &CanonicalRecord) -> bool {
        self.schema
            .key_indices()
            .into_iter()
            .all(|i| !record.values()[i].is_blank())
    }

    /// Resolve source column positions once per file.
    pub fn bind_header<S: AsRef<str>>(&self, header: &[S]) -> HeaderIndex {
        HeaderIndex::new(header)
    }
}

/// Source column name -> position in a delimited row.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new<S: AsRef<str>>(header: &[S]) -> Self {
        let mut positions = HashMap::with_capacity(header.len());
        for (i, name) in header.iter().enumerate() {
            // First occurrence wins on duplicated header names.
            positions
                .entry(name.as_ref().trim().to_string())
                .or_insert(i);
        }
        Self { positions }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn row<'a, S: AsRef<str>>(&'a self, values: &'a [S]) -> IndexedRow<'a, S> {
        IndexedRow { index: self, values }
    }
}

/// One row viewed through its file's header.
pub struct IndexedRow<'a, S> {
    index: &'a HeaderIndex,
    values: &'a [S],
}

impl<S: AsRef<str>> RawRecord for IndexedRow<'_, S> {
    fn field(&self, column: &str) -> Option<&str> {
        self.index
            .position(column)
            .and_then(|i| self.values.get(i))
            .map(|v| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_station_record_normalization() {
        let normalizer = RecordNormalizer::for_kind(DatasetKind::Station);
        let raw: &[(&str, &str)] = &[
            ("NUM_POSTE", "14002"),
            ("NOM_USUEL", " Paris "),
            ("DATFERM", ""),
            ("LAT", "48.82"),
            ("ALTI", "75"),
        ];
        let record = normalizer.normalize(raw);

        assert_eq!(record.get("numPoste"), Some(&Value::Text("00014002".to_string())));
        assert_eq!(record.get("nomUsuel"), Some(&Value::Text("Paris".to_string())));
        assert_eq!(record.get("posteOuvert"), Some(&Value::Bool(true)));
        assert_eq!(record.get("lat"), Some(&Value::Float(48.82)));
        assert_eq!(record.get("alti"), Some(&Value::Int(75)));
        assert_eq!(record.get("commune"), Some(&Value::Null));
        assert_eq!(record.len(), normalizer.schema().columns().len());
        assert!(normalizer.has_valid_key(&record));
    }

    #[test]
    fn test_closed_station() {
        let normalizer = RecordNormalizer::for_kind(DatasetKind::Station);
        let raw: &[(&str, &str)] = &[("NUM_POSTE", "75114001"), ("DATFERM", "2001-06-30")];
        let record = normalizer.normalize(raw);
        assert_eq!(record.get("posteOuvert"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_observation_record_normalization() {
        let normalizer = RecordNormalizer::for_kind(DatasetKind::Observation);
        let raw: &[(&str, &str)] = &[
            ("NUM_POSTE", "1014002"),
            ("AAAAMMJJHH", "2024021310"),
            ("T", "12.4"),
            ("QT", "1"),
        ];
        let record = normalizer.normalize(raw);

        let expected = Utc.with_ymd_and_hms(2024, 2, 13, 10, 0, 0).unwrap();
        assert_eq!(record.get("numPoste"), Some(&Value::Text("01014002".to_string())));
        assert_eq!(record.get("dateObservation"), Some(&Value::Timestamp(expected)));
        assert_eq!(record.get("aaaammjjhh"), Some(&Value::Int(2024021310)));
        assert_eq!(record.get("t"), Some(&Value::Float(12.4)));
        assert_eq!(record.get("qt"), Some(&Value::Int(1)));
        assert_eq!(record.get("uvIndice"), Some(&Value::Null));
        assert!(normalizer.has_valid_key(&record));
    }

    #[test]
    fn test_blank_key_is_invalid() {
        let normalizer = RecordNormalizer::for_kind(DatasetKind::Observation);
        let no_station: &[(&str, &str)] = &[("AAAAMMJJHH", "2024021310")];
        assert!(!normalizer.has_valid_key(&normalizer.normalize(no_station)));

        let bad_stamp: &[(&str, &str)] = &[("NUM_POSTE", "14002"), ("AAAAMMJJHH", "2024")];
        let record = normalizer.normalize(bad_stamp);
        assert_eq!(record.get("dateObservation"), Some(&Value::Null));
        assert!(!normalizer.has_valid_key(&record));
    }

    #[test]
    fn test_indexed_row_lookup() {
        let normalizer = RecordNormalizer::for_kind(DatasetKind::Station);
        let index = normalizer.bind_header(&["NUM_POSTE", "NOM_USUEL", "DATFERM"]);
        let values = vec!["14002".to_string(), "Paris".to_string(), String::new()];
        let row = index.row(values.as_slice());

        assert_eq!(row.field("NOM_USUEL"), Some("Paris"));
        assert_eq!(row.field("ALTI"), None);

        let record = normalizer.normalize(&row);
        assert_eq!(record.get("numPoste"), Some(&Value::Text("00014002".to_string())));
        assert_eq!(record.get("posteOuvert"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_short_row_reads_missing_columns_as_null() {
        let index = HeaderIndex::new(&["NUM_POSTE", "NOM_USUEL"]);
        let values = ["14002"];
        let row = index.row(&values);
        assert_eq!(row.field("NOM_USUEL"), None);
    }
}
