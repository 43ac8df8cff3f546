//! Station metadata table (`Poste`).

use super::{DatasetKind, DatasetSchema};
use crate::models::{ColumnType, Derivation, DerivedField, FieldDescriptor, FieldType};
use crate::utils::constants::{STATION_ID_COLUMN, STATION_TABLE};

pub static FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("NUM_POSTE", "numPoste", FieldType::String),
    FieldDescriptor::new("NOM_USUEL", "nomUsuel", FieldType::String),
    FieldDescriptor::new("COMMUNE", "commune", FieldType::String),
    FieldDescriptor::new("LIEU_DIT", "lieuDit", FieldType::String),
    FieldDescriptor::new("DATOUVR", "datouvr", FieldType::Date),
    FieldDescriptor::new("DATFERM", "datferm", FieldType::Date),
    FieldDescriptor::new("LAT", "lat", FieldType::Float),
    FieldDescriptor::new("LON", "lon", FieldType::Float),
    FieldDescriptor::new("LAMBX", "lambx", FieldType::Int),
    FieldDescriptor::new("LAMBY", "lamby", FieldType::Int),
    FieldDescriptor::new("ALTI", "alti", FieldType::Int),
    FieldDescriptor::new("TYPE_POSTE_ACTUEL", "typePosteActuel", FieldType::Int),
];

pub static DERIVED: &[DerivedField] = &[
    DerivedField::new(
        STATION_ID_COLUMN,
        ColumnType::Text,
        Derivation::StationId {
            source_column: "NUM_POSTE",
        },
    ),
    // A station is open while it has no closing date.
    DerivedField::new(
        "posteOuvert",
        ColumnType::Boolean,
        Derivation::OpenWhenNull {
            target_name: "datferm",
        },
    ),
];

pub static PRIMARY_KEY: &[&str] = &[STATION_ID_COLUMN];

static SCHEMA: DatasetSchema = DatasetSchema::new(
    DatasetKind::Station,
    STATION_TABLE,
    FIELDS,
    DERIVED,
    PRIMARY_KEY,
    &[],
    None,
);

pub fn schema() -> &'static DatasetSchema {
    &SCHEMA
}
