//! Hourly observation table (`ObservationHoraire`).

use super::{DatasetKind, DatasetSchema, ParentFilter};
use crate::models::field::FieldType::{Float, Int, String as Text};
use crate::models::{ColumnType, Derivation, DerivedField, FieldDescriptor, FieldType};
use crate::utils::constants::{OBSERVATION_TABLE, STATION_ID_COLUMN, STATION_TABLE};

const fn field(source: &'static str, target: &'static str, field_type: FieldType) -> FieldDescriptor {
    FieldDescriptor::new(source, target, field_type)
}

/// Source columns of the hourly archives. Column order here is the staging
/// and merge order.
pub static FIELDS: &[FieldDescriptor] = &[
    field("N", "n", Text),
    field("T", "t", Float),
    field("U", "u", Text),
    field("B1", "b1", Text),
    field("B2", "b2", Text),
    field("B3", "b3", Text),
    field("B4", "b4", Text),
    field("C1", "c1", Text),
    field("C2", "c2", Text),
    field("C3", "c3", Text),
    field("C4", "c4", Text),
    field("CH", "ch", Text),
    field("CL", "cl", Text),
    field("CM", "cm", Text),
    field("DD", "dd", Text),
    field("DG", "dg", Text),
    field("FF", "ff", Text),
    field("N1", "n1", Text),
    field("N2", "n2", Text),
    field("N3", "n3", Text),
    field("N4", "n4", Text),
    field("QN", "qn", Text),
    field("QT", "qt", Int),
    field("QU", "qu", Text),
    field("TD", "td", Text),
    field("TN", "tn", Text),
    field("TX", "tx", Text),
    field("UN", "un", Text),
    field("UV", "uv", Text),
    field("UX", "ux", Text),
    field("VV", "vv", Text),
    field("W1", "w1", Text),
    field("W2", "w2", Text),
    field("WW", "ww", Text),
    field("DD2", "dd2", Text),
    field("DIF", "dif", Text),
    field("DIR", "dir", Text),
    field("DXI", "dxi", Text),
    field("DXY", "dxy", Text),
    field("FF2", "ff2", Text),
    field("FXI", "fxi", Text),
    field("FXY", "fxy", Text),
    field("GLO", "glo", Text),
    field("HTN", "htn", Text),
    field("HTX", "htx", Text),
    field("HUN", "hun", Text),
    field("HUX", "hux", Text),
    field("HXI", "hxi", Text),
    field("HXY", "hxy", Text),
    field("LAT", "lat", Text),
    field("LON", "lon", Text),
    field("QB1", "qb1", Text),
    field("QB2", "qb2", Text),
    field("QB3", "qb3", Text),
    field("QB4", "qb4", Text),
    field("QC1", "qc1", Text),
    field("QC2", "qc2", Text),
    field("QC3", "qc3", Text),
    field("QC4", "qc4", Text),
    field("QCH", "qch", Text),
    field("QCL", "qcl", Text),
    field("QCM", "qcm", Text),
    field("QDD", "qdd", Text),
    field("QDG", "qdg", Text),
    field("QFF", "qff", Text),
    field("QN1", "qn1", Text),
    field("QN2", "qn2", Text),
    field("QN3", "qn3", Text),
    field("QN4", "qn4", Text),
    field("QTD", "qtd", Text),
    field("QTN", "qtn", Text),
    field("QTX", "qtx", Text),
    field("QUN", "qun", Text),
    field("QUV", "quv", Text),
    field("QUX", "qux", Text),
    field("QVV", "qvv", Text),
    field("QW1", "qw1", Text),
    field("QW2", "qw2", Text),
    field("QWW", "qww", Text),
    field("RR1", "rr1", Text),
    field("SOL", "sol", Text),
    field("T10", "t10", Text),
    field("T20", "t20", Text),
    field("T50", "t50", Text),
    field("TSV", "tsv", Text),
    field("UV2", "uv2", Text),
    field("ALTI", "alti", Int),
    field("DIF2", "dif2", Text),
    field("DIR2", "dir2", Text),
    field("DRR1", "drr1", Text),
    field("DXI2", "dxi2", Text),
    field("FXI2", "fxi2", Text),
    field("GEOP", "geop", Text),
    field("GLO2", "glo2", Text),
    field("HXI2", "hxi2", Text),
    field("INS2", "ins2", Text),
    field("NBAS", "nbas", Text),
    field("PMER", "pmer", Float),
    field("QDD2", "qdd2", Text),
    field("QDIF", "qdif", Text),
    field("QDIR", "qdir", Text),
    field("QDXI", "qdxi", Text),
    field("QDXY", "qdxy", Text),
    field("QFF2", "qff2", Text),
    field("QFXI", "qfxi", Text),
    field("QFXY", "qfxy", Text),
    field("QGLO", "qglo", Text),
    field("QHTN", "qhtn", Text),
    field("QHTX", "qhtx", Text),
    field("QHUN", "qhun", Text),
    field("QHUX", "qhux", Text),
    field("QHXI", "qhxi", Text),
    field("QHXY", "qhxy", Text),
    field("QINS", "qins", Text),
    field("QRR1", "qrr1", Text),
    field("QSOL", "qsol", Text),
    field("QT10", "qt10", Text),
    field("QT20", "qt20", Text),
    field("QT50", "qt50", Text),
    field("QTSV", "qtsv", Text),
    field("QUV2", "quv2", Text),
    field("T100", "t100", Text),
    field("TMER", "tmer", Text),
    field("TN50", "tn50", Text),
    field("DXI3S", "dxi3S", Text),
    field("FXI3S", "fxi3S", Text),
    field("PSTAT", "pstat", Text),
    field("QDIF2", "qdif2", Text),
    field("QDIR2", "qdir2", Text),
    field("QDRR1", "qdrr1", Text),
    field("QDXI2", "qdxi2", Text),
    field("QFXI2", "qfxi2", Text),
    field("QGEOP", "qgeop", Text),
    field("QGLO2", "qglo2", Text),
    field("QHXI2", "qhxi2", Text),
    field("QINS2", "qins2", Text),
    field("QNBAS", "qnbas", Text),
    field("QPMER", "qpmer", Int),
    field("QT100", "qt100", Text),
    field("QTMER", "qtmer", Text),
    field("QTN50", "qtn50", Text),
    field("SOLNG", "solng", Text),
    field("TNSOL", "tnsol", Text),
    field("VVMER", "vvmer", Text),
    field("DHUMEC", "dhumec", Text),
    field("DVV200", "dvv200", Text),
    field("HFXI3S", "hfxi3S", Text),
    field("HVAGUE", "hvague", Text),
    field("INFRAR", "infrar", Text),
    field("PVAGUE", "pvague", Text),
    field("QDXI3S", "qdxi3S", Text),
    field("QFXI3S", "qfxi3S", Text),
    field("QPSTAT", "qpstat", Int),
    field("QSOLNG", "qsolng", Text),
    field("QTNSOL", "qtnsol", Text),
    field("QVVMER", "qvvmer", Text),
    field("TLAGON", "tlagon", Text),
    field("DHUMI40", "dhumi40", Text),
    field("DHUMI80", "dhumi80", Text),
    field("ESNEIGE", "esneige", Text),
    field("ETATMER", "etatmer", Text),
    field("HNEIGEF", "hneigef", Text),
    field("INFRAR2", "infrar2", Text),
    field("PMERMIN", "pmermin", Text),
    field("QDHUMEC", "qdhumec", Text),
    field("QDVV200", "qdvv200", Text),
    field("QHFXI3S", "qhfxi3S", Text),
    field("QHVAGUE", "qhvague", Text),
    field("QINFRAR", "qinfrar", Text),
    field("QPVAGUE", "qpvague", Text),
    field("QTLAGON", "qtlagon", Text),
    field("TSNEIGE", "tsneige", Text),
    field("DIRHOULE", "dirhoule", Text),
    field("NEIGETOT", "neigetot", Text),
    field("QDHUMI40", "qdhumi40", Text),
    field("QDHUMI80", "qdhumi80", Text),
    field("QESNEIGE", "qesneige", Text),
    field("QETATMER", "qetatmer", Text),
    field("QHNEIGEF", "qhneigef", Text),
    field("QINFRAR2", "qinfrar2", Text),
    field("QPMERMIN", "qpmermin", Text),
    field("QTSNEIGE", "qtsneige", Text),
    field("HNEIGEFI1", "hneigefi1", Text),
    field("HNEIGEFI3", "hneigefi3", Text),
    field("NOM_USUEL", "nomUsuel", Text),
    field("NUM_POSTE", "numPoste", Text),
    field("QDIRHOULE", "qdirhoule", Text),
    field("QNEIGETOT", "qneigetot", Text),
    field("TCHAUSSEE", "tchaussee", Text),
    field("TUBENEIGE", "tubeneige", Text),
    field("TVEGETAUX", "tvegetaux", Text),
    field("UV_INDICE", "uvIndice", Text),
    field("AAAAMMJJHH", "aaaammjjhh", Int),
    field("ECOULEMENT", "ecoulement", Text),
    field("QHNEIGEFI1", "qhneigefi1", Text),
    field("QHNEIGEFI3", "qhneigefi3", Text),
    field("QTCHAUSSEE", "qtchaussee", Text),
    field("QTUBENEIGE", "qtubeneige", Text),
    field("QTVEGETAUX", "qtvegetaux", Text),
    field("QUV_INDICE", "quvIndice", Text),
    field("CHARGENEIGE", "chargeneige", Text),
    field("QECOULEMENT", "qecoulement", Text),
    field("QCHARGENEIGE", "qchargeneige", Text),
];

pub static DERIVED: &[DerivedField] = &[
    DerivedField::new(
        STATION_ID_COLUMN,
        ColumnType::Text,
        Derivation::StationId {
            source_column: "NUM_POSTE",
        },
    ),
    DerivedField::new(
        "dateObservation",
        ColumnType::Timestamp,
        Derivation::HourStamp {
            source_column: "AAAAMMJJHH",
        },
    ),
];

pub static PRIMARY_KEY: &[&str] = &[STATION_ID_COLUMN, "dateObservation"];

static SCHEMA: DatasetSchema = DatasetSchema::new(
    DatasetKind::Observation,
    OBSERVATION_TABLE,
    FIELDS,
    DERIVED,
    PRIMARY_KEY,
    &[],
    Some(ParentFilter {
        column: STATION_ID_COLUMN,
        parent_table: STATION_TABLE,
    }),
);

pub fn schema() -> &'static DatasetSchema {
    &SCHEMA
}
