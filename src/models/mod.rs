pub mod field;
pub mod record;
pub mod report;
pub mod value;

pub use field::{Column, ColumnType, Derivation, DerivedField, FieldDescriptor, FieldType};
pub use record::{CanonicalRecord, RawRecord};
pub use report::{FileReport, FileStatus, RunReport};
pub use value::{format_timestamp, Value};
