//! Raw symptom datasets and the categorical column encoder that feeds the
//! triage classifier.
//!
//! A [`RawDataset`] is read once (usually from CSV), handed to a
//! [`ColumnEncoder`], and turned into an [`EncodedDataset`] plus the
//! [`SymbolTables`] needed to encode future prediction inputs and decode
//! predicted labels.

pub mod dataset;
pub mod encoder;
pub mod error;
pub mod symbols;
pub mod value;

pub use dataset::RawDataset;
pub use encoder::{encode, ColumnEncoder, Encoded, EncodedDataset};
pub use error::{DatasetError, DatasetResult};
pub use symbols::{SymbolTable, SymbolTables, TargetDecoder};
pub use value::Value;
