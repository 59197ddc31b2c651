use thiserror::Error;

/// Errors that can occur while loading or encoding a [`RawDataset`](crate::RawDataset).
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset file could not be opened or read.
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    /// The CSV reader rejected the input.
    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
    /// The dataset has a header but no records.
    #[error("dataset contains no records")]
    Empty,
    /// At least one feature column and the target column are required.
    #[error("dataset needs at least 2 columns (features + target), found {0}")]
    TooFewColumns(usize),
    /// Two columns share the same header.
    #[error("column `{0}` appears more than once")]
    DuplicateColumn(String),
    /// A record does not supply exactly one value per column.
    #[error("record {row} has {found} values but the dataset declares {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A column classified as numeric holds a non-numeric value.
    #[error("column `{column}` is numeric but record {row} holds `{value}`")]
    InvalidNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

/// Convenience result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
