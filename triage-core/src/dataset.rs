use std::collections::HashSet;
use std::io;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use log::debug;

use crate::error::{DatasetError, DatasetResult};
use crate::value::Value;

/// Ordered, rectangular table of raw records.
///
/// Column order is fixed for the lifetime of the dataset; the last column is
/// the target column.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RawDataset {
    /// Builds a dataset, checking that headers are unique and that every
    /// record supplies exactly one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> DatasetResult<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(DatasetError::DuplicateColumn(column.clone()));
            }
        }

        for (row, values) in rows.iter().enumerate() {
            if values.len() != columns.len() {
                return Err(DatasetError::RaggedRow {
                    row,
                    expected: columns.len(),
                    found: values.len(),
                });
            }
        }

        Ok(Self { columns, rows })
    }

    /// Reads a CSV file whose first line holds the column headers.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let path = path.as_ref();
        debug!(
            target: "triage_core::dataset",
            "Loading dataset from {}",
            path.display()
        );
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Reads CSV data from any reader. Cells are trimmed and kept as text;
    /// the encoder decides per column whether they are numeric.
    pub fn from_csv_reader<R: io::Read>(reader: R) -> DatasetResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Value::from).collect());
        }

        let dataset = Self::new(columns, rows)?;
        debug!(
            target: "triage_core::dataset",
            "Parsed {} records across {} columns",
            dataset.len(),
            dataset.columns.len()
        );
        Ok(dataset)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Name of the last column, if any.
    pub fn target_column(&self) -> Option<&str> {
        self.columns.last().map(String::as_str)
    }

    /// Iterates one column top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
symptom,severity,age,condition
fever, moderate ,34,Influenza
cough,mild,21,Common Cold
";

    #[test]
    fn csv_headers_and_cells_are_parsed() {
        let dataset = RawDataset::from_csv_reader(SAMPLE.as_bytes()).expect("valid csv");

        assert_eq!(dataset.columns(), ["symptom", "severity", "age", "condition"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.target_column(), Some("condition"));
        assert_eq!(dataset.rows()[0][1], Value::Text("moderate".into()));
        assert_eq!(dataset.rows()[1][2].as_number(), Some(21.0));
    }

    #[test]
    fn numeric_looking_cells_keep_their_source_text() {
        let input = "grade,condition\nhigh,A\n01,B\n1,A\n3.0,B\n";
        let dataset = RawDataset::from_csv_reader(input.as_bytes()).expect("valid csv");
        let grades: Vec<_> = dataset.column_values(0).map(|v| v.to_string()).collect();
        assert_eq!(grades, ["high", "01", "1", "3.0"]);
    }

    #[test]
    fn ragged_records_are_rejected() {
        let input = "a,b,c\n1,2,3\n4,5\n";
        let err = RawDataset::from_csv_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let err = RawDataset::new(vec!["a".into(), "a".into()], Vec::new()).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn header_only_csv_yields_empty_dataset() {
        let dataset = RawDataset::from_csv_reader("x,y\n".as_bytes()).expect("valid csv");
        assert!(dataset.is_empty());
        assert_eq!(dataset.columns().len(), 2);
    }

    #[test]
    fn column_values_follow_row_order() {
        let dataset = RawDataset::from_csv_reader(SAMPLE.as_bytes()).expect("valid csv");
        let symptoms: Vec<_> = dataset.column_values(0).map(|v| v.to_string()).collect();
        assert_eq!(symptoms, ["fever", "cough"]);
    }
}
