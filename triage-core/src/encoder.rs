use log::debug;

use crate::dataset::RawDataset;
use crate::error::{DatasetError, DatasetResult};
use crate::symbols::{SymbolTable, SymbolTables};
use crate::value::Value;

/// Numeric image of a [`RawDataset`]: same columns, same row order.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedDataset {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl EncodedDataset {
    /// Wraps already-numeric rows. No shape validation is performed here; the
    /// trainer checks row widths against the column list.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }
}

/// Output of one encoding run.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    pub dataset: EncodedDataset,
    pub tables: SymbolTables,
    pub target_column: String,
}

/// Builds per-column symbol tables and encodes categorical cells into dense
/// integer codes.
///
/// A column is numeric when its first value reads as a number; numeric
/// columns are copied unchanged and get no table. Categorical columns intern
/// each cell's text as written. The last column is the target and its
/// table is inverted into a decoder.
#[derive(Clone, Debug, Default)]
pub struct ColumnEncoder {
    tables: SymbolTables,
}

impl ColumnEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables produced by the last successful [`encode`](Self::encode) call.
    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }

    /// Encodes `raw`, replacing any tables from a previous run.
    pub fn encode(&mut self, raw: &RawDataset) -> DatasetResult<Encoded> {
        let width = raw.columns().len();
        if width < 2 {
            return Err(DatasetError::TooFewColumns(width));
        }
        if raw.is_empty() {
            return Err(DatasetError::Empty);
        }

        let target_index = width - 1;
        let mut tables = SymbolTables::new();
        let mut cells = vec![vec![0.0; width]; raw.len()];

        for (index, column) in raw.columns().iter().enumerate() {
            let numeric = raw.rows()[0][index].is_numeric();
            if numeric {
                debug!(
                    target: "triage_core::encoder",
                    "Column `{}` is numeric; copying values unchanged",
                    column
                );
                for (row, value) in raw.column_values(index).enumerate() {
                    cells[row][index] = numeric_cell(column, row, value)?;
                }
                continue;
            }

            let mut table = SymbolTable::new();
            for (row, value) in raw.column_values(index).enumerate() {
                cells[row][index] = table.intern(&value.symbol()) as f64;
            }
            debug!(
                target: "triage_core::encoder",
                "Column `{}` is categorical with {} symbols",
                column,
                table.len()
            );

            if index == target_index {
                tables.set_target(table.invert());
            } else {
                tables.insert_feature(column.clone(), table);
            }
        }

        self.tables = tables.clone();
        Ok(Encoded {
            dataset: EncodedDataset::new(raw.columns().to_vec(), cells),
            tables,
            target_column: raw.columns()[target_index].clone(),
        })
    }
}

/// Encodes `raw` with a fresh [`ColumnEncoder`].
pub fn encode(raw: &RawDataset) -> DatasetResult<Encoded> {
    ColumnEncoder::new().encode(raw)
}

fn numeric_cell(column: &str, row: usize, value: &Value) -> DatasetResult<f64> {
    value.as_number().ok_or_else(|| DatasetError::InvalidNumeric {
        column: column.to_string(),
        row,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> RawDataset {
        RawDataset::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| Value::from(*cell)).collect())
                .collect(),
        )
        .expect("rectangular dataset")
    }

    #[test]
    fn categorical_columns_use_first_seen_codes() {
        let raw = dataset(
            &["symptom", "condition"],
            &[
                &["cough", "Common Cold"],
                &["fever", "Influenza"],
                &["cough", "Common Cold"],
                &["headache", "Migraine"],
            ],
        );

        let encoded = encode(&raw).expect("encodes");

        let codes: Vec<f64> = encoded.dataset.rows().iter().map(|row| row[0]).collect();
        assert_eq!(codes, [0.0, 1.0, 0.0, 2.0]);
        let table = encoded.tables.feature("symptom").expect("symptom table");
        assert_eq!(table.code("headache"), Some(2));
    }

    #[test]
    fn target_column_is_last_and_inverted() {
        let raw = dataset(
            &["condition", "label"],
            &[&["a", "yes"], &["b", "no"], &["c", "yes"]],
        );

        let encoded = encode(&raw).expect("encodes");

        assert_eq!(encoded.target_column, "label");
        assert!(encoded.tables.feature("label").is_none());
        let decoder = encoded.tables.target().expect("target decoder");
        assert_eq!(decoder.decode(0), Some("yes"));
        assert_eq!(decoder.decode(1), Some("no"));
    }

    #[test]
    fn numeric_columns_are_copied_without_a_table() {
        let raw = dataset(
            &["age", "symptom", "condition"],
            &[&["34", "fever", "Flu"], &["7.5", "cough", "Cold"]],
        );

        let encoded = encode(&raw).expect("encodes");

        assert!(!encoded.tables.is_categorical("age"));
        assert_eq!(encoded.dataset.rows()[0][0], 34.0);
        assert_eq!(encoded.dataset.rows()[1][0], 7.5);
    }

    #[test]
    fn numbers_inside_categorical_columns_use_their_text() {
        let raw = dataset(&["grade", "y"], &[&["high", "a"], &["3", "b"]]);

        let encoded = encode(&raw).expect("encodes");

        let table = encoded.tables.feature("grade").expect("grade table");
        assert_eq!(table.code("3"), Some(1));
    }

    #[test]
    fn numeric_spellings_in_categorical_columns_stay_distinct() {
        let input = "grade,condition\nhigh,A\n01,B\n1,A\n3.0,B\n";
        let raw = RawDataset::from_csv_reader(input.as_bytes()).expect("valid csv");

        let encoded = encode(&raw).expect("encodes");

        let table = encoded.tables.feature("grade").expect("grade table");
        assert_eq!(table.symbols(), ["high", "01", "1", "3.0"]);
        let codes: Vec<f64> = encoded.dataset.rows().iter().map(|row| row[0]).collect();
        assert_eq!(codes, [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn non_finite_number_in_numeric_column_is_rejected() {
        let raw = RawDataset::new(
            vec!["age".into(), "condition".into()],
            vec![
                vec![Value::Number(34.0), Value::from("Flu")],
                vec![Value::Number(f64::NAN), Value::from("Cold")],
            ],
        )
        .expect("rectangular");

        let err = encode(&raw).unwrap_err();

        assert!(matches!(err, DatasetError::InvalidNumeric { row: 1, .. }));
    }

    #[test]
    fn text_in_numeric_column_is_rejected() {
        let raw = dataset(
            &["age", "condition"],
            &[&["34", "Flu"], &["unknown", "Cold"]],
        );

        let err = encode(&raw).unwrap_err();

        assert!(matches!(
            err,
            DatasetError::InvalidNumeric { ref column, row: 1, ref value }
                if column == "age" && value == "unknown"
        ));
    }

    #[test]
    fn empty_and_narrow_datasets_are_rejected() {
        let empty = dataset(&["a", "b"], &[]);
        assert!(matches!(encode(&empty), Err(DatasetError::Empty)));

        let narrow = dataset(&["only"], &[&["x"]]);
        assert!(matches!(encode(&narrow), Err(DatasetError::TooFewColumns(1))));
    }

    #[test]
    fn rebuilt_encoder_replaces_previous_tables() {
        let mut encoder = ColumnEncoder::new();
        encoder
            .encode(&dataset(&["symptom", "y"], &[&["fever", "a"], &["cough", "b"]]))
            .expect("first run");
        encoder
            .encode(&dataset(&["severity", "y"], &[&["mild", "a"], &["mild", "b"]]))
            .expect("second run");

        assert!(encoder.tables().feature("symptom").is_none());
        assert_eq!(
            encoder.tables().feature("severity").map(SymbolTable::len),
            Some(1)
        );
    }
}
