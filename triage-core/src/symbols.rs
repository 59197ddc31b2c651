use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Forward symbol table for one categorical column.
///
/// Codes are dense and zero-based, assigned in first-seen order. The table is
/// serialized as its ordered symbol list and the lookup index is rebuilt on
/// deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SymbolTable {
    symbols: Vec<String>,
    codes: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the code for `symbol`, assigning the next free code on first
    /// sight.
    pub fn intern(&mut self, symbol: &str) -> usize {
        if let Some(&code) = self.codes.get(symbol) {
            return code;
        }
        let code = self.symbols.len();
        self.symbols.push(symbol.to_string());
        self.codes.insert(symbol.to_string(), code);
        code
    }

    /// Forward lookup: symbol to code.
    pub fn code(&self, symbol: &str) -> Option<usize> {
        self.codes.get(symbol).copied()
    }

    /// Reverse lookup: code to symbol.
    pub fn symbol(&self, code: usize) -> Option<&str> {
        self.symbols.get(code).map(String::as_str)
    }

    /// Symbols in code order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Every symbol is distinct and maps back to its own code. Tables built by
    /// [`intern`](Self::intern) always hold; a deserialized list may not.
    pub fn is_consistent(&self) -> bool {
        self.codes.len() == self.symbols.len()
            && self
                .symbols
                .iter()
                .enumerate()
                .all(|(code, symbol)| self.codes.get(symbol) == Some(&code))
    }

    /// Turns the table into a decoder (code to symbol), as used for the
    /// target column.
    pub fn invert(self) -> TargetDecoder {
        TargetDecoder {
            labels: self.symbols,
        }
    }
}

impl From<Vec<String>> for SymbolTable {
    fn from(symbols: Vec<String>) -> Self {
        let mut codes = HashMap::with_capacity(symbols.len());
        for (code, symbol) in symbols.iter().enumerate() {
            codes.entry(symbol.clone()).or_insert(code);
        }
        Self { symbols, codes }
    }
}

impl From<SymbolTable> for Vec<String> {
    fn from(table: SymbolTable) -> Self {
        table.symbols
    }
}

/// Inverted symbol table of the target column: maps predicted class codes
/// back to label text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetDecoder {
    labels: Vec<String>,
}

impl TargetDecoder {
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Labels in code order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of distinct classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns `true` when no label appears twice.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.labels.len());
        self.labels.iter().all(|label| seen.insert(label.as_str()))
    }
}

/// Every symbol table produced by one encoding run.
///
/// Feature columns keep their forward tables keyed by column name; the target
/// column, when categorical, is held as a [`TargetDecoder`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTables {
    features: BTreeMap<String, SymbolTable>,
    target: Option<TargetDecoder>,
}

impl SymbolTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward table of a categorical feature column.
    pub fn feature(&self, column: &str) -> Option<&SymbolTable> {
        self.features.get(column)
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, &SymbolTable)> + '_ {
        self.features
            .iter()
            .map(|(column, table)| (column.as_str(), table))
    }

    pub fn target(&self) -> Option<&TargetDecoder> {
        self.target.as_ref()
    }

    /// Returns `true` when `column` was encoded through a symbol table.
    pub fn is_categorical(&self, column: &str) -> bool {
        self.features.contains_key(column)
    }

    pub fn insert_feature(&mut self, column: impl Into<String>, table: SymbolTable) {
        self.features.insert(column.into(), table);
    }

    pub fn set_target(&mut self, decoder: TargetDecoder) {
        self.target = Some(decoder);
    }
}
