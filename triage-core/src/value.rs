use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single raw cell: either already numeric or the text exactly as it was
/// read. Text that looks like a number stays text until a numeric column asks
/// for it, so categorical values such as `01` and `1` remain distinct.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Returns `true` when the cell reads as a finite number.
    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    /// Numeric view of the cell. Text is parsed on demand after trimming;
    /// non-finite values yield `None` in either form.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number).filter(|number| number.is_finite()),
            Value::Text(text) => parse_number(text),
        }
    }

    /// Textual form used as a symbol-table key.
    pub fn symbol(&self) -> Cow<'_, str> {
        match self {
            Value::Text(text) => Cow::Borrowed(text.as_str()),
            Value::Number(number) => Cow::Owned(number.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(number) => write!(f, "{number}"),
            Value::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}
