use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a cell value in a sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl CellValue {
    /// Check if the value is missing (null or a NaN float).
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Check if the value is numeric (int or float, NaN excluded)
    #[must_use]
    pub fn is_number(&self) -> bool {
        match self {
            CellValue::Int(_) => true,
            CellValue::Float(f) => !f.is_nan(),
            _ => false,
        }
    }

    /// Try to get the value as a float
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::String(s) => s.parse().ok(),
            CellValue::Null => None,
        }
    }

    /// Get the value as a string
    #[must_use]
    pub fn as_str(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::String(s) => s.clone(),
        }
    }

    /// Compare two cells the way the file format sees them.
    ///
    /// Missing values equal each other, and numbers compare by value, so
    /// `Int(1)` and `Float(1.0)` are the same cell.
    #[must_use]
    pub fn same_as(&self, other: &CellValue) -> bool {
        match (self, other) {
            (a, b) if a.is_missing() || b.is_missing() => a.is_missing() && b.is_missing(),
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => a.as_float() == b.as_float(),
            (a, b) => a == b,
        }
    }

    /// Parse text as a number: integer first, then float.
    ///
    /// Returns `None` for anything that is not a plain number, including the
    /// empty string.
    #[must_use]
    pub fn parse_number(s: &str) -> Option<CellValue> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return Some(CellValue::Int(i));
        }

        match trimmed.parse::<f64>() {
            // "inf" and "nan" parse as floats but are not numbers a user typed
            Ok(f) if f.is_finite() => Some(CellValue::Float(f)),
            _ => None,
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(fl) => write!(f, "{fl}"),
            CellValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i64::from(i))
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}
