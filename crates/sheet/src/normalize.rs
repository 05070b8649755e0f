//! Column type coercion for freshly loaded sheets.
//!
//! A column holding any text is either converted to numbers as a whole or
//! left as text; there is no per-cell conversion. Text columns then get
//! their missing cells filled with the empty string.

use crate::cell::CellValue;
use crate::sheet::Sheet;

/// How a column's values are typed after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every present value is a number.
    Numeric,
    /// At least one present value is text.
    Text,
    /// Anything else (booleans, all-missing columns).
    Other,
}

/// Classify a column by its present values.
#[must_use]
pub fn column_kind(values: &[CellValue]) -> ColumnKind {
    let mut present = values.iter().filter(|v| !v.is_missing()).peekable();
    if present.peek().is_none() {
        return ColumnKind::Other;
    }

    let mut all_numeric = true;
    for value in present {
        match value {
            CellValue::String(_) => return ColumnKind::Text,
            v if v.is_number() => {}
            _ => all_numeric = false,
        }
    }

    if all_numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Other
    }
}

/// Convert every present value of a text column to a number.
///
/// Returns `None` as soon as one value does not convert.
fn to_numeric(values: &[CellValue]) -> Option<Vec<CellValue>> {
    values
        .iter()
        .map(|value| match value {
            v if v.is_missing() => Some(v.clone()),
            v if v.is_number() => Some(v.clone()),
            CellValue::String(s) => CellValue::parse_number(s),
            _ => None,
        })
        .collect()
}

/// Coerce a sheet's columns to consistent types.
#[must_use]
pub fn normalize(mut sheet: Sheet) -> Sheet {
    for col in 0..sheet.col_count() {
        let Ok(values) = sheet.column(col) else {
            continue;
        };
        if column_kind(&values) != ColumnKind::Text {
            continue;
        }

        let mut converted = to_numeric(&values).map(Vec::into_iter);
        let result = sheet.column_map(col, |cell| match converted.as_mut() {
            Some(numbers) => numbers.next().unwrap_or_else(|| cell.clone()),
            None if cell.is_missing() => CellValue::String(String::new()),
            None => cell.clone(),
        });
        if result.is_err() {
            tracing::warn!(column = col, "column vanished during normalization");
        }
    }
    sheet
}
