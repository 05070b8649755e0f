//! Cell-level change detection between a snapshot and an edited sheet.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tabkeep_sheet::{CellValue, Sheet};

/// Address of a cell: data row index and column name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub row: usize,
    pub column: String,
}

impl CellKey {
    #[must_use]
    pub fn new(row: usize, column: &str) -> Self {
        CellKey {
            row,
            column: column.to_string(),
        }
    }
}

/// What happened to one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellChange {
    /// The cell now holds this value.
    Set(CellValue),
    /// The cell had a value and is now empty.
    Cleared,
}

impl CellChange {
    /// The value the cell should hold after the change.
    #[must_use]
    pub fn value(&self) -> CellValue {
        match self {
            CellChange::Set(value) => value.clone(),
            CellChange::Cleared => CellValue::Null,
        }
    }
}

/// Sparse set of unsaved cell edits for one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingChanges {
    cells: BTreeMap<CellKey, CellChange>,
}

impl PendingChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The change recorded for a cell, if any
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&CellChange> {
        self.cells.get(&CellKey::new(row, column))
    }

    pub fn insert(&mut self, key: CellKey, change: CellChange) {
        self.cells.insert(key, change);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Iterate in (row, column) order
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &CellChange)> {
        self.cells.iter()
    }

    /// Write every pending change into `sheet`.
    ///
    /// Entries whose row is out of range or whose column no longer exists
    /// are skipped. Returns how many cells were written.
    pub fn apply_to(&self, sheet: &mut Sheet) -> usize {
        let mut applied = 0;
        for (key, change) in &self.cells {
            let Some(col) = sheet.column_index(&key.column) else {
                continue;
            };
            if sheet.set(key.row, col, change.value()).is_ok() {
                applied += 1;
            }
        }
        applied
    }
}

#[derive(Serialize)]
struct PendingEntry<'a> {
    row: usize,
    column: &'a str,
    #[serde(flatten)]
    change: &'a CellChange,
}

impl Serialize for PendingChanges {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.cells.iter().map(|(key, change)| PendingEntry {
            row: key.row,
            column: &key.column,
            change,
        }))
    }
}

/// Result of comparing a snapshot against an edited sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeReport {
    /// Cells whose value differs.
    pub changes: PendingChanges,
    /// Rows or columns were added, removed or reordered.
    pub structural: bool,
}

impl ChangeReport {
    /// Whether the edited sheet differs from the snapshot at all.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.structural || !self.changes.is_empty()
    }
}

/// Compare `previous` against `current` cell by cell.
///
/// Only cells inside `previous` are visited; rows past the end of `current`
/// and columns missing from it are skipped. Columns are matched by name.
#[must_use]
pub fn detect(previous: &Sheet, current: &Sheet) -> ChangeReport {
    let mut changes = PendingChanges::new();
    let rows = previous.row_count().min(current.row_count());

    for (prev_col, column) in previous.column_names().iter().enumerate() {
        let Some(cur_col) = current.column_index(column) else {
            continue;
        };

        for row in 0..rows {
            let (Ok(before), Ok(after)) = (previous.get(row, prev_col), current.get(row, cur_col))
            else {
                continue;
            };

            let change = match (before.is_missing(), after.is_missing()) {
                (true, true) => None,
                (true, false) => Some(CellChange::Set(after.clone())),
                (false, true) => Some(CellChange::Cleared),
                (false, false) if before.same_as(after) => None,
                (false, false) => Some(CellChange::Set(after.clone())),
            };

            if let Some(change) = change {
                changes.insert(CellKey::new(row, column), change);
            }
        }
    }

    let structural = previous.row_count() != current.row_count()
        || previous.column_names() != current.column_names();

    tracing::debug!(
        sheet = current.name(),
        changed = changes.len(),
        structural,
        "compared sheet against snapshot"
    );

    ChangeReport {
        changes,
        structural,
    }
}
