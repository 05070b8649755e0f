use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Wire shape of a sheet; validated into a [`Sheet`] on deserialization.
#[derive(Deserialize)]
struct RawSheet {
    #[serde(default)]
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl TryFrom<RawSheet> for Sheet {
    type Error = SheetError;

    fn try_from(raw: RawSheet) -> Result<Self> {
        Sheet::from_parts(&raw.name, raw.columns, raw.rows)
    }
}

/// A sheet: named columns over a grid of rows (row-major storage).
///
/// The header is kept apart from the data, so row `0` is the first data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSheet")]
pub struct Sheet {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    #[serde(skip)]
    column_index: HashMap<String, usize>,
}

impl Sheet {
    /// Create a new empty sheet
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("Sheet1")
    }

    /// Create a new empty sheet with a name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            column_index: HashMap::new(),
        }
    }

    /// Build a sheet from column names and rows.
    ///
    /// Every row must have exactly one cell per column and column names must
    /// be unique; anything else is not a table.
    pub fn from_parts(
        name: &str,
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self> {
        let mut column_index = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if column_index.insert(column.clone(), idx).is_some() {
                return Err(SheetError::DuplicateColumnName {
                    name: column.clone(),
                });
            }
        }

        if let Some((row_idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(SheetError::InvalidTable(format!(
                "row {row_idx} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }

        Ok(Sheet {
            name: name.to_string(),
            columns,
            rows,
            column_index,
        })
    }

    /// Create a sheet from column names and rows of convertible values
    pub fn from_data<T: Into<CellValue>>(columns: &[&str], data: Vec<Vec<T>>) -> Result<Self> {
        let rows = data
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::from_parts(
            "Sheet1",
            columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        )
    }

    /// Create a sheet from a raw grid whose first row is the header.
    ///
    /// Blank header cells become `Unnamed: <index>`, repeated names get a
    /// `.1`, `.2`, ... suffix, and short rows are padded with nulls.
    #[must_use]
    pub fn from_grid(name: &str, grid: Vec<Vec<CellValue>>) -> Self {
        let mut grid = grid.into_iter();
        let Some(header) = grid.next() else {
            return Self::with_name(name);
        };

        let width = header.len();
        let columns = header_names(&header);
        let rows: Vec<Vec<CellValue>> = grid
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();

        let column_index = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.clone(), idx))
            .collect();

        Sheet {
            name: name.to_string(),
            columns,
            rows,
            column_index,
        }
    }

    /// Get the sheet name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Get the number of data rows (header excluded)
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    fn column_index_by_name(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| SheetError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    // ===== Cell Access =====

    /// Get a cell value by row and column index (0-based)
    pub fn get(&self, row: usize, col: usize) -> Result<&CellValue> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .ok_or(SheetError::IndexOutOfBounds {
                row,
                col,
                rows: self.row_count(),
                cols: self.col_count(),
            })
    }

    /// Get a mutable cell value by row and column index (0-based)
    pub fn get_mut(&mut self, row: usize, col: usize) -> Result<&mut CellValue> {
        let rows = self.row_count();
        let cols = self.col_count();
        self.rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(SheetError::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            })
    }

    /// Set a cell value by row and column index (0-based)
    pub fn set<T: Into<CellValue>>(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        *self.get_mut(row, col)? = value.into();
        Ok(())
    }

    /// Get a cell value by row index and column name
    pub fn get_by_name(&self, row: usize, col_name: &str) -> Result<&CellValue> {
        let col = self.column_index_by_name(col_name)?;
        self.get(row, col)
    }

    /// Set a cell value by row index and column name
    pub fn set_by_name<T: Into<CellValue>>(
        &mut self,
        row: usize,
        col_name: &str,
        value: T,
    ) -> Result<()> {
        let col = self.column_index_by_name(col_name)?;
        self.set(row, col, value)
    }

    // ===== Row / Column Operations =====

    /// Get a column's values by index
    pub fn column(&self, index: usize) -> Result<Vec<CellValue>> {
        if index >= self.col_count() {
            return Err(SheetError::IndexOutOfBounds {
                row: 0,
                col: index,
                rows: self.row_count(),
                cols: self.col_count(),
            });
        }
        Ok(self.rows.iter().map(|row| row[index].clone()).collect())
    }

    /// Apply a function to every cell of one column
    pub fn column_map<F>(&mut self, col_index: usize, mut f: F) -> Result<()>
    where
        F: FnMut(&CellValue) -> CellValue,
    {
        if col_index >= self.col_count() {
            return Err(SheetError::IndexOutOfBounds {
                row: 0,
                col: col_index,
                rows: self.row_count(),
                cols: self.col_count(),
            });
        }
        for row in &mut self.rows {
            row[col_index] = f(&row[col_index]);
        }
        Ok(())
    }

    // ===== Iteration =====

    /// Iterate over data rows
    pub fn rows(&self) -> impl Iterator<Item = &Vec<CellValue>> {
        self.rows.iter()
    }

    /// Header row followed by data rows, as written to a worksheet
    pub fn grid(&self) -> impl Iterator<Item = Vec<CellValue>> + '_ {
        std::iter::once(
            self.columns
                .iter()
                .map(|c| CellValue::String(c.clone()))
                .collect(),
        )
        .filter(|header: &Vec<CellValue>| !header.is_empty())
        .chain(self.rows.iter().cloned())
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a header row into unique column names.
fn header_names(header: &[CellValue]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(header.len());
    let mut names = Vec::with_capacity(header.len());

    for (idx, cell) in header.iter().enumerate() {
        let base = if cell.is_missing() {
            format!("Unnamed: {idx}")
        } else {
            cell.as_str()
        };

        let mut name = base.clone();
        let mut suffix = 0;
        while seen.contains(&name) {
            suffix += 1;
            name = format!("{base}.{suffix}");
        }
        seen.insert(name.clone());
        names.push(name);
    }

    names
}
