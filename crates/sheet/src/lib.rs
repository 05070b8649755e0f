//! Sheet/Book model and workbook storage for tabkeep
//!
//! Loads named sheets from a multi-sheet `.xlsx` file, normalizes their
//! column types, and saves single sheets back without disturbing the others.
//!
//! # Examples
//!
//! ## Creating a sheet from data
//!
//! ```
//! use tabkeep_sheet::{CellValue, Sheet};
//!
//! let sheet = Sheet::from_data(
//!     &["Name", "Age"],
//!     vec![vec!["Alice", "30"], vec!["Bob", "25"]],
//! )
//! .unwrap();
//!
//! assert_eq!(sheet.row_count(), 2);
//! assert_eq!(sheet.get_by_name(1, "Name").unwrap(), &CellValue::from("Bob"));
//! ```
//!
//! ## Normalizing loaded columns
//!
//! ```
//! use tabkeep_sheet::{normalize, CellValue, Sheet};
//!
//! let sheet = Sheet::from_data(&["qty"], vec![vec!["1"], vec!["2"]]).unwrap();
//! let sheet = normalize(sheet);
//!
//! assert_eq!(sheet.get(0, 0).unwrap(), &CellValue::Int(1));
//! ```
//!
//! ## Saving one sheet of a workbook
//!
//! ```no_run
//! use tabkeep_sheet::{SheetStore, WorkbookStore};
//!
//! let store = WorkbookStore::open("metadata-example.xlsx").unwrap();
//! let mut sheet = store.load("Inventory").unwrap();
//! sheet.set(0, 1, 42).unwrap();
//! store.save("Inventory", &sheet).unwrap();
//! ```

mod book;
mod cell;
mod error;
mod normalize;
mod sheet;
mod store;
mod xlsx;

/// Re-export book type.
pub use book::Book;
/// Re-export cell value type.
pub use cell::CellValue;
/// Re-export sheet error types.
pub use error::{Result, SheetError};
/// Re-export the column normalizer.
pub use normalize::{column_kind, normalize, ColumnKind};
/// Re-export sheet type.
pub use sheet::Sheet;
/// Re-export sheet storage.
pub use store::{SheetStore, WorkbookStore};
