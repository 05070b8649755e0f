//! Loading and saving single sheets of a shared workbook file.
//!
//! A save rewrites the whole file: every other sheet is read from the file as
//! it is before the save, the new workbook goes to a temp file next to the
//! original, and the temp file is renamed over it. The original is never
//! opened for writing.

use crate::book::Book;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Where sheets are loaded from and saved to.
pub trait SheetStore: Send + Sync {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Result<Vec<String>>;

    /// Load one sheet as stored.
    fn load(&self, sheet_name: &str) -> Result<Sheet>;

    /// Replace one sheet, keeping every other sheet as it is.
    fn save(&self, sheet_name: &str, sheet: &Sheet) -> Result<()>;
}

/// A [`SheetStore`] backed by one `.xlsx` file on disk.
#[derive(Debug)]
pub struct WorkbookStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` is `Some("")` for a bare file name like `book.xlsx`.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

impl WorkbookStore {
    /// Open the workbook at `path`.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if nothing exists at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(SheetError::FileNotFound { path });
        }
        Ok(WorkbookStore {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the workbook file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole workbook as it currently is on disk.
    pub fn read_book(&self) -> Result<Book> {
        let bytes = fs::read(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SheetError::FileNotFound {
                path: self.path.clone(),
            },
            _ => SheetError::load(self.path.display().to_string(), e),
        })?;
        Book::from_xlsx_bytes(bytes)
    }

    fn rewrite_with(&self, sheet_name: &str, sheet: &Sheet) -> Result<()> {
        let mut book = self.read_book()?;
        let appended = book.put_sheet(sheet_name, sheet.clone()).is_none();
        if appended {
            tracing::info!(sheet = sheet_name, "appending new sheet to workbook");
        }

        let bytes = book.to_xlsx_bytes()?;
        self.replace_file(&bytes)
    }

    /// Write `bytes` to a temp file beside the workbook and rename it into
    /// place. The temp file is deleted when dropped on any failure.
    fn replace_file(&self, bytes: &[u8]) -> Result<()> {
        let dir = parent_dir_or_dot(&self.path);
        let io_err = |e: std::io::Error| SheetError::save_io(&self.path, e);

        let mut tmp = tempfile::Builder::new()
            .prefix(".tabkeep-")
            .suffix(".xlsx.tmp")
            .tempfile_in(dir)
            .map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;

        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl SheetStore for WorkbookStore {
    fn sheet_names(&self) -> Result<Vec<String>> {
        Book::xlsx_sheet_names(&self.path)
    }

    fn load(&self, sheet_name: &str) -> Result<Sheet> {
        Sheet::from_xlsx_sheet(&self.path, sheet_name)
    }

    fn save(&self, sheet_name: &str, sheet: &Sheet) -> Result<()> {
        // One full-file rewrite at a time, whichever sheet it is for.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.rewrite_with(sheet_name, sheet).map_err(|err| {
            tracing::warn!(sheet = sheet_name, error = %err, "workbook save failed");
            match err {
                err @ SheetError::SaveIo { .. } => err,
                other => SheetError::save_io(&self.path, other),
            }
        })?;

        tracing::info!(
            sheet = sheet_name,
            rows = sheet.row_count(),
            path = %self.path.display(),
            "saved sheet"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use tempfile::tempdir;

    fn seed(path: &Path) {
        let mut book = Book::new();
        book.add_sheet(
            "A",
            Sheet::from_data(
                &["id", "name"],
                vec![vec![CellValue::Float(1.0), "x".into()]],
            )
            .unwrap(),
        )
        .unwrap();
        book.add_sheet(
            "B",
            Sheet::from_data(&["k"], vec![vec![CellValue::Float(9.5)]]).unwrap(),
        )
        .unwrap();
        book.save_as_xlsx(path).unwrap();
    }

    fn dir_entries(dir: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let result = WorkbookStore::open(dir.path().join("missing.xlsx"));
        assert!(matches!(result, Err(SheetError::FileNotFound { .. })));
    }

    #[test]
    fn test_save_replaces_only_target_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        seed(&path);
        let store = WorkbookStore::open(&path).unwrap();

        let mut edited = store.load("A").unwrap();
        edited.set_by_name(0, "name", "y").unwrap();
        store.save("A", &edited).unwrap();

        assert_eq!(store.sheet_names().unwrap(), vec!["A", "B"]);
        assert_eq!(
            store.load("A").unwrap().get_by_name(0, "name").unwrap(),
            &CellValue::String("y".to_string())
        );
        assert_eq!(
            store.load("B").unwrap().get_by_name(0, "k").unwrap(),
            &CellValue::Float(9.5)
        );
        assert_eq!(dir_entries(dir.path()), vec![path.clone()]);
    }

    #[test]
    fn test_save_unknown_sheet_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        seed(&path);
        let store = WorkbookStore::open(&path).unwrap();

        let extra = Sheet::from_data(&["z"], vec![vec!["new"]]).unwrap();
        store.save("C", &extra).unwrap();

        assert_eq!(store.sheet_names().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_failed_save_leaves_file_and_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"not a workbook").unwrap();
        let store = WorkbookStore::open(&path).unwrap();

        let sheet = Sheet::from_data(&["a"], vec![vec![1]]).unwrap();
        let result = store.save("A", &sheet);

        assert!(matches!(result, Err(SheetError::SaveIo { .. })));
        assert_eq!(fs::read(&path).unwrap(), b"not a workbook");
        assert_eq!(dir_entries(dir.path()), vec![path.clone()]);
    }

    #[test]
    fn test_failed_render_leaves_file_and_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        seed(&path);
        let original = fs::read(&path).unwrap();
        let store = WorkbookStore::open(&path).unwrap();

        // Worksheet names are limited to 31 characters.
        let long_name = "N".repeat(40);
        let sheet = Sheet::from_data(&["a"], vec![vec![1]]).unwrap();
        let err = store.save(&long_name, &sheet).unwrap_err();
        assert!(matches!(err, SheetError::SaveIo { .. }));
        assert_eq!(err.kind(), "save_io_error");

        // Cells hold at most 32767 characters.
        let mut edited = store.load("A").unwrap();
        edited.set_by_name(0, "name", "x".repeat(40_000)).unwrap();
        let err = store.save("A", &edited).unwrap_err();
        assert_eq!(err.kind(), "save_io_error");

        assert_eq!(fs::read(&path).unwrap(), original);
        assert_eq!(dir_entries(dir.path()), vec![path.clone()]);
        assert_eq!(store.sheet_names().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_relative_parent() {
        assert_eq!(parent_dir_or_dot(Path::new("book.xlsx")), Path::new("."));
        assert_eq!(parent_dir_or_dot(Path::new("data/book.xlsx")), Path::new("data"));
    }
}
