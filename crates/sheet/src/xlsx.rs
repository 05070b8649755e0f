use crate::book::Book;
use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

/// Convert calamine Data to CellValue
fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        // Excel stores dates as days since 1899-12-30
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::String(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(format!("#ERROR: {e:?}")),
    }
}

fn read_sheet<RS: Read + Seek>(workbook: &mut Xlsx<RS>, sheet_name: &str) -> Result<Sheet> {
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e: XlsxError| SheetError::load(format!("sheet '{sheet_name}'"), e))?;

    let grid: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(data_to_cell_value).collect())
        .collect();

    Ok(Sheet::from_grid(sheet_name, grid))
}

fn read_book<RS: Read + Seek>(mut workbook: Xlsx<RS>) -> Result<Book> {
    let mut book = Book::new();
    for sheet_name in workbook.sheet_names() {
        let sheet = read_sheet(&mut workbook, &sheet_name)?;
        book.add_sheet(&sheet_name, sheet)?;
    }
    Ok(book)
}

fn open_path(path: &Path) -> Result<Xlsx<BufReader<File>>> {
    if !path.exists() {
        return Err(SheetError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    open_workbook(path).map_err(|e: XlsxError| SheetError::load(path.display().to_string(), e))
}

/// Write a sheet's header and rows into a worksheet.
///
/// Missing cells and empty strings are left blank.
fn write_to_worksheet(sheet: &Sheet, worksheet: &mut Worksheet) -> Result<()> {
    worksheet.set_name(sheet.name()).map_err(SheetError::write)?;

    for (row_idx, row) in sheet.grid().enumerate() {
        let row_num =
            RowNum::try_from(row_idx).map_err(|_| SheetError::write("Row index overflow"))?;
        for (col_idx, cell) in row.iter().enumerate() {
            let col_num = ColNum::try_from(col_idx)
                .map_err(|_| SheetError::write("Column index overflow"))?;

            let written = match cell {
                CellValue::Null => continue,
                CellValue::Float(f) if f.is_nan() => continue,
                CellValue::String(s) if s.is_empty() => continue,
                CellValue::Bool(b) => worksheet.write_boolean(row_num, col_num, *b),
                // Note: Excel stores all numbers as f64, so integers > 2^53
                // (9,007,199,254,740,992) may lose precision
                CellValue::Int(i) => worksheet.write_number(row_num, col_num, *i as f64),
                CellValue::Float(f) => worksheet.write_number(row_num, col_num, *f),
                CellValue::String(s) => worksheet.write_string(row_num, col_num, s),
            };
            written.map_err(SheetError::write)?;
        }
    }

    Ok(())
}

impl Sheet {
    /// Load a specific sheet from an Excel file by name
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened, sheet not found, or read fails.
    pub fn from_xlsx_sheet<P: AsRef<Path>>(path: P, sheet_name: &str) -> Result<Self> {
        let mut workbook = open_path(path.as_ref())?;
        if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
            return Err(SheetError::SheetNotFound {
                name: sheet_name.to_string(),
            });
        }
        read_sheet(&mut workbook, sheet_name)
    }
}

impl Book {
    /// Load a book from an Excel file (all sheets)
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened or read.
    pub fn from_xlsx<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_book(open_path(path.as_ref())?)
    }

    /// Load a book from the bytes of an Excel file
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a readable workbook.
    pub fn from_xlsx_bytes(bytes: Vec<u8>) -> Result<Self> {
        let workbook = Xlsx::new(Cursor::new(bytes))
            .map_err(|e: XlsxError| SheetError::load("workbook", e))?;
        read_book(workbook)
    }

    /// Render the book as the bytes of an Excel file
    ///
    /// # Errors
    ///
    /// Returns error if a sheet cannot be written.
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();

        for (_, sheet) in self.sheets() {
            let worksheet = workbook.add_worksheet();
            write_to_worksheet(sheet, worksheet)?;
        }

        workbook.save_to_buffer().map_err(SheetError::write)
    }

    /// Save the book to an Excel file (not atomic; see `WorkbookStore`)
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or written.
    pub fn save_as_xlsx<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_xlsx_bytes()?;
        std::fs::write(path, bytes).map_err(|e| SheetError::save_io(path, e))
    }

    /// Get sheet names from an Excel file without loading data
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened.
    pub fn xlsx_sheet_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        Ok(open_path(path.as_ref())?.sheet_names())
    }
}
