use std::path::Path;
use std::sync::Arc;
use std::thread;

use tabkeep_sheet::{normalize, Book, CellValue, Sheet, SheetError, SheetStore, WorkbookStore};
use tempfile::tempdir;

fn seed_workbook(path: &Path) {
    let mut book = Book::new();

    let people = Sheet::from_data(
        &["name", "age", "active"],
        vec![
            vec![
                CellValue::from("Alice"),
                CellValue::Float(30.0),
                CellValue::Bool(true),
            ],
            vec![CellValue::from("Bob"), CellValue::Null, CellValue::Bool(false)],
        ],
    )
    .unwrap();

    let prices = Sheet::from_data(
        &["sku", "price", "note"],
        vec![
            vec![CellValue::from("X-1"), CellValue::Float(9.99), CellValue::Null],
            vec![
                CellValue::from("X-2"),
                CellValue::Float(12.5),
                CellValue::from("discontinued"),
            ],
        ],
    )
    .unwrap();

    book.add_sheet("People", people).unwrap();
    book.add_sheet("Prices", prices).unwrap();
    book.save_as_xlsx(path).unwrap();
}

// ===== Round Trip =====

#[test]
fn test_unchanged_save_round_trips_every_sheet() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    seed_workbook(&path);
    let store = WorkbookStore::open(&path).unwrap();

    let before = store.read_book().unwrap();
    let people = store.load("People").unwrap();
    store.save("People", &people).unwrap();
    let after = store.read_book().unwrap();

    assert_eq!(before, after);
}

#[test]
fn test_double_save_matches_single_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    seed_workbook(&path);
    let store = WorkbookStore::open(&path).unwrap();

    let mut edited = store.load("Prices").unwrap();
    edited.set_by_name(1, "price", 13.0).unwrap();

    store.save("Prices", &edited).unwrap();
    let once = store.read_book().unwrap();
    store.save("Prices", &edited).unwrap();
    let twice = store.read_book().unwrap();

    assert_eq!(once, twice);
}

// ===== Other-Sheet Preservation =====

#[test]
fn test_editing_one_sheet_preserves_the_other() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    seed_workbook(&path);
    let store = WorkbookStore::open(&path).unwrap();

    let prices_before = store.load("Prices").unwrap();

    let mut people = normalize(store.load("People").unwrap());
    people.set_by_name(1, "age", 41).unwrap();
    store.save("People", &people).unwrap();

    let prices_after = store.load("Prices").unwrap();
    assert_eq!(prices_before, prices_after);
    assert_eq!(prices_after.column_names(), ["sku", "price", "note"]);
    assert_eq!(store.sheet_names().unwrap(), vec!["People", "Prices"]);

    let people_after = store.load("People").unwrap();
    assert!(people_after
        .get_by_name(1, "age")
        .unwrap()
        .same_as(&CellValue::Int(41)));
}

#[test]
fn test_concurrent_saves_of_different_sheets_keep_both_edits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    seed_workbook(&path);
    let store = Arc::new(WorkbookStore::open(&path).unwrap());

    let mut people = store.load("People").unwrap();
    people.set_by_name(0, "name", "Alicia").unwrap();
    let mut prices = store.load("Prices").unwrap();
    prices.set_by_name(0, "price", 1.25).unwrap();

    let handles: Vec<_> = [("People", people), ("Prices", prices)]
        .into_iter()
        .map(|(name, sheet)| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.save(name, &sheet))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(
        store.load("People").unwrap().get_by_name(0, "name").unwrap(),
        &CellValue::from("Alicia")
    );
    assert_eq!(
        store.load("Prices").unwrap().get_by_name(0, "price").unwrap(),
        &CellValue::Float(1.25)
    );
}

// ===== Loading =====

#[test]
fn test_load_then_normalize_fills_text_gaps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    seed_workbook(&path);
    let store = WorkbookStore::open(&path).unwrap();

    let prices = normalize(store.load("Prices").unwrap());

    assert_eq!(prices.get_by_name(0, "note").unwrap(), &CellValue::from(""));
    assert_eq!(prices.get_by_name(0, "price").unwrap(), &CellValue::Float(9.99));

    let people = normalize(store.load("People").unwrap());
    assert!(people.get_by_name(1, "age").unwrap().is_missing());
}

#[test]
fn test_load_missing_sheet() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    seed_workbook(&path);
    let store = WorkbookStore::open(&path).unwrap();

    let result = store.load("Nope");
    assert!(matches!(result, Err(SheetError::SheetNotFound { .. })));
}

#[test]
fn test_file_removed_after_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    seed_workbook(&path);
    let store = WorkbookStore::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(
        store.load("People"),
        Err(SheetError::FileNotFound { .. })
    ));
    assert!(matches!(
        store.save("People", &Sheet::new()),
        Err(SheetError::SaveIo { .. })
    ));
    assert!(!path.exists());
}
