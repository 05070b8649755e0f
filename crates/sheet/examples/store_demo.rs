//! Builds a two-sheet workbook, edits one sheet through a `WorkbookStore`
//! and shows the other sheet is untouched.
//!
//! Run with: cargo run --example store_demo -p tabkeep-sheet

use std::env;
use tabkeep_sheet::{normalize, Book, CellValue, Sheet, SheetStore, WorkbookStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Workbook Store Demo ===\n");

    let path = env::temp_dir().join("tabkeep_store_demo.xlsx");

    let mut book = Book::new();
    book.add_sheet(
        "Inventory",
        Sheet::from_data(
            &["item", "qty", "note"],
            vec![
                vec![CellValue::from("bolt"), CellValue::from("4"), CellValue::Null],
                vec![CellValue::from("nut"), CellValue::from("10"), CellValue::from("m6")],
            ],
        )?,
    )?;
    book.add_sheet(
        "Suppliers",
        Sheet::from_data(&["name", "city"], vec![vec!["Acme", "Springfield"]])?,
    )?;
    book.save_as_xlsx(&path)?;
    println!("Wrote {}", path.display());

    let store = WorkbookStore::open(&path)?;
    println!("Sheets: {:?}", store.sheet_names()?);

    // Text digits become numbers, text gaps become ""
    let mut inventory = normalize(store.load("Inventory")?);
    println!("Loaded Inventory: {:?}", inventory.rows().collect::<Vec<_>>());

    inventory.set_by_name(0, "qty", 5)?;
    store.save("Inventory", &inventory)?;

    let book = store.read_book()?;
    for name in book.sheet_names() {
        let rows: Vec<_> = book.get_sheet(name)?.rows().collect();
        println!("On disk, {name}: {rows:?}");
    }

    std::fs::remove_file(&path)?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
