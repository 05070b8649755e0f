//! Change tracking and save coordination for tabkeep
//!
//! [`detect`] compares an edited sheet against its last saved snapshot.
//! [`PersistenceController`] keeps one snapshot per sheet, decides when an
//! edit should be saved, and makes sure only one save per sheet is in flight.
//!
//! ```
//! use tabkeep_sheet::{CellValue, Sheet};
//! use tabkeep_sync::{EditDecision, PersistenceController};
//!
//! let loaded = Sheet::from_data(
//!     &["item", "qty"],
//!     vec![vec![CellValue::from("bolt"), 4.into()]],
//! )
//! .unwrap();
//! let mut controller = PersistenceController::default();
//! controller.register("Inventory", loaded.clone());
//!
//! let mut edited = loaded;
//! edited.set_by_name(0, "qty", 5).unwrap();
//!
//! match controller.record_edit("Inventory", edited).unwrap() {
//!     EditDecision::Save(ticket) => {
//!         // write ticket.table() somewhere, then report back
//!         let notice = controller.complete_save(ticket, Ok(()));
//!         assert_eq!(notice.message, "Saved changes to Inventory!");
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! assert!(controller.status("Inventory").unwrap().up_to_date);
//! ```

mod controller;
mod notice;
mod tracker;

pub use controller::{
    EditDecision, EditOutcome, PersistenceController, SavePhase, SaveTicket, SheetStatus,
};
pub use notice::{Notice, NoticeLevel};
pub use tracker::{detect, CellChange, CellKey, ChangeReport, PendingChanges};
