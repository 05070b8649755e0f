//! Per-sheet persistence state and the autosave policy.
//!
//! Each tracked sheet is `Idle` or `Saving`. An edit is compared against the
//! sheet's snapshot; when it differs, autosave is on and nothing is in
//! flight, the controller hands out a [`SaveTicket`] and moves the sheet to
//! `Saving` until [`PersistenceController::complete_save`] is called with
//! the store's result. While a sheet is `Saving`, further save requests for
//! it are dropped.

use indexmap::IndexMap;
use serde::Serialize;
use tabkeep_sheet::{normalize, Result, Sheet, SheetError, SheetStore};

use crate::notice::Notice;
use crate::tracker::{detect, PendingChanges};

/// Whether a save is in flight for a sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePhase {
    #[default]
    Idle,
    Saving,
}

#[derive(Debug, Clone)]
struct SheetState {
    snapshot: Sheet,
    edited: Option<Sheet>,
    pending: PendingChanges,
    up_to_date: bool,
    phase: SavePhase,
}

impl SheetState {
    fn new(snapshot: Sheet) -> Self {
        SheetState {
            snapshot,
            edited: None,
            pending: PendingChanges::new(),
            up_to_date: true,
            phase: SavePhase::Idle,
        }
    }

    fn current(&self) -> &Sheet {
        self.edited.as_ref().unwrap_or(&self.snapshot)
    }

    /// Recompute pending changes and the up-to-date flag from the latest
    /// edit against the snapshot.
    fn refresh(&mut self) {
        let report = self
            .edited
            .as_ref()
            .map(|edited| detect(&self.snapshot, edited))
            .unwrap_or_default();
        self.up_to_date = !report.has_changes();
        self.pending = report.changes;
    }
}

/// Snapshot of a sheet's persistence state, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetStatus {
    pub sheet: String,
    pub pending: usize,
    pub up_to_date: bool,
    pub phase: SavePhase,
}

/// Permission to run one store save for one sheet.
///
/// Holding a ticket means the sheet is `Saving`; hand it back through
/// [`PersistenceController::complete_save`] whatever the outcome.
#[derive(Debug)]
#[must_use = "a save ticket keeps its sheet in the Saving phase until completed"]
pub struct SaveTicket {
    sheet: String,
    table: Sheet,
}

impl SaveTicket {
    /// Name of the sheet to save
    #[must_use]
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// The table to write, pending changes already applied
    #[must_use]
    pub fn table(&self) -> &Sheet {
        &self.table
    }
}

/// What the controller decided after an edit.
#[derive(Debug)]
pub enum EditDecision {
    /// Run this save now.
    Save(SaveTicket),
    /// The edit matches the snapshot.
    Unchanged,
    /// Changes are pending but autosave is off.
    Held,
    /// A save for this sheet is already in flight.
    Busy,
}

/// Result of a full edit cycle against a store.
#[derive(Debug, Clone, Serialize)]
pub struct EditOutcome {
    pub status: SheetStatus,
    pub notice: Option<Notice>,
}

/// Owns every tracked sheet's snapshot, pending changes and save guard.
#[derive(Debug, Clone)]
pub struct PersistenceController {
    sheets: IndexMap<String, SheetState>,
    autosave: bool,
}

impl Default for PersistenceController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PersistenceController {
    #[must_use]
    pub fn new(autosave: bool) -> Self {
        PersistenceController {
            sheets: IndexMap::new(),
            autosave,
        }
    }

    #[must_use]
    pub fn autosave(&self) -> bool {
        self.autosave
    }

    pub fn set_autosave(&mut self, enabled: bool) {
        if self.autosave != enabled {
            tracing::info!(enabled, "autosave toggled");
        }
        self.autosave = enabled;
    }

    #[must_use]
    pub fn is_tracked(&self, name: &str) -> bool {
        self.sheets.contains_key(name)
    }

    /// Start tracking a freshly loaded sheet; its snapshot is `table`.
    ///
    /// Returns `false` (and changes nothing) if the sheet is already tracked.
    pub fn register(&mut self, name: &str, table: Sheet) -> bool {
        if self.sheets.contains_key(name) {
            return false;
        }
        let mut table = table;
        table.set_name(name);
        self.sheets.insert(name.to_string(), SheetState::new(table));
        true
    }

    /// Load, normalize and track a sheet unless it is already tracked.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the sheet cannot be loaded.
    pub fn open<S: SheetStore + ?Sized>(&mut self, store: &S, name: &str) -> Result<&Sheet> {
        if !self.is_tracked(name) {
            let table = normalize(store.load(name)?);
            self.register(name, table);
        }
        self.view(name)
    }

    fn state(&self, name: &str) -> Result<&SheetState> {
        self.sheets.get(name).ok_or_else(|| SheetError::SheetNotFound {
            name: name.to_string(),
        })
    }

    fn state_mut(&mut self, name: &str) -> Result<&mut SheetState> {
        self.sheets
            .get_mut(name)
            .ok_or_else(|| SheetError::SheetNotFound {
                name: name.to_string(),
            })
    }

    /// The latest edited table, or the snapshot if there were no edits.
    pub fn view(&self, name: &str) -> Result<&Sheet> {
        Ok(self.state(name)?.current())
    }

    /// The last saved table.
    pub fn snapshot(&self, name: &str) -> Result<&Sheet> {
        Ok(&self.state(name)?.snapshot)
    }

    /// Unsaved cell changes for a sheet.
    pub fn pending(&self, name: &str) -> Result<&PendingChanges> {
        Ok(&self.state(name)?.pending)
    }

    pub fn status(&self, name: &str) -> Result<SheetStatus> {
        let state = self.state(name)?;
        Ok(SheetStatus {
            sheet: name.to_string(),
            pending: state.pending.len(),
            up_to_date: state.up_to_date,
            phase: state.phase,
        })
    }

    /// Take an edited table for a sheet and decide whether to save it.
    ///
    /// # Errors
    ///
    /// Returns `SheetNotFound` if the sheet is not tracked.
    pub fn record_edit(&mut self, name: &str, edited: Sheet) -> Result<EditDecision> {
        let autosave = self.autosave;
        let state = self.state_mut(name)?;

        let mut edited = edited;
        edited.set_name(name);
        let report = detect(&state.snapshot, &edited);
        state.edited = Some(edited);

        if !report.has_changes() {
            state.pending.clear();
            state.up_to_date = true;
            return Ok(EditDecision::Unchanged);
        }

        state.pending = report.changes;
        state.up_to_date = false;

        if state.phase == SavePhase::Saving {
            tracing::debug!(sheet = name, "save in flight; holding new changes");
            return Ok(EditDecision::Busy);
        }
        if !autosave {
            return Ok(EditDecision::Held);
        }

        Ok(EditDecision::Save(Self::begin_save(name, state)))
    }

    /// Ask for a save regardless of pending changes.
    ///
    /// Returns `None` when a save for the sheet is already in flight.
    ///
    /// # Errors
    ///
    /// Returns `SheetNotFound` if the sheet is not tracked.
    pub fn request_save(&mut self, name: &str) -> Result<Option<SaveTicket>> {
        let state = self.state_mut(name)?;
        if state.phase == SavePhase::Saving {
            tracing::warn!(sheet = name, "save already in progress; request dropped");
            return Ok(None);
        }
        Ok(Some(Self::begin_save(name, state)))
    }

    fn begin_save(name: &str, state: &mut SheetState) -> SaveTicket {
        let mut table = state.current().clone();
        state.pending.apply_to(&mut table);
        state.phase = SavePhase::Saving;
        tracing::debug!(sheet = name, pending = state.pending.len(), "starting save");
        SaveTicket {
            sheet: name.to_string(),
            table,
        }
    }

    /// Finish a save started by [`record_edit`](Self::record_edit) or
    /// [`request_save`](Self::request_save).
    ///
    /// On success the saved table becomes the snapshot. Either way pending
    /// changes are recomputed from the latest edit against the snapshot, so
    /// edits made while saving are neither lost nor double counted.
    pub fn complete_save(&mut self, ticket: SaveTicket, result: Result<()>) -> Notice {
        let SaveTicket { sheet, table } = ticket;
        let Some(state) = self.sheets.get_mut(&sheet) else {
            return Notice::error(format!("Save failed: sheet '{sheet}' is not open"));
        };
        state.phase = SavePhase::Idle;

        match result {
            Ok(()) => {
                state.snapshot = table;
                state.refresh();
                tracing::info!(sheet = %sheet, "changes saved");
                Notice::success(format!("Saved changes to {sheet}!"))
            }
            Err(err) => {
                state.refresh();
                tracing::warn!(
                    sheet = %sheet,
                    error = %err,
                    pending = state.pending.len(),
                    "save failed"
                );
                Notice::error(format!("Save failed: {err}"))
            }
        }
    }

    /// Record an edit and, if it calls for a save, run it against `store`.
    ///
    /// # Errors
    ///
    /// Returns `SheetNotFound` if the sheet is not tracked. Store failures
    /// are reported through the outcome's notice instead.
    pub fn handle_edit<S: SheetStore + ?Sized>(
        &mut self,
        store: &S,
        name: &str,
        edited: Sheet,
    ) -> Result<EditOutcome> {
        let notice = match self.record_edit(name, edited)? {
            EditDecision::Save(ticket) => {
                let result = store.save(ticket.sheet(), ticket.table());
                Some(self.complete_save(ticket, result))
            }
            EditDecision::Unchanged | EditDecision::Held | EditDecision::Busy => None,
        };

        Ok(EditOutcome {
            status: self.status(name)?,
            notice,
        })
    }

    /// Run a manual save against `store`.
    ///
    /// # Errors
    ///
    /// Returns `SheetNotFound` if the sheet is not tracked.
    pub fn save_now<S: SheetStore + ?Sized>(
        &mut self,
        store: &S,
        name: &str,
    ) -> Result<EditOutcome> {
        let notice = match self.request_save(name)? {
            Some(ticket) => {
                let result = store.save(ticket.sheet(), ticket.table());
                self.complete_save(ticket, result)
            }
            None => Notice::info(format!("A save for {name} is already in progress")),
        };

        Ok(EditOutcome {
            status: self.status(name)?,
            notice: Some(notice),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabkeep_sheet::CellValue;

    fn table(rows: Vec<Vec<CellValue>>) -> Sheet {
        Sheet::from_parts("Data", vec!["a".to_string(), "b".to_string()], rows).unwrap()
    }

    fn tracked() -> PersistenceController {
        let mut controller = PersistenceController::default();
        controller.register("Data", table(vec![vec![1.into(), "x".into()]]));
        controller
    }

    #[test]
    fn test_unchanged_edit() {
        let mut controller = tracked();
        let decision = controller
            .record_edit("Data", table(vec![vec![CellValue::Float(1.0), "x".into()]]))
            .unwrap();

        assert!(matches!(decision, EditDecision::Unchanged));
        assert!(controller.status("Data").unwrap().up_to_date);
    }

    #[test]
    fn test_edit_starts_save_when_autosave_on() {
        let mut controller = tracked();
        let decision = controller
            .record_edit("Data", table(vec![vec![1.into(), "y".into()]]))
            .unwrap();

        let EditDecision::Save(ticket) = decision else {
            panic!("expected a save, got {decision:?}");
        };
        assert_eq!(ticket.sheet(), "Data");
        assert_eq!(ticket.table().get(0, 1).unwrap(), &CellValue::from("y"));

        let status = controller.status("Data").unwrap();
        assert_eq!(status.phase, SavePhase::Saving);
        assert_eq!(status.pending, 1);
        assert!(!status.up_to_date);

        let notice = controller.complete_save(ticket, Ok(()));
        assert!(!notice.is_error());
        let status = controller.status("Data").unwrap();
        assert_eq!(status.phase, SavePhase::Idle);
        assert_eq!(status.pending, 0);
        assert!(status.up_to_date);
        assert_eq!(
            controller.snapshot("Data").unwrap().get(0, 1).unwrap(),
            &CellValue::from("y")
        );
    }

    #[test]
    fn test_edit_held_when_autosave_off() {
        let mut controller = tracked();
        controller.set_autosave(false);

        let decision = controller
            .record_edit("Data", table(vec![vec![2.into(), "x".into()]]))
            .unwrap();

        assert!(matches!(decision, EditDecision::Held));
        assert_eq!(controller.status("Data").unwrap().pending, 1);
        assert_eq!(controller.status("Data").unwrap().phase, SavePhase::Idle);
    }

    #[test]
    fn test_second_save_is_dropped_while_saving() {
        let mut controller = tracked();
        let first = controller.request_save("Data").unwrap();
        assert!(first.is_some());

        assert!(controller.request_save("Data").unwrap().is_none());
        let busy = controller
            .record_edit("Data", table(vec![vec![3.into(), "x".into()]]))
            .unwrap();
        assert!(matches!(busy, EditDecision::Busy));

        controller.complete_save(first.unwrap(), Ok(()));
        assert!(controller.request_save("Data").unwrap().is_some());
    }

    #[test]
    fn test_edits_during_save_stay_pending() {
        let mut controller = tracked();
        let EditDecision::Save(ticket) = controller
            .record_edit("Data", table(vec![vec![1.into(), "y".into()]]))
            .unwrap()
        else {
            panic!("expected a save");
        };

        controller
            .record_edit("Data", table(vec![vec![1.into(), "z".into()]]))
            .unwrap();
        controller.complete_save(ticket, Ok(()));

        let status = controller.status("Data").unwrap();
        assert_eq!(status.pending, 1);
        assert!(!status.up_to_date);
        assert_eq!(controller.view("Data").unwrap().get(0, 1).unwrap(), &CellValue::from("z"));
    }

    #[test]
    fn test_failed_save_keeps_pending() {
        let mut controller = tracked();
        let EditDecision::Save(ticket) = controller
            .record_edit("Data", table(vec![vec![CellValue::Null, "x".into()]]))
            .unwrap()
        else {
            panic!("expected a save");
        };

        let notice = controller.complete_save(
            ticket,
            Err(SheetError::SaveIo {
                path: "book.xlsx".into(),
                message: "disk full".to_string(),
            }),
        );

        assert!(notice.is_error());
        assert!(notice.message.contains("disk full"));
        let status = controller.status("Data").unwrap();
        assert_eq!(status.phase, SavePhase::Idle);
        assert_eq!(status.pending, 1);
        assert!(!status.up_to_date);
        assert_eq!(
            controller.snapshot("Data").unwrap().get(0, 0).unwrap(),
            &CellValue::Int(1)
        );
    }

    #[test]
    fn test_failed_save_after_revert_is_up_to_date() {
        let mut controller = tracked();
        let EditDecision::Save(ticket) = controller
            .record_edit("Data", table(vec![vec![1.into(), "y".into()]]))
            .unwrap()
        else {
            panic!("expected a save");
        };

        // Edited back to the snapshot while the save runs.
        controller
            .record_edit("Data", table(vec![vec![1.into(), "x".into()]]))
            .unwrap();
        let notice = controller.complete_save(
            ticket,
            Err(SheetError::SaveIo {
                path: "book.xlsx".into(),
                message: "disk full".to_string(),
            }),
        );

        assert!(notice.is_error());
        let status = controller.status("Data").unwrap();
        assert_eq!(status.phase, SavePhase::Idle);
        assert_eq!(status.pending, 0);
        assert!(status.up_to_date);
    }

    #[test]
    fn test_unknown_sheet() {
        let mut controller = PersistenceController::default();
        assert!(matches!(
            controller.record_edit("Nope", Sheet::new()),
            Err(SheetError::SheetNotFound { .. })
        ));
        assert!(controller.request_save("Nope").is_err());
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut controller = tracked();
        assert!(!controller.register("Data", table(vec![])));
        assert_eq!(controller.snapshot("Data").unwrap().row_count(), 1);
    }
}
