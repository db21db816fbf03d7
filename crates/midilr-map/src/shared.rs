//! Shared command table between the editing context and the MIDI input thread
//!
//! The command map and the table model are kept behind one lock, so a reader
//! never sees a row sequence that disagrees with the map's key set. Every
//! method takes the lock exactly once.

use crate::codec::ProfileDocument;
use crate::command_map::{BindOutcome, CommandMap, DuplicatePolicy, LoadReport};
use crate::error::{IdentityError, TableError};
use crate::identity::{MessageKind, MidiMessageId};
use crate::table::{Column, CommandTableModel, SortState};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Map and rows, guarded together
#[derive(Debug, Default)]
struct Inner {
    map: CommandMap,
    table: CommandTableModel,
}

/// Cloneable handle to the shared command table
#[derive(Debug, Clone, Default)]
pub struct SharedCommandTable {
    inner: Arc<RwLock<Inner>>,
}

impl SharedCommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing map; rows are derived from its bindings
    pub fn from_map(map: CommandMap, sort: SortState) -> Self {
        let mut table = CommandTableModel::with_sort(sort);
        table.rebuild(&map);
        Self {
            inner: Arc::new(RwLock::new(Inner { map, table })),
        }
    }

    /// Empty table with the given duplicate policy and initial ordering
    pub fn with_policy(policy: DuplicatePolicy, sort: SortState) -> Self {
        Self::from_map(CommandMap::with_policy(policy), sort)
    }

    // Nothing leaves Inner half-updated, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind a command and make sure the identity has a row
    ///
    /// Rows are re-sorted on any change: a new command text moves the row
    /// under a command-name sort.
    pub fn bind(&self, id: MidiMessageId, command: impl Into<String>) -> BindOutcome {
        let mut guard = self.write();
        let Inner { map, table } = &mut *guard;
        let outcome = map.bind(id, command);
        if outcome.is_bound() {
            table.rebuild(map);
        }
        outcome
    }

    /// Drop the binding and its row; no-op if absent
    pub fn unbind(&self, id: &MidiMessageId) -> Option<String> {
        let mut guard = self.write();
        let Inner { map, table } = &mut *guard;
        let removed = map.unbind(id);
        if removed.is_some() {
            table.rebuild(map);
        }
        removed
    }

    /// Add a row for a control together with its command
    pub fn add_row(
        &self,
        channel: u8,
        data: u8,
        kind: MessageKind,
        command: impl Into<String>,
    ) -> Result<BindOutcome, IdentityError> {
        let id = MidiMessageId::new(channel, data, kind)?;
        let mut guard = self.write();
        let Inner { map, table } = &mut *guard;
        let outcome = map.bind(id, command);
        if outcome.is_bound() {
            table.rebuild(map);
        }
        Ok(outcome)
    }

    /// Remove the row at `row` and its binding
    pub fn remove_row(&self, row: usize) -> Result<MidiMessageId, TableError> {
        let mut guard = self.write();
        let Inner { map, table } = &mut *guard;
        let id = table.remove_row(row)?;
        map.unbind(&id);
        Ok(id)
    }

    /// Remove every row and binding
    pub fn remove_all_rows(&self) {
        let mut guard = self.write();
        guard.table.remove_all_rows();
        guard.map.clear();
    }

    /// Replace everything with the contents of `doc`
    pub fn build_from_document(&self, doc: &ProfileDocument) -> LoadReport {
        let mut guard = self.write();
        let Inner { map, table } = &mut *guard;
        table.build_from_document(map, doc)
    }

    /// Snapshot of the current bindings as a document
    pub fn to_document(&self) -> ProfileDocument {
        self.read().map.to_document()
    }

    pub fn sort(&self, column: Column, ascending: bool) {
        let mut guard = self.write();
        let Inner { map, table } = &mut *guard;
        table.sort(map, column, ascending);
    }

    pub fn lookup(&self, id: &MidiMessageId) -> Option<String> {
        self.read().map.lookup(id).map(str::to_string)
    }

    /// Command and row for a control, resolved under one lock
    pub fn resolve(&self, id: &MidiMessageId) -> Option<(String, usize)> {
        let guard = self.read();
        let command = guard.map.lookup(id)?.to_string();
        let row = guard.table.row_of(id)?;
        Some((command, row))
    }

    pub fn row_for_identity(&self, channel: u8, data: u8, kind: MessageKind) -> Option<usize> {
        self.read().table.row_for_identity(channel, data, kind)
    }

    pub fn row_count(&self) -> usize {
        self.read().table.row_count()
    }

    pub fn row_content(&self, row: usize, column: Column) -> Result<String, TableError> {
        let guard = self.read();
        guard.table.row_content(&guard.map, row, column)
    }

    pub fn cell_text(&self, row: usize, column_id: usize) -> Result<String, TableError> {
        let guard = self.read();
        guard.table.cell_text(&guard.map, row, column_id)
    }

    /// Rows in display order
    pub fn rows(&self) -> Vec<MidiMessageId> {
        self.read().table.rows().to_vec()
    }

    /// Identities bound in the map (unordered)
    pub fn all_identities(&self) -> Vec<MidiMessageId> {
        self.read().map.all_identities()
    }

    pub fn messages_for_command(&self, command: &str) -> Vec<MidiMessageId> {
        self.read().map.messages_for_command(command)
    }

    pub fn current_sort(&self) -> SortState {
        self.read().table.current_sort()
    }

    pub fn len(&self) -> usize {
        self.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    fn cc(channel: u8, cc: u8) -> MidiMessageId {
        MidiMessageId::cc(channel, cc).unwrap()
    }

    fn assert_consistent(shared: &SharedCommandTable) {
        let guard = shared.read();
        let keys: HashSet<_> = guard.map.all_identities().into_iter().collect();
        let rows: HashSet<_> = guard.table.rows().iter().copied().collect();
        assert_eq!(keys, rows);
        assert_eq!(guard.table.row_count(), guard.map.len(), "duplicate rows");
    }

    #[test]
    fn test_rebind_keeps_single_row() {
        let shared = SharedCommandTable::new();
        shared.bind(cc(1, 7), "Exposure");
        shared.bind(cc(1, 7), "Contrast");

        assert_eq!(shared.lookup(&cc(1, 7)).as_deref(), Some("Contrast"));
        assert_eq!(shared.row_count(), 1);
        assert_consistent(&shared);
    }

    #[test]
    fn test_structural_edits_stay_consistent() {
        let shared = SharedCommandTable::new();
        shared.add_row(1, 7, MessageKind::ControlChange, "Exposure").unwrap();
        shared.add_row(1, 8, MessageKind::ControlChange, "Contrast").unwrap();
        shared.add_row(2, 1, MessageKind::NoteOn, "NextPhoto").unwrap();
        assert_consistent(&shared);

        shared.sort(Column::CommandName, true);
        assert_eq!(shared.row_content(0, Column::CommandName).unwrap(), "Contrast");
        assert_consistent(&shared);

        let removed = shared.remove_row(0).unwrap();
        assert_eq!(removed, cc(1, 8));
        assert_eq!(shared.lookup(&removed), None);
        assert_consistent(&shared);

        assert!(shared.remove_row(7).is_err());
        assert_eq!(shared.row_count(), 2);
        assert_consistent(&shared);

        assert!(shared.add_row(0, 1, MessageKind::NoteOn, "Bad").is_err());
        assert_consistent(&shared);

        assert_eq!(shared.unbind(&cc(1, 7)).as_deref(), Some("Exposure"));
        assert_eq!(shared.unbind(&cc(1, 7)), None);
        assert_consistent(&shared);

        let doc = shared.to_document();
        shared.remove_all_rows();
        assert!(shared.is_empty());
        assert_consistent(&shared);

        let report = shared.build_from_document(&doc);
        assert_eq!(report.loaded, 1);
        assert_eq!(shared.row_for_identity(2, 1, MessageKind::NoteOn), Some(0));
        assert_consistent(&shared);
    }

    #[test]
    fn test_rebind_reorders_under_command_sort() {
        let shared = SharedCommandTable::new();
        shared.bind(cc(1, 1), "A");
        shared.bind(cc(1, 2), "B");
        shared.sort(Column::CommandName, true);

        shared.bind(cc(1, 1), "Z");
        assert_eq!(shared.row_content(0, Column::CommandName).unwrap(), "B");
        assert_eq!(shared.row_content(1, Column::CommandName).unwrap(), "Z");

        shared.add_row(1, 2, MessageKind::ControlChange, "Zz").unwrap();
        assert_eq!(shared.rows(), vec![cc(1, 1), cc(1, 2)]);
        assert_consistent(&shared);
    }

    #[test]
    fn test_reject_policy_row_unchanged() {
        let shared = SharedCommandTable::with_policy(DuplicatePolicy::Reject, SortState::default());
        shared.bind(cc(1, 7), "Exposure");
        assert_eq!(shared.bind(cc(1, 7), "Contrast"), BindOutcome::Rejected);
        assert_eq!(shared.cell_text(0, 3).unwrap(), "Exposure");
        assert_eq!(shared.row_count(), 1);
    }

    #[test]
    fn test_resolve() {
        let shared = SharedCommandTable::from_map(CommandMap::new(), SortState::new(Column::Data, false));
        shared.bind(cc(1, 7), "Exposure");
        shared.bind(cc(1, 9), "Contrast");

        assert_eq!(shared.resolve(&cc(1, 7)), Some(("Exposure".to_string(), 1)));
        assert_eq!(shared.resolve(&cc(1, 9)), Some(("Contrast".to_string(), 0)));
        assert_eq!(shared.resolve(&cc(1, 8)), None);
    }

    #[test]
    fn test_concurrent_edit_and_lookup() {
        let shared = SharedCommandTable::new();

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for round in 0..50u8 {
                    for data in 0..20u8 {
                        shared.bind(cc(1, data), format!("Command{}", round));
                    }
                    shared.sort(if round % 2 == 0 { Column::Data } else { Column::CommandName }, true);
                    for data in (0..20u8).step_by(3) {
                        shared.unbind(&cc(1, data));
                    }
                }
            })
        };

        let reader = {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    assert_consistent(&shared);
                    if let Some((command, _)) = shared.resolve(&cc(1, 4)) {
                        assert!(command.starts_with("Command"));
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_consistent(&shared);
    }
}
