//! Table model - ordered, row-indexed view over the command map
//!
//! The row sequence is a derived view: it never owns bindings, it only orders
//! the identities currently in the [`CommandMap`]. Every call that needs
//! command text takes the map explicitly, so the model can be tested alone.
//!
//! Sorting is deterministic: rows are ordered by the requested column, ties
//! by the previously active column, remaining ties by identity.

use crate::codec::ProfileDocument;
use crate::command_map::{CommandMap, LoadReport};
use crate::error::{IdentityError, TableError};
use crate::identity::{MessageKind, MidiMessageId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Channel,
    Data,
    MessageType,
    CommandName,
}

type CompareFn = fn(&CommandMap, &MidiMessageId, &MidiMessageId) -> Ordering;
type DisplayFn = fn(&CommandMap, &MidiMessageId) -> String;

/// How a column sorts and renders
struct ColumnDef {
    title: &'static str,
    compare: CompareFn,
    display: DisplayFn,
}

/// Indexed by column id
static COLUMNS: [ColumnDef; 4] = [
    ColumnDef {
        title: "Channel",
        compare: compare_channel,
        display: display_channel,
    },
    ColumnDef {
        title: "Data",
        compare: compare_data,
        display: display_data,
    },
    ColumnDef {
        title: "Type",
        compare: compare_kind,
        display: display_kind,
    },
    ColumnDef {
        title: "Command",
        compare: compare_command,
        display: display_command,
    },
];

// The channel column orders whole messages: channel, then data, then kind.
fn compare_channel(_: &CommandMap, a: &MidiMessageId, b: &MidiMessageId) -> Ordering {
    a.cmp(b)
}

fn compare_data(_: &CommandMap, a: &MidiMessageId, b: &MidiMessageId) -> Ordering {
    a.data().cmp(&b.data())
}

fn compare_kind(_: &CommandMap, a: &MidiMessageId, b: &MidiMessageId) -> Ordering {
    a.kind().cmp(&b.kind())
}

fn compare_command(map: &CommandMap, a: &MidiMessageId, b: &MidiMessageId) -> Ordering {
    let a = map.lookup(a).unwrap_or_default();
    let b = map.lookup(b).unwrap_or_default();
    a.cmp(b)
}

fn display_channel(_: &CommandMap, id: &MidiMessageId) -> String {
    id.channel().to_string()
}

fn display_data(_: &CommandMap, id: &MidiMessageId) -> String {
    id.data().to_string()
}

fn display_kind(_: &CommandMap, id: &MidiMessageId) -> String {
    id.kind().label().to_string()
}

fn display_command(map: &CommandMap, id: &MidiMessageId) -> String {
    map.lookup(id).unwrap_or_default().to_string()
}

impl Column {
    pub const ALL: [Column; 4] = [
        Self::Channel,
        Self::Data,
        Self::MessageType,
        Self::CommandName,
    ];

    /// Numeric id used by the UI shell
    pub fn id(self) -> usize {
        match self {
            Self::Channel => 0,
            Self::Data => 1,
            Self::MessageType => 2,
            Self::CommandName => 3,
        }
    }

    pub fn from_id(id: usize) -> Result<Self, TableError> {
        Self::ALL
            .get(id)
            .copied()
            .ok_or(TableError::UnknownColumn(id))
    }

    /// Header text
    pub fn title(self) -> &'static str {
        self.def().title
    }

    fn def(self) -> &'static ColumnDef {
        &COLUMNS[self.id()]
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Column {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "channel" | "ch" => Ok(Self::Channel),
            "data" | "cc" | "note" => Ok(Self::Data),
            "type" | "kind" | "message_type" => Ok(Self::MessageType),
            "command" | "command_name" => Ok(Self::CommandName),
            _ => Err(TableError::UnknownColumnName(s.trim().to_string())),
        }
    }
}

/// Active ordering: column plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: Column,
    pub ascending: bool,
}

/// Command name, ascending
impl Default for SortState {
    fn default() -> Self {
        Self {
            column: Column::CommandName,
            ascending: true,
        }
    }
}

impl SortState {
    pub fn new(column: Column, ascending: bool) -> Self {
        Self { column, ascending }
    }

    fn compare(&self, map: &CommandMap, a: &MidiMessageId, b: &MidiMessageId) -> Ordering {
        let ordering = (self.column.def().compare)(map, a, b);
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

/// Row-indexed presentation of a command map
#[derive(Debug, Clone, Default)]
pub struct CommandTableModel {
    rows: Vec<MidiMessageId>,
    current_sort: SortState,
    prior_sort: SortState,
}

impl CommandTableModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty model starting from the given ordering
    pub fn with_sort(sort: SortState) -> Self {
        Self {
            rows: Vec::new(),
            current_sort: sort,
            prior_sort: sort,
        }
    }

    /// Make an identity visible as a row and re-apply the current ordering
    ///
    /// Purely structural: binding a command to the identity is the caller's
    /// job. Adding an identity that already has a row does nothing.
    pub fn add_row(
        &mut self,
        map: &CommandMap,
        channel: u8,
        data: u8,
        kind: MessageKind,
    ) -> Result<MidiMessageId, IdentityError> {
        let id = MidiMessageId::new(channel, data, kind)?;
        if !self.rows.contains(&id) {
            self.rows.push(id);
            self.apply_sort(map);
        }
        Ok(id)
    }

    /// Remove the row at `row` and return its identity
    ///
    /// The caller unbinds the identity from the map.
    pub fn remove_row(&mut self, row: usize) -> Result<MidiMessageId, TableError> {
        self.check_row(row)?;
        Ok(self.rows.remove(row))
    }

    pub fn remove_all_rows(&mut self) {
        self.rows.clear();
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Identities in display order
    pub fn rows(&self) -> &[MidiMessageId] {
        &self.rows
    }

    /// Identity shown at `row`
    pub fn row(&self, row: usize) -> Result<MidiMessageId, TableError> {
        self.check_row(row)?;
        Ok(self.rows[row])
    }

    /// Display text of one cell
    pub fn row_content(
        &self,
        map: &CommandMap,
        row: usize,
        column: Column,
    ) -> Result<String, TableError> {
        let id = self.row(row)?;
        Ok((column.def().display)(map, &id))
    }

    /// Display text of one cell addressed by numeric column id
    pub fn cell_text(
        &self,
        map: &CommandMap,
        row: usize,
        column_id: usize,
    ) -> Result<String, TableError> {
        let column = Column::from_id(column_id).inspect_err(|e| log::error!("cell_text: {}", e))?;
        self.row_content(map, row, column)
    }

    /// Row showing the given control, if any
    ///
    /// Values that cannot form an identity are simply not found.
    pub fn row_for_identity(&self, channel: u8, data: u8, kind: MessageKind) -> Option<usize> {
        let id = MidiMessageId::new(channel, data, kind).ok()?;
        self.row_of(&id)
    }

    pub fn row_of(&self, id: &MidiMessageId) -> Option<usize> {
        self.rows.iter().position(|row| row == id)
    }

    pub fn current_sort(&self) -> SortState {
        self.current_sort
    }

    pub fn prior_sort(&self) -> SortState {
        self.prior_sort
    }

    /// Re-order rows by `column`
    ///
    /// The previously active ordering becomes the tie-breaker.
    pub fn sort(&mut self, map: &CommandMap, column: Column, ascending: bool) {
        self.prior_sort = self.current_sort;
        self.current_sort = SortState::new(column, ascending);
        self.apply_sort(map);
    }

    /// Regenerate the rows from the map's key set
    pub fn rebuild(&mut self, map: &CommandMap) {
        self.rows = map.all_identities();
        self.apply_sort(map);
    }

    /// Load `doc` into `map` and rebuild the rows from the result
    pub fn build_from_document(&mut self, map: &mut CommandMap, doc: &ProfileDocument) -> LoadReport {
        self.remove_all_rows();
        let report = map.load_document(doc);
        self.rebuild(map);
        report
    }

    fn apply_sort(&mut self, map: &CommandMap) {
        let current = self.current_sort;
        let prior = self.prior_sort;
        self.rows.sort_by(|a, b| {
            current
                .compare(map, a, b)
                .then_with(|| {
                    if prior.column == current.column {
                        Ordering::Equal
                    } else {
                        prior.compare(map, a, b)
                    }
                })
                .then_with(|| a.cmp(b))
        });
    }

    fn check_row(&self, row: usize) -> Result<(), TableError> {
        if row < self.rows.len() {
            Ok(())
        } else {
            let err = TableError::RowOutOfRange {
                row,
                row_count: self.rows.len(),
            };
            log::error!("table: {}", err);
            Err(err)
        }
    }
}
