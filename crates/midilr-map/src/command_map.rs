//! Command map - the authoritative identity → command registry
//!
//! At most one command per identity. What happens when an identity that is
//! already bound gets bound again is decided in one place, [`DuplicatePolicy`].

use crate::codec::{self, ProfileDocument};
use crate::error::RecordError;
use crate::identity::MidiMessageId;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// What `bind` does with an identity that already has a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Overwrite the old command silently
    #[default]
    Replace,
    /// Keep the old command and report the rejection
    Reject,
}

/// Outcome of a `bind` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// Identity was unbound before
    Inserted,
    /// Identity was bound; the old command is returned
    Replaced(String),
    /// Identity was bound and the policy kept the old command
    Rejected,
}

impl BindOutcome {
    /// Whether the map now holds the requested command
    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Summary of loading a document into the map
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Bindings present after the load
    pub loaded: usize,
    /// Records dropped as malformed
    pub skipped: Vec<RecordError>,
}

/// Identity → command registry
#[derive(Debug, Clone, Default)]
pub struct CommandMap {
    bindings: HashMap<MidiMessageId, String>,
    policy: DuplicatePolicy,
}

impl CommandMap {
    /// Empty map with the default (replace) policy
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            bindings: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Bind `id` to `command`
    pub fn bind(&mut self, id: MidiMessageId, command: impl Into<String>) -> BindOutcome {
        let command = command.into();
        match self.bindings.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(command);
                BindOutcome::Inserted
            }
            Entry::Occupied(mut slot) => match self.policy {
                DuplicatePolicy::Replace => BindOutcome::Replaced(slot.insert(command)),
                DuplicatePolicy::Reject => {
                    log::warn!(
                        "bind: {} already bound to '{}', keeping it (rejected '{}')",
                        id,
                        slot.get(),
                        command
                    );
                    BindOutcome::Rejected
                }
            },
        }
    }

    /// Remove the binding for `id`; no-op if absent
    pub fn unbind(&mut self, id: &MidiMessageId) -> Option<String> {
        self.bindings.remove(id)
    }

    /// Command bound to `id`
    pub fn lookup(&self, id: &MidiMessageId) -> Option<&str> {
        self.bindings.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &MidiMessageId) -> bool {
        self.bindings.contains_key(id)
    }

    /// Snapshot of the bound identities (unordered)
    pub fn all_identities(&self) -> Vec<MidiMessageId> {
        self.bindings.keys().copied().collect()
    }

    /// Every identity bound to `command`, in identity order
    ///
    /// Used to send host state back to the controls that drive a command.
    pub fn messages_for_command(&self, command: &str) -> Vec<MidiMessageId> {
        let mut ids: Vec<_> = self
            .bindings
            .iter()
            .filter(|(_, bound)| bound.as_str() == command)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn has_command(&self, command: &str) -> bool {
        self.bindings.values().any(|bound| bound == command)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MidiMessageId, &str)> {
        self.bindings.iter().map(|(id, command)| (id, command.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Remove every binding
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Encode all bindings as a profile document
    pub fn to_document(&self) -> ProfileDocument {
        codec::encode(self.iter())
    }

    /// Replace the contents of the map with the bindings in `doc`
    ///
    /// The map is cleared first. Malformed records are skipped and reported;
    /// repeated identities inside the document follow the duplicate policy.
    pub fn load_document(&mut self, doc: &ProfileDocument) -> LoadReport {
        self.clear();

        let decoded = codec::decode(doc);
        for (id, command) in decoded.bindings {
            self.bind(id, command);
        }

        log::info!(
            "load_document: {} binding(s) loaded, {} record(s) skipped",
            self.len(),
            decoded.errors.len()
        );

        LoadReport {
            loaded: self.len(),
            skipped: decoded.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MessageKind;

    fn cc(channel: u8, cc: u8) -> MidiMessageId {
        MidiMessageId::cc(channel, cc).unwrap()
    }

    #[test]
    fn test_bind_replaces_duplicate() {
        let mut map = CommandMap::new();
        assert_eq!(map.bind(cc(1, 7), "Exposure"), BindOutcome::Inserted);
        assert_eq!(
            map.bind(cc(1, 7), "Contrast"),
            BindOutcome::Replaced("Exposure".to_string())
        );
        assert_eq!(map.lookup(&cc(1, 7)), Some("Contrast"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_last_bind_wins() {
        let mut map = CommandMap::new();
        let names = ["A", "B", "C", "D"];
        for round in 0..3 {
            for (i, name) in names.iter().enumerate() {
                map.bind(cc(1, (i % 2) as u8), format!("{}{}", name, round));
            }
        }
        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup(&cc(1, 0)), Some("C2"));
        assert_eq!(map.lookup(&cc(1, 1)), Some("D2"));
    }

    #[test]
    fn test_reject_policy_keeps_first() {
        let mut map = CommandMap::with_policy(DuplicatePolicy::Reject);
        assert!(map.bind(cc(1, 7), "Exposure").is_bound());
        assert_eq!(map.bind(cc(1, 7), "Contrast"), BindOutcome::Rejected);
        assert_eq!(map.lookup(&cc(1, 7)), Some("Exposure"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_unbind_and_lookup_missing() {
        let mut map = CommandMap::new();
        map.bind(cc(1, 7), "Exposure");

        assert_eq!(map.unbind(&cc(1, 8)), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.unbind(&cc(1, 7)), Some("Exposure".to_string()));
        assert_eq!(map.lookup(&cc(1, 7)), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_messages_for_command() {
        let mut map = CommandMap::new();
        let note = MidiMessageId::new(3, 60, MessageKind::NoteOn).unwrap();
        map.bind(cc(2, 1), "Exposure");
        map.bind(note, "Exposure");
        map.bind(cc(1, 7), "Exposure");
        map.bind(cc(1, 8), "Contrast");

        assert_eq!(map.messages_for_command("Exposure"), vec![cc(1, 7), cc(2, 1), note]);
        assert!(map.has_command("Contrast"));
        assert!(!map.has_command("Clarity"));
        assert!(map.messages_for_command("Clarity").is_empty());
    }

    #[test]
    fn test_document_round_trip() {
        let mut map = CommandMap::new();
        map.bind(cc(1, 7), "Exposure");
        map.bind(cc(1, 8), "Contrast");
        map.bind(MidiMessageId::note_on(2, 1).unwrap(), "NextPhoto");

        let doc = map.to_document();
        let mut restored = CommandMap::new();
        restored.bind(cc(9, 9), "Stale");
        let report = restored.load_document(&doc);

        assert_eq!(report.loaded, 3);
        assert!(report.skipped.is_empty());
        assert_eq!(restored.lookup(&cc(9, 9)), None);
        let mut expected: Vec<_> = map.iter().map(|(id, c)| (*id, c.to_string())).collect();
        let mut actual: Vec<_> = restored.iter().map(|(id, c)| (*id, c.to_string())).collect();
        expected.sort();
        actual.sort();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_load_skips_malformed_record() {
        let mut map = CommandMap::new();
        let mut doc = CommandMap::new().to_document();
        for i in 0..5u8 {
            doc.elements.push(codec::binding_element(&cc(1, i), "Command"));
        }
        doc.elements.push(
            codec::Element::new(codec::BINDING_ELEMENT)
                .with_attribute(codec::ATTR_CHANNEL, 20u64)
                .with_attribute(codec::ATTR_DATA, 1u64)
                .with_attribute(codec::ATTR_MESSAGE_TYPE, "ControlChange")
                .with_attribute(codec::ATTR_COMMAND_NAME, "Broken"),
        );

        let report = map.load_document(&doc);
        assert_eq!(report.loaded, 5);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(map.len(), 5);
    }
}
