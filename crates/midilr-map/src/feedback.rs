//! Host → controller feedback
//!
//! When the host reports a new value for a command, every control bound to
//! that command gets a MIDI message so motor faders, LED rings and the like
//! follow the host.

use crate::identity::{MessageKind, MidiMessageId};
use crate::input::MidiEvent;
use crate::shared::SharedCommandTable;
use std::collections::HashMap;

/// Builds feedback messages from host values
pub struct HostFeedback {
    table: SharedCommandTable,
    /// Last sent values (to avoid redundant sends)
    last_values: HashMap<MidiMessageId, u16>,
}

impl HostFeedback {
    pub fn new(table: SharedCommandTable) -> Self {
        Self {
            table,
            last_values: HashMap::new(),
        }
    }

    /// Events for every control bound to `command`
    ///
    /// Program Change controls get nothing; values are clamped per kind.
    pub fn events_for(&self, command: &str, value: u16) -> Vec<MidiEvent> {
        self.table
            .messages_for_command(command)
            .into_iter()
            .filter(|id| id.kind() != MessageKind::ProgramChange)
            .map(|id| MidiEvent {
                id,
                value: value.min(id.kind().max_value()),
            })
            .collect()
    }

    /// Raw MIDI messages for every control bound to `command`
    pub fn bytes_for(&self, command: &str, value: u16) -> Vec<Vec<u8>> {
        self.events_for(command, value)
            .iter()
            .map(MidiEvent::to_bytes)
            .collect()
    }

    /// Raw messages for `command`, skipping controls already showing `value`
    pub fn update(&mut self, command: &str, value: u16) -> Vec<Vec<u8>> {
        let events = self.events_for(command, value);
        let mut messages = Vec::with_capacity(events.len());
        for event in events {
            if self.last_values.get(&event.id) == Some(&event.value) {
                continue;
            }
            self.last_values.insert(event.id, event.value);
            messages.push(event.to_bytes());
        }
        if messages.is_empty() {
            log::trace!("HostFeedback: nothing to send for '{}'", command);
        }
        messages
    }

    /// Forget sent values so the next update resends everything
    pub fn reset(&mut self) {
        self.last_values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SharedCommandTable {
        let table = SharedCommandTable::new();
        table.bind(MidiMessageId::cc(1, 7).unwrap(), "Exposure");
        table.bind(MidiMessageId::new(2, 0, MessageKind::PitchBend).unwrap(), "Exposure");
        table.bind(MidiMessageId::new(1, 3, MessageKind::ProgramChange).unwrap(), "Exposure");
        table.bind(MidiMessageId::cc(1, 8).unwrap(), "Contrast");
        table
    }

    #[test]
    fn test_events_for_command() {
        let feedback = HostFeedback::new(table());
        let events = feedback.events_for("Exposure", 1000);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, MidiMessageId::cc(1, 7).unwrap());
        assert_eq!(events[0].value, 127);
        assert_eq!(events[1].id.kind(), MessageKind::PitchBend);
        assert_eq!(events[1].value, 1000);
        assert!(feedback.events_for("Clarity", 5).is_empty());

        assert_eq!(
            feedback.bytes_for("Exposure", 0x2000),
            vec![vec![0xB0, 7, 127], vec![0xE1, 0x00, 0x40]]
        );
    }

    #[test]
    fn test_update_skips_unchanged() {
        let mut feedback = HostFeedback::new(table());

        assert_eq!(feedback.update("Contrast", 64), vec![vec![0xB0, 8, 64]]);
        assert!(feedback.update("Contrast", 64).is_empty());
        assert_eq!(feedback.update("Contrast", 65), vec![vec![0xB0, 8, 65]]);

        feedback.reset();
        assert_eq!(feedback.update("Contrast", 65).len(), 1);
    }
}
