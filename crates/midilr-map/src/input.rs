//! Raw MIDI decoding
//!
//! Turns channel voice bytes from a device callback into an identity plus the
//! value carried by the message, and back again for controller feedback.

use crate::identity::{MessageKind, MidiMessageId};

/// A decoded channel voice message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// Which control sent the message
    pub id: MidiMessageId,
    /// Velocity, controller value, pressure or 14-bit bend
    pub value: u16,
}

impl MidiEvent {
    /// Parse raw MIDI bytes into an event
    ///
    /// MIDI message format:
    /// - Note Off: 0x8n nn vv (n=channel, nn=note, vv=velocity)
    /// - Note On: 0x9n nn vv
    /// - Control Change: 0xBn cc vv (cc=controller, vv=value)
    /// - Program Change: 0xCn pp
    /// - Pitch Bend: 0xEn ll mm (14-bit, LSB first)
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        let kind = MessageKind::from_status(status)?;
        let channel = (status & 0x0F) + 1;

        let (kind, number, value) = match kind {
            MessageKind::ProgramChange | MessageKind::ChannelPressure => {
                let first = *rest.first()?;
                if kind == MessageKind::ProgramChange {
                    (kind, first, 0)
                } else {
                    (kind, 0, u16::from(first))
                }
            }
            MessageKind::PitchBend => {
                let (lsb, msb) = (*rest.first()?, *rest.get(1)?);
                (kind, 0, (u16::from(msb & 0x7F) << 7) | u16::from(lsb & 0x7F))
            }
            // Note On with velocity 0 is treated as Note Off
            MessageKind::NoteOn if *rest.get(1)? == 0 => (MessageKind::NoteOff, rest[0], 0),
            _ => (kind, *rest.first()?, u16::from(*rest.get(1)?)),
        };

        let id = MidiMessageId::new(channel, number & 0x7F, kind).ok()?;
        Some(Self { id, value })
    }

    /// Encode back into raw bytes, clamping the value to the kind's range
    pub fn to_bytes(&self) -> Vec<u8> {
        let kind = self.id.kind();
        let status = kind.status_nibble() | (self.id.channel() - 1);
        let value = self.value.min(kind.max_value());

        match kind {
            MessageKind::ProgramChange => vec![status, self.id.data()],
            MessageKind::ChannelPressure => vec![status, value as u8],
            MessageKind::PitchBend => vec![status, (value & 0x7F) as u8, (value >> 7) as u8],
            _ => vec![status, self.id.data(), value as u8],
        }
    }

    /// Parse a line of hex bytes such as `B0 07 40`
    pub fn parse_hex(line: &str) -> Option<Self> {
        let bytes: Option<Vec<u8>> = line
            .split_whitespace()
            .map(|token| u8::from_str_radix(token.trim_start_matches("0x"), 16).ok())
            .collect();
        Self::parse(&bytes?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_change() {
        let event = MidiEvent::parse(&[0xB1, 7, 64]).unwrap();
        assert_eq!(event.id, MidiMessageId::cc(2, 7).unwrap());
        assert_eq!(event.value, 64);
    }

    #[test]
    fn test_parse_note_on() {
        let event = MidiEvent::parse(&[0x90, 60, 100]).unwrap();
        assert_eq!(event.id, MidiMessageId::note_on(1, 60).unwrap());
        assert_eq!(event.value, 100);
    }

    #[test]
    fn test_parse_note_off_via_velocity() {
        let event = MidiEvent::parse(&[0x90, 60, 0]).unwrap();
        assert_eq!(event.id.kind(), MessageKind::NoteOff);
        assert_eq!(event.id.data(), 60);
    }

    #[test]
    fn test_parse_program_and_pressure() {
        let program = MidiEvent::parse(&[0xCF, 12]).unwrap();
        assert_eq!(program.id, MidiMessageId::new(16, 12, MessageKind::ProgramChange).unwrap());

        let pressure = MidiEvent::parse(&[0xD0, 99]).unwrap();
        assert_eq!(pressure.id.data(), 0);
        assert_eq!(pressure.value, 99);
    }

    #[test]
    fn test_parse_pitch_bend() {
        let event = MidiEvent::parse(&[0xE3, 0x00, 0x40]).unwrap();
        assert_eq!(event.id, MidiMessageId::new(4, 0, MessageKind::PitchBend).unwrap());
        assert_eq!(event.value, 0x2000);
    }

    #[test]
    fn test_parse_rejects_short_and_system() {
        assert!(MidiEvent::parse(&[]).is_none());
        assert!(MidiEvent::parse(&[0xB0, 7]).is_none());
        assert!(MidiEvent::parse(&[0xC0]).is_none());
        assert!(MidiEvent::parse(&[0xF8]).is_none());
        assert!(MidiEvent::parse(&[0x40, 1, 2]).is_none());
    }

    #[test]
    fn test_to_bytes() {
        let cc = MidiEvent {
            id: MidiMessageId::cc(2, 7).unwrap(),
            value: 300,
        };
        assert_eq!(cc.to_bytes(), vec![0xB1, 7, 127]);

        let bend = MidiEvent {
            id: MidiMessageId::new(1, 0, MessageKind::PitchBend).unwrap(),
            value: 0x2000,
        };
        assert_eq!(bend.to_bytes(), vec![0xE0, 0x00, 0x40]);
    }

    #[test]
    fn test_parse_hex() {
        let event = MidiEvent::parse_hex("b0 07 40").unwrap();
        assert_eq!(event.id, MidiMessageId::cc(1, 7).unwrap());
        assert_eq!(event.value, 0x40);
        assert!(MidiEvent::parse_hex("zz 07").is_none());
    }
}
