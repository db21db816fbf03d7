//! MIDI message identity
//!
//! A physical control on a controller is named by the triple
//! (channel, data byte, message kind). This is the key used for every
//! lookup in the command map, the table model and the live input path.

use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest valid MIDI channel (channels are 1-based)
pub const MIN_CHANNEL: u8 = 1;
/// Highest valid MIDI channel
pub const MAX_CHANNEL: u8 = 16;
/// Highest valid 7-bit data byte
pub const MAX_DATA: u8 = 127;

/// MIDI channel voice message type
///
/// Variant order is the sort order used by the table's message type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    /// Note On (0x9n)
    NoteOn,
    /// Note Off (0x8n)
    NoteOff,
    /// Polyphonic key pressure (0xAn)
    KeyPressure,
    /// Control Change (0xBn)
    ControlChange,
    /// Program Change (0xCn)
    ProgramChange,
    /// Channel pressure (0xDn)
    ChannelPressure,
    /// Pitch Bend (0xEn)
    PitchBend,
}

impl MessageKind {
    /// Every kind, in column sort order
    pub const ALL: [MessageKind; 7] = [
        Self::NoteOn,
        Self::NoteOff,
        Self::KeyPressure,
        Self::ControlChange,
        Self::ProgramChange,
        Self::ChannelPressure,
        Self::PitchBend,
    ];

    /// Symbolic name, as written to profile documents
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoteOn => "NoteOn",
            Self::NoteOff => "NoteOff",
            Self::KeyPressure => "KeyPressure",
            Self::ControlChange => "ControlChange",
            Self::ProgramChange => "ProgramChange",
            Self::ChannelPressure => "ChannelPressure",
            Self::PitchBend => "PitchBend",
        }
    }

    /// Short label for table display
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoteOn => "Note On",
            Self::NoteOff => "Note Off",
            Self::KeyPressure => "Aftertouch",
            Self::ControlChange => "CC",
            Self::ProgramChange => "Program",
            Self::ChannelPressure => "Pressure",
            Self::PitchBend => "Pitch Bend",
        }
    }

    /// Status byte high nibble for this kind
    pub fn status_nibble(&self) -> u8 {
        match self {
            Self::NoteOff => 0x80,
            Self::NoteOn => 0x90,
            Self::KeyPressure => 0xA0,
            Self::ControlChange => 0xB0,
            Self::ProgramChange => 0xC0,
            Self::ChannelPressure => 0xD0,
            Self::PitchBend => 0xE0,
        }
    }

    /// Kind for a status byte (channel nibble ignored)
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(Self::NoteOff),
            0x90 => Some(Self::NoteOn),
            0xA0 => Some(Self::KeyPressure),
            0xB0 => Some(Self::ControlChange),
            0xC0 => Some(Self::ProgramChange),
            0xD0 => Some(Self::ChannelPressure),
            0xE0 => Some(Self::PitchBend),
            _ => None,
        }
    }

    /// Whether the message carries a single data byte (no value byte)
    pub fn is_single_byte(&self) -> bool {
        matches!(self, Self::ProgramChange | Self::ChannelPressure)
    }

    /// Largest value this kind can carry (14-bit for pitch bend)
    pub fn max_value(&self) -> u16 {
        match self {
            Self::PitchBend => 0x3FFF,
            _ => MAX_DATA as u16,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MessageKind {
    type Err = IdentityError;

    /// Accepts the symbolic name or the display label, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| {
                kind.name().eq_ignore_ascii_case(trimmed)
                    || kind.label().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| IdentityError::UnknownKind(trimmed.to_string()))
    }
}

/// Identity of one physical MIDI control
///
/// Immutable once built; two identities are equal iff channel, data and kind
/// are all equal. Ordering is by channel, then data, then kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MidiMessageId {
    channel: u8,
    data: u8,
    kind: MessageKind,
}

impl MidiMessageId {
    /// Build an identity, validating channel (1-16) and data (0-127)
    pub fn new(channel: u8, data: u8, kind: MessageKind) -> Result<Self, IdentityError> {
        Self::from_wide(i64::from(channel), i64::from(data), kind)
    }

    /// Build an identity from unchecked integers (e.g. parsed from a document)
    pub fn from_wide(channel: i64, data: i64, kind: MessageKind) -> Result<Self, IdentityError> {
        if !(i64::from(MIN_CHANNEL)..=i64::from(MAX_CHANNEL)).contains(&channel) {
            return Err(IdentityError::ChannelOutOfRange(channel));
        }
        if !(0..=i64::from(MAX_DATA)).contains(&data) {
            return Err(IdentityError::DataOutOfRange(data));
        }
        Ok(Self {
            channel: channel as u8,
            data: data as u8,
            kind,
        })
    }

    /// Control Change identity
    pub fn cc(channel: u8, cc: u8) -> Result<Self, IdentityError> {
        Self::new(channel, cc, MessageKind::ControlChange)
    }

    /// Note On identity
    pub fn note_on(channel: u8, note: u8) -> Result<Self, IdentityError> {
        Self::new(channel, note, MessageKind::NoteOn)
    }

    /// MIDI channel (1-16)
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Controller, note or program number (0-127)
    pub fn data(&self) -> u8 {
        self.data
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }
}

impl fmt::Display for MidiMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ch{} {} #{}", self.channel, self.kind, self.data)
    }
}
