//! Command mapping engine for the MIDI2LR bridge
//!
//! This crate provides:
//! - MIDI control identities (channel, data byte, message kind)
//! - A registry from identities to host command names
//! - A sortable row view over the registry for an editing table
//! - Profile persistence as YAML element/attribute documents
//! - Live input dispatch and host-to-controller feedback
//!
//! # Architecture
//!
//! ```text
//! MIDI Device → MidiEvent::parse → flume channel → MidiDispatcher → CommandSink
//!                                                        ↑
//!                         editor → SharedCommandTable (map + rows, one lock)
//! ```
//!
//! The registry and the row sequence always change together under the same
//! lock, so the input thread never sees a row without a binding or the reverse.

mod codec;
mod command_map;
mod config;
mod dispatch;
mod error;
mod feedback;
mod identity;
mod input;
mod profile;
mod shared;
mod storage;
mod table;

pub use codec::{
    binding_element, decode, encode, DecodedProfile, Element, ProfileDocument, ATTR_CHANNEL,
    ATTR_COMMAND_NAME, ATTR_DATA, ATTR_MESSAGE_TYPE, BINDING_ELEMENT, ROOT_ELEMENT,
};
pub use command_map::{BindOutcome, CommandMap, DuplicatePolicy, LoadReport};
pub use config::{default_config_path, load_config, save_config, BridgeConfig};
pub use dispatch::{CommandSink, MidiDispatcher};
pub use error::{IdentityError, ProfileError, RecordError, TableError};
pub use feedback::HostFeedback;
pub use identity::{MessageKind, MidiMessageId, MAX_CHANNEL, MAX_DATA, MIN_CHANNEL};
pub use input::MidiEvent;
pub use profile::{load_document, save_document, ProfileStore};
pub use shared::SharedCommandTable;
pub use table::{Column, CommandTableModel, SortState};
