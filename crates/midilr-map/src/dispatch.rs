//! Live MIDI input dispatch
//!
//! The device callback only decodes bytes and pushes a [`MidiEvent`] into a
//! bounded channel. A dedicated worker resolves the command through the shared
//! table and hands it to the transport.
//!
//! ```text
//! MIDI callback → flume channel → dispatcher thread → CommandSink
//! ```

use crate::input::MidiEvent;
use crate::shared::SharedCommandTable;
use flume::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// No row matched yet
const NO_ROW: usize = usize::MAX;

/// Events waiting for the worker before new ones are dropped
const EVENT_QUEUE_SIZE: usize = 256;

/// Receives resolved commands (the transport to the host application)
pub trait CommandSink: Send + 'static {
    fn send_command(&mut self, command: &str, value: u16);
}

impl<F> CommandSink for F
where
    F: FnMut(&str, u16) + Send + 'static,
{
    fn send_command(&mut self, command: &str, value: u16) {
        self(command, value)
    }
}

/// Background dispatcher for live input
pub struct MidiDispatcher {
    event_tx: Sender<MidiEvent>,
    last_row: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MidiDispatcher {
    /// Start the worker thread
    pub fn new<S: CommandSink>(table: SharedCommandTable, sink: S) -> Self {
        let (event_tx, event_rx) = flume::bounded::<MidiEvent>(EVENT_QUEUE_SIZE);
        let last_row = Arc::new(AtomicUsize::new(NO_ROW));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread = {
            let last_row = Arc::clone(&last_row);
            let shutdown = Arc::clone(&shutdown);
            std::thread::Builder::new()
                .name("midi-dispatch".into())
                .spawn(move || Self::run(event_rx, table, sink, last_row, shutdown))
                .expect("Failed to spawn MIDI dispatch thread")
        };

        Self {
            event_tx,
            last_row,
            shutdown,
            thread: Some(thread),
        }
    }

    fn run<S: CommandSink>(
        rx: Receiver<MidiEvent>,
        table: SharedCommandTable,
        mut sink: S,
        last_row: Arc<AtomicUsize>,
        shutdown: Arc<AtomicBool>,
    ) {
        log::info!("Dispatcher started");

        while !shutdown.load(Ordering::Relaxed) {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => Self::handle(&table, &mut sink, &last_row, event),
                Err(flume::RecvTimeoutError::Disconnected) => {
                    log::info!("Dispatcher: channel disconnected, shutting down");
                    return;
                }
                Err(flume::RecvTimeoutError::Timeout) => continue,
            }
        }

        // Events queued before shutdown are still delivered
        for event in rx.try_iter() {
            Self::handle(&table, &mut sink, &last_row, event);
        }
        log::info!("Dispatcher stopped");
    }

    fn handle<S: CommandSink>(
        table: &SharedCommandTable,
        sink: &mut S,
        last_row: &AtomicUsize,
        event: MidiEvent,
    ) {
        match table.resolve(&event.id) {
            Some((command, row)) => {
                last_row.store(row, Ordering::Relaxed);
                log::debug!("Dispatcher: {} -> '{}' (row {})", event.id, command, row);
                sink.send_command(&command, event.value);
            }
            None => {
                log::debug!("Dispatcher: No command bound to {}", event.id);
            }
        }
    }

    /// Sender for the device callback
    pub fn sender(&self) -> Sender<MidiEvent> {
        self.event_tx.clone()
    }

    /// Queue an event (non-blocking, drops if the worker is behind)
    pub fn dispatch(&self, event: MidiEvent) -> bool {
        match self.event_tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Dispatcher: Dropped MIDI event: {}", e);
                false
            }
        }
    }

    /// Decode raw bytes and queue them; unknown messages are ignored
    pub fn dispatch_raw(&self, bytes: &[u8]) -> bool {
        MidiEvent::parse(bytes).is_some_and(|event| self.dispatch(event))
    }

    /// Row of the most recently matched control, for highlighting
    pub fn last_row(&self) -> Option<usize> {
        match self.last_row.load(Ordering::Relaxed) {
            NO_ROW => None,
            row => Some(row),
        }
    }
}

impl Drop for MidiDispatcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
