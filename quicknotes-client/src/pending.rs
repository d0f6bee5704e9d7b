use quicknotes_core::{AppState, Note};
use std::collections::HashMap;
use uuid::Uuid;

/// An optimistic change that has been applied locally and sent to the
/// backend, but not yet confirmed.
///
/// Rollbacks are computed against the state at the time of failure rather
/// than a snapshot taken before the write, so realtime notes that arrived in
/// the meantime are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    Create { id: Uuid },
    Delete { note: Note, index: usize },
    /// `previous` is the value to put back; `seq` orders toggles of one note.
    Toggle { id: Uuid, previous: bool, seq: u64 },
}

impl PendingWrite {
    pub fn note_id(&self) -> Uuid {
        match self {
            PendingWrite::Create { id } => *id,
            PendingWrite::Delete { note, .. } => note.id,
            PendingWrite::Toggle { id, .. } => *id,
        }
    }

    pub fn operation_type(&self) -> &'static str {
        match self {
            PendingWrite::Create { .. } => "create",
            PendingWrite::Delete { .. } => "delete",
            PendingWrite::Toggle { .. } => "update",
        }
    }

    /// The note list with this write undone, or `None` if there is nothing
    /// left to undo.
    pub fn rollback(&self, state: &AppState) -> Option<Vec<Note>> {
        match self {
            PendingWrite::Create { id } => {
                let index = state.position(*id)?;
                let mut notes = state.notes.clone();
                notes.remove(index);
                Some(notes)
            }
            PendingWrite::Delete { note, index } => {
                if state.position(note.id).is_some() {
                    return None;
                }
                let mut notes = state.notes.clone();
                let index = (*index).min(notes.len());
                notes.insert(index, note.clone());
                Some(notes)
            }
            PendingWrite::Toggle { id, previous, .. } => {
                let index = state.position(*id)?;
                if state.notes[index].completed == *previous {
                    return None;
                }
                let mut notes = state.notes.clone();
                notes[index].completed = *previous;
                Some(notes)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ToggleEntry {
    latest: u64,
    in_flight: usize,
    confirmed: bool,
    confirmed_seq: u64,
}

/// Bookkeeping for toggles still waiting on the backend, per note.
///
/// Only the newest toggle of a note may roll it back, and it restores the
/// last value the backend accepted rather than the value it replaced.
#[derive(Debug, Default)]
pub struct ToggleLedger {
    entries: HashMap<Uuid, ToggleEntry>,
}

impl ToggleLedger {
    /// Register a toggle away from `current`; returns its sequence number.
    pub fn begin(&mut self, id: Uuid, current: bool) -> u64 {
        let entry = self.entries.entry(id).or_insert(ToggleEntry {
            latest: 0,
            in_flight: 0,
            confirmed: current,
            confirmed_seq: 0,
        });
        entry.latest += 1;
        entry.in_flight += 1;
        entry.latest
    }

    pub fn commit(&mut self, id: Uuid, seq: u64, completed: bool) {
        if let Some(entry) = self.entries.get_mut(&id) {
            if seq > entry.confirmed_seq {
                entry.confirmed = completed;
                entry.confirmed_seq = seq;
            }
            entry.in_flight -= 1;
        }
        self.release(id);
    }

    /// The value to restore after a failed toggle, or `None` when a newer
    /// toggle of the same note owns the value.
    pub fn fail(&mut self, id: Uuid, seq: u64) -> Option<bool> {
        let entry = self.entries.get_mut(&id)?;
        entry.in_flight -= 1;
        let restore = (seq == entry.latest).then_some(entry.confirmed);
        self.release(id);
        restore
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn release(&mut self, id: Uuid) {
        if self.entries.get(&id).is_some_and(|e| e.in_flight == 0) {
            self.entries.remove(&id);
        }
    }
}
