use async_trait::async_trait;
use chrono::Utc;
use futures_util::{stream, StreamExt};
use quicknotes_core::protocol::{CreateNoteInput, DeleteNoteInput, UpdateNoteInput};
use quicknotes_core::{Note, NotesError};
use tokio::sync::{broadcast, Mutex};

use crate::backend::{NoteStream, NotesBackend};
use crate::ClientResult;

const EVENT_CAPACITY: usize = 100;

/// In-process notes service.
///
/// Behaves like the managed API as far as the client can tell: it stamps
/// timestamps, rejects unknown ids, and broadcasts every created note to all
/// subscribers, the creator included.
pub struct MemoryBackend {
    notes: Mutex<Vec<Note>>,
    created_tx: broadcast::Sender<Note>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_notes(Vec::new())
    }

    pub fn with_notes(notes: Vec<Note>) -> Self {
        let (created_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            notes: Mutex::new(notes),
            created_tx,
        }
    }

    pub async fn notes(&self) -> Vec<Note> {
        self.notes.lock().await.clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotesBackend for MemoryBackend {
    async fn list_notes(&self) -> ClientResult<Vec<Note>> {
        Ok(self.notes().await)
    }

    async fn create_note(&self, input: CreateNoteInput) -> ClientResult<Note> {
        let mut notes = self.notes.lock().await;
        if notes.iter().any(|n| n.id == input.id) {
            return Err(NotesError::Backend(format!("note {} already exists", input.id)).into());
        }

        let now = Utc::now();
        let note = Note {
            id: input.id,
            client_origin_id: input.client_origin_id,
            name: input.name,
            description: input.description,
            completed: input.completed,
            created_at: Some(now),
            updated_at: Some(now),
        };
        notes.insert(0, note.clone());
        drop(notes);

        if self.created_tx.send(note.clone()).is_err() {
            tracing::debug!("MEMORY: no subscribers for note {}", note.id);
        }
        Ok(note)
    }

    async fn update_note(&self, input: UpdateNoteInput) -> ClientResult<Note> {
        let mut notes = self.notes.lock().await;
        let note = notes
            .iter_mut()
            .find(|n| n.id == input.id)
            .ok_or(NotesError::NotFound(input.id))?;

        note.name = input.name;
        note.description = input.description;
        note.completed = input.completed;
        note.client_origin_id = input.client_origin_id;
        note.updated_at = Some(Utc::now());
        Ok(note.clone())
    }

    async fn delete_note(&self, input: DeleteNoteInput) -> ClientResult<Note> {
        let mut notes = self.notes.lock().await;
        let index = notes
            .iter()
            .position(|n| n.id == input.id)
            .ok_or(NotesError::NotFound(input.id))?;
        Ok(notes.remove(index))
    }

    async fn on_note_created(&self) -> ClientResult<NoteStream> {
        let rx = self.created_tx.subscribe();
        let events = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(note) => return Some((Ok(note), rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("MEMORY: subscriber lagged, {} events dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quicknotes_core::{ClientSessionId, FormDraft};

    fn input(name: &str) -> CreateNoteInput {
        let note = Note::draft(&FormDraft::new(name, "body"), ClientSessionId::generate());
        CreateNoteInput::from(&note)
    }

    #[tokio::test]
    async fn test_create_stamps_and_lists_newest_first() {
        let backend = MemoryBackend::new();
        backend.create_note(input("first")).await.unwrap();
        let second = backend.create_note(input("second")).await.unwrap();

        assert!(second.created_at.is_some());
        let names: Vec<String> = backend
            .list_notes()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let backend = MemoryBackend::new();
        let create = input("dup");
        backend.create_note(create.clone()).await.unwrap();
        assert!(backend.create_note(create).await.is_err());
    }

    #[tokio::test]
    async fn test_created_notes_are_broadcast_to_creator() {
        let backend = MemoryBackend::new();
        let mut events = backend.on_note_created().await.unwrap();

        let create = input("echo");
        backend.create_note(create.clone()).await.unwrap();

        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.id, create.id);
        assert_eq!(event.client_origin_id, create.client_origin_id);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_fail() {
        let backend = MemoryBackend::new();
        let create = input("x");
        let missing = create.id;

        let update = UpdateNoteInput {
            id: missing,
            name: create.name.clone(),
            description: create.description.clone(),
            client_origin_id: create.client_origin_id,
            completed: true,
        };
        assert!(backend.update_note(update.clone()).await.is_err());
        assert!(backend
            .delete_note(DeleteNoteInput { id: missing })
            .await
            .is_err());

        backend.create_note(create).await.unwrap();
        let updated = backend.update_note(update).await.unwrap();
        assert!(updated.completed);

        backend
            .delete_note(DeleteNoteInput { id: missing })
            .await
            .unwrap();
        assert!(backend.notes().await.is_empty());
    }
}
