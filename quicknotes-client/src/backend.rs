use async_trait::async_trait;
use futures_util::stream::BoxStream;
use quicknotes_core::protocol::{CreateNoteInput, DeleteNoteInput, UpdateNoteInput};
use quicknotes_core::Note;

use crate::ClientResult;

/// Notes created by any client, including this one.
pub type NoteStream = BoxStream<'static, ClientResult<Note>>;

/// The operations the sync controller needs from a notes service.
#[async_trait]
pub trait NotesBackend: Send + Sync {
    async fn list_notes(&self) -> ClientResult<Vec<Note>>;

    async fn create_note(&self, input: CreateNoteInput) -> ClientResult<Note>;

    async fn update_note(&self, input: UpdateNoteInput) -> ClientResult<Note>;

    async fn delete_note(&self, input: DeleteNoteInput) -> ClientResult<Note>;

    /// Open the note-creation feed. Dropping the stream ends the subscription.
    async fn on_note_created(&self) -> ClientResult<NoteStream>;
}
