use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use quicknotes_client::{ClientError, ClientResult, NoteStream, NotesBackend, Store};
use quicknotes_core::protocol::{CreateNoteInput, DeleteNoteInput, UpdateNoteInput};
use quicknotes_core::{AppState, ClientSessionId, FormDraft, Note, NotesError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// A backend whose answers are decided by the test.
///
/// Every call is recorded by name. Mutations can be held open with a gate
/// until the test releases them, and realtime events are pushed through
/// [`ScriptedBackend::emit`].
#[allow(dead_code)]
pub struct ScriptedBackend {
    pub notes: Mutex<Vec<Note>>,
    pub fail_list: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_subscribe: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
    updates: Mutex<Vec<UpdateNoteInput>>,
    gate: Option<Semaphore>,
    events_tx: mpsc::UnboundedSender<ClientResult<Note>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ClientResult<Note>>>>,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn new(notes: Vec<Note>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            notes: Mutex::new(notes),
            fail_list: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            gate: None,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Mutations wait until [`ScriptedBackend::release`] lets them through.
    pub fn gated(notes: Vec<Note>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(notes)
        }
    }

    pub fn release(&self, mutations: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(mutations);
        }
    }

    /// Push a realtime event. Events sent after the listener is gone are
    /// dropped.
    pub fn emit(&self, note: Note) {
        let _ = self.events_tx.send(Ok(note));
    }

    pub fn emit_error(&self, message: &str) {
        let _ = self
            .events_tx
            .send(Err(ClientError::WebSocket(message.to_string())));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| **c == operation).count()
    }

    pub fn updates(&self) -> Vec<UpdateNoteInput> {
        self.updates.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    fn check(flag: &AtomicBool, operation: &str) -> ClientResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(NotesError::Backend(format!("{} failed", operation)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl NotesBackend for ScriptedBackend {
    async fn list_notes(&self) -> ClientResult<Vec<Note>> {
        self.record("list_notes");
        Self::check(&self.fail_list, "listNotes")?;
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn create_note(&self, input: CreateNoteInput) -> ClientResult<Note> {
        self.record("create_note");
        self.pass_gate().await;
        Self::check(&self.fail_create, "createNote")?;
        let note = Note {
            id: input.id,
            client_origin_id: input.client_origin_id,
            name: input.name,
            description: input.description,
            completed: input.completed,
            created_at: None,
            updated_at: None,
        };
        self.notes.lock().unwrap().insert(0, note.clone());
        Ok(note)
    }

    async fn update_note(&self, input: UpdateNoteInput) -> ClientResult<Note> {
        self.record("update_note");
        self.updates.lock().unwrap().push(input.clone());
        self.pass_gate().await;
        Self::check(&self.fail_update, "updateNote")?;
        Ok(Note {
            id: input.id,
            client_origin_id: input.client_origin_id,
            name: input.name,
            description: input.description,
            completed: input.completed,
            created_at: None,
            updated_at: None,
        })
    }

    async fn delete_note(&self, input: DeleteNoteInput) -> ClientResult<Note> {
        self.record("delete_note");
        self.pass_gate().await;
        Self::check(&self.fail_delete, "deleteNote")?;
        let mut notes = self.notes.lock().unwrap();
        let index = notes
            .iter()
            .position(|n| n.id == input.id)
            .ok_or(NotesError::NotFound(input.id))?;
        Ok(notes.remove(index))
    }

    async fn on_note_created(&self) -> ClientResult<NoteStream> {
        self.record("on_note_created");
        Self::check(&self.fail_subscribe, "onCreateNote")?;
        let rx = self
            .events_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(ClientError::SubscriptionClosed)?;
        let events = stream::unfold(rx, |mut rx| async move {
            let item = rx.recv().await?;
            Some((item, rx))
        });
        Ok(events.boxed())
    }
}

/// A note that looks like it was created by some other client.
#[allow(dead_code)]
pub fn foreign_note(name: &str, description: &str) -> Note {
    Note::draft(
        &FormDraft::new(name, description),
        ClientSessionId::generate(),
    )
}

/// Wait until the store satisfies `predicate`, failing after two seconds.
#[allow(dead_code)]
pub async fn wait_for_state<F>(store: &Store, predicate: F) -> AppState
where
    F: Fn(&AppState) -> bool,
{
    let mut rx = store.subscribe();
    tokio::time::timeout(Duration::from_secs(2), async move {
        loop {
            {
                let state = rx.borrow_and_update();
                if predicate(&*state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("store dropped");
        }
    })
    .await
    .expect("Timed out waiting for state")
}
