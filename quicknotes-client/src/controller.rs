use futures_util::StreamExt;
use quicknotes_core::protocol::{CreateNoteInput, DeleteNoteInput, UpdateNoteInput};
use quicknotes_core::{Action, AppState, ClientSessionId, FormDraft, FormField, Note};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::{NoteStream, NotesBackend};
use crate::config::SyncConfig;
use crate::pending::{PendingWrite, ToggleLedger};
use crate::store::Store;
use crate::{errors::ClientError, ClientResult};

/// What `initialize` managed to set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitReport {
    pub fetched: bool,
    pub subscribed: bool,
}

/// How an optimistic write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The backend accepted the change.
    Committed,
    /// The backend rejected the change and the local state was reverted.
    RolledBack,
    /// The backend rejected the change and the local state was left as is.
    Failed,
    /// No note with that id; nothing was sent.
    Skipped,
}

/// What happened to one note from the realtime feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeOutcome {
    Added,
    /// Our own write coming back.
    Echo,
    /// Already listed under the same id.
    Duplicate,
}

/// Owns the realtime listener task; dropping it stops the task.
struct SubscriptionGuard {
    handle: JoinHandle<()>,
}

impl SubscriptionGuard {
    fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Inner {
    store: Store,
    backend: Arc<dyn NotesBackend>,
    session: ClientSessionId,
    config: SyncConfig,
    initialized: AtomicBool,
    subscription: Mutex<Option<SubscriptionGuard>>,
    toggles: Mutex<ToggleLedger>,
}

/// Drives the store from user intents and backend traffic.
///
/// Every write is applied to the store first and sent to the backend second.
/// Backend failures never reach the caller as errors; they are logged and
/// reported through [`WriteOutcome`].
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<Inner>,
}

impl SyncController {
    pub fn new(
        store: Store,
        backend: Arc<dyn NotesBackend>,
        session: ClientSessionId,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                backend,
                session,
                config,
                initialized: AtomicBool::new(false),
                subscription: Mutex::new(None),
                toggles: Mutex::new(ToggleLedger::default()),
            }),
        }
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn session(&self) -> ClientSessionId {
        self.inner.session
    }

    pub fn config(&self) -> SyncConfig {
        self.inner.config
    }

    pub fn state(&self) -> AppState {
        self.inner.store.snapshot()
    }

    /// Load the notes and start listening for notes created elsewhere.
    ///
    /// The feed is opened before the list is fetched, so creations that land
    /// while the fetch is in flight are buffered and applied after it.
    pub async fn initialize(&self) -> ClientResult<InitReport> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyInitialized);
        }
        let session = self.inner.session;
        tracing::info!("CLIENT {}: Initializing note sync", session);

        let stream = match self.inner.backend.on_note_created().await {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::error!(
                    "CLIENT {}: Failed to open realtime subscription: {}",
                    session,
                    e
                );
                None
            }
        };

        let fetched = self.fetch_notes().await;

        let subscribed = match stream {
            Some(stream) => {
                let guard = self.spawn_listener(stream);
                *self.inner.subscription.lock().await = Some(guard);
                true
            }
            None => false,
        };

        tracing::info!(
            "CLIENT {}: Initialization finished (fetched: {}, subscribed: {})",
            session,
            fetched,
            subscribed
        );
        Ok(InitReport {
            fetched,
            subscribed,
        })
    }

    async fn fetch_notes(&self) -> bool {
        let session = self.inner.session;
        match self.inner.backend.list_notes().await {
            Ok(notes) => {
                tracing::info!("CLIENT {}: Fetched {} notes", session, notes.len());
                self.inner.store.dispatch(Action::SetNotes { notes });
                true
            }
            Err(e) => {
                tracing::error!("CLIENT {}: Failed to fetch notes: {}", session, e);
                self.inner.store.dispatch(Action::Error);
                false
            }
        }
    }

    fn spawn_listener(&self, mut stream: NoteStream) -> SubscriptionGuard {
        // The task must not hold `Inner`, or dropping the controller would
        // never release the subscription.
        let store = self.inner.store.clone();
        let session = self.inner.session;
        let config = self.inner.config;

        let handle = tokio::spawn(async move {
            tracing::info!("CLIENT {}: Realtime listener started", session);
            while let Some(event) = stream.next().await {
                match event {
                    Ok(note) => {
                        apply_remote_created(&store, session, &config, note);
                    }
                    Err(e) => {
                        tracing::error!("CLIENT {}: Realtime event error: {}", session, e);
                    }
                }
            }
            tracing::warn!("CLIENT {}: Realtime listener terminated", session);
        });

        SubscriptionGuard { handle }
    }

    /// Apply one note from the realtime feed.
    pub fn handle_remote_created(&self, note: Note) -> RealtimeOutcome {
        apply_remote_created(
            &self.inner.store,
            self.inner.session,
            &self.inner.config,
            note,
        )
    }

    pub async fn is_subscribed(&self) -> bool {
        self.inner
            .subscription
            .lock()
            .await
            .as_ref()
            .is_some_and(SubscriptionGuard::is_active)
    }

    /// Stop the realtime listener. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(guard) = self.inner.subscription.lock().await.take() {
            drop(guard);
            tracing::info!(
                "CLIENT {}: Realtime subscription released",
                self.inner.session
            );
        }
    }

    pub fn set_input(&self, field: FormField, value: impl Into<String>) {
        self.inner.store.dispatch(Action::set_input(field, value));
    }

    /// Create a note from whatever is currently in the form.
    pub async fn submit_form(&self) -> ClientResult<WriteOutcome> {
        let draft = self.inner.store.read(|state| state.form.clone());
        self.create_note(draft).await
    }

    /// Validate `draft`, show the note immediately, then send it.
    ///
    /// Returns a validation error without touching the state or the backend
    /// when either field is empty.
    pub async fn create_note(&self, draft: FormDraft) -> ClientResult<WriteOutcome> {
        let session = self.inner.session;
        if let Err(e) = draft.validate() {
            tracing::warn!("CLIENT {}: Rejected note: {}", session, e);
            return Err(e.into());
        }

        let note = Note::draft(&draft, session);
        let input = CreateNoteInput::from(&note);
        let pending = PendingWrite::Create { id: note.id };

        tracing::info!("CLIENT {}: Creating note {}", session, note.id);
        self.inner.store.dispatch(Action::AddNote { note });
        self.inner.store.dispatch(Action::ResetForm);

        let result = self.inner.backend.create_note(input).await.map(|_| ());
        Ok(self.settle(pending, result).await)
    }

    /// Remove the note locally, then ask the backend to delete it.
    pub async fn delete_note(&self, id: Uuid) -> ClientResult<WriteOutcome> {
        let session = self.inner.session;
        let pending = self.inner.store.dispatch_with(|state| {
            let index = state.position(id)?;
            let mut notes = state.notes.clone();
            let note = notes.remove(index);
            Some((Action::SetNotes { notes }, PendingWrite::Delete { note, index }))
        });

        let Some(pending) = pending else {
            tracing::info!("CLIENT {}: Note {} not found, nothing to delete", session, id);
            return Ok(WriteOutcome::Skipped);
        };

        tracing::info!("CLIENT {}: Deleting note {}", session, id);
        let result = self
            .inner
            .backend
            .delete_note(DeleteNoteInput { id })
            .await
            .map(|_| ());
        Ok(self.settle(pending, result).await)
    }

    /// Flip `completed` locally, then send the updated note.
    pub async fn toggle_completed(&self, id: Uuid) -> ClientResult<WriteOutcome> {
        let session = self.inner.session;
        let mut toggles = self.inner.toggles.lock().await;
        let planned = self.inner.store.dispatch_with(|state| {
            let index = state.position(id)?;
            let mut notes = state.notes.clone();
            let previous = notes[index].completed;
            notes[index].completed = !previous;
            let input = UpdateNoteInput::from(&notes[index]);
            let seq = toggles.begin(id, previous);
            Some((
                Action::SetNotes { notes },
                (PendingWrite::Toggle { id, previous, seq }, input),
            ))
        });
        drop(toggles);

        let Some((pending, input)) = planned else {
            tracing::info!("CLIENT {}: Note {} not found, nothing to update", session, id);
            return Ok(WriteOutcome::Skipped);
        };

        tracing::info!(
            "CLIENT {}: Marking note {} as {}",
            session,
            id,
            if input.completed { "completed" } else { "not completed" }
        );
        let result = self.inner.backend.update_note(input).await.map(|_| ());
        Ok(self.settle(pending, result).await)
    }

    async fn settle(&self, pending: PendingWrite, result: ClientResult<()>) -> WriteOutcome {
        let session = self.inner.session;
        let id = pending.note_id();
        let operation = pending.operation_type();

        let error = match result {
            Ok(()) => {
                if let PendingWrite::Toggle { previous, seq, .. } = pending {
                    self.inner.toggles.lock().await.commit(id, seq, !previous);
                }
                tracing::info!("CLIENT {}: Backend accepted {} of note {}", session, operation, id);
                return WriteOutcome::Committed;
            }
            Err(e) => e,
        };

        tracing::warn!(
            "CLIENT {}: Backend rejected {} of note {}: {}",
            session,
            operation,
            id,
            error
        );

        let pending = match pending {
            PendingWrite::Toggle { seq, .. } => {
                match self.inner.toggles.lock().await.fail(id, seq) {
                    Some(previous) => PendingWrite::Toggle { id, previous, seq },
                    None => {
                        tracing::info!(
                            "CLIENT {}: A newer update of note {} is still pending",
                            session,
                            id
                        );
                        return WriteOutcome::Failed;
                    }
                }
            }
            other => other,
        };

        if !self.inner.config.rollback_on_failure {
            return WriteOutcome::Failed;
        }

        let reverted = self.inner.store.dispatch_with(|state| {
            pending
                .rollback(state)
                .map(|notes| (Action::SetNotes { notes }, ()))
        });

        match reverted {
            Some(()) => {
                tracing::info!("CLIENT {}: Rolled back {} of note {}", session, operation, id);
                WriteOutcome::RolledBack
            }
            None => {
                tracing::warn!(
                    "CLIENT {}: Nothing to roll back for {} of note {}",
                    session,
                    operation,
                    id
                );
                WriteOutcome::Failed
            }
        }
    }
}

/// Echoes of our own writes are dropped; so are notes already listed when
/// deduplication is on. Everything else is prepended.
fn apply_remote_created(
    store: &Store,
    session: ClientSessionId,
    config: &SyncConfig,
    note: Note,
) -> RealtimeOutcome {
    let id = note.id;
    if note.originated_from(session) {
        tracing::debug!("CLIENT {}: Ignoring echo of note {}", session, id);
        return RealtimeOutcome::Echo;
    }

    let dedupe = config.dedupe_realtime;
    let added = store.dispatch_with(|state| {
        if dedupe && state.find_note(id).is_some() {
            return None;
        }
        Some((Action::AddNote { note }, ()))
    });

    match added {
        Some(()) => {
            tracing::info!("CLIENT {}: Received note {} from another client", session, id);
            RealtimeOutcome::Added
        }
        None => {
            tracing::debug!("CLIENT {}: Note {} already listed", session, id);
            RealtimeOutcome::Duplicate
        }
    }
}
