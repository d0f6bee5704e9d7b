use quicknotes_core::{reduce, Action, AppState};
use std::sync::Arc;
use tokio::sync::watch;

/// Shared handle to the application state.
///
/// Every change goes through [`reduce`], one action at a time. Renderers
/// follow along through [`Store::subscribe`].
#[derive(Clone)]
pub struct Store {
    tx: Arc<watch::Sender<AppState>>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: Action) {
        let kind = action.kind();
        self.tx.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action);
        });
        tracing::debug!("STORE: dispatched {}", kind);
    }

    /// Decide on an action from the current state and apply it in the same
    /// step, so nothing else can be dispatched in between.
    ///
    /// `plan` returns the action together with a value handed back to the
    /// caller, or `None` to leave the state alone.
    pub fn dispatch_with<R>(
        &self,
        plan: impl FnOnce(&AppState) -> Option<(Action, R)>,
    ) -> Option<R> {
        let mut planned = None;
        self.tx.send_if_modified(|state| match plan(state) {
            Some((action, result)) => {
                tracing::debug!("STORE: dispatched {}", action.kind());
                let current = std::mem::take(state);
                *state = reduce(current, action);
                planned = Some(result);
                true
            }
            None => false,
        });
        planned
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quicknotes_core::{ClientSessionId, FormDraft, FormField, Note};

    #[test]
    fn test_dispatch_goes_through_reducer() {
        let store = Store::new();
        store.dispatch(Action::set_input(FormField::Name, "Shopping"));
        store.dispatch(Action::SetNotes { notes: vec![] });

        let state = store.snapshot();
        assert_eq!(state.form.name, "Shopping");
        assert!(!state.loading);
    }

    #[test]
    fn test_dispatch_with_skips_when_no_plan() {
        let store = Store::new();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        let result: Option<()> = store.dispatch_with(|_| None);

        assert!(result.is_none());
        assert!(!rx.has_changed().unwrap());
        assert!(store.snapshot().loading);
    }

    #[test]
    fn test_dispatch_with_returns_planned_value() {
        let store = Store::new();
        let note = Note::draft(&FormDraft::new("a", "b"), ClientSessionId::generate());
        let id = note.id;

        let result = store.dispatch_with(|state| {
            assert!(state.notes.is_empty());
            Some((Action::AddNote { note }, id))
        });

        assert_eq!(result, Some(id));
        assert_eq!(store.read(|state| state.notes[0].id), id);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = Store::new();
        let mut rx = store.subscribe();

        store.dispatch(Action::Error);

        rx.changed().await.unwrap();
        assert!(rx.borrow().error);
    }
}
