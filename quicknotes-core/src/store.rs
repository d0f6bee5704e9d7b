//! The closed action set and the transition function over [`AppState`].

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::models::{AppState, FormDraft, FormField, Note};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Replace the whole list and stop loading.
    SetNotes { notes: Vec<Note> },
    /// The initial fetch failed.
    Error,
    /// Prepend a single note.
    AddNote { note: Note },
    ResetForm,
    SetInput { name: FormField, value: String },
    /// Any action type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub fn set_input(name: FormField, value: impl Into<String>) -> Self {
        Action::SetInput {
            name,
            value: value.into(),
        }
    }
}

/// Apply `action` to `state` and return the next state.
///
/// Total and side-effect free: every action, including [`Action::Unknown`],
/// produces a state and nothing here can panic.
pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::SetNotes { notes } => {
            state.notes = notes;
            state.loading = false;
        }
        Action::Error => {
            state.loading = false;
            state.error = true;
        }
        Action::AddNote { note } => state.notes.insert(0, note),
        Action::ResetForm => state.form = FormDraft::default(),
        Action::SetInput { name, value } => state.form.set(name, value),
        Action::Unknown => {}
    }
    state
}
