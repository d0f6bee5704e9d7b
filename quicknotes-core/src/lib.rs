pub mod errors;
pub mod models;
pub mod protocol;
pub mod store;

pub use errors::NotesError;
pub use models::{AppState, ClientSessionId, FormDraft, FormField, Note};
pub use store::{reduce, Action};

pub type NotesResult<T> = Result<T, NotesError>;
