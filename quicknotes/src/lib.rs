//! Quick Notes - optimistic note list kept in sync with a GraphQL notes API
//!
//! This crate provides a unified API over the core model and the client.
//!
//! # Example
//!
//! ```ignore
//! use quicknotes::{ClientSessionId, MemoryBackend, Store, SyncConfig, SyncController};
//!
//! let controller = SyncController::new(
//!     Store::new(),
//!     Arc::new(MemoryBackend::new()),
//!     ClientSessionId::generate(),
//!     SyncConfig::default(),
//! );
//! controller.initialize().await?;
//! controller.create_note(FormDraft::new("Groceries", "Milk and eggs")).await?;
//! ```

// Re-export client types
pub use quicknotes_client::{
    ClientConfig, ClientError, ClientResult, GraphqlBackend, InitReport, MemoryBackend,
    NoteStream, NotesBackend, RealtimeOutcome, Store, SyncConfig, SyncController, WriteOutcome,
};

// Re-export core types that external applications may need
pub use quicknotes_core::protocol;
pub use quicknotes_core::{
    reduce, Action, AppState, ClientSessionId, FormDraft, FormField, Note, NotesError,
    NotesResult,
};
