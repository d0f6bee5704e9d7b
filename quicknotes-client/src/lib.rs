pub mod backend;
pub mod config;
pub mod controller;
pub mod errors;
pub mod graphql;
pub mod logging;
pub mod memory;
pub mod pending;
pub mod store;

pub use backend::{NoteStream, NotesBackend};
pub use config::{ClientConfig, SyncConfig};
pub use controller::{InitReport, RealtimeOutcome, SyncController, WriteOutcome};
pub use errors::ClientError;
pub use graphql::GraphqlBackend;
pub use memory::MemoryBackend;
pub use store::Store;

pub type ClientResult<T> = Result<T, ClientError>;
