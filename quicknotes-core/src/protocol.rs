//! Operation documents and payload shapes for the notes GraphQL API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ClientSessionId, Note};
use crate::{errors::NotesError, NotesResult};

macro_rules! note_fields {
    () => {
        "id clientOriginID name description completed createdAt updatedAt"
    };
}

pub const LIST_NOTES: &str = concat!(
    "query ListNotes { listNotes { items { ",
    note_fields!(),
    " } } }"
);

pub const CREATE_NOTE: &str = concat!(
    "mutation CreateNote($input: CreateNoteInput!) { createNote(input: $input) { ",
    note_fields!(),
    " } }"
);

pub const UPDATE_NOTE: &str = concat!(
    "mutation UpdateNote($input: UpdateNoteInput!) { updateNote(input: $input) { ",
    note_fields!(),
    " } }"
);

pub const DELETE_NOTE: &str = concat!(
    "mutation DeleteNote($input: DeleteNoteInput!) { deleteNote(input: $input) { ",
    note_fields!(),
    " } }"
);

pub const ON_CREATE_NOTE: &str = concat!(
    "subscription OnCreateNote { onCreateNote { ",
    note_fields!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteInput {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "clientOriginID")]
    pub client_origin_id: Option<ClientSessionId>,
    pub completed: bool,
}

impl From<&Note> for CreateNoteInput {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            name: note.name.clone(),
            description: note.description.clone(),
            client_origin_id: note.client_origin_id,
            completed: note.completed,
        }
    }
}

/// Update input. The backend expects every mutable field, not just the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteInput {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "clientOriginID")]
    pub client_origin_id: Option<ClientSessionId>,
    pub completed: bool,
}

impl From<&Note> for UpdateNoteInput {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            name: note.name.clone(),
            description: note.description.clone(),
            client_origin_id: note.client_origin_id,
            completed: note.completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteNoteInput {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

impl GraphqlRequest {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            variables: None,
        }
    }

    /// Request whose variables are `{ "input": <input> }`.
    pub fn with_input<T: Serialize>(query: &str, input: &T) -> NotesResult<Self> {
        Ok(Self {
            query: query.to_string(),
            variables: Some(serde_json::json!({ "input": serde_json::to_value(input)? })),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl<T> GraphqlResponse<T> {
    /// Errors win over partial data.
    pub fn into_result(self) -> NotesResult<T> {
        if !self.errors.is_empty() {
            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(NotesError::Backend(messages.join("; ")));
        }
        self.data
            .ok_or_else(|| NotesError::Backend("response carried no data".to_string()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteConnection {
    #[serde(default)]
    pub items: Option<Vec<Option<Note>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotesData {
    #[serde(default)]
    pub list_notes: Option<NoteConnection>,
}

impl ListNotesData {
    /// Missing lists and null entries both collapse to nothing.
    pub fn into_notes(self) -> Vec<Note> {
        self.list_notes
            .and_then(|connection| connection.items)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteData {
    pub create_note: Option<Note>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteData {
    pub update_note: Option<Note>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNoteData {
    pub delete_note: Option<Note>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnCreateNoteData {
    pub on_create_note: Option<Note>,
}

/// Unwrap the single note a mutation or subscription event returns.
pub fn require_note(note: Option<Note>, operation: &str) -> NotesResult<Note> {
    note.ok_or_else(|| NotesError::Backend(format!("{} returned no note", operation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FormDraft;
    use serde_json::json;

    #[test]
    fn test_documents_select_note_fields() {
        for document in [LIST_NOTES, CREATE_NOTE, UPDATE_NOTE, DELETE_NOTE, ON_CREATE_NOTE] {
            assert!(document.contains("clientOriginID"));
            assert!(document.contains("completed"));
        }
        assert!(UPDATE_NOTE.contains("UpdateNoteInput!"));
        assert!(ON_CREATE_NOTE.starts_with("subscription"));
    }

    #[test]
    fn test_update_input_carries_full_field_set() {
        let session = ClientSessionId::generate();
        let mut note = Note::draft(&FormDraft::new("Title", "Body"), session);
        note.completed = true;

        let request = GraphqlRequest::with_input(UPDATE_NOTE, &UpdateNoteInput::from(&note)).unwrap();
        let variables = request.variables.unwrap();
        let input = &variables["input"];

        assert_eq!(input["id"], json!(note.id.to_string()));
        assert_eq!(input["name"], json!("Title"));
        assert_eq!(input["description"], json!("Body"));
        assert_eq!(input["completed"], json!(true));
        assert_eq!(input["clientOriginID"], json!(session.to_string()));
    }

    #[test]
    fn test_list_response_with_missing_and_null_items() {
        let response: GraphqlResponse<ListNotesData> = serde_json::from_value(json!({
            "data": { "listNotes": { "items": [
                null,
                {
                    "id": "550e8400-e29b-41d4-a716-446655440000",
                    "name": "A",
                    "description": "first",
                    "completed": false
                }
            ] } }
        }))
        .unwrap();
        let notes = response.into_result().unwrap().into_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].name, "A");

        let empty: GraphqlResponse<ListNotesData> =
            serde_json::from_value(json!({ "data": { "listNotes": { "items": null } } })).unwrap();
        assert!(empty.into_result().unwrap().into_notes().is_empty());

        let absent: GraphqlResponse<ListNotesData> =
            serde_json::from_value(json!({ "data": { "listNotes": null } })).unwrap();
        assert!(absent.into_result().unwrap().into_notes().is_empty());
    }

    #[test]
    fn test_errors_become_backend_error() {
        let response: GraphqlResponse<CreateNoteData> = serde_json::from_value(json!({
            "data": null,
            "errors": [
                { "message": "Not Authorized" },
                { "message": "Conditional check failed", "path": ["createNote"] }
            ]
        }))
        .unwrap();

        match response.into_result() {
            Err(NotesError::Backend(message)) => {
                assert_eq!(message, "Not Authorized; Conditional check failed")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_require_note() {
        assert!(require_note(None, "createNote").is_err());
    }

    fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> NotesResult<T> {
        serde_json::from_value::<GraphqlResponse<T>>(value)?.into_result()
    }

    #[test]
    fn test_payloads_without_default_decode() {
        let note: OnCreateNoteData = decode(json!({
            "data": { "onCreateNote": {
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "name": "pushed",
                "description": "from elsewhere",
                "completed": true
            } }
        }))
        .unwrap();
        let note = require_note(note.on_create_note, "onCreateNote").unwrap();
        assert_eq!(note.name, "pushed");

        // A missing "data" key is read as no data at all
        let missing = decode::<DeleteNoteData>(json!({}));
        assert!(matches!(missing, Err(NotesError::Backend(_))));

        let rejected = decode::<UpdateNoteData>(json!({ "errors": [{ "message": "denied" }] }));
        assert!(matches!(rejected, Err(NotesError::Backend(m)) if m == "denied"));
    }
}
