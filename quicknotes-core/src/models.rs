use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{errors::NotesError, NotesResult};

/// Message shown when a note is submitted without a name or description.
pub const MISSING_FIELDS_MESSAGE: &str = "Please enter a name and a description";

/// Identifies one running client instance.
///
/// Generated once at start-up and handed to whatever needs to tell this
/// client's own writes apart from other clients' writes in the realtime feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSessionId(Uuid);

impl ClientSessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ClientSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ClientSessionId {
    type Err = NotesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    #[serde(rename = "clientOriginID", default)]
    pub client_origin_id: Option<ClientSessionId>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    // Assigned by the backend; optimistic notes have none yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Build a fresh, not yet persisted note from the form contents.
    pub fn draft(form: &FormDraft, origin: ClientSessionId) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_origin_id: Some(origin),
            name: form.name.clone(),
            description: form.description.clone(),
            completed: false,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn originated_from(&self, session: ClientSessionId) -> bool {
        self.client_origin_id == Some(session)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FormField {
    Name,
    Description,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDraft {
    pub name: String,
    pub description: String,
}

impl FormDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Description => &self.description,
        }
    }

    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Name => self.name = value,
            FormField::Description => self.description = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.description.is_empty()
    }

    /// Both fields are required before a note can be created.
    pub fn validate(&self) -> NotesResult<()> {
        if self.name.is_empty() || self.description.is_empty() {
            return Err(NotesError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Newest first.
    pub notes: Vec<Note>,
    pub loading: bool,
    pub error: bool,
    pub form: FormDraft,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            loading: true,
            error: false,
            form: FormDraft::default(),
        }
    }
}

impl AppState {
    pub fn find_note(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }
}
