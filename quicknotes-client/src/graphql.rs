use async_trait::async_trait;
use futures_util::stream::{self, SplitSink};
use futures_util::{SinkExt, StreamExt};
use quicknotes_core::protocol::{
    self, CreateNoteData, CreateNoteInput, DeleteNoteData, DeleteNoteInput, GraphqlRequest,
    GraphqlResponse, ListNotesData, OnCreateNoteData, UpdateNoteData, UpdateNoteInput,
};
use quicknotes_core::Note;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderValue};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::backend::{NoteStream, NotesBackend};
use crate::config::ClientConfig;
use crate::{errors::ClientError, ClientResult};

const SUBPROTOCOL: &str = "graphql-transport-ws";
const API_KEY_HEADER: &str = "x-api-key";

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Messages of the graphql-transport-ws protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TransportMessage {
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    ConnectionAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Subscribe {
        id: String,
        payload: GraphqlRequest,
    },
    Next {
        id: String,
        payload: Value,
    },
    Error {
        id: String,
        payload: Value,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
}

/// Notes backend speaking GraphQL: HTTP for queries and mutations,
/// graphql-transport-ws for the creation feed.
pub struct GraphqlBackend {
    http: reqwest::Client,
    endpoint: String,
    realtime_endpoint: String,
    api_key: Option<String>,
}

impl GraphqlBackend {
    pub fn new(
        endpoint: impl Into<String>,
        realtime_endpoint: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            realtime_endpoint: realtime_endpoint.into(),
            api_key,
        }
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self::new(
            config.endpoint.clone(),
            config.realtime_url()?,
            config.api_key.clone(),
        ))
    }

    async fn execute<T: DeserializeOwned>(&self, request: &GraphqlRequest) -> ClientResult<T> {
        let mut builder = self.http.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response: GraphqlResponse<T> = builder
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.into_result()?)
    }

    fn connection_payload(&self) -> Option<Value> {
        self.api_key
            .as_ref()
            .map(|key| serde_json::json!({ (API_KEY_HEADER): key }))
    }
}

async fn send_message(write: &mut WsSink, message: &TransportMessage) -> ClientResult<()> {
    let json = serde_json::to_string(message)?;
    write.send(Message::Text(json)).await?;
    Ok(())
}

fn decode_created(payload: Value) -> ClientResult<Note> {
    let response: GraphqlResponse<OnCreateNoteData> = serde_json::from_value(payload)?;
    let data = response.into_result()?;
    Ok(protocol::require_note(data.on_create_note, "onCreateNote")?)
}

#[async_trait]
impl NotesBackend for GraphqlBackend {
    async fn list_notes(&self) -> ClientResult<Vec<Note>> {
        let data: ListNotesData = self
            .execute(&GraphqlRequest::new(protocol::LIST_NOTES))
            .await?;
        Ok(data.into_notes())
    }

    async fn create_note(&self, input: CreateNoteInput) -> ClientResult<Note> {
        let request = GraphqlRequest::with_input(protocol::CREATE_NOTE, &input)?;
        let data: CreateNoteData = self.execute(&request).await?;
        Ok(protocol::require_note(data.create_note, "createNote")?)
    }

    async fn update_note(&self, input: UpdateNoteInput) -> ClientResult<Note> {
        let request = GraphqlRequest::with_input(protocol::UPDATE_NOTE, &input)?;
        let data: UpdateNoteData = self.execute(&request).await?;
        Ok(protocol::require_note(data.update_note, "updateNote")?)
    }

    async fn delete_note(&self, input: DeleteNoteInput) -> ClientResult<Note> {
        let request = GraphqlRequest::with_input(protocol::DELETE_NOTE, &input)?;
        let data: DeleteNoteData = self.execute(&request).await?;
        Ok(protocol::require_note(data.delete_note, "deleteNote")?)
    }

    async fn on_note_created(&self) -> ClientResult<NoteStream> {
        let mut request = self.realtime_endpoint.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

        let (ws_stream, _) = connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        send_message(
            &mut write,
            &TransportMessage::ConnectionInit {
                payload: self.connection_payload(),
            },
        )
        .await?;

        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<TransportMessage>(&text)? {
                    TransportMessage::ConnectionAck { .. } => break,
                    TransportMessage::Ping { .. } => {
                        send_message(&mut write, &TransportMessage::Pong { payload: None }).await?
                    }
                    other => {
                        return Err(ClientError::WebSocket(format!(
                            "unexpected message before connection_ack: {:?}",
                            other
                        )))
                    }
                },
                Some(Ok(Message::Close(_))) | None => return Err(ClientError::SubscriptionClosed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }

        let subscription_id = Uuid::new_v4().to_string();
        send_message(
            &mut write,
            &TransportMessage::Subscribe {
                id: subscription_id.clone(),
                payload: GraphqlRequest::new(protocol::ON_CREATE_NOTE),
            },
        )
        .await?;
        tracing::info!("REALTIME: subscribed to onCreateNote ({})", subscription_id);

        let (tx, rx) = mpsc::channel::<ClientResult<Note>>(100);

        // Reader task: runs until the server completes the subscription, the
        // socket closes, or the consumer drops the stream.
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    _ = tx.closed() => break,
                    msg = read.next() => msg,
                };

                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<TransportMessage>(&text) {
                            Ok(TransportMessage::Next { id, payload }) if id == subscription_id => {
                                if tx.send(decode_created(payload)).await.is_err() {
                                    break;
                                }
                            }
                            Ok(TransportMessage::Error { payload, .. }) => {
                                let error = ClientError::WebSocket(format!(
                                    "subscription rejected: {}",
                                    payload
                                ));
                                let _ = tx.send(Err(error)).await;
                                break;
                            }
                            Ok(TransportMessage::Complete { .. }) => break,
                            Ok(TransportMessage::Ping { .. }) => {
                                let pong = TransportMessage::Pong { payload: None };
                                if let Err(e) = send_message(&mut write, &pong).await {
                                    tracing::warn!("REALTIME: failed to answer ping: {}", e);
                                }
                            }
                            Ok(_) => {}
                            Err(e) => tracing::warn!("REALTIME: unreadable message: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = tx.send(Err(e.into())).await;
                        break;
                    }
                }
            }

            let complete = TransportMessage::Complete {
                id: subscription_id,
            };
            if send_message(&mut write, &complete).await.is_ok() {
                let _ = write.send(Message::Close(None)).await;
            }
            tracing::info!("REALTIME: subscription closed");
        });

        let events = stream::unfold(rx, |mut rx| async move {
            let item = rx.recv().await?;
            Some((item, rx))
        });
        Ok(events.boxed())
    }
}
