use clap::Parser;

use crate::{errors::ClientError, ClientResult};

/// How the sync controller reconciles local and remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Undo an optimistic change when the backend rejects it.
    pub rollback_on_failure: bool,
    /// Ignore realtime notes whose id is already in the list.
    pub dedupe_realtime: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rollback_on_failure: true,
            dedupe_realtime: true,
        }
    }
}

impl SyncConfig {
    /// Failures are only logged and realtime notes are never deduplicated.
    pub fn log_only() -> Self {
        Self {
            rollback_on_failure: false,
            dedupe_realtime: false,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "quicknotes")]
#[command(about = "Note list kept in sync with a GraphQL notes API", long_about = None)]
pub struct ClientConfig {
    /// GraphQL HTTP endpoint
    #[arg(
        short,
        long,
        env = "QUICKNOTES_ENDPOINT",
        default_value = "http://localhost:4000/graphql"
    )]
    pub endpoint: String,

    /// Realtime (graphql-transport-ws) endpoint, derived from --endpoint when omitted
    #[arg(short, long, env = "QUICKNOTES_REALTIME_ENDPOINT")]
    pub realtime_endpoint: Option<String>,

    /// API key sent as x-api-key
    #[arg(short = 'k', long, env = "QUICKNOTES_API_KEY")]
    pub api_key: Option<String>,

    /// Use an in-process backend instead of the network
    #[arg(long)]
    pub memory: bool,

    /// Keep optimistic changes even when the backend rejects them
    #[arg(long)]
    pub no_rollback: bool,

    /// Add realtime notes even when their id is already listed
    #[arg(long)]
    pub no_dedupe: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_filter: String,
}

impl ClientConfig {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            rollback_on_failure: !self.no_rollback,
            dedupe_realtime: !self.no_dedupe,
        }
    }

    pub fn realtime_url(&self) -> ClientResult<String> {
        if let Some(url) = &self.realtime_endpoint {
            return Ok(url.clone());
        }
        if let Some(rest) = self.endpoint.strip_prefix("https://") {
            Ok(format!("wss://{}", rest))
        } else if let Some(rest) = self.endpoint.strip_prefix("http://") {
            Ok(format!("ws://{}", rest))
        } else {
            Err(ClientError::Url(format!(
                "cannot derive a realtime endpoint from {}",
                self.endpoint
            )))
        }
    }
}
