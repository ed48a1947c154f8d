//! Retrieval-augmented document chat.
//!
//! The one synchronous flow in the system: search the caller's documents for
//! chunks relevant to the query, then generate an answer grounded in them.
//! Both steps go through the same bridge the asynchronous tasks use, so the
//! retry/deadline policy applies here too.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use courier_bridge::{Bridge, BridgeMethod, BridgePayload};
use courier_core::{CourierError, Result};

/// The generated answer together with the retrieved context it was grounded
/// in.
#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub response: String,
    pub context: String,
}

/// Answers questions over previously ingested documents.
pub struct ChatService {
    bridge: Arc<dyn Bridge>,
}

impl ChatService {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge }
    }

    /// Runs the search-then-generate flow for `query` over the given
    /// documents.
    pub async fn answer(&self, query: &str, document_ids: &[i64]) -> Result<ChatAnswer> {
        if query.trim().is_empty() {
            return Err(CourierError::validation("chat query must not be empty"));
        }

        let chunks = match self
            .bridge
            .invoke(
                BridgeMethod::SearchSimilarChunks,
                &json!({ "query": query, "document_ids": document_ids }),
            )
            .await?
        {
            BridgePayload::Chunks(chunks) => chunks,
            other => {
                return Err(CourierError::BridgeProtocolViolation(format!(
                    "chunk search returned {other:?}"
                )));
            }
        };
        debug!(chunk_count = chunks.len(), "retrieved context chunks");

        let context = chunks.join("\n\n");
        let generation = match self
            .bridge
            .invoke(
                BridgeMethod::GenerateChatResponse,
                &json!({ "query": query, "context": [context.clone()] }),
            )
            .await?
        {
            BridgePayload::Generation(out) => out,
            other => {
                return Err(CourierError::BridgeProtocolViolation(format!(
                    "chat generation returned {other:?}"
                )));
            }
        };

        Ok(ChatAnswer {
            response: generation.response,
            context,
        })
    }
}
