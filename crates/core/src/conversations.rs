use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::confirm::Confirmed;
use crate::connections::ConnectionId;
use crate::gateway::{AiGateway, GatewayError};
use crate::insights::{AiInsight, InsightError, InsightOrchestrator};
use crate::optimistic::{OptimisticList, SpeculativeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConversation {
    pub id: i64,
    pub connection_id: ConnectionId,
    pub user_prompt: String,
    #[serde(default)]
    pub generated_sql: String,
    #[serde(default)]
    pub created_at: String,
}

impl AiConversation {
    fn placeholder(connection: ConnectionId, prompt: &str) -> Self {
        Self {
            id: 0,
            connection_id: connection,
            user_prompt: prompt.to_string(),
            generated_sql: String::new(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        !self.generated_sql.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Generate(#[from] InsightError),
    #[error("Failed to load conversations: {0}")]
    Reload(#[source] GatewayError),
}

/// A generate request whose placeholder is already on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub connection: ConnectionId,
    pub prompt: String,
    placeholder: SpeculativeId,
}

/// Per-connection AI chat history.
#[derive(Debug, Default)]
pub struct ConversationStore {
    lists: HashMap<ConnectionId, OptimisticList<AiConversation>>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Display order: oldest first, with any pending prompt last.
    #[must_use]
    pub fn oldest_first(&self, connection: ConnectionId) -> Vec<&AiConversation> {
        self.lists
            .get(&connection)
            .map(|list| list.oldest_first().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self, connection: ConnectionId) -> usize {
        self.lists.get(&connection).map_or(0, OptimisticList::len)
    }

    #[must_use]
    pub fn is_pending(&self, pending: &PendingGeneration) -> bool {
        self.lists
            .get(&pending.connection)
            .is_some_and(|list| list.is_speculative(pending.placeholder))
    }

    /// Ids known to the backend, newest first.
    #[must_use]
    pub fn persisted_ids(&self, connection: ConnectionId) -> Vec<i64> {
        self.lists
            .get(&connection)
            .map(|list| {
                list.newest_first()
                    .filter(|conversation| conversation.id > 0)
                    .map(|conversation| conversation.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn replace(&mut self, connection: ConnectionId, conversations: Vec<AiConversation>) {
        self.lists
            .entry(connection)
            .or_default()
            .reconcile(conversations);
    }

    pub fn remove(&mut self, connection: ConnectionId) {
        self.lists.remove(&connection);
    }

    /// Shows the prompt immediately. Blank prompts are ignored.
    pub fn begin_generate(&mut self, connection: ConnectionId, prompt: &str) -> Option<PendingGeneration> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        let placeholder = self
            .lists
            .entry(connection)
            .or_default()
            .apply_speculative(AiConversation::placeholder(connection, prompt));

        Some(PendingGeneration {
            connection,
            prompt: prompt.to_string(),
            placeholder,
        })
    }

    /// Success installs the reloaded list wholesale; failure removes exactly
    /// the placeholder this request added.
    pub fn finish_generate(
        &mut self,
        pending: &PendingGeneration,
        outcome: Result<(AiInsight, Vec<AiConversation>), ConversationError>,
    ) -> Result<AiInsight, ConversationError> {
        let Some(list) = self.lists.get_mut(&pending.connection) else {
            debug!(connection = %pending.connection, "conversation list dropped before generate resolved");
            return outcome.map(|(insight, _)| insight);
        };

        match outcome {
            Ok((insight, authoritative)) => {
                list.reconcile(authoritative);
                Ok(insight)
            }
            Err(error) => {
                list.rollback(pending.placeholder);
                warn!(connection = %pending.connection, %error, "generate failed; placeholder rolled back");
                Err(error)
            }
        }
    }

    /// Abandons a request without waiting for it, e.g. after cancellation.
    pub fn abandon(&mut self, pending: &PendingGeneration) {
        if let Some(list) = self.lists.get_mut(&pending.connection) {
            list.rollback(pending.placeholder);
        }
    }
}

pub async fn load_conversations<G: AiGateway + ?Sized>(
    gateway: &G,
    connection: ConnectionId,
) -> Result<Vec<AiConversation>, GatewayError> {
    gateway.conversations(connection).await
}

/// Runs generation and, only if it succeeded, reloads the authoritative list.
pub async fn generate_and_reload<G: AiGateway + ?Sized>(
    gateway: &G,
    pending: &PendingGeneration,
) -> Result<(AiInsight, Vec<AiConversation>), ConversationError> {
    let insight = InsightOrchestrator::new(gateway)
        .generate(pending.connection, &pending.prompt)
        .await?;
    let conversations = gateway
        .conversations(pending.connection)
        .await
        .map_err(ConversationError::Reload)?;
    Ok((insight, conversations))
}

/// Deletes every listed conversation; stops at the first failure.
pub async fn delete_conversations<G: AiGateway + ?Sized>(
    gateway: &G,
    ids: &[i64],
    proof: &Confirmed,
) -> Result<(), GatewayError> {
    for id in ids {
        gateway.delete_conversation(*id, proof).await?;
    }
    Ok(())
}
