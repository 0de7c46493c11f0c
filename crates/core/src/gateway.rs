use async_trait::async_trait;
use thiserror::Error;

use crate::autocomplete::AutocompleteData;
use crate::confirm::Confirmed;
use crate::connections::{Connection, ConnectionDraft, ConnectionId, ConnectionTest};
use crate::conversations::AiConversation;
use crate::favorites::FavoriteQuery;
use crate::health::HealthReport;
use crate::history::{QueryHistoryEntry, SlowQuery, SlowQueryAnalysis, SlowQueryFilter, SlowQueryListing};
use crate::insights::{
    AiResponse, DebugAdvice, Explanation, GeneratedSql, IndexAdvice, Optimization, PlanAnalysis,
};
use crate::results::QueryResult;
use crate::schema::{ColumnInfo, IndexInfo, TableRef, TableRelations, TableStats};
use crate::settings::{Settings, SettingsUpdate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The backend answered, but with a failure body.
    #[error("{message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("malformed backend response: {0}")]
    Decode(String),
}

impl GatewayError {
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// The message the backend supplied, if it supplied a usable one.
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Remote { message, .. } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.remote_message().unwrap_or(fallback).to_string()
    }
}

#[async_trait]
pub trait QueryGateway: Send + Sync {
    async fn execute(
        &self,
        connection: ConnectionId,
        sql: &str,
        row_limit: Option<u32>,
    ) -> Result<QueryResult, GatewayError>;

    async fn format_sql(&self, connection: ConnectionId, sql: &str) -> Result<String, GatewayError>;
}

#[async_trait]
pub trait SchemaGateway: Send + Sync {
    async fn tables(&self, connection: ConnectionId) -> Result<Vec<TableRef>, GatewayError>;

    async fn columns(
        &self,
        connection: ConnectionId,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, GatewayError>;

    async fn indexes(
        &self,
        connection: ConnectionId,
        table: &str,
    ) -> Result<Vec<IndexInfo>, GatewayError>;

    async fn ddl(&self, connection: ConnectionId, table: &str) -> Result<String, GatewayError>;

    async fn relations(
        &self,
        connection: ConnectionId,
        table: &str,
    ) -> Result<TableRelations, GatewayError>;

    async fn table_stats(
        &self,
        connection: ConnectionId,
        table: &str,
    ) -> Result<TableStats, GatewayError>;

    async fn autocomplete(&self, connection: ConnectionId)
        -> Result<AutocompleteData, GatewayError>;

    /// Asks the backend to rebuild its schema cache. Returns the table count.
    async fn refresh_schema(&self, connection: ConnectionId) -> Result<usize, GatewayError>;

    async fn health(&self, connection: ConnectionId) -> Result<HealthReport, GatewayError>;
}

/// AI calls hand back the `{success, ..., error}` envelope untouched; deciding
/// whether a response is usable is the orchestrator's job.
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn generate_sql(
        &self,
        connection: ConnectionId,
        prompt: &str,
    ) -> Result<AiResponse<GeneratedSql>, GatewayError>;

    /// Newest first.
    async fn conversations(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<AiConversation>, GatewayError>;

    async fn delete_conversation(
        &self,
        conversation: i64,
        proof: &Confirmed,
    ) -> Result<(), GatewayError>;

    async fn explain(
        &self,
        connection: ConnectionId,
        query: &str,
    ) -> Result<AiResponse<Explanation>, GatewayError>;

    async fn debug(
        &self,
        connection: ConnectionId,
        query: &str,
        error: &str,
    ) -> Result<AiResponse<DebugAdvice>, GatewayError>;

    async fn optimize(
        &self,
        connection: ConnectionId,
        query: &str,
        execution_time: Option<f64>,
    ) -> Result<AiResponse<Optimization>, GatewayError>;

    async fn analyze(
        &self,
        connection: ConnectionId,
        query: &str,
    ) -> Result<AiResponse<PlanAnalysis>, GatewayError>;

    async fn suggest_indexes(
        &self,
        connection: ConnectionId,
    ) -> Result<AiResponse<IndexAdvice>, GatewayError>;

    async fn analyze_slow_queries(
        &self,
        connection: ConnectionId,
        queries: &[SlowQuery],
    ) -> Result<AiResponse<SlowQueryAnalysis>, GatewayError>;
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn connections(&self) -> Result<Vec<Connection>, GatewayError>;

    async fn create_connection(&self, draft: &ConnectionDraft) -> Result<Connection, GatewayError>;

    async fn update_connection(
        &self,
        id: ConnectionId,
        draft: &ConnectionDraft,
    ) -> Result<Connection, GatewayError>;

    async fn delete_connection(
        &self,
        id: ConnectionId,
        proof: &Confirmed,
    ) -> Result<(), GatewayError>;

    async fn test_connection(&self, id: ConnectionId) -> Result<ConnectionTest, GatewayError>;

    async fn favorites(&self) -> Result<Vec<FavoriteQuery>, GatewayError>;

    /// Returns the id the backend assigned.
    async fn create_favorite(&self, favorite: &FavoriteQuery) -> Result<i64, GatewayError>;

    async fn update_favorite(&self, id: i64, favorite: &FavoriteQuery) -> Result<(), GatewayError>;

    async fn delete_favorite(&self, id: i64, proof: &Confirmed) -> Result<(), GatewayError>;

    async fn history(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<QueryHistoryEntry>, GatewayError>;

    async fn delete_history(&self, id: i64, proof: &Confirmed) -> Result<(), GatewayError>;

    async fn slow_queries(
        &self,
        connection: ConnectionId,
        filter: &SlowQueryFilter,
    ) -> Result<SlowQueryListing, GatewayError>;

    async fn settings(&self) -> Result<Settings, GatewayError>;

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<(), GatewayError>;
}

/// Everything the workspace talks to, behind one bound.
pub trait Gateway: QueryGateway + SchemaGateway + AiGateway + PersistenceGateway {}

impl<T> Gateway for T where T: QueryGateway + SchemaGateway + AiGateway + PersistenceGateway {}

#[cfg(test)]
mod tests {
    use super::GatewayError;

    #[test]
    fn only_non_blank_remote_messages_reach_the_user() {
        let remote = GatewayError::Remote {
            status: Some(400),
            message: "relation \"missing\" does not exist".to_string(),
        };
        assert_eq!(
            remote.user_message("Failed to execute query"),
            "relation \"missing\" does not exist"
        );

        let blank = GatewayError::remote("   ");
        assert_eq!(blank.remote_message(), None);
        assert_eq!(blank.user_message("Failed to execute query"), "Failed to execute query");

        let unreachable = GatewayError::transport("connection refused");
        assert_eq!(
            unreachable.user_message("Failed to execute query"),
            "Failed to execute query"
        );
    }
}
