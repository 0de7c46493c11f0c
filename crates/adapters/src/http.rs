use std::time::Duration;

use async_trait::async_trait;
use pgai_core::autocomplete::AutocompleteData;
use pgai_core::config::ClientConfig;
use pgai_core::confirm::Confirmed;
use pgai_core::connections::{Connection, ConnectionDraft, ConnectionId, ConnectionTest};
use pgai_core::conversations::AiConversation;
use pgai_core::favorites::FavoriteQuery;
use pgai_core::gateway::{
    AiGateway, GatewayError, PersistenceGateway, QueryGateway, SchemaGateway,
};
use pgai_core::health::HealthReport;
use pgai_core::history::{
    QueryHistoryEntry, SlowQuery, SlowQueryAnalysis, SlowQueryFilter, SlowQueryListing,
};
use pgai_core::insights::{
    AiResponse, DebugAdvice, Explanation, GeneratedSql, IndexAdvice, Optimization, PlanAnalysis,
};
use pgai_core::results::QueryResult;
use pgai_core::schema::{ColumnInfo, IndexInfo, TableRef, TableRelations, TableStats};
use pgai_core::settings::{Settings, SettingsUpdate};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum HttpSetupError {
    #[error("invalid gateway url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Talks to the query/AI/persistence backend over its JSON API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http_client: HttpClient,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct FormattedBody {
    formatted: String,
}

#[derive(Debug, Deserialize)]
struct DdlBody {
    ddl: String,
}

#[derive(Debug, Deserialize)]
struct RefreshBody {
    #[serde(default)]
    table_count: usize,
}

#[derive(Debug, Serialize)]
struct ExecuteBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, HttpSetupError> {
        let base_url = parse_base_url(&config.gateway_url)?;
        let mut builder = HttpClient::builder();
        if let Some(seconds) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        Ok(Self {
            http_client: builder.build()?,
            base_url,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::transport(format!("cannot route under {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, GatewayError> {
        let url = self.endpoint(segments)?;
        debug!(%method, path = url.path(), "gateway request");
        Ok(self.http_client.request(method, url))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GatewayError> {
        let response = send(self.request(Method::GET, segments)?).await?;
        decode(response).await
    }

    async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = send(self.request(Method::POST, segments)?.json(body)).await?;
        decode(response).await
    }

    async fn put<B>(&self, segments: &[&str], body: &B) -> Result<(), GatewayError>
    where
        B: Serialize + ?Sized + Sync,
    {
        send(self.request(Method::PUT, segments)?.json(body)).await?;
        Ok(())
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), GatewayError> {
        send(self.request(Method::DELETE, segments)?).await?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, HttpSetupError> {
    let url = Url::parse(raw.trim()).map_err(|error| HttpSetupError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: error.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(HttpSetupError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "url cannot carry a path".to_string(),
        });
    }
    Ok(url)
}

async fn send(request: RequestBuilder) -> Result<Response, GatewayError> {
    let response = request.send().await.map_err(to_gateway_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = remote_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_default();
    warn!(status = status.as_u16(), %message, "gateway request failed");
    Err(GatewayError::Remote {
        status: Some(status.as_u16()),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    response.json::<T>().await.map_err(to_gateway_error)
}

/// `{"error": ...}` when the backend sent one, else the raw body text.
fn remote_message(body: &str) -> Option<String> {
    if let Ok(ErrorBody { error: Some(error) }) = serde_json::from_str::<ErrorBody>(body) {
        return Some(error);
    }
    let trimmed = body.trim();
    (!trimmed.is_empty() && !trimmed.starts_with('{')).then(|| trimmed.to_string())
}

fn to_gateway_error(error: reqwest::Error) -> GatewayError {
    if error.is_decode() {
        GatewayError::decode(error.to_string())
    } else {
        GatewayError::transport(error.to_string())
    }
}

fn slow_query_url(mut url: Url, filter: &SlowQueryFilter) -> Url {
    url.query_pairs_mut()
        .append_pair("min_time", &filter.min_time.to_string())
        .append_pair("limit", &filter.limit.to_string())
        .append_pair("source", filter.source.as_param());
    url
}

fn saved_connection(id: ConnectionId, draft: &ConnectionDraft) -> Connection {
    Connection {
        id,
        name: draft.name.clone(),
        host: draft.host.clone(),
        port: draft.port,
        database: draft.database.clone(),
        username: draft.username.clone(),
        password: None,
        ssl_enabled: draft.ssl_enabled,
        color: draft.color.clone(),
        created_at: None,
        last_used: None,
    }
}

#[async_trait]
impl QueryGateway for HttpGateway {
    async fn execute(
        &self,
        connection: ConnectionId,
        sql: &str,
        row_limit: Option<u32>,
    ) -> Result<QueryResult, GatewayError> {
        let id = connection.to_string();
        self.post(
            &["connections", &id, "query"],
            &ExecuteBody {
                query: sql,
                limit: row_limit,
            },
        )
        .await
    }

    async fn format_sql(&self, connection: ConnectionId, sql: &str) -> Result<String, GatewayError> {
        let id = connection.to_string();
        let body: FormattedBody = self
            .post(&["connections", &id, "format-sql"], &json!({ "query": sql }))
            .await?;
        Ok(body.formatted)
    }
}

#[async_trait]
impl SchemaGateway for HttpGateway {
    async fn tables(&self, connection: ConnectionId) -> Result<Vec<TableRef>, GatewayError> {
        self.get(&["connections", &connection.to_string(), "tables"])
            .await
    }

    async fn columns(
        &self,
        connection: ConnectionId,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, GatewayError> {
        self.get(&["connections", &connection.to_string(), "tables", table, "columns"])
            .await
    }

    async fn indexes(
        &self,
        connection: ConnectionId,
        table: &str,
    ) -> Result<Vec<IndexInfo>, GatewayError> {
        self.get(&["connections", &connection.to_string(), "tables", table, "indexes"])
            .await
    }

    async fn ddl(&self, connection: ConnectionId, table: &str) -> Result<String, GatewayError> {
        let body: DdlBody = self
            .get(&["connections", &connection.to_string(), "tables", table, "ddl"])
            .await?;
        Ok(body.ddl)
    }

    async fn relations(
        &self,
        connection: ConnectionId,
        table: &str,
    ) -> Result<TableRelations, GatewayError> {
        self.get(&["connections", &connection.to_string(), "tables", table, "relations"])
            .await
    }

    async fn table_stats(
        &self,
        connection: ConnectionId,
        table: &str,
    ) -> Result<TableStats, GatewayError> {
        self.get(&["connections", &connection.to_string(), "tables", table, "stats"])
            .await
    }

    async fn autocomplete(
        &self,
        connection: ConnectionId,
    ) -> Result<AutocompleteData, GatewayError> {
        self.get(&["connections", &connection.to_string(), "autocomplete"])
            .await
    }

    async fn refresh_schema(&self, connection: ConnectionId) -> Result<usize, GatewayError> {
        let body: RefreshBody = self
            .post(
                &["connections", &connection.to_string(), "refresh-schema"],
                &json!({}),
            )
            .await?;
        Ok(body.table_count)
    }

    async fn health(&self, connection: ConnectionId) -> Result<HealthReport, GatewayError> {
        self.get(&["connections", &connection.to_string(), "health"])
            .await
    }
}

#[async_trait]
impl AiGateway for HttpGateway {
    async fn generate_sql(
        &self,
        connection: ConnectionId,
        prompt: &str,
    ) -> Result<AiResponse<GeneratedSql>, GatewayError> {
        self.post(
            &["ai", "generate-sql"],
            &json!({ "prompt": prompt, "connection_id": connection }),
        )
        .await
    }

    async fn conversations(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<AiConversation>, GatewayError> {
        self.get(&["ai", "conversations", &connection.to_string()])
            .await
    }

    async fn delete_conversation(
        &self,
        conversation: i64,
        _proof: &Confirmed,
    ) -> Result<(), GatewayError> {
        self.delete(&["ai", "conversations", &conversation.to_string()])
            .await
    }

    async fn explain(
        &self,
        connection: ConnectionId,
        query: &str,
    ) -> Result<AiResponse<Explanation>, GatewayError> {
        self.post(
            &["ai", "explain-query"],
            &json!({ "query": query, "connection_id": connection }),
        )
        .await
    }

    async fn debug(
        &self,
        connection: ConnectionId,
        query: &str,
        error: &str,
    ) -> Result<AiResponse<DebugAdvice>, GatewayError> {
        self.post(
            &["ai", "debug-query"],
            &json!({ "query": query, "error": error, "connection_id": connection }),
        )
        .await
    }

    async fn optimize(
        &self,
        connection: ConnectionId,
        query: &str,
        execution_time: Option<f64>,
    ) -> Result<AiResponse<Optimization>, GatewayError> {
        self.post(
            &["ai", "optimize-query"],
            &json!({
                "query": query,
                "connection_id": connection,
                "execution_time": execution_time,
            }),
        )
        .await
    }

    async fn analyze(
        &self,
        connection: ConnectionId,
        query: &str,
    ) -> Result<AiResponse<PlanAnalysis>, GatewayError> {
        self.post(
            &["ai", "analyze-explain"],
            &json!({ "query": query, "connection_id": connection }),
        )
        .await
    }

    async fn suggest_indexes(
        &self,
        connection: ConnectionId,
    ) -> Result<AiResponse<IndexAdvice>, GatewayError> {
        self.post(
            &["ai", "suggest-indexes"],
            &json!({ "connection_id": connection }),
        )
        .await
    }

    async fn analyze_slow_queries(
        &self,
        connection: ConnectionId,
        queries: &[SlowQuery],
    ) -> Result<AiResponse<SlowQueryAnalysis>, GatewayError> {
        self.post(
            &["ai", "analyze-slow-queries"],
            &json!({ "queries": queries, "connection_id": connection }),
        )
        .await
    }
}

#[async_trait]
impl PersistenceGateway for HttpGateway {
    async fn connections(&self) -> Result<Vec<Connection>, GatewayError> {
        self.get(&["connections"]).await
    }

    async fn create_connection(&self, draft: &ConnectionDraft) -> Result<Connection, GatewayError> {
        let created: CreatedBody = self.post(&["connections"], draft).await?;
        Ok(saved_connection(ConnectionId(created.id), draft))
    }

    async fn update_connection(
        &self,
        id: ConnectionId,
        draft: &ConnectionDraft,
    ) -> Result<Connection, GatewayError> {
        self.put(&["connections", &id.to_string()], draft).await?;
        Ok(saved_connection(id, draft))
    }

    async fn delete_connection(
        &self,
        id: ConnectionId,
        _proof: &Confirmed,
    ) -> Result<(), GatewayError> {
        self.delete(&["connections", &id.to_string()]).await
    }

    async fn test_connection(&self, id: ConnectionId) -> Result<ConnectionTest, GatewayError> {
        self.post(&["connections", &id.to_string(), "test"], &json!({}))
            .await
    }

    async fn favorites(&self) -> Result<Vec<FavoriteQuery>, GatewayError> {
        self.get(&["favorites"]).await
    }

    async fn create_favorite(&self, favorite: &FavoriteQuery) -> Result<i64, GatewayError> {
        let created: CreatedBody = self.post(&["favorites"], favorite).await?;
        Ok(created.id)
    }

    async fn update_favorite(&self, id: i64, favorite: &FavoriteQuery) -> Result<(), GatewayError> {
        self.put(&["favorites", &id.to_string()], favorite).await
    }

    async fn delete_favorite(&self, id: i64, _proof: &Confirmed) -> Result<(), GatewayError> {
        self.delete(&["favorites", &id.to_string()]).await
    }

    async fn history(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<QueryHistoryEntry>, GatewayError> {
        self.get(&["history", &connection.to_string()]).await
    }

    async fn delete_history(&self, id: i64, _proof: &Confirmed) -> Result<(), GatewayError> {
        self.delete(&["history", &id.to_string()]).await
    }

    async fn slow_queries(
        &self,
        connection: ConnectionId,
        filter: &SlowQueryFilter,
    ) -> Result<SlowQueryListing, GatewayError> {
        let url = slow_query_url(
            self.endpoint(&["connections", &connection.to_string(), "slow-queries"])?,
            filter,
        );
        debug!(path = url.path(), "gateway request");
        let response = send(self.http_client.get(url)).await?;
        decode(response).await
    }

    async fn settings(&self) -> Result<Settings, GatewayError> {
        self.get(&["settings"]).await
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<(), GatewayError> {
        self.put(&["settings"], update).await
    }
}
