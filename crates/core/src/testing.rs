use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::autocomplete::AutocompleteData;
use crate::confirm::Confirmed;
use crate::connections::{Connection, ConnectionDraft, ConnectionId, ConnectionTest};
use crate::conversations::AiConversation;
use crate::favorites::FavoriteQuery;
use crate::gateway::{AiGateway, GatewayError, PersistenceGateway, QueryGateway, SchemaGateway};
use crate::health::HealthReport;
use crate::history::{
    QueryAnalysis, QueryHistoryEntry, SlowQuery, SlowQueryAnalysis, SlowQueryFilter,
    SlowQueryListing,
};
use crate::insights::{
    AiResponse, DebugAdvice, Explanation, GeneratedSql, IndexAdvice, IndexRecommendation,
    Optimization, PlanAnalysis,
};
use crate::results::QueryResult;
use crate::schema::{ColumnInfo, IndexInfo, TableRef, TableRelations, TableStats};
use crate::settings::{Settings, SettingsUpdate};

pub(crate) fn sample_conversation(id: i64, prompt: &str, sql: &str) -> AiConversation {
    AiConversation {
        id,
        connection_id: ConnectionId(1),
        user_prompt: prompt.to_string(),
        generated_sql: sql.to_string(),
        created_at: format!("2024-05-0{}T10:00:00Z", id.clamp(1, 9)),
    }
}

pub(crate) fn sample_slow_query(id: i64) -> SlowQuery {
    SlowQuery {
        id,
        query: format!("SELECT * FROM events WHERE id > {id}"),
        execution_time: 2.5,
        executed_at: "2024-05-01 10:00:00".to_string(),
        calls: None,
        total_time: None,
        max_time: None,
        min_time: None,
        total_rows: None,
        source: Some("application_history".to_string()),
    }
}

fn select_one() -> QueryResult {
    let mut row = serde_json::Map::new();
    row.insert("?column?".to_string(), json!(1));
    QueryResult {
        success: true,
        columns: vec!["?column?".to_string()],
        rows: vec![row],
        row_count: Some(1),
        execution_time: Some(0.01),
        error: None,
        message: None,
    }
}

fn default_autocomplete() -> AutocompleteData {
    AutocompleteData {
        tables: vec!["users".to_string(), "orders".to_string()],
        columns: BTreeMap::from([
            (
                "users".to_string(),
                vec!["id".to_string(), "email".to_string()],
            ),
            (
                "orders".to_string(),
                vec!["id".to_string(), "user_id".to_string()],
            ),
        ]),
        keywords: Vec::new(),
    }
}

/// Scripted stand-in for the backend. Unscripted calls answer with a small,
/// consistent `users`/`orders` database.
#[derive(Debug, Default)]
pub(crate) struct FakeGateway {
    executions: Mutex<VecDeque<Result<QueryResult, GatewayError>>>,
    executed_sql: Mutex<Vec<String>>,
    last_row_limit: Mutex<Option<Option<u32>>>,
    format_failure: Mutex<Option<GatewayError>>,
    ddl_failure: Mutex<Option<GatewayError>>,
    refresh_failure: Mutex<Option<GatewayError>>,
    autocomplete_script: Mutex<Option<AutocompleteData>>,
    autocomplete_loads: AtomicUsize,
    ai_failure: Mutex<Option<GatewayError>>,
    ai_calls: AtomicUsize,
    generations: Mutex<VecDeque<AiResponse<GeneratedSql>>>,
    slow_analyses: Mutex<VecDeque<AiResponse<SlowQueryAnalysis>>>,
    last_optimize_time: Mutex<Option<f64>>,
    conversations: Mutex<Vec<AiConversation>>,
    conversations_failure: Mutex<Option<GatewayError>>,
    conversation_loads: AtomicUsize,
    connections: Mutex<Vec<Connection>>,
    favorites: Mutex<Vec<FavoriteQuery>>,
    favorite_failure: Mutex<Option<GatewayError>>,
    deletions: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub(crate) fn script_execute(&self, outcome: Result<QueryResult, GatewayError>) {
        self.executions
            .lock()
            .expect("executions lock")
            .push_back(outcome);
    }

    pub(crate) fn executed_sql(&self) -> Vec<String> {
        self.executed_sql.lock().expect("executed sql lock").clone()
    }

    pub(crate) fn last_row_limit(&self) -> Option<Option<u32>> {
        *self.last_row_limit.lock().expect("row limit lock")
    }

    pub(crate) fn fail_format(&self, error: GatewayError) {
        *self.format_failure.lock().expect("format lock") = Some(error);
    }

    pub(crate) fn fail_ddl(&self, error: GatewayError) {
        *self.ddl_failure.lock().expect("ddl lock") = Some(error);
    }

    pub(crate) fn fail_refresh(&self, error: GatewayError) {
        *self.refresh_failure.lock().expect("refresh lock") = Some(error);
    }

    pub(crate) fn script_autocomplete(&self, data: AutocompleteData) {
        *self.autocomplete_script.lock().expect("autocomplete lock") = Some(data);
    }

    pub(crate) fn autocomplete_loads(&self) -> usize {
        self.autocomplete_loads.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_ai(&self, error: GatewayError) {
        *self.ai_failure.lock().expect("ai lock") = Some(error);
    }

    pub(crate) fn ai_calls(&self) -> usize {
        self.ai_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn script_generate(&self, response: AiResponse<GeneratedSql>) {
        self.generations
            .lock()
            .expect("generations lock")
            .push_back(response);
    }

    pub(crate) fn script_slow_analysis(&self, response: AiResponse<SlowQueryAnalysis>) {
        self.slow_analyses
            .lock()
            .expect("slow analyses lock")
            .push_back(response);
    }

    pub(crate) fn last_optimize_time(&self) -> Option<f64> {
        *self.last_optimize_time.lock().expect("optimize lock")
    }

    pub(crate) fn script_conversations(&self, conversations: Vec<AiConversation>) {
        *self.conversations.lock().expect("conversations lock") = conversations;
    }

    pub(crate) fn fail_conversations(&self, error: GatewayError) {
        *self
            .conversations_failure
            .lock()
            .expect("conversations failure lock") = Some(error);
    }

    pub(crate) fn conversation_loads(&self) -> usize {
        self.conversation_loads.load(Ordering::SeqCst)
    }

    pub(crate) fn script_connections(&self, connections: Vec<Connection>) {
        *self.connections.lock().expect("connections lock") = connections;
    }

    pub(crate) fn fail_favorites(&self, error: GatewayError) {
        *self.favorite_failure.lock().expect("favorite failure lock") = Some(error);
    }

    pub(crate) fn saved_favorites(&self) -> Vec<FavoriteQuery> {
        self.favorites.lock().expect("favorites lock").clone()
    }

    /// Destructive calls in issue order, e.g. `connection:2`.
    pub(crate) fn deletions(&self) -> Vec<String> {
        self.deletions.lock().expect("deletions lock").clone()
    }

    fn record_deletion(&self, entry: String) {
        self.deletions.lock().expect("deletions lock").push(entry);
    }

    fn ai_call(&self) -> Result<(), GatewayError> {
        self.ai_calls.fetch_add(1, Ordering::SeqCst);
        match self.ai_failure.lock().expect("ai lock").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn scripted_failure(slot: &Mutex<Option<GatewayError>>) -> Result<(), GatewayError> {
    match slot.lock().expect("failure lock").clone() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[async_trait]
impl QueryGateway for FakeGateway {
    async fn execute(
        &self,
        _connection: ConnectionId,
        sql: &str,
        row_limit: Option<u32>,
    ) -> Result<QueryResult, GatewayError> {
        self.executed_sql
            .lock()
            .expect("executed sql lock")
            .push(sql.to_string());
        *self.last_row_limit.lock().expect("row limit lock") = Some(row_limit);
        self.executions
            .lock()
            .expect("executions lock")
            .pop_front()
            .unwrap_or_else(|| Ok(select_one()))
    }

    async fn format_sql(&self, _connection: ConnectionId, sql: &str) -> Result<String, GatewayError> {
        scripted_failure(&self.format_failure)?;
        Ok(sql.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

#[async_trait]
impl SchemaGateway for FakeGateway {
    async fn tables(&self, _connection: ConnectionId) -> Result<Vec<TableRef>, GatewayError> {
        Ok(["orders", "users"]
            .into_iter()
            .map(|name| TableRef {
                schema: "public".to_string(),
                name: name.to_string(),
                table_type: "BASE TABLE".to_string(),
            })
            .collect())
    }

    async fn columns(
        &self,
        _connection: ConnectionId,
        _table: &str,
    ) -> Result<Vec<ColumnInfo>, GatewayError> {
        Ok(vec![
            ColumnInfo {
                name: "id".to_string(),
                data_type: "integer".to_string(),
                is_nullable: "NO".to_string(),
                default_value: Some("nextval('users_id_seq'::regclass)".to_string()),
                max_length: None,
                is_primary_key: true,
            },
            ColumnInfo {
                name: "email".to_string(),
                data_type: "character varying".to_string(),
                is_nullable: "YES".to_string(),
                default_value: None,
                max_length: Some(255),
                is_primary_key: false,
            },
        ])
    }

    async fn indexes(
        &self,
        _connection: ConnectionId,
        table: &str,
    ) -> Result<Vec<IndexInfo>, GatewayError> {
        Ok(vec![IndexInfo {
            name: format!("{table}_pkey"),
            definition: format!("CREATE UNIQUE INDEX {table}_pkey ON public.{table} USING btree (id)"),
        }])
    }

    async fn ddl(&self, _connection: ConnectionId, table: &str) -> Result<String, GatewayError> {
        scripted_failure(&self.ddl_failure)?;
        Ok(format!(
            "CREATE TABLE {table} (\n    id integer NOT NULL,\n    email character varying(255)\n);"
        ))
    }

    async fn relations(
        &self,
        _connection: ConnectionId,
        _table: &str,
    ) -> Result<TableRelations, GatewayError> {
        Ok(TableRelations::default())
    }

    async fn table_stats(
        &self,
        _connection: ConnectionId,
        _table: &str,
    ) -> Result<TableStats, GatewayError> {
        Ok(TableStats {
            row_count: 42,
            size: "16 kB".to_string(),
        })
    }

    async fn autocomplete(
        &self,
        _connection: ConnectionId,
    ) -> Result<AutocompleteData, GatewayError> {
        self.autocomplete_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .autocomplete_script
            .lock()
            .expect("autocomplete lock")
            .clone()
            .unwrap_or_else(default_autocomplete))
    }

    async fn refresh_schema(&self, _connection: ConnectionId) -> Result<usize, GatewayError> {
        scripted_failure(&self.refresh_failure)?;
        Ok(default_autocomplete().tables.len())
    }

    async fn health(&self, _connection: ConnectionId) -> Result<HealthReport, GatewayError> {
        serde_json::from_value(json!({})).map_err(|error| GatewayError::decode(error.to_string()))
    }
}

#[async_trait]
impl AiGateway for FakeGateway {
    async fn generate_sql(
        &self,
        _connection: ConnectionId,
        _prompt: &str,
    ) -> Result<AiResponse<GeneratedSql>, GatewayError> {
        self.ai_call()?;
        Ok(self
            .generations
            .lock()
            .expect("generations lock")
            .pop_front()
            .unwrap_or_else(|| {
                AiResponse::ok(GeneratedSql {
                    sql: "SELECT count(*) FROM users;".to_string(),
                })
            }))
    }

    async fn conversations(
        &self,
        _connection: ConnectionId,
    ) -> Result<Vec<AiConversation>, GatewayError> {
        self.conversation_loads.fetch_add(1, Ordering::SeqCst);
        scripted_failure(&self.conversations_failure)?;
        Ok(self.conversations.lock().expect("conversations lock").clone())
    }

    async fn delete_conversation(
        &self,
        conversation: i64,
        _proof: &Confirmed,
    ) -> Result<(), GatewayError> {
        self.record_deletion(format!("conversation:{conversation}"));
        Ok(())
    }

    async fn explain(
        &self,
        _connection: ConnectionId,
        _query: &str,
    ) -> Result<AiResponse<Explanation>, GatewayError> {
        self.ai_call()?;
        Ok(AiResponse::ok(Explanation {
            explanation: "Returns every user.".to_string(),
        }))
    }

    async fn debug(
        &self,
        _connection: ConnectionId,
        _query: &str,
        _error: &str,
    ) -> Result<AiResponse<DebugAdvice>, GatewayError> {
        self.ai_call()?;
        Ok(AiResponse::ok(DebugAdvice {
            fixed_query: Some("SELECT * FROM users".to_string()),
            explanation: "The table is called users.".to_string(),
        }))
    }

    async fn optimize(
        &self,
        _connection: ConnectionId,
        _query: &str,
        execution_time: Option<f64>,
    ) -> Result<AiResponse<Optimization>, GatewayError> {
        self.ai_call()?;
        *self.last_optimize_time.lock().expect("optimize lock") = execution_time;
        Ok(AiResponse::ok(Optimization {
            original_query: "SELECT  1".to_string(),
            optimized_query: Some("SELECT 1".to_string()),
            suggestions: vec!["Remove redundant whitespace".to_string()],
            explanation: String::new(),
        }))
    }

    async fn analyze(
        &self,
        _connection: ConnectionId,
        _query: &str,
    ) -> Result<AiResponse<PlanAnalysis>, GatewayError> {
        self.ai_call()?;
        Ok(AiResponse::ok(PlanAnalysis {
            summary: "Sequential scan on users".to_string(),
            bottlenecks: vec!["Seq Scan on users".to_string()],
            ..PlanAnalysis::default()
        }))
    }

    async fn suggest_indexes(
        &self,
        _connection: ConnectionId,
    ) -> Result<AiResponse<IndexAdvice>, GatewayError> {
        self.ai_call()?;
        Ok(AiResponse::ok(IndexAdvice {
            recommendations: vec![IndexRecommendation {
                table: Some("orders".to_string()),
                columns: vec!["user_id".to_string()],
                reason: "Frequent joins on user_id".to_string(),
                create_statement: Some(
                    "CREATE INDEX idx_orders_user_id ON orders (user_id);".to_string(),
                ),
            }],
            analyzed_queries: Some(12),
        }))
    }

    async fn analyze_slow_queries(
        &self,
        _connection: ConnectionId,
        queries: &[SlowQuery],
    ) -> Result<AiResponse<SlowQueryAnalysis>, GatewayError> {
        self.ai_call()?;
        if let Some(scripted) = self
            .slow_analyses
            .lock()
            .expect("slow analyses lock")
            .pop_front()
        {
            return Ok(scripted);
        }
        let analyses = (1..=queries.len())
            .map(|number| QueryAnalysis {
                query_number: u32::try_from(number).unwrap_or(u32::MAX),
                issues: vec!["Sequential scan".to_string()],
                ..QueryAnalysis::default()
            })
            .collect();
        Ok(AiResponse::ok(SlowQueryAnalysis {
            analyses,
            summary: "Add indexes on filter columns.".to_string(),
            query_count: queries.len(),
        }))
    }
}

#[async_trait]
impl PersistenceGateway for FakeGateway {
    async fn connections(&self) -> Result<Vec<Connection>, GatewayError> {
        Ok(self.connections.lock().expect("connections lock").clone())
    }

    async fn create_connection(&self, draft: &ConnectionDraft) -> Result<Connection, GatewayError> {
        let mut connections = self.connections.lock().expect("connections lock");
        let id = connections
            .iter()
            .map(|connection| connection.id.0)
            .max()
            .unwrap_or(0)
            + 1;
        let connection = Connection {
            id: ConnectionId(id),
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
        };
        connections.push(connection.clone());
        Ok(connection)
    }

    async fn update_connection(
        &self,
        id: ConnectionId,
        draft: &ConnectionDraft,
    ) -> Result<Connection, GatewayError> {
        let mut connections = self.connections.lock().expect("connections lock");
        let connection = connections
            .iter_mut()
            .find(|connection| connection.id == id)
            .ok_or_else(|| GatewayError::remote("Connection not found"))?;
        connection.name = draft.name.clone();
        connection.host = draft.host.clone();
        connection.port = draft.port;
        connection.database = draft.database.clone();
        connection.username = draft.username.clone();
        connection.ssl_enabled = draft.ssl_enabled;
        connection.color = draft.color.clone();
        Ok(connection.clone())
    }

    async fn delete_connection(
        &self,
        id: ConnectionId,
        _proof: &Confirmed,
    ) -> Result<(), GatewayError> {
        self.connections
            .lock()
            .expect("connections lock")
            .retain(|connection| connection.id != id);
        self.record_deletion(format!("connection:{id}"));
        Ok(())
    }

    async fn test_connection(&self, _id: ConnectionId) -> Result<ConnectionTest, GatewayError> {
        Ok(ConnectionTest {
            success: true,
            message: "Connection successful".to_string(),
        })
    }

    async fn favorites(&self) -> Result<Vec<FavoriteQuery>, GatewayError> {
        scripted_failure(&self.favorite_failure)?;
        Ok(self.favorites.lock().expect("favorites lock").clone())
    }

    async fn create_favorite(&self, favorite: &FavoriteQuery) -> Result<i64, GatewayError> {
        scripted_failure(&self.favorite_failure)?;
        let mut favorites = self.favorites.lock().expect("favorites lock");
        let id = 100 + i64::try_from(favorites.len()).unwrap_or(0);
        favorites.push(FavoriteQuery {
            id: Some(id),
            ..favorite.clone()
        });
        Ok(id)
    }

    async fn update_favorite(&self, id: i64, favorite: &FavoriteQuery) -> Result<(), GatewayError> {
        scripted_failure(&self.favorite_failure)?;
        let mut favorites = self.favorites.lock().expect("favorites lock");
        if let Some(existing) = favorites.iter_mut().find(|existing| existing.id == Some(id)) {
            *existing = FavoriteQuery {
                id: Some(id),
                ..favorite.clone()
            };
        }
        Ok(())
    }

    async fn delete_favorite(&self, id: i64, _proof: &Confirmed) -> Result<(), GatewayError> {
        self.favorites
            .lock()
            .expect("favorites lock")
            .retain(|favorite| favorite.id != Some(id));
        self.record_deletion(format!("favorite:{id}"));
        Ok(())
    }

    async fn history(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<QueryHistoryEntry>, GatewayError> {
        Ok(vec![QueryHistoryEntry {
            id: 1,
            connection_id: connection,
            query: "SELECT * FROM users".to_string(),
            execution_time: 0.02,
            executed_at: "2024-05-01 10:00:00".to_string(),
        }])
    }

    async fn delete_history(&self, id: i64, _proof: &Confirmed) -> Result<(), GatewayError> {
        self.record_deletion(format!("history:{id}"));
        Ok(())
    }

    async fn slow_queries(
        &self,
        _connection: ConnectionId,
        filter: &SlowQueryFilter,
    ) -> Result<SlowQueryListing, GatewayError> {
        Ok(SlowQueryListing {
            queries: vec![sample_slow_query(1)],
            source: filter.source.as_param().to_string(),
            sources_available: vec!["application_history".to_string()],
        })
    }

    async fn settings(&self) -> Result<Settings, GatewayError> {
        Ok(Settings::default())
    }

    async fn update_settings(&self, _update: &SettingsUpdate) -> Result<(), GatewayError> {
        Ok(())
    }
}
