use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::connections::ConnectionId;
use crate::gateway::{AiGateway, GatewayError};
use crate::tabs::{InsertMode, QueryTab, TabId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiAction {
    Generate,
    Explain,
    Debug,
    Optimize,
    Analyze,
    Indexes,
    SlowQueries,
}

impl AiAction {
    #[must_use]
    pub fn failure_label(self) -> &'static str {
        match self {
            Self::Generate => "Failed to generate SQL",
            Self::Explain => "Failed to explain query",
            Self::Debug => "Failed to debug query",
            Self::Optimize => "Failed to optimize query",
            Self::Analyze => "Failed to analyze query",
            Self::Indexes => "Failed to suggest indexes",
            Self::SlowQueries => "Failed to analyze slow queries",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Generate => "Generated SQL",
            Self::Explain => "Query Explanation",
            Self::Debug => "Query Debug",
            Self::Optimize => "Query Optimization",
            Self::Analyze => "Execution Plan Analysis",
            Self::Indexes => "Index Recommendations",
            Self::SlowQueries => "Slow Query Analysis",
        }
    }
}

impl fmt::Display for AiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// The `{success, ..., error}` envelope every AI endpoint answers with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> AiResponse<T> {
    #[must_use]
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            error: None,
            payload,
        }
    }

    pub fn into_result(self, action: AiAction) -> Result<T, InsightError> {
        if self.success {
            return Ok(self.payload);
        }
        Err(InsightError::from_message(action, self.error.as_deref()))
    }
}

impl<T: Default> AiResponse<T> {
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            payload: T::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct GeneratedSql {
    #[serde(default)]
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Explanation {
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DebugAdvice {
    #[serde(default)]
    pub fixed_query: Option<String>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Optimization {
    #[serde(default)]
    pub original_query: String,
    #[serde(default)]
    pub optimized_query: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

impl Optimization {
    /// The rewrite, if the model actually changed something.
    #[must_use]
    pub fn rewrite(&self) -> Option<&str> {
        self.optimized_query
            .as_deref()
            .filter(|optimized| !optimized.trim().is_empty() && *optimized != self.original_query)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PlanAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub bottlenecks: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub plan_text: Option<String>,
    #[serde(default)]
    pub plan_json: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct IndexRecommendation {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub create_statement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct IndexAdvice {
    #[serde(default)]
    pub recommendations: Vec<IndexRecommendation>,
    #[serde(default)]
    pub analyzed_queries: Option<u32>,
}

impl IndexAdvice {
    #[must_use]
    pub fn create_statements(&self) -> Vec<&str> {
        self.recommendations
            .iter()
            .filter_map(|recommendation| recommendation.create_statement.as_deref())
            .filter(|statement| !statement.trim().is_empty())
            .collect()
    }
}

/// One normalized AI answer, whatever action produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum AiInsight {
    Generated { prompt: String, sql: String },
    Explanation(Explanation),
    Debug(DebugAdvice),
    Optimization(Optimization),
    PlanAnalysis(PlanAnalysis),
    Indexes(IndexAdvice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlInsertion {
    pub sql: String,
    pub mode: InsertMode,
}

impl AiInsight {
    #[must_use]
    pub fn action(&self) -> AiAction {
        match self {
            Self::Generated { .. } => AiAction::Generate,
            Self::Explanation(_) => AiAction::Explain,
            Self::Debug(_) => AiAction::Debug,
            Self::Optimization(_) => AiAction::Optimize,
            Self::PlanAnalysis(_) => AiAction::Analyze,
            Self::Indexes(_) => AiAction::Indexes,
        }
    }

    /// SQL the user can push back into the originating tab, and how.
    #[must_use]
    pub fn insertable_sql(&self) -> Option<SqlInsertion> {
        let (sql, mode) = match self {
            Self::Generated { sql, .. } => (sql.clone(), InsertMode::Append),
            Self::Debug(advice) => (advice.fixed_query.clone()?, InsertMode::Replace),
            Self::Optimization(optimization) => {
                (optimization.rewrite()?.to_string(), InsertMode::Replace)
            }
            Self::Indexes(advice) => (advice.create_statements().join("\n"), InsertMode::Append),
            Self::Explanation(_) | Self::PlanAnalysis(_) => return None,
        };
        if sql.trim().is_empty() {
            return None;
        }
        Some(SqlInsertion { sql, mode })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsightError {
    #[error("{label}: {message}", label = .action.failure_label())]
    Rejected { action: AiAction, message: String },
    #[error("{label}", label = .action.failure_label())]
    Unavailable { action: AiAction },
}

impl InsightError {
    fn from_message(action: AiAction, message: Option<&str>) -> Self {
        match message.map(str::trim).filter(|message| !message.is_empty()) {
            Some(message) => Self::Rejected {
                action,
                message: message.to_string(),
            },
            None => Self::Unavailable { action },
        }
    }

    #[must_use]
    pub fn from_gateway(action: AiAction, error: &GatewayError) -> Self {
        match error {
            GatewayError::Remote { .. } => Self::from_message(action, error.remote_message()),
            GatewayError::Transport(_) | GatewayError::Decode(_) => Self::Rejected {
                action,
                message: error.to_string(),
            },
        }
    }

    #[must_use]
    pub fn action(&self) -> AiAction {
        match self {
            Self::Rejected { action, .. } | Self::Unavailable { action } => *action,
        }
    }
}

/// A content- or connection-bound AI request, already validated.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightRequest {
    Explain { query: String },
    Debug { query: String, error: String },
    Optimize { query: String, execution_time: Option<f64> },
    Analyze { query: String },
    Indexes,
}

impl InsightRequest {
    /// Builds the request from a tab, or `None` when the action has nothing
    /// to work on (blank content, or nothing to debug).
    #[must_use]
    pub fn from_tab(action: AiAction, tab: &QueryTab) -> Option<Self> {
        let query = tab.content();
        if action != AiAction::Indexes && query.trim().is_empty() {
            return None;
        }
        let query = query.to_string();
        match action {
            AiAction::Explain => Some(Self::Explain { query }),
            AiAction::Debug => tab.last_error().map(|error| Self::Debug {
                query,
                error: error.to_string(),
            }),
            AiAction::Optimize => Some(Self::Optimize {
                query,
                execution_time: tab.last_execution_time(),
            }),
            AiAction::Analyze => Some(Self::Analyze { query }),
            AiAction::Indexes => Some(Self::Indexes),
            AiAction::Generate | AiAction::SlowQueries => None,
        }
    }

    #[must_use]
    pub fn action(&self) -> AiAction {
        match self {
            Self::Explain { .. } => AiAction::Explain,
            Self::Debug { .. } => AiAction::Debug,
            Self::Optimize { .. } => AiAction::Optimize,
            Self::Analyze { .. } => AiAction::Analyze,
            Self::Indexes => AiAction::Indexes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InsightState {
    #[default]
    Idle,
    Displaying { origin: TabId, insight: AiInsight },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsightTicket {
    pub origin: TabId,
    pub action: AiAction,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightOutcome {
    Displayed,
    /// A newer insight request was issued meanwhile.
    Stale,
    Failed(InsightError),
}

/// The workspace-wide single insight slot.
#[derive(Debug, Default)]
pub struct InsightSlot {
    state: InsightState,
    generation: u64,
    requesting: Option<AiAction>,
}

impl InsightSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &InsightState {
        &self.state
    }

    #[must_use]
    pub fn displayed(&self) -> Option<&AiInsight> {
        match &self.state {
            InsightState::Displaying { insight, .. } => Some(insight),
            InsightState::Idle => None,
        }
    }

    #[must_use]
    pub fn requesting(&self) -> Option<AiAction> {
        self.requesting
    }

    pub fn begin(&mut self, origin: TabId, action: AiAction) -> InsightTicket {
        self.generation += 1;
        self.requesting = Some(action);
        InsightTicket {
            origin,
            action,
            generation: self.generation,
        }
    }

    pub fn complete(
        &mut self,
        ticket: InsightTicket,
        outcome: Result<AiInsight, InsightError>,
    ) -> InsightOutcome {
        if ticket.generation != self.generation {
            debug!(action = ?ticket.action, "discarding superseded insight response");
            return InsightOutcome::Stale;
        }
        self.requesting = None;

        match outcome {
            Ok(insight) => {
                self.state = InsightState::Displaying {
                    origin: ticket.origin,
                    insight,
                };
                InsightOutcome::Displayed
            }
            Err(error) => {
                warn!(action = ?ticket.action, %error, "insight request failed");
                InsightOutcome::Failed(error)
            }
        }
    }

    pub fn dismiss(&mut self) {
        self.state = InsightState::Idle;
    }

    /// Takes the displayed insight's SQL and dismisses it. Insights with
    /// nothing to insert stay on screen.
    pub fn take_insertion(&mut self) -> Option<(TabId, SqlInsertion)> {
        let InsightState::Displaying { origin, insight } = &self.state else {
            return None;
        };
        let insertion = insight.insertable_sql()?;
        let origin = *origin;
        self.state = InsightState::Idle;
        Some((origin, insertion))
    }

    /// Drops the displayed insight and orphans any request in flight.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.requesting = None;
        self.state = InsightState::Idle;
    }
}

pub struct InsightOrchestrator<'g, G: AiGateway + ?Sized> {
    gateway: &'g G,
}

impl<'g, G: AiGateway + ?Sized> InsightOrchestrator<'g, G> {
    #[must_use]
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    pub async fn run(
        &self,
        connection: ConnectionId,
        request: &InsightRequest,
    ) -> Result<AiInsight, InsightError> {
        let action = request.action();
        debug!(?action, %connection, "requesting insight");
        let reject = |error: GatewayError| InsightError::from_gateway(action, &error);

        match request {
            InsightRequest::Explain { query } => {
                let response = self.gateway.explain(connection, query).await.map_err(reject)?;
                response.into_result(action).map(AiInsight::Explanation)
            }
            InsightRequest::Debug { query, error } => {
                let response = self
                    .gateway
                    .debug(connection, query, error)
                    .await
                    .map_err(reject)?;
                response.into_result(action).map(AiInsight::Debug)
            }
            InsightRequest::Optimize {
                query,
                execution_time,
            } => {
                let response = self
                    .gateway
                    .optimize(connection, query, *execution_time)
                    .await
                    .map_err(reject)?;
                response.into_result(action).map(AiInsight::Optimization)
            }
            InsightRequest::Analyze { query } => {
                let response = self.gateway.analyze(connection, query).await.map_err(reject)?;
                response.into_result(action).map(AiInsight::PlanAnalysis)
            }
            InsightRequest::Indexes => {
                let response = self
                    .gateway
                    .suggest_indexes(connection)
                    .await
                    .map_err(reject)?;
                response.into_result(action).map(AiInsight::Indexes)
            }
        }
    }

    pub async fn generate(
        &self,
        connection: ConnectionId,
        prompt: &str,
    ) -> Result<AiInsight, InsightError> {
        let action = AiAction::Generate;
        let generated = self
            .gateway
            .generate_sql(connection, prompt)
            .await
            .map_err(|error| InsightError::from_gateway(action, &error))?
            .into_result(action)?;
        if generated.sql.trim().is_empty() {
            return Err(InsightError::Unavailable { action });
        }
        Ok(AiInsight::Generated {
            prompt: prompt.to_string(),
            sql: generated.sql,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        AiAction, AiInsight, AiResponse, DebugAdvice, Explanation, InsightError, InsightOrchestrator,
        InsightOutcome, InsightRequest, InsightSlot, Optimization, PlanAnalysis,
    };
    use crate::connections::ConnectionId;
    use crate::gateway::GatewayError;
    use crate::results::QueryResult;
    use crate::tabs::{InsertMode, TabRegistry};
    use crate::testing::FakeGateway;

    fn optimization(original: &str, optimized: &str) -> AiInsight {
        AiInsight::Optimization(Optimization {
            original_query: original.to_string(),
            optimized_query: Some(optimized.to_string()),
            suggestions: vec!["Avoid SELECT *".to_string()],
            explanation: String::new(),
        })
    }

    #[test]
    fn decodes_envelopes_with_flattened_payloads() {
        let response: AiResponse<PlanAnalysis> = serde_json::from_value(json!({
            "success": true,
            "summary": "Sequential scan on orders",
            "bottlenecks": ["Seq Scan on orders"],
            "insights": [],
            "recommendations": ["CREATE INDEX ON orders (customer_id)"],
            "plan_text": "Seq Scan on orders  (cost=0.00..431.00 rows=21000 width=8)"
        }))
        .expect("analysis should decode");
        let analysis = response
            .into_result(AiAction::Analyze)
            .expect("success envelope should unwrap");
        assert_eq!(analysis.bottlenecks, vec!["Seq Scan on orders"]);

        let failed: AiResponse<Explanation> =
            serde_json::from_value(json!({"success": false, "error": "OpenAI API key not configured"}))
                .expect("failure should decode");
        let error = failed
            .into_result(AiAction::Explain)
            .expect_err("failure envelope should be rejected");
        assert_eq!(
            error.to_string(),
            "Failed to explain query: OpenAI API key not configured"
        );
    }

    #[test]
    fn failure_without_message_uses_action_label() {
        let failed: AiResponse<DebugAdvice> =
            serde_json::from_value(json!({"success": false})).expect("failure should decode");
        let error = failed
            .into_result(AiAction::Debug)
            .expect_err("should be rejected");
        assert_eq!(error, InsightError::Unavailable { action: AiAction::Debug });
        assert_eq!(error.to_string(), "Failed to debug query");
    }

    #[test]
    fn optimization_offers_rewrite_only_when_it_differs() {
        let changed = optimization("SELECT  1", "SELECT 1");
        let insertion = changed.insertable_sql().expect("rewrite should be offered");
        assert_eq!(insertion.sql, "SELECT 1");
        assert_eq!(insertion.mode, InsertMode::Replace);

        assert!(optimization("SELECT 1", "SELECT 1").insertable_sql().is_none());
        assert!(AiInsight::Explanation(Explanation::default())
            .insertable_sql()
            .is_none());
    }

    #[test]
    fn requests_need_content_and_debug_needs_an_error() {
        let mut tabs = TabRegistry::new();
        let id = tabs.active_id();
        assert!(InsightRequest::from_tab(AiAction::Explain, tabs.active()).is_none());
        assert_eq!(
            InsightRequest::from_tab(AiAction::Indexes, tabs.active()),
            Some(InsightRequest::Indexes)
        );

        tabs.update_content(id, "SELECT * FROM missing");
        assert!(InsightRequest::from_tab(AiAction::Debug, tabs.active()).is_none());

        tabs.update_result(id, QueryResult::failure("relation \"missing\" does not exist"));
        assert_eq!(
            InsightRequest::from_tab(AiAction::Debug, tabs.active()),
            Some(InsightRequest::Debug {
                query: "SELECT * FROM missing".to_string(),
                error: "relation \"missing\" does not exist".to_string(),
            })
        );
    }

    #[test]
    fn only_latest_request_may_be_displayed() {
        let mut slot = InsightSlot::new();
        let tab = TabRegistry::new().active_id();
        let first = slot.begin(tab, AiAction::Explain);
        let second = slot.begin(tab, AiAction::Optimize);

        let outcome = slot.complete(second, Ok(optimization("SELECT  1", "SELECT 1")));
        assert_eq!(outcome, InsightOutcome::Displayed);
        let outcome = slot.complete(first, Ok(AiInsight::Explanation(Explanation::default())));
        assert_eq!(outcome, InsightOutcome::Stale);

        assert_eq!(slot.displayed().map(AiInsight::action), Some(AiAction::Optimize));
    }

    #[test]
    fn failure_leaves_previous_insight_in_place() {
        let mut slot = InsightSlot::new();
        let tab = TabRegistry::new().active_id();
        let ticket = slot.begin(tab, AiAction::Optimize);
        slot.complete(ticket, Ok(optimization("SELECT  1", "SELECT 1")));

        let ticket = slot.begin(tab, AiAction::Explain);
        assert!(slot.requesting().is_some());
        let outcome = slot.complete(ticket, Err(InsightError::Unavailable { action: AiAction::Explain }));

        assert!(matches!(outcome, InsightOutcome::Failed(_)));
        assert!(slot.requesting().is_none());
        assert_eq!(slot.displayed().map(AiInsight::action), Some(AiAction::Optimize));
    }

    #[test]
    fn taking_insertion_dismisses_the_insight() {
        let mut slot = InsightSlot::new();
        let tab = TabRegistry::new().active_id();
        let ticket = slot.begin(tab, AiAction::Optimize);
        slot.complete(ticket, Ok(optimization("SELECT  1", "SELECT 1")));

        let (origin, insertion) = slot.take_insertion().expect("rewrite should be insertable");
        assert_eq!(origin, tab);
        assert_eq!(insertion.sql, "SELECT 1");
        assert!(slot.displayed().is_none());
        assert!(slot.take_insertion().is_none());
    }

    #[test]
    fn invalidate_orphans_in_flight_request() {
        let mut slot = InsightSlot::new();
        let tab = TabRegistry::new().active_id();
        let ticket = slot.begin(tab, AiAction::Analyze);

        slot.invalidate();
        let outcome = slot.complete(ticket, Ok(AiInsight::PlanAnalysis(PlanAnalysis::default())));
        assert_eq!(outcome, InsightOutcome::Stale);
        assert!(slot.displayed().is_none());
    }

    #[tokio::test]
    async fn orchestrator_normalizes_remote_failures() {
        let gateway = FakeGateway::default();
        gateway.fail_ai(GatewayError::transport("connection reset by peer"));
        let orchestrator = InsightOrchestrator::new(&gateway);

        let error = orchestrator
            .run(
                ConnectionId(1),
                &InsightRequest::Analyze {
                    query: "SELECT 1".to_string(),
                },
            )
            .await
            .expect_err("transport failure should surface");
        assert_eq!(
            error.to_string(),
            "Failed to analyze query: backend unreachable: connection reset by peer"
        );
    }

    #[test]
    fn gateway_failures_keep_their_cause() {
        let decode = InsightError::from_gateway(
            AiAction::Explain,
            &GatewayError::decode("missing field `explanation`"),
        );
        assert_eq!(
            decode.to_string(),
            "Failed to explain query: malformed backend response: missing field `explanation`"
        );

        let blank_remote = InsightError::from_gateway(AiAction::Explain, &GatewayError::remote("  "));
        assert_eq!(blank_remote, InsightError::Unavailable { action: AiAction::Explain });
    }

    #[tokio::test]
    async fn orchestrator_passes_execution_time_to_optimizer() {
        let gateway = FakeGateway::default();
        let orchestrator = InsightOrchestrator::new(&gateway);

        let insight = orchestrator
            .run(
                ConnectionId(1),
                &InsightRequest::Optimize {
                    query: "SELECT  1".to_string(),
                    execution_time: Some(3.2),
                },
            )
            .await
            .expect("optimize should succeed");

        assert_eq!(gateway.last_optimize_time(), Some(3.2));
        assert_eq!(
            insight.insertable_sql().map(|insertion| insertion.sql),
            Some("SELECT 1".to_string())
        );
    }

    #[tokio::test]
    async fn blank_generated_sql_is_not_a_usable_answer() {
        let gateway = FakeGateway::default();
        gateway.script_generate(AiResponse::ok(super::GeneratedSql { sql: "  ".to_string() }));
        let orchestrator = InsightOrchestrator::new(&gateway);

        let error = orchestrator
            .generate(ConnectionId(1), "count users")
            .await
            .expect_err("blank sql should be rejected");
        assert_eq!(error.action(), AiAction::Generate);
    }
}
