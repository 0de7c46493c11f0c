use serde::{Deserialize, Serialize};

use crate::connections::ConnectionId;
use crate::gateway::AiGateway;
use crate::insights::{AiAction, InsightError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHistoryEntry {
    pub id: i64,
    pub connection_id: ConnectionId,
    pub query: String,
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub executed_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlowQuerySource {
    /// `pg_stat_statements` when available, else the application history.
    #[default]
    Auto,
    PgStat,
    History,
}

impl SlowQuerySource {
    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::PgStat => "pg_stat",
            Self::History => "history",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlowQueryFilter {
    /// Seconds.
    pub min_time: f64,
    pub limit: u32,
    pub source: SlowQuerySource,
}

impl Default for SlowQueryFilter {
    fn default() -> Self {
        Self {
            min_time: 1.0,
            limit: 50,
            source: SlowQuerySource::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowQuery {
    pub id: i64,
    pub query: String,
    /// Mean time for aggregated statistics.
    pub execution_time: f64,
    #[serde(default)]
    pub executed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calls: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl SlowQuery {
    #[must_use]
    pub fn is_aggregated(&self) -> bool {
        self.calls.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlowQueryListing {
    #[serde(default)]
    pub queries: Vec<SlowQuery>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub sources_available: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct QueryAnalysis {
    #[serde(default)]
    pub query_number: u32,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<String>,
    #[serde(default)]
    pub estimated_improvement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SlowQueryAnalysis {
    #[serde(default)]
    pub analyses: Vec<QueryAnalysis>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub query_count: usize,
}

impl SlowQueryAnalysis {
    /// `query_number` is 1-based over the submitted batch.
    #[must_use]
    pub fn for_query(&self, index: usize) -> Option<&QueryAnalysis> {
        self.analyses
            .iter()
            .find(|analysis| analysis.query_number as usize == index + 1)
    }
}

/// Sends a batch for analysis. An empty batch is ignored without a request.
pub async fn analyze_slow_queries<G: AiGateway + ?Sized>(
    gateway: &G,
    connection: ConnectionId,
    queries: &[SlowQuery],
) -> Result<Option<SlowQueryAnalysis>, InsightError> {
    if queries.is_empty() {
        return Ok(None);
    }
    let action = AiAction::SlowQueries;
    gateway
        .analyze_slow_queries(connection, queries)
        .await
        .map_err(|error| InsightError::from_gateway(action, &error))?
        .into_result(action)
        .map(Some)
}
