use std::time::Instant;

use tracing::{debug, warn};

use crate::connections::ConnectionId;
use crate::gateway::QueryGateway;
use crate::results::QueryResult;
use crate::tabs::{ExecutionTicket, FormatTicket};

pub const EXECUTE_FALLBACK: &str = "Failed to execute query";

/// Runs tab requests against the query engine. Every failure comes back as a
/// displayable value, never as an error.
#[derive(Debug)]
pub struct QueryRunner<'g, G: QueryGateway + ?Sized> {
    gateway: &'g G,
    row_limit: Option<u32>,
}

impl<'g, G: QueryGateway + ?Sized> QueryRunner<'g, G> {
    #[must_use]
    pub fn new(gateway: &'g G) -> Self {
        Self {
            gateway,
            row_limit: None,
        }
    }

    #[must_use]
    pub fn with_row_limit(mut self, row_limit: Option<u32>) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub async fn execute(&self, connection: ConnectionId, ticket: &ExecutionTicket) -> QueryResult {
        let started_at = Instant::now();
        let outcome = self
            .gateway
            .execute(connection, &ticket.sql, self.row_limit)
            .await;

        let result = match outcome {
            Ok(result) if result.success => result,
            Ok(result) => {
                let message = result
                    .error_message()
                    .unwrap_or(EXECUTE_FALLBACK)
                    .to_string();
                QueryResult::failure(message)
            }
            Err(error) => {
                warn!(tab = %ticket.tab, %error, "query execution failed");
                QueryResult::failure(error.user_message(EXECUTE_FALLBACK))
            }
        };

        debug!(
            tab = %ticket.tab,
            generation = ticket.generation,
            success = result.success,
            elapsed_ms = started_at.elapsed().as_millis(),
            "execution finished"
        );
        result
    }

    /// `None` when formatting failed; the failure is logged only.
    pub async fn format(&self, connection: ConnectionId, ticket: &FormatTicket) -> Option<String> {
        match self.gateway.format_sql(connection, &ticket.original).await {
            Ok(formatted) if !formatted.trim().is_empty() => Some(formatted),
            Ok(_) => {
                warn!(tab = %ticket.tab, "formatter returned empty text");
                None
            }
            Err(error) => {
                warn!(tab = %ticket.tab, %error, "formatting failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{QueryRunner, EXECUTE_FALLBACK};
    use crate::connections::ConnectionId;
    use crate::gateway::GatewayError;
    use crate::results::{render_mode, QueryResult, RenderMode};
    use crate::tabs::TabRegistry;
    use crate::testing::FakeGateway;

    fn ticket_for(sql: &str) -> (TabRegistry, crate::tabs::ExecutionTicket) {
        let mut tabs = TabRegistry::new();
        let id = tabs.active_id();
        tabs.update_content(id, sql);
        let ticket = tabs.begin_execution(id, None).expect("ticket");
        (tabs, ticket)
    }

    #[tokio::test]
    async fn select_one_produces_single_row_grid() {
        let gateway = FakeGateway::default();
        gateway.script_execute(Ok(serde_json::from_value(json!({
            "success": true,
            "columns": ["?column?"],
            "rows": [{"?column?": 1}],
            "row_count": 1,
            "execution_time": 0.01
        }))
        .expect("result should decode")));
        let (mut tabs, ticket) = ticket_for("SELECT 1");

        let result = QueryRunner::new(&gateway).execute(ConnectionId(1), &ticket).await;
        tabs.complete_execution(&ticket, result);

        let result = tabs.active().result().expect("result should be attached");
        assert_eq!(render_mode(result), RenderMode::Grid);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.columns.len(), 1);
        assert_eq!(result.summary_line(), "1 rows • 0.01s");
    }

    #[tokio::test]
    async fn backend_error_message_becomes_the_result_error() {
        let gateway = FakeGateway::default();
        gateway.script_execute(Err(GatewayError::Remote {
            status: Some(500),
            message: "relation \"nope\" does not exist".to_string(),
        }));
        let (_, ticket) = ticket_for("SELECT * FROM nope");

        let result = QueryRunner::new(&gateway).execute(ConnectionId(1), &ticket).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("relation \"nope\" does not exist"));
    }

    #[tokio::test]
    async fn missing_error_text_falls_back_to_generic_message() {
        let gateway = FakeGateway::default();
        gateway.script_execute(Ok(QueryResult {
            success: false,
            ..QueryResult::default()
        }));
        gateway.script_execute(Err(GatewayError::decode("expected value at line 1")));
        let (_, ticket) = ticket_for("SELECT 1");
        let runner = QueryRunner::new(&gateway);

        for _ in 0..2 {
            let result = runner.execute(ConnectionId(1), &ticket).await;
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some(EXECUTE_FALLBACK));
        }
    }

    #[tokio::test]
    async fn row_limit_is_forwarded() {
        let gateway = FakeGateway::default();
        let (_, ticket) = ticket_for("SELECT * FROM events");

        QueryRunner::new(&gateway)
            .with_row_limit(Some(500))
            .execute(ConnectionId(1), &ticket)
            .await;
        assert_eq!(gateway.last_row_limit(), Some(Some(500)));
    }

    #[tokio::test]
    async fn failed_format_returns_none() {
        let gateway = FakeGateway::default();
        gateway.fail_format(GatewayError::transport("timed out"));
        let mut tabs = TabRegistry::new();
        let id = tabs.active_id();
        tabs.update_content(id, "select 1");
        let ticket = tabs.begin_format(id).expect("format ticket");

        let formatted = QueryRunner::new(&gateway).format(ConnectionId(1), &ticket).await;
        assert!(formatted.is_none());
        assert_eq!(tabs.active().content(), "select 1");
    }
}
