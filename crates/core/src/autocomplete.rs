use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connections::ConnectionId;
use crate::gateway::{GatewayError, SchemaGateway};

pub const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "LEFT JOIN", "RIGHT JOIN", "INNER JOIN", "ORDER BY",
    "GROUP BY", "HAVING", "LIMIT", "OFFSET", "INSERT", "UPDATE", "DELETE", "CREATE", "ALTER",
    "DROP", "AND", "OR", "NOT", "IN", "BETWEEN", "LIKE", "IS NULL", "IS NOT NULL", "AS",
    "DISTINCT", "COUNT", "SUM", "AVG", "MIN", "MAX", "CASE", "WHEN", "THEN", "ELSE", "END",
];

/// Point-in-time editor metadata for one connection. Always replaced as a
/// whole, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutocompleteData {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub columns: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SuggestionKind {
    Keyword,
    Table,
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub label: String,
    pub insert_text: String,
}

#[derive(Debug, Default)]
pub struct AutocompleteCache {
    snapshots: HashMap<ConnectionId, Arc<AutocompleteData>>,
}

impl AutocompleteCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, connection: ConnectionId, data: AutocompleteData) {
        debug!(
            %connection,
            tables = data.tables.len(),
            "replacing autocomplete snapshot"
        );
        self.snapshots.insert(connection, Arc::new(data));
    }

    #[must_use]
    pub fn snapshot(&self, connection: ConnectionId) -> Option<Arc<AutocompleteData>> {
        self.snapshots.get(&connection).cloned()
    }

    pub fn remove(&mut self, connection: ConnectionId) {
        self.snapshots.remove(&connection);
    }

    #[must_use]
    pub fn suggest(&self, connection: Option<ConnectionId>, prefix: &str) -> Vec<Suggestion> {
        let snapshot = connection.and_then(|connection| self.snapshots.get(&connection));
        suggest(snapshot.map(Arc::as_ref), prefix)
    }
}

/// Case-insensitive prefix match over keywords, tables and `table.column`
/// labels. Without a snapshot only the built-in keywords are offered.
#[must_use]
pub fn suggest(data: Option<&AutocompleteData>, prefix: &str) -> Vec<Suggestion> {
    let needle = prefix.to_lowercase();
    let matches = |label: &str| label.to_lowercase().starts_with(&needle);
    let mut suggestions = Vec::new();

    let keywords: Vec<&str> = match data {
        Some(data) if !data.keywords.is_empty() => data.keywords.iter().map(String::as_str).collect(),
        _ => SQL_KEYWORDS.to_vec(),
    };
    for keyword in keywords.into_iter().filter(|keyword| matches(*keyword)) {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Keyword,
            label: keyword.to_string(),
            insert_text: keyword.to_string(),
        });
    }

    let Some(data) = data else {
        return suggestions;
    };

    for table in data.tables.iter().filter(|table| matches(table.as_str())) {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Table,
            label: table.clone(),
            insert_text: table.clone(),
        });
    }

    for (table, columns) in &data.columns {
        for column in columns {
            let label = format!("{table}.{column}");
            let hit = if needle.contains('.') {
                matches(label.as_str())
            } else {
                matches(column.as_str())
            };
            if hit {
                suggestions.push(Suggestion {
                    kind: SuggestionKind::Column,
                    label,
                    insert_text: column.clone(),
                });
            }
        }
    }

    suggestions
}

/// The identifier (possibly dotted) that ends at the cursor.
#[must_use]
pub fn completion_prefix(before_cursor: &str) -> &str {
    let start = before_cursor
        .char_indices()
        .rev()
        .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_' || *ch == '.'))
        .map_or(0, |(index, ch)| index + ch.len_utf8());
    &before_cursor[start..]
}

/// Replaces the word segment after the last `.` of the prefix.
#[must_use]
pub fn apply_completion(before_cursor: &str, suggestion: &Suggestion) -> String {
    let prefix = completion_prefix(before_cursor);
    let keep = before_cursor.len() - prefix.len();
    let segment_start = match (suggestion.kind, prefix.rfind('.')) {
        (SuggestionKind::Column, Some(dot)) => keep + dot + 1,
        _ => keep,
    };
    format!("{}{}", &before_cursor[..segment_start], suggestion.insert_text)
}

pub async fn fetch_autocomplete<G: SchemaGateway + ?Sized>(
    gateway: &G,
    connection: ConnectionId,
) -> Result<AutocompleteData, GatewayError> {
    gateway.autocomplete(connection).await
}

/// Rebuilds the backend schema cache, then fetches the new snapshot. The
/// fetch never runs if the rebuild failed.
pub async fn refresh_and_fetch<G: SchemaGateway + ?Sized>(
    gateway: &G,
    connection: ConnectionId,
) -> Result<(usize, AutocompleteData), GatewayError> {
    let table_count = gateway.refresh_schema(connection).await?;
    let data = gateway.autocomplete(connection).await?;
    Ok((table_count, data))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{
        apply_completion, completion_prefix, refresh_and_fetch, suggest, AutocompleteCache,
        AutocompleteData, SuggestionKind,
    };
    use crate::connections::ConnectionId;
    use crate::gateway::GatewayError;
    use crate::testing::FakeGateway;

    fn data() -> AutocompleteData {
        AutocompleteData {
            tables: vec!["users".to_string(), "orders".to_string()],
            columns: BTreeMap::from([
                (
                    "users".to_string(),
                    vec!["id".to_string(), "email".to_string()],
                ),
                ("orders".to_string(), vec!["user_id".to_string()]),
            ]),
            keywords: Vec::new(),
        }
    }

    #[test]
    fn without_snapshot_only_keywords_are_offered() {
        let suggestions = suggest(None, "sel");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].label, "SELECT");
        assert_eq!(suggestions[0].kind, SuggestionKind::Keyword);
    }

    #[test]
    fn columns_are_labelled_with_their_table() {
        let data = data();
        let suggestions = suggest(Some(&data), "us");

        let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["users", "orders.user_id"]);
        assert_eq!(suggestions[1].insert_text, "user_id");

        let dotted = suggest(Some(&data), "users.e");
        assert_eq!(dotted.len(), 1);
        assert_eq!(dotted[0].label, "users.email");
    }

    #[test]
    fn completion_replaces_segment_after_dot() {
        assert_eq!(completion_prefix("SELECT u.id, users.em"), "users.em");
        assert_eq!(completion_prefix("SELECT "), "");

        let data = data();
        let email = suggest(Some(&data), "users.em").remove(0);
        assert_eq!(apply_completion("SELECT users.em", &email), "SELECT users.email");

        let table = suggest(Some(&data), "ord")
            .into_iter()
            .find(|suggestion| suggestion.kind == SuggestionKind::Table)
            .expect("orders table should be suggested");
        assert_eq!(apply_completion("SELECT * FROM ord", &table), "SELECT * FROM orders");
    }

    #[test]
    fn snapshots_are_per_connection_and_replaced_whole() {
        let mut cache = AutocompleteCache::new();
        cache.replace(ConnectionId(1), data());
        let held = cache.snapshot(ConnectionId(1)).expect("snapshot");

        cache.replace(
            ConnectionId(1),
            AutocompleteData {
                tables: vec!["events".to_string()],
                ..AutocompleteData::default()
            },
        );
        assert_eq!(held.tables.len(), 2);
        assert_eq!(
            cache.snapshot(ConnectionId(1)).map(|s| s.tables.clone()),
            Some(vec!["events".to_string()])
        );
        assert!(cache.snapshot(ConnectionId(2)).is_none());
        assert!(cache.suggest(Some(ConnectionId(2)), "user").is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_skips_the_fetch() {
        let gateway = FakeGateway::default();
        gateway.fail_refresh(GatewayError::remote("Connection not found"));

        let error = refresh_and_fetch(&gateway, ConnectionId(1))
            .await
            .expect_err("refresh should fail");
        assert_eq!(error.to_string(), "Connection not found");
        assert_eq!(gateway.autocomplete_loads(), 0);
    }

    #[tokio::test]
    async fn refresh_then_fetch_returns_table_count_and_snapshot() {
        let gateway = FakeGateway::default();
        let (count, data) = refresh_and_fetch(&gateway, ConnectionId(1))
            .await
            .expect("refresh should succeed");

        assert_eq!(count, data.tables.len());
        assert_eq!(gateway.autocomplete_loads(), 1);
    }
}
