use std::collections::BTreeMap;

use futures_util::try_join;
use serde::{Deserialize, Serialize};

use crate::connections::ConnectionId;
use crate::gateway::{GatewayError, SchemaGateway};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub table_type: String,
}

fn default_schema() -> String {
    "public".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub is_nullable: String,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub is_primary_key: bool,
}

impl ColumnInfo {
    #[must_use]
    pub fn nullable(&self) -> bool {
        self.is_nullable.eq_ignore_ascii_case("YES")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub constraint_name: String,
    pub column_name: String,
    #[serde(default)]
    pub foreign_table_name: Option<String>,
    #[serde(default)]
    pub foreign_column_name: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub referenced_column_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableRelations {
    #[serde(default)]
    pub outgoing: Vec<Relation>,
    #[serde(default)]
    pub incoming: Vec<Relation>,
}

impl TableRelations {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableStats {
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDetails {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
    pub ddl: String,
    pub relations: TableRelations,
    pub stats: TableStats,
}

impl TableDetails {
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.is_primary_key)
            .map(|column| column.name.as_str())
            .collect()
    }
}

/// Fetches every detail tab for one table. The requests run concurrently and
/// the first failure fails the whole load.
pub async fn load_table_details<G: SchemaGateway + ?Sized>(
    gateway: &G,
    connection: ConnectionId,
    table: &str,
) -> Result<TableDetails, GatewayError> {
    let (columns, indexes, ddl, relations, stats) = try_join!(
        gateway.columns(connection, table),
        gateway.indexes(connection, table),
        gateway.ddl(connection, table),
        gateway.relations(connection, table),
        gateway.table_stats(connection, table),
    )?;

    Ok(TableDetails {
        table: table.to_string(),
        columns,
        indexes,
        ddl,
        relations,
        stats,
    })
}

#[must_use]
pub fn filter_tables<'a>(tables: &'a [TableRef], needle: &str) -> Vec<&'a TableRef> {
    let needle = needle.trim().to_lowercase();
    tables
        .iter()
        .filter(|table| needle.is_empty() || table.name.to_lowercase().contains(&needle))
        .collect()
}

#[must_use]
pub fn group_by_schema<'a>(tables: &[&'a TableRef]) -> BTreeMap<&'a str, Vec<&'a TableRef>> {
    let mut grouped: BTreeMap<&str, Vec<&TableRef>> = BTreeMap::new();
    for table in tables {
        grouped.entry(table.schema.as_str()).or_default().push(table);
    }
    for members in grouped.values_mut() {
        members.sort_unstable_by(|left, right| left.name.cmp(&right.name));
    }
    grouped
}
