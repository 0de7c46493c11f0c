use pgai_core::connections::Connection;
use pgai_core::favorites::{group_by_folder, FavoriteQuery};
use pgai_core::health::HealthReport;
use pgai_core::history::{SlowQueryAnalysis, SlowQueryListing};
use pgai_core::schema::{filter_tables, group_by_schema, TableDetails, TableRef};
use pgai_core::settings::Settings;

const QUERY_PREVIEW_CHARS: usize = 100;

fn preview(query: &str) -> String {
    let flat = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= QUERY_PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(QUERY_PREVIEW_CHARS).collect();
    format!("{cut}...")
}

pub(crate) fn connection_lines(connections: &[Connection]) -> Vec<String> {
    if connections.is_empty() {
        return vec!["No saved connections".to_string()];
    }
    connections
        .iter()
        .map(|connection| {
            let ssl = if connection.ssl_enabled { " ssl" } else { "" };
            format!(
                "{:>4}  {}  {}@{}{ssl}",
                connection.id.0,
                connection.name,
                connection.username,
                connection.address()
            )
        })
        .collect()
}

pub(crate) fn table_listing_lines(tables: &[TableRef], filter: &str) -> Vec<String> {
    let matching = filter_tables(tables, filter);
    if matching.is_empty() {
        return vec!["No tables found".to_string()];
    }
    let mut lines = Vec::new();
    for (schema, members) in group_by_schema(&matching) {
        lines.push(format!("{schema}:"));
        lines.extend(members.iter().map(|table| {
            if table.table_type.is_empty() {
                format!("  {}", table.name)
            } else {
                format!("  {} ({})", table.name, table.table_type)
            }
        }));
    }
    lines
}

pub(crate) fn table_details_lines(details: &TableDetails) -> Vec<String> {
    let mut lines = vec![format!(
        "{} | {} rows | {}",
        details.table, details.stats.row_count, details.stats.size
    )];

    lines.push("Columns:".to_string());
    for column in &details.columns {
        let mut line = format!("  {} {}", column.name, column.data_type);
        if column.is_primary_key {
            line.push_str(" PK");
        }
        if !column.nullable() {
            line.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default_value {
            line.push_str(&format!(" DEFAULT {default}"));
        }
        lines.push(line);
    }

    if !details.indexes.is_empty() {
        lines.push("Indexes:".to_string());
        lines.extend(
            details
                .indexes
                .iter()
                .map(|index| format!("  {}: {}", index.name, index.definition)),
        );
    }

    if !details.relations.is_empty() {
        lines.push("Relations:".to_string());
        for relation in &details.relations.outgoing {
            lines.push(format!(
                "  {} -> {}.{}",
                relation.column_name,
                relation.foreign_table_name.as_deref().unwrap_or("?"),
                relation.foreign_column_name.as_deref().unwrap_or("?")
            ));
        }
        for relation in &details.relations.incoming {
            lines.push(format!(
                "  {}.{} -> {}",
                relation.table_name.as_deref().unwrap_or("?"),
                relation.column_name,
                relation.referenced_column_name.as_deref().unwrap_or("?")
            ));
        }
    }

    lines.push("DDL:".to_string());
    lines.extend(details.ddl.lines().map(|line| format!("  {line}")));
    lines
}

pub(crate) fn health_lines(report: &HealthReport) -> Vec<String> {
    let overall = report.cache.overall.cache_hit_ratio;
    let mut lines = vec![format!(
        "Cache hit ratio: {overall:.1}% ({})",
        report.cache_band().label()
    )];

    match report.analysis() {
        Some(analysis) => {
            lines.push(format!(
                "Health score: {:.0} ({}, grade {})",
                analysis.health_score,
                analysis.band().label(),
                analysis.grade
            ));
            if !analysis.summary.trim().is_empty() {
                lines.push(analysis.summary.clone());
            }
            for item in analysis.sorted_action_items() {
                lines.push(format!("[{}] {}: {}", item.priority, item.title, item.description));
                if let Some(sql) = item.fix_sql() {
                    lines.push(format!("  fix: {sql}"));
                }
            }
        }
        None => {
            if let Some(reason) = report.analysis_error() {
                lines.push(format!("AI analysis: {reason}"));
            }
        }
    }

    let bloated = report.bloated_tables();
    if !bloated.is_empty() {
        lines.push("Bloated tables:".to_string());
        lines.extend(bloated.iter().map(|table| {
            format!(
                "  {} {:.1}% of {} ({} dead tuples)",
                table.tablename, table.bloat_percent, table.total_size, table.n_dead_tup
            )
        }));
    }

    let unused = report.unused_indexes();
    if !unused.is_empty() {
        lines.push("Unused indexes:".to_string());
        lines.extend(unused.iter().map(|index| {
            format!("  {} on {} ({})", index.indexname, index.tablename, index.index_size)
        }));
    }

    let poorly_cached = report.poorly_cached_tables();
    if !poorly_cached.is_empty() {
        lines.push("Poorly cached tables:".to_string());
        lines.extend(
            poorly_cached
                .iter()
                .map(|table| format!("  {} {:.1}%", table.tablename, table.cache_hit_ratio)),
        );
    }
    lines
}

pub(crate) fn slow_query_lines(listing: &SlowQueryListing) -> Vec<String> {
    let mut lines = vec![format!("Source: {}", listing.source)];
    if listing.queries.is_empty() {
        lines.push("No slow queries above the threshold".to_string());
        return lines;
    }
    for (index, query) in listing.queries.iter().enumerate() {
        let timing = match query.calls {
            Some(calls) => format!("{:.3}s avg over {calls} calls", query.execution_time),
            None => format!("{:.3}s", query.execution_time),
        };
        lines.push(format!("{:>3}. {timing}  {}", index + 1, preview(&query.query)));
    }
    lines
}

pub(crate) fn slow_analysis_lines(analysis: &SlowQueryAnalysis) -> Vec<String> {
    let mut lines = Vec::new();
    if !analysis.summary.trim().is_empty() {
        lines.push(analysis.summary.clone());
    }
    for item in &analysis.analyses {
        lines.push(format!("Query {}:", item.query_number));
        lines.extend(item.issues.iter().map(|issue| format!("  issue: {issue}")));
        lines.extend(
            item.recommendations
                .iter()
                .map(|recommendation| format!("  do: {recommendation}")),
        );
        lines.extend(item.indexes.iter().map(|index| format!("  index: {index}")));
        if let Some(improvement) = &item.estimated_improvement {
            lines.push(format!("  expected: {improvement}"));
        }
    }
    lines
}

pub(crate) fn favorite_lines(favorites: &[FavoriteQuery]) -> Vec<String> {
    if favorites.is_empty() {
        return vec!["No favorites saved".to_string()];
    }
    let mut lines = Vec::new();
    for (folder, members) in group_by_folder(favorites) {
        lines.push(format!("{folder}:"));
        for favorite in members {
            let id = favorite
                .id
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            lines.push(format!("  [{id}] {}: {}", favorite.name, preview(&favorite.query)));
        }
    }
    lines
}

pub(crate) fn settings_lines(settings: &Settings) -> Vec<String> {
    let unset = || "(default)".to_string();
    vec![
        format!(
            "OpenAI API key: {}",
            if settings.ai_ready() { "set" } else { "not set" }
        ),
        format!(
            "Model: {}",
            settings.openai_model.clone().unwrap_or_else(unset)
        ),
        format!(
            "Autocomplete: {}",
            if settings.autocomplete_enabled() { "on" } else { "off" }
        ),
        format!(
            "Default query limit: {}",
            settings
                .default_query_limit
                .map_or_else(unset, |limit| limit.to_string())
        ),
    ]
}
