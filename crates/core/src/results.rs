use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NULL_MARKER: &str = "NULL";
const JSON_PREVIEW_CHARS: usize = 50;
const TEXT_PREVIEW_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

static NULL_VALUE: Value = Value::Null;

pub type ResultRow = Map<String, Value>;

/// Outcome of one execution call, exactly as reported by the query engine.
///
/// A result is never patched: a later execution replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QueryResult {
    pub success: bool,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<ResultRow>,
    /// The engine reports `-1` when the count is unknown (most DDL).
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QueryResult {
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.error.as_deref().filter(|error| !error.trim().is_empty())
    }

    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.row_count
            .and_then(|count| u64::try_from(count).ok())
            .unwrap_or(self.rows.len() as u64)
    }

    /// Header line shown above the grid, e.g. `1 rows • 0.01s`.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "{} rows • {}s",
            self.total_rows(),
            format_seconds(self.execution_time.unwrap_or_default())
        )
    }

    /// Cells of one row in column order. Missing keys read as `null`.
    pub fn row_values<'a>(&'a self, row: &'a ResultRow) -> impl Iterator<Item = &'a Value> + 'a {
        self.columns
            .iter()
            .map(move |column| row.get(column).unwrap_or(&NULL_VALUE))
    }
}

fn format_seconds(seconds: f64) -> String {
    let rendered = format!("{seconds:.4}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderMode<'a> {
    Error(&'a str),
    Status {
        message: &'a str,
        execution_time: Option<f64>,
    },
    Empty,
    Grid,
}

pub const GENERIC_RESULT_ERROR: &str = "Query failed";

/// Picks the view for a result. The checks are ordered; the first match wins.
#[must_use]
pub fn render_mode(result: &QueryResult) -> RenderMode<'_> {
    if !result.success {
        return RenderMode::Error(result.error_message().unwrap_or(GENERIC_RESULT_ERROR));
    }
    if let Some(message) = result.message.as_deref() {
        if result.columns.is_empty() {
            return RenderMode::Status {
                message,
                execution_time: result.execution_time,
            };
        }
    }
    if result.columns.is_empty() {
        return RenderMode::Empty;
    }
    RenderMode::Grid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PageSize {
    Fifty,
    #[default]
    Hundred,
    FiveHundred,
    Thousand,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Fifty,
        PageSize::Hundred,
        PageSize::FiveHundred,
        PageSize::Thousand,
    ];

    #[must_use]
    pub fn rows(self) -> usize {
        match self {
            Self::Fifty => 50,
            Self::Hundred => 100,
            Self::FiveHundred => 500,
            Self::Thousand => 1000,
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Fifty => Self::Hundred,
            Self::Hundred => Self::FiveHundred,
            Self::FiveHundred => Self::Thousand,
            Self::Thousand => Self::Fifty,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|size| size.rows() == value)
            .ok_or_else(|| format!("unsupported page size {value}; expected 50, 100, 500 or 1000"))
    }
}

impl From<PageSize> for usize {
    fn from(value: PageSize) -> Self {
        value.rows()
    }
}

/// Client-side pagination over an already fetched row set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Paginator {
    page_size: PageSize,
    page: usize,
}

impl Paginator {
    #[must_use]
    pub fn new(page_size: PageSize) -> Self {
        Self { page_size, page: 0 }
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.page = 0;
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }

    #[must_use]
    pub fn total_pages(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.page_size.rows())
    }

    #[must_use]
    pub fn can_next(&self, total_rows: usize) -> bool {
        self.page + 1 < self.total_pages(total_rows)
    }

    #[must_use]
    pub fn can_previous(&self) -> bool {
        self.page > 0
    }

    pub fn next_page(&mut self, total_rows: usize) -> bool {
        if !self.can_next(total_rows) {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.can_previous() {
            return false;
        }
        self.page -= 1;
        true
    }

    #[must_use]
    pub fn window(&self, total_rows: usize) -> Range<usize> {
        let start = (self.page * self.page_size.rows()).min(total_rows);
        let end = (start + self.page_size.rows()).min(total_rows);
        start..end
    }

    #[must_use]
    pub fn page_rows<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        &rows[self.window(rows.len())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellDisplay {
    Null,
    Text {
        shown: String,
        full: Option<String>,
    },
    Json {
        preview: String,
        full: String,
    },
}

impl CellDisplay {
    #[must_use]
    pub fn shown(&self) -> &str {
        match self {
            Self::Null => NULL_MARKER,
            Self::Text { shown, .. } => shown,
            Self::Json { preview, .. } => preview,
        }
    }
}

#[must_use]
pub fn render_cell(value: &Value) -> CellDisplay {
    match value {
        Value::Null => CellDisplay::Null,
        Value::Array(_) | Value::Object(_) => {
            let full = value.to_string();
            CellDisplay::Json {
                preview: truncate_chars(&full, JSON_PREVIEW_CHARS),
                full,
            }
        }
        scalar => {
            let text = scalar_text(scalar);
            if text.chars().count() > TEXT_PREVIEW_CHARS {
                CellDisplay::Text {
                    shown: truncate_chars(&text, TEXT_PREVIEW_CHARS),
                    full: Some(text),
                }
            } else {
                CellDisplay::Text {
                    shown: text,
                    full: None,
                }
            }
        }
    }
}

/// Untruncated text placed on the clipboard when a cell is copied.
#[must_use]
pub fn copy_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        scalar => scalar_text(scalar),
    }
}

#[must_use]
pub fn copy_row_text(row: &ResultRow) -> String {
    serde_json::to_string_pretty(row).unwrap_or_default()
}

/// Flat text used by delimited export: `null` is an empty field, nested values are compact JSON.
#[must_use]
pub fn export_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        scalar => scalar_text(scalar),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}{ELLIPSIS}", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{
        copy_text, render_cell, render_mode, CellDisplay, PageSize, Paginator, QueryResult,
        RenderMode, ResultRow,
    };

    fn rows(count: usize) -> Vec<ResultRow> {
        (0..count)
            .map(|index| {
                let mut row = ResultRow::new();
                row.insert("id".to_string(), json!(index));
                row
            })
            .collect()
    }

    #[test]
    fn render_modes_follow_priority_order() {
        let failed = QueryResult::failure("relation \"nope\" does not exist");
        assert_eq!(
            render_mode(&failed),
            RenderMode::Error("relation \"nope\" does not exist")
        );

        let status = QueryResult {
            success: true,
            message: Some("3 rows updated".to_string()),
            execution_time: Some(0.2),
            ..QueryResult::default()
        };
        assert!(matches!(
            render_mode(&status),
            RenderMode::Status {
                message: "3 rows updated",
                ..
            }
        ));

        let empty = QueryResult {
            success: true,
            ..QueryResult::default()
        };
        assert_eq!(render_mode(&empty), RenderMode::Empty);

        let grid = QueryResult {
            success: true,
            columns: vec!["id".to_string()],
            message: Some("ignored".to_string()),
            ..QueryResult::default()
        };
        assert_eq!(render_mode(&grid), RenderMode::Grid);
    }

    #[test]
    fn select_one_summary_matches_header_format() {
        let result: QueryResult = serde_json::from_value(json!({
            "success": true,
            "columns": ["?column?"],
            "rows": [{"?column?": 1}],
            "row_count": 1,
            "execution_time": 0.01
        }))
        .expect("result should decode");

        assert_eq!(render_mode(&result), RenderMode::Grid);
        assert_eq!(result.summary_line(), "1 rows • 0.01s");
        let cells: Vec<&Value> = result.row_values(&result.rows[0]).collect();
        assert_eq!(cells, vec![&json!(1)]);
    }

    #[test]
    fn ddl_result_with_unknown_row_count_renders_as_status() {
        let result: QueryResult = serde_json::from_str(
            r#"{"success":true,"columns":[],"rows":[],"row_count":-1,"execution_time":0.004,"message":"-1 rows affected"}"#,
        )
        .expect("ddl result should decode");

        assert_eq!(result.row_count, Some(-1));
        assert_eq!(result.total_rows(), 0);
        assert_eq!(
            render_mode(&result),
            RenderMode::Status {
                message: "-1 rows affected",
                execution_time: Some(0.004),
            }
        );
    }

    #[test]
    fn dml_result_keeps_affected_count() {
        let result: QueryResult = serde_json::from_value(json!({
            "success": true,
            "columns": [],
            "rows": [],
            "row_count": 3,
            "execution_time": 0.02,
            "message": "3 rows affected"
        }))
        .expect("dml result should decode");

        assert_eq!(result.summary_line(), "3 rows • 0.02s");
        assert!(matches!(render_mode(&result), RenderMode::Status { .. }));
    }

    #[test]
    fn page_count_is_ceiling_and_pages_reassemble_rows() {
        let all_rows = rows(257);
        let mut paginator = Paginator::new(PageSize::Fifty);
        assert_eq!(paginator.total_pages(all_rows.len()), 6);

        let mut reassembled = Vec::new();
        loop {
            reassembled.extend_from_slice(paginator.page_rows(&all_rows));
            if !paginator.next_page(all_rows.len()) {
                break;
            }
        }
        assert_eq!(reassembled, all_rows);
        assert_eq!(paginator.page(), 5);
    }

    #[test]
    fn changing_page_size_resets_to_first_page() {
        let mut paginator = Paginator::default();
        assert_eq!(paginator.page_size(), PageSize::Hundred);
        assert!(paginator.next_page(350));
        assert!(paginator.next_page(350));
        assert_eq!(paginator.page(), 2);

        paginator.set_page_size(PageSize::Fifty);
        assert_eq!(paginator.page(), 0);
        assert_eq!(paginator.total_pages(350), 7);
    }

    #[test]
    fn empty_row_set_has_no_pages() {
        let paginator = Paginator::default();
        assert_eq!(paginator.total_pages(0), 0);
        assert!(paginator.page_rows::<ResultRow>(&[]).is_empty());
        assert!(!paginator.can_next(0));
    }

    #[test]
    fn page_size_accepts_only_known_values() {
        assert_eq!(PageSize::try_from(500), Ok(PageSize::FiveHundred));
        assert!(PageSize::try_from(42).is_err());
        assert_eq!(PageSize::Thousand.next(), PageSize::Fifty);
    }

    #[test]
    fn null_and_empty_string_render_differently() {
        assert_eq!(render_cell(&Value::Null), CellDisplay::Null);
        assert_eq!(render_cell(&Value::Null).shown(), "NULL");
        assert_eq!(render_cell(&json!("")).shown(), "");
    }

    #[test]
    fn nested_values_render_as_truncated_json_with_full_copy() {
        let long_object = json!({
            "payload": "x".repeat(80),
            "tags": ["a", "b"]
        });
        let CellDisplay::Json { preview, full } = render_cell(&long_object) else {
            panic!("expected json cell");
        };
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 53);
        assert_eq!(full, long_object.to_string());
        assert!(copy_text(&long_object).contains("\"payload\""));
    }

    #[test]
    fn long_text_keeps_full_value_available() {
        let text = "é".repeat(120);
        let CellDisplay::Text { shown, full } = render_cell(&json!(text)) else {
            panic!("expected text cell");
        };
        assert_eq!(shown.chars().count(), 103);
        assert_eq!(full.as_deref(), Some(text.as_str()));
    }
}
