use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use pgai_core::results::{export_text, QueryResult};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write delimited export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize JSON export: {0}")]
    Json(#[from] serde_json::Error),
    #[error("delimiter `{0}` must be a single ASCII character")]
    Delimiter(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl CsvOptions {
    fn delimiter_byte(self) -> Result<u8, ExportError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ExportError::Delimiter(self.delimiter))
    }
}

#[must_use]
pub fn default_export_file_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("query-results-{millis}.csv")
}

/// Writes every row of `result` (not just the visible page) as delimited text.
/// Returns the number of data rows written.
pub fn write_result_csv<W: Write>(
    writer: W,
    result: &QueryResult,
    options: CsvOptions,
) -> Result<usize, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter_byte()?)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    writer.write_record(&result.columns)?;
    for row in &result.rows {
        writer.write_record(result.row_values(row).map(export_text))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(result.rows.len())
}

pub fn export_result_to_csv(
    path: &Path,
    result: &QueryResult,
    options: CsvOptions,
) -> Result<usize, ExportError> {
    let file = create_file(path)?;
    let written = write_result_csv(BufWriter::new(file), result, options)?;
    debug!(path = %path.display(), rows = written, "exported delimited result");
    Ok(written)
}

/// Array of objects keyed by column name, values as the engine returned them.
pub fn export_result_to_json(path: &Path, result: &QueryResult) -> Result<usize, ExportError> {
    let records = result
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = result
                .columns
                .iter()
                .cloned()
                .zip(result.row_values(row).cloned())
                .collect();
            Value::Object(object)
        })
        .collect::<Vec<_>>();

    let mut writer = BufWriter::new(create_file(path)?);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush().map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), rows = records.len(), "exported JSON result");
    Ok(records.len())
}

fn create_file(path: &Path) -> Result<File, ExportError> {
    File::create(path).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pgai_core::results::QueryResult;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::{
        default_export_file_name, export_result_to_csv, export_result_to_json, write_result_csv,
        CsvOptions, ExportError,
    };

    fn sample_result() -> QueryResult {
        let rows = [
            json!({"id": 1, "name": "alpha", "tags": ["a", "b"], "note": null}),
            json!({"id": 2, "name": "quote \"name\", with comma", "tags": {"k": 1}, "note": ""}),
        ]
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect();
        QueryResult {
            success: true,
            columns: vec![
                "id".to_string(),
                "name".to_string(),
                "tags".to_string(),
                "note".to_string(),
            ],
            rows,
            row_count: Some(2),
            execution_time: Some(0.02),
            ..QueryResult::default()
        }
    }

    #[test]
    fn exports_full_result_with_header_and_minimal_quoting() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("result.csv");

        let written = export_result_to_csv(&path, &sample_result(), CsvOptions::default())
            .expect("csv export failed");
        assert_eq!(written, 2);

        let output = fs::read_to_string(path).expect("failed to read csv output");
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "id,name,tags,note");
        assert_eq!(lines[1], r#"1,alpha,"[""a"",""b""]","#);
        assert_eq!(lines[2], r#"2,"quote ""name"", with comma","{""k"":1}","#);
    }

    #[test]
    fn custom_delimiter_keeps_column_count_for_plain_rows() {
        let mut result = sample_result();
        result.columns.truncate(2);
        let mut buffer = Vec::new();

        write_result_csv(&mut buffer, &result, CsvOptions { delimiter: ';' })
            .expect("csv export failed");
        let output = String::from_utf8(buffer).expect("csv output should be utf-8");
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "id;name");
        assert_eq!(lines[1].split(';').count(), 2);
        // The comma no longer needs quoting, the embedded quotes still do.
        assert_eq!(lines[2], r#"2;"quote ""name"", with comma""#);
    }

    #[test]
    fn rejects_non_ascii_delimiters() {
        let error = write_result_csv(Vec::new(), &sample_result(), CsvOptions { delimiter: '§' })
            .expect_err("non-ascii delimiter should be rejected");
        assert!(matches!(error, ExportError::Delimiter('§')));
    }

    #[test]
    fn exports_json_objects_with_original_values() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("result.json");

        let written = export_result_to_json(&path, &sample_result()).expect("json export failed");
        assert_eq!(written, 2);
        let output = fs::read_to_string(path).expect("failed to read json output");
        let parsed: Value = serde_json::from_str(&output).expect("invalid json");
        assert_eq!(parsed[0]["id"], 1);
        assert_eq!(parsed[0]["tags"], json!(["a", "b"]));
        assert_eq!(parsed[0]["note"], Value::Null);
        assert_eq!(parsed[1]["note"], "");
    }

    #[test]
    fn write_failure_names_the_path() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("missing").join("result.csv");

        let error = export_result_to_csv(&path, &sample_result(), CsvOptions::default())
            .expect_err("missing directory should fail");
        match error {
            ExportError::Write { path: reported, .. } => assert!(reported.ends_with("result.csv")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_file_name_is_timestamped_csv() {
        let name = default_export_file_name();
        let millis = name
            .strip_prefix("query-results-")
            .and_then(|rest| rest.strip_suffix(".csv"))
            .expect("unexpected file name shape");
        assert!(millis.parse::<u128>().is_ok());
    }
}
