use crate::models::QueryResult;
use serde::Serialize;
use serde_json::Value;

/// Detail rows rendered before the table is cut off. The true total is
/// always reported alongside the shown count.
pub const MAX_RENDERED_ROWS: usize = 1000;
pub const MAX_FRACTION_DIGITS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: u64,
    pub shown_rows: usize,
    pub truncated: bool,
}

/// Renders a query result into markup-safe strings, capped at
/// [`MAX_RENDERED_ROWS`] detail rows.
pub fn render_table(result: &QueryResult) -> RenderedTable {
    let columns = result
        .columns
        .iter()
        .map(|name| escape_html(name))
        .collect();

    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(MAX_RENDERED_ROWS)
        .map(|row| row.iter().map(|cell| escape_html(&format_cell(cell))).collect())
        .collect();

    let shown_rows = rows.len();
    RenderedTable {
        columns,
        rows,
        total_rows: result.row_count,
        shown_rows,
        truncated: (result.row_count as usize) > shown_rows,
    }
}

/// Formats one cell: null becomes the `NULL` token, integral values with
/// magnitude >= 1000 get thousands separators, fractional values are fixed
/// to [`MAX_FRACTION_DIGITS`] digits (never scientific notation), and
/// everything else renders as its plain text.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return group_thousands(int);
            }
            if let Some(float) = number.as_f64() {
                if float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
                    return group_thousands(float as i64);
                }
                return format!("{float:.prec$}", prec = MAX_FRACTION_DIGITS);
            }
            number.to_string()
        }
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    if value.unsigned_abs() < 1000 {
        return value.to_string();
    }

    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    let lead = digits.len() % 3;
    for (index, ch) in digits.chars().enumerate() {
        if index != 0 && (index + 3 - lead) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Total escape of arbitrary text for markup embedding.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
