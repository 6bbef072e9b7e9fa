//! Output rendering: aligned text tables and pretty JSON
//!
//! The whole result set is buffered into one string before printing; there
//! is no streaming output.

use serde::Serialize;
use serde_json::Value;

use crate::normalize::Record;

/// Cells longer than this are cut before measuring and printing.
const MAX_CELL_WIDTH: usize = 50;

fn clip(cell: &str) -> String {
    cell.chars().take(MAX_CELL_WIDTH).collect()
}

/// Render rows as a left-aligned table.
///
/// Column width is the max of the header length and every (clipped) cell
/// length; columns are joined by two spaces and separated from the data by
/// a dash rule spanning `sum(widths) + 2 * columns`.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let clipped: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| clip(c)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let cell_max = clipped
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0);
            h.chars().count().max(cell_max)
        })
        .collect();

    let mut out = String::new();

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    out.push_str(&header_line.join("  "));
    out.push('\n');

    let rule_len: usize = widths.iter().sum::<usize>() + 2 * widths.len();
    out.push_str(&"-".repeat(rule_len));
    out.push('\n');

    for row in &clipped {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths.get(i).copied().unwrap_or(0)))
            .collect();
        out.push_str(&line.join("  "));
        out.push('\n');
    }

    out
}

/// Serialize with 2-space indentation.
pub fn to_json_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

/// Record field as a table cell. Scalars render naturally, null and absent
/// fields come out empty.
pub fn cell(rec: &Record, key: &str) -> String {
    match rec.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Numeric record field as a thousands-grouped cell.
pub fn count_cell(rec: &Record, key: &str) -> String {
    fmt_thousands(rec.get(key).and_then(Value::as_i64).unwrap_or(0))
}

/// Group digits by thousands for count columns (`1234567` -> `1,234,567`).
pub fn fmt_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_widths_and_rule() {
        let out = format_table(
            &["ID", "Name"],
            &[
                vec!["1".to_string(), "A".to_string()],
                vec!["22".to_string(), "BB".to_string()],
            ],
        );
        let lines: Vec<&str> = out.lines().collect();
        // widths: max(2, 2) = 2 and max(4, 2) = 4
        assert_eq!(lines[0], "ID  Name");
        // rule: (2 + 4) + 2 * 2 = 10 dashes
        assert_eq!(lines[1], "-".repeat(10));
        assert_eq!(lines[2], "1   A   ");
        assert_eq!(lines[3], "22  BB  ");
    }

    #[test]
    fn test_table_empty_rows() {
        assert_eq!(format_table(&["ID"], &[]), "");
    }

    #[test]
    fn test_cells_clipped_before_measuring() {
        let long = "x".repeat(80);
        let out = format_table(&["V"], &[vec![long]]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1].len(), 50 + 2);
        assert_eq!(lines[2].chars().count(), 50);
    }

    #[test]
    fn test_json_indentation() {
        let value = serde_json::json!([{"id": 1}]);
        let out = to_json_pretty(&value);
        assert!(out.contains("  \"id\": 1"));
    }

    #[test]
    fn test_cell_shapes() {
        let mut rec = Record::new();
        rec.insert("s".to_string(), serde_json::json!("text"));
        rec.insert("n".to_string(), serde_json::json!(42));
        rec.insert("none".to_string(), Value::Null);

        assert_eq!(cell(&rec, "s"), "text");
        assert_eq!(cell(&rec, "n"), "42");
        assert_eq!(cell(&rec, "none"), "");
        assert_eq!(cell(&rec, "absent"), "");
    }

    #[test]
    fn test_count_cell() {
        let mut rec = Record::new();
        rec.insert("impressions".to_string(), serde_json::json!(45000));
        assert_eq!(count_cell(&rec, "impressions"), "45,000");
        assert_eq!(count_cell(&rec, "clicks"), "0");
    }

    #[test]
    fn test_fmt_thousands() {
        assert_eq!(fmt_thousands(0), "0");
        assert_eq!(fmt_thousands(999), "999");
        assert_eq!(fmt_thousands(1000), "1,000");
        assert_eq!(fmt_thousands(1234567), "1,234,567");
        assert_eq!(fmt_thousands(-45000), "-45,000");
    }
}
