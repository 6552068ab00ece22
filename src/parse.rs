//! Text extraction from captured `mloop` output.
//!
//! strip_control_sequences / clean_output      - terminal noise removal
//! parse_table                                 - header + separator tables
//! parse_key_value_pairs                       - "Key: Value" / "Key = Value" lines
//! try_parse_structured                        - JSON, or None

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::LazyLock;

/// One parsed table row keyed by column header, in header order.
pub type Row = Map<String, Value>;

static CONTROL_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-9;]*[a-zA-Z]").expect("control sequence regex"));
static SEPARATOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-─═]+").expect("separator regex"));
static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("column gap regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:=]+)[:\s=]+(.+)$").expect("key value regex"));

/// Remove ANSI/VT escape sequences (`ESC [ params letter`).
///
/// Repeats until nothing matches, so removing one sequence cannot leave a
/// new one behind and the result is a fixed point.
pub fn strip_control_sequences(text: &str) -> Cow<'_, str> {
    if !CONTROL_SEQUENCE.is_match(text) {
        return Cow::Borrowed(text);
    }
    let mut out = CONTROL_SEQUENCE.replace_all(text, "").into_owned();
    while CONTROL_SEQUENCE.is_match(&out) {
        out = CONTROL_SEQUENCE.replace_all(&out, "").into_owned();
    }
    Cow::Owned(out)
}

/// Default transform for every textual response.
pub fn clean_output(text: &str) -> String {
    strip_control_sequences(text).trim().to_string()
}

/// Parse a table with a header line and a dashed/box-drawing separator.
///
/// Columns are split on runs of two or more whitespace characters. Without a
/// separator line, header and rows are split on any whitespace instead.
pub fn parse_table(text: &str) -> Vec<Row> {
    let cleaned = clean_output(text);
    let lines: Vec<&str> = cleaned.split('\n').collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let header = lines[0];
    if header.is_empty() {
        return Vec::new();
    }

    if !SEPARATOR_LINE.is_match(lines[1]) {
        return zip_rows(&lines, 1, &WHITESPACE);
    }

    zip_rows(&lines, 2, &COLUMN_GAP)
}

fn zip_rows(lines: &[&str], first_row: usize, splitter: &Regex) -> Vec<Row> {
    let headers: Vec<&str> = splitter
        .split(lines[0])
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .collect();

    lines
        .iter()
        .skip(first_row)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let values: Vec<&str> = splitter.split(line).map(str::trim).collect();
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let value = values.get(idx).copied().unwrap_or_default();
                    (header.to_string(), Value::String(value.to_string()))
                })
                .collect()
        })
        .collect()
}

/// Extract `Key: Value` / `Key = Value` lines in first-seen order.
///
/// Later duplicates overwrite the value; an empty value is kept as `""`.
pub fn parse_key_value_pairs(text: &str) -> Map<String, Value> {
    let mut pairs = Map::new();
    for line in clean_output(text).split('\n') {
        let Some(caps) = KEY_VALUE.captures(line) else {
            continue;
        };
        let key = caps[1].trim();
        if key.is_empty() {
            continue;
        }
        pairs.insert(key.to_string(), Value::String(caps[2].trim().to_string()));
    }
    pairs
}

/// Strict JSON decoding of the cleaned text; `None` on any failure.
pub fn try_parse_structured<T: DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::from_str(&clean_output(text)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_control_sequences("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(
            strip_control_sequences("\x1b[1;32mbold green\x1b[0m"),
            "bold green"
        );
        assert_eq!(strip_control_sequences("plain"), "plain");
    }

    #[test]
    fn stripping_is_idempotent() {
        let samples = [
            "\x1b[2K\x1b[1Gprogress 50%",
            "\x1b\x1b[0m[31mnested",
            "no escapes at all",
            "\x1b[38;5;208morange\x1b[0m tail",
        ];
        for s in samples {
            let once = strip_control_sequences(s).into_owned();
            let twice = strip_control_sequences(&once).into_owned();
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn clean_output_trims() {
        assert_eq!(clean_output("\n  \x1b[32mdone\x1b[0m \n"), "done");
    }

    #[test]
    fn parses_separated_table() {
        let text = "\
Experiment  Status     Accuracy
----------  ---------  --------
exp-001     Completed  0.91
exp-002     Failed

exp-003     Completed  0.95
";
        let rows = parse_table(text);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Experiment"], "exp-001");
        assert_eq!(rows[0]["Accuracy"], "0.91");
        assert_eq!(rows[1]["Status"], "Failed");
        assert_eq!(rows[1]["Accuracy"], "");
        assert_eq!(rows[2]["Experiment"], "exp-003");
        assert!(rows.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn parses_box_drawing_separator_with_spaced_headers() {
        let text = "Model Name    Best Metric\n═════════════════════════\ndefault       0.88\n";
        let rows = parse_table(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Model Name"], "default");
        assert_eq!(rows[0]["Best Metric"], "0.88");
    }

    #[test]
    fn falls_back_to_whitespace_columns() {
        let text = "id status\nexp-1 done\nexp-2\n";
        let rows = parse_table(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["status"], "done");
        assert_eq!(rows[1]["id"], "exp-2");
        assert_eq!(rows[1]["status"], "");
    }

    #[test]
    fn too_short_for_a_table() {
        assert!(parse_table("just one line").is_empty());
        assert!(parse_table("").is_empty());
    }

    #[test]
    fn key_values_with_mixed_separators() {
        let text = "Project: churn\nRows = 1200\nLabel :  Exited\nProject: churn-v2\n";
        let pairs = parse_key_value_pairs(text);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs["Project"], "churn-v2");
        assert_eq!(pairs["Rows"], "1200");
        assert_eq!(pairs["Label"], "Exited");
    }

    #[test]
    fn blank_values_are_kept() {
        let pairs = parse_key_value_pairs("Model: churn\nNotes: \nRows = 10");
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs["Notes"], "");
        let keys: Vec<&str> = pairs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Model", "Notes", "Rows"]);
    }

    #[test]
    fn columns_keep_header_order() {
        let text = "Status     Experiment  Accuracy\n---------  ----------  --------\nDone       exp-001     0.91\n";
        let rows = parse_table(text);
        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["Status", "Experiment", "Accuracy"]);
        assert_eq!(
            serde_json::to_string(&rows[0]).unwrap(),
            r#"{"Status":"Done","Experiment":"exp-001","Accuracy":"0.91"}"#
        );
    }

    #[test]
    fn structured_output_or_none() {
        let parsed: Option<Value> = try_parse_structured("\x1b[0m{\"accuracy\": 0.9}\n");
        assert_eq!(parsed, Some(json!({"accuracy": 0.9})));

        let failed: Option<Value> = try_parse_structured("Accuracy: 0.9");
        assert!(failed.is_none());
    }
}
