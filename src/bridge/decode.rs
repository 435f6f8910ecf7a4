use serde_json::Value;
use tracing::{debug, warn};

use super::options::JSON_REPORT;
use crate::report::types::{AnalysisResult, Finding};

/// Decode analyzer output according to the requested report type.
///
/// A finding's key is the object key it was filed under, else its own
/// `Key` field, else its `Item` code.
///
/// JSON mode never fails: output that is empty or not understood
/// [degrades](degrade) to a single blank finding so a report can always be
/// rendered. Other report types are passed through as text.
pub fn decode(raw: &[u8], report_type: &str) -> AnalysisResult {
    if report_type != JSON_REPORT {
        return AnalysisResult::Raw(String::from_utf8_lossy(raw).into_owned());
    }
    AnalysisResult::Findings(decode_findings(raw))
}

/// Fallback for output the decoder cannot use: one empty finding.
pub fn degrade(reason: &str) -> Vec<Finding> {
    warn!(reason, "analyzer output not decodable, using an empty finding");
    vec![Finding::default()]
}

fn decode_findings(raw: &[u8]) -> Vec<Finding> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return degrade("empty output");
    }

    let value: Value = match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(err) => return degrade(&err.to_string()),
    };

    let findings: Vec<Finding> = match value {
        Value::Array(items) => items.into_iter().map(|v| finding_from(None, v)).collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, v)| finding_from(Some(key), v))
            .collect(),
        other => return degrade(&format!("unexpected JSON {}", json_kind(&other))),
    };
    debug!(findings = findings.len(), "decoded analyzer findings");
    findings
}

fn finding_from(key: Option<String>, value: Value) -> Finding {
    let mut finding: Finding = serde_json::from_value(value).unwrap_or_else(|err| {
        debug!(error = %err, "finding entry is not an object");
        Finding::default()
    });
    finding.key = match key {
        Some(key) => key,
        None => match finding.extra.remove("Key") {
            Some(Value::String(key)) => key,
            Some(other) if !other.is_null() => other.to_string(),
            _ => finding.item.clone(),
        },
    };
    finding
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings(result: AnalysisResult) -> Vec<Finding> {
        match result {
            AnalysisResult::Findings(f) => f,
            AnalysisResult::Raw(text) => panic!("expected findings, got raw {text:?}"),
        }
    }

    #[test]
    fn test_decode_object_keyed_findings() {
        let raw = br####"{
            "EXP.000": {"Item":"EXP.000","Severity":"L0","Case":"### Plan\n"},
            "ALI.001": {"Item":"ALI.001","Severity":"L1","Summary":"alias"}
        }"####;
        let decoded = findings(decode(raw, "json"));
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].key, "EXP.000");
        assert!(decoded[0].is_explain());
        assert_eq!(decoded[1].key, "ALI.001");
        assert_eq!(decoded[1].summary, "alias");
    }

    #[test]
    fn test_decode_array_uses_item_as_key() {
        let raw = br#"[{"Item":"RULE1","Severity":"L4"},{"Item":"EXP001","Severity":"L2"}]"#;
        let decoded = findings(decode(raw, "json"));
        assert_eq!(decoded[0].key, "RULE1");
        assert!(decoded[1].is_explain());
    }

    #[test]
    fn test_decode_key_field_marks_explain() {
        let raw = br####"[{"Key":"EXP001","Severity":"L2","Case":"### Title\n* point\n"}]"####;
        let decoded = findings(decode(raw, "json"));
        assert_eq!(decoded[0].key, "EXP001");
        assert!(decoded[0].extra.get("Key").is_none());

        let report = crate::report::score::score(decoded);
        assert_eq!(report.score, 90);
        assert!(report.findings.is_empty());
        assert_eq!(report.explain.as_ref().unwrap().key, "EXP001");

        let html = crate::report::render::render_explain(&report);
        assert!(html.contains("<h3"));
        assert!(html.contains("<ul"));
    }

    #[test]
    fn test_decode_key_precedence() {
        let raw = br#"[{"Key":"RULE1","Item":"ITEM1"},{"Item":"ITEM2"},{"Key":null,"Item":"ITEM3"}]"#;
        let keys: Vec<String> = findings(decode(raw, "json")).into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["RULE1", "ITEM2", "ITEM3"]);

        let raw = br#"{"OUTER":{"Key":"EXP.9","Item":"X"}}"#;
        assert_eq!(findings(decode(raw, "json"))[0].key, "OUTER");
    }

    #[test]
    fn test_decode_valid_empty_collections_are_empty() {
        // well-formed but empty output is zero findings, not a degraded one
        assert!(findings(decode(b"[]", "json")).is_empty());
        assert!(findings(decode(b"{}", "json")).is_empty());
        assert!(findings(decode(b" [ ] \n", "json")).is_empty());
    }

    #[test]
    fn test_malformed_output_degrades() {
        assert_eq!(findings(decode(b"{not json", "json")), vec![Finding::default()]);
        assert_eq!(findings(decode(b"", "json")), vec![Finding::default()]);
        assert_eq!(findings(decode(b" \n", "json")), vec![Finding::default()]);
        assert_eq!(findings(decode(b"42", "json")), vec![Finding::default()]);
    }

    #[test]
    fn test_non_object_entry_degrades_individually() {
        let decoded = findings(decode(br#"[{"Item":"A","Severity":"L1"}, 7]"#, "json"));
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].level(), 1);
        assert_eq!(decoded[1], Finding::default());
    }

    #[test]
    fn test_raw_mode_passes_text_through() {
        let text = "# Query: 1\n\n★ ★ ★ ☆ ☆ 60分\n";
        assert_eq!(
            decode(text.as_bytes(), "markdown"),
            AnalysisResult::Raw(text.to_string())
        );
        assert_eq!(decode(b"{}", "text"), AnalysisResult::Raw("{}".to_string()));
    }
}
