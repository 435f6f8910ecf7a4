use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Marker carried by the key of the explain-plan note.
pub const EXPLAIN_MARKER: &str = "EXP";

/// One issue (or the explain-plan note) reported by the analyzer.
///
/// Every field is optional on the wire; anything missing decodes to an
/// empty string and fields we do not model are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Finding {
    /// Identifier used for explain-class detection: the object key the
    /// analyzer filed this finding under, or its `Item` code.
    #[serde(skip)]
    pub key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub severity: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub case: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Finding {
    pub fn is_explain(&self) -> bool {
        self.key.contains(EXPLAIN_MARKER)
    }

    pub fn level(&self) -> u32 {
        severity_level(&self.severity)
    }
}

/// Accept strings, numbers, booleans and null where a string is expected.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Parse a severity code such as `L3` into its level.
///
/// Anything that is not `L`/`l` followed by digits is level 0. Levels too
/// large for a `u32` saturate.
pub fn severity_level(raw: &str) -> u32 {
    let raw = raw.trim();
    let Some(digits) = raw.strip_prefix('L').or_else(|| raw.strip_prefix('l')) else {
        return 0;
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

/// What one analyzer run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    /// JSON report mode: the decoded findings.
    Findings(Vec<Finding>),
    /// Any other report mode: the analyzer output, untouched.
    Raw(String),
}

/// An ordinary finding together with its parsed severity level.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFinding {
    pub level: u32,
    pub finding: Finding,
}

/// Score and ordering derived from one set of findings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReport {
    /// 100 minus five points per severity level, never below zero
    pub score: u32,
    /// The explain-plan note, if the analyzer sent one
    pub explain: Option<Finding>,
    /// Ordinary findings, highest level first
    pub findings: Vec<RankedFinding>,
}
