use tracing::debug;

use super::types::{Finding, RankedFinding, ScoredReport};

pub const FULL_MARKS: u32 = 100;
pub const POINTS_PER_LEVEL: u32 = 5;

/// Score a set of findings and split off the explain-plan note.
///
/// Every finding, the explain note included, costs five points per
/// severity level. When several explain notes are present the last one
/// is kept. Ordinary findings are sorted by level, highest first; equal
/// levels keep their input order.
pub fn score(findings: Vec<Finding>) -> ScoredReport {
    let mut deduction: u64 = 0;
    let mut explain = None;
    let mut ranked = Vec::with_capacity(findings.len());

    for finding in findings {
        let level = finding.level();
        deduction = deduction.saturating_add(u64::from(level) * u64::from(POINTS_PER_LEVEL));
        if finding.is_explain() {
            explain = Some(finding);
        } else {
            ranked.push(RankedFinding { level, finding });
        }
    }

    // stable
    ranked.sort_by(|a, b| b.level.cmp(&a.level));

    let score = u64::from(FULL_MARKS).saturating_sub(deduction) as u32;
    debug!(score, deduction, findings = ranked.len(), explain = explain.is_some(), "scored findings");

    ScoredReport {
        score,
        explain,
        findings: ranked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(key: &str, severity: &str) -> Finding {
        Finding {
            key: key.to_string(),
            item: key.to_string(),
            severity: severity.to_string(),
            ..Finding::default()
        }
    }

    #[test]
    fn test_single_ordinary_finding() {
        let mut f = finding("RULE1", "L4");
        f.summary = "s1".to_string();
        let report = score(vec![f]);
        assert_eq!(report.score, 80);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].level, 4);
        assert!(report.explain.is_none());
    }

    #[test]
    fn test_explain_finding_counts_but_is_separated() {
        let mut f = finding("EXP001", "L2");
        f.case = "### Title\n* point\n".to_string();
        let report = score(vec![f]);
        assert_eq!(report.score, 90);
        assert!(report.findings.is_empty());
        assert_eq!(report.explain.unwrap().key, "EXP001");
    }

    #[test]
    fn test_score_clamps_at_zero() {
        assert_eq!(score(vec![finding("A", "L25")]).score, 0);
        assert_eq!(score(vec![finding("A", "L20")]).score, 0);
        assert_eq!(score(vec![finding("A", "L19")]).score, 5);
        assert_eq!(
            score(vec![finding("A", "L4294967295"), finding("B", "L4294967295")]).score,
            0
        );
    }

    #[test]
    fn test_empty_input() {
        let report = score(vec![]);
        assert_eq!(report.score, 100);
        assert!(report.findings.is_empty());
        assert!(report.explain.is_none());
    }

    #[test]
    fn test_score_sums_all_levels() {
        let report = score(vec![
            finding("A", "L1"),
            finding("EXP.000", "L3"),
            finding("B", "bogus"),
            finding("C", "l2"),
        ]);
        assert_eq!(report.score, 100 - 5 * (1 + 3 + 0 + 2));
    }

    #[test]
    fn test_sort_descending_and_stable() {
        let report = score(vec![
            finding("A", "L1"),
            finding("B", "L3"),
            finding("C", "L1"),
            finding("D", "L3"),
            finding("E", "L0"),
        ]);
        let order: Vec<&str> = report.findings.iter().map(|r| r.finding.key.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C", "E"]);
    }

    #[test]
    fn test_last_explain_finding_wins() {
        let report = score(vec![
            finding("EXP.000", "L1"),
            finding("A", "L1"),
            finding("EXP.001", "L1"),
        ]);
        assert_eq!(report.explain.unwrap().key, "EXP.001");
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.score, 85);
    }
}
