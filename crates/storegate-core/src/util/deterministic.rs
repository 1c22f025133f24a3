//! Deterministic ordering helpers.
//!
//! Reports group findings by category and severity without losing the
//! rule declaration order. Everything here uses stable sorts and
//! first-appearance ordering so identical runs render identically.

use crate::rules::eval::Finding;

/// Group findings by category, categories in order of first appearance.
///
/// Findings inside each group keep their original relative order.
pub fn group_by_category(findings: &[Finding]) -> Vec<(&str, Vec<&Finding>)> {
    let mut groups: Vec<(&str, Vec<&Finding>)> = Vec::new();

    for finding in findings {
        match groups.iter_mut().find(|(c, _)| *c == finding.category) {
            Some((_, members)) => members.push(finding),
            None => groups.push((finding.category.as_str(), vec![finding])),
        }
    }

    groups
}

/// Order findings most severe first.
///
/// Stable: findings of equal severity keep declaration order.
pub fn order_by_severity(findings: &mut [&Finding]) {
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
}
