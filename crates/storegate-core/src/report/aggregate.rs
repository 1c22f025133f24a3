//! Aggregation of findings into counts and a verdict.
//!
//! Responsibilities:
//! - Count findings per severity, overall and per category
//! - Derive one verdict from the counts and profile thresholds
//! - Explain the verdict in one line
//!
//! Non-responsibilities:
//! - Evaluating rules (handled in `rules::eval`)
//! - Reading finding messages: only severities and categories are used
//!
//! Verdict precedence is fixed, most severe wins:
//!
//!   - Any critical finding              → CRITICAL
//!   - Else any error finding            → FAILED
//!   - Else warnings above the threshold → ATTENTION
//!   - Else                              → APPROVED

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::report::model::Verdict;
use crate::rules::eval::Finding;
use crate::rules::model::Severity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub success: u32,
    pub warning: u32,
    pub error: u32,
    pub critical: u32,
}

impl SeverityCounts {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Success => self.success += 1,
            Severity::Warning => self.warning += 1,
            Severity::Error => self.error += 1,
            Severity::Critical => self.critical += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    #[serde(flatten)]
    pub counts: SeverityCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub success_count: u32,
    pub warning_count: u32,
    pub error_count: u32,
    pub critical_count: u32,
    /// Categories in order of first appearance.
    pub findings_by_category: Vec<CategorySummary>,
}

/// Counts findings overall and per category.
pub fn aggregate(findings: &[Finding]) -> Summary {
    let mut totals = SeverityCounts::default();
    let mut by_category: Vec<CategorySummary> = Vec::new();

    for finding in findings {
        totals.record(finding.severity);

        let idx = match by_category
            .iter()
            .position(|c| c.category == finding.category)
        {
            Some(idx) => idx,
            None => {
                by_category.push(CategorySummary {
                    category: finding.category.clone(),
                    counts: SeverityCounts::default(),
                });
                by_category.len() - 1
            }
        };
        by_category[idx].counts.record(finding.severity);
    }

    Summary {
        success_count: totals.success,
        warning_count: totals.warning,
        error_count: totals.error,
        critical_count: totals.critical,
        findings_by_category: by_category,
    }
}

/// Derives the verdict. Pure; precedence never depends on input order.
pub fn verdict(summary: &Summary, thresholds: &Thresholds) -> Verdict {
    if summary.critical_count > 0 {
        return Verdict::Critical;
    }
    if summary.error_count > 0 {
        return Verdict::Failed;
    }
    match thresholds.max_warnings_for_approval {
        Some(max) if summary.warning_count > max => Verdict::Attention,
        _ => Verdict::Approved,
    }
}

/// One-line reason for a verdict.
pub fn explain(summary: &Summary, verdict: Verdict, thresholds: &Thresholds) -> String {
    match verdict {
        Verdict::Critical => format!("{} critical finding(s)", summary.critical_count),
        Verdict::Failed => format!("{} error finding(s)", summary.error_count),
        Verdict::Attention => format!(
            "{} warning(s) exceed the limit of {}",
            summary.warning_count,
            thresholds.max_warnings_for_approval.unwrap_or_default()
        ),
        Verdict::Approved if summary.warning_count > 0 => format!(
            "no blocking findings, {} warning(s)",
            summary.warning_count
        ),
        Verdict::Approved => "all requirements met".to_string(),
    }
}
