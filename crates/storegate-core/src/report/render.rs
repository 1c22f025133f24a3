use std::fmt::Write;

use crate::TOOL_NAME;
use crate::config::ExitPolicy;
use crate::report::model::{Report, Verdict};
use crate::rules::model::Severity;
use crate::util::deterministic::{group_by_category, order_by_severity};

pub fn glyph(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "✓",
        Severity::Warning => "⚠",
        Severity::Error => "✗",
        Severity::Critical => "‼",
    }
}

/// Maps a verdict to a process exit code under `policy`.
pub fn exit_code(verdict: Verdict, policy: &ExitPolicy) -> i32 {
    policy.code_for(verdict)
}

/// Human-readable report. Every finding is printed, successes included.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", TOOL_NAME, report.tool.version);
    let _ = writeln!(out, "Target: {}", report.target.root);
    let _ = writeln!(out, "Profile: {}", report.profile);

    for (category, mut findings) in group_by_category(&report.findings) {
        order_by_severity(&mut findings);
        let _ = writeln!(out, "\n{category}");
        for f in findings {
            let _ = writeln!(out, "  {} {}", glyph(f.severity), f.message);
        }
    }

    let s = &report.summary;
    let _ = writeln!(
        out,
        "\nSummary: {} passed, {} warning(s), {} error(s), {} critical",
        s.success_count, s.warning_count, s.error_count, s.critical_count
    );
    let _ = writeln!(
        out,
        "Verdict: {} ({})",
        report.verdict.verdict, report.verdict.reason
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use crate::report::model::{TargetInfo, ToolInfo};
    use crate::rules::eval::Finding;

    fn f(category: &str, severity: Severity, message: &str) -> Finding {
        Finding {
            category: category.into(),
            rule: message.into(),
            severity,
            message: message.into(),
        }
    }

    fn report(findings: Vec<Finding>) -> Report {
        Report::new(
            ToolInfo {
                name: "storegate".into(),
                version: "0.1.0".into(),
            },
            TargetInfo {
                root: "/work/app".into(),
                artifacts: vec![],
            },
            &Profile::standard(),
            findings,
        )
    }

    #[test]
    fn groups_by_category_then_severity() {
        let text = render_text(&report(vec![
            f("Project Metadata", Severity::Success, "manifest found"),
            f("Project Metadata", Severity::Error, "app configuration not found"),
            f("Code Signing", Severity::Warning, "signing team not declared"),
        ]));

        let expected = "\
storegate 0.1.0
Target: /work/app
Profile: standard

Project Metadata
  ✗ app configuration not found
  ✓ manifest found

Code Signing
  ⚠ signing team not declared

Summary: 1 passed, 1 warning(s), 1 error(s), 0 critical
Verdict: FAILED (1 error finding(s))
";
        assert_eq!(text, expected);
    }

    #[test]
    fn rendering_is_deterministic() {
        let findings = vec![
            f("A", Severity::Critical, "x"),
            f("B", Severity::Success, "y"),
        ];
        assert_eq!(
            render_text(&report(findings.clone())),
            render_text(&report(findings))
        );
    }

    #[test]
    fn glyphs_are_distinct() {
        let glyphs: std::collections::HashSet<&str> =
            Severity::ALL.iter().map(|s| glyph(*s)).collect();
        assert_eq!(glyphs.len(), 4);
    }

    #[test]
    fn exit_code_uses_policy() {
        let policy = ExitPolicy {
            attention: 4,
            ..ExitPolicy::default()
        };
        assert_eq!(exit_code(Verdict::Attention, &policy), 4);
        assert_eq!(exit_code(Verdict::Critical, &policy), 1);
        assert_eq!(exit_code(Verdict::Approved, &policy), 0);
    }
}
