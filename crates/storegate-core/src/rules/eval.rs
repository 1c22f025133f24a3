//! Rule evaluation and the validation run.
//!
//! Evaluation is total: probe failures and predicate panics are turned
//! into findings, so a run always completes.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::probe::Probe;
use crate::rules::catalog::categories;
use crate::rules::model::{Outcome, Rule, RuleSet, Severity};

/// One emitted result of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: String,
    pub rule: String,
    pub severity: Severity,
    pub message: String,
}

/// Evaluates one rule against the probe, producing exactly one finding.
pub fn evaluate(rule: &Rule, category: &str, probe: &Probe) -> Finding {
    let checked = panic::catch_unwind(AssertUnwindSafe(|| rule.check(probe)));

    let (severity, message) = match checked {
        Ok(Ok(Outcome::Pass(observed))) => {
            (rule.on_pass.severity, rule.on_pass.render(observed.as_deref()))
        }
        Ok(Ok(Outcome::Fail(observed))) => {
            (rule.on_fail.severity, rule.on_fail.render(observed.as_deref()))
        }
        Ok(Err(cause)) => (
            rule.on_unavailable,
            format!("cannot evaluate {}: {cause}", rule.subject),
        ),
        Err(payload) => {
            let cause = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "rule panicked".to_string());
            (
                rule.on_unavailable,
                format!("cannot evaluate {}: {cause}", rule.subject),
            )
        }
    };

    debug!(category, rule = %rule.name, %severity, "rule evaluated");

    Finding {
        category: category.to_string(),
        rule: rule.name.clone(),
        severity,
        message,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// A single, non-resumable pass of rule sets over a target root.
#[derive(Debug)]
pub struct Run<'a> {
    probe: &'a Probe,
    state: RunState,
    findings: Vec<Finding>,
}

impl<'a> Run<'a> {
    pub fn new(probe: &'a Probe) -> Self {
        Self {
            probe,
            state: RunState::Idle,
            findings: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Evaluates every rule of every set, in declaration order.
    ///
    /// A root that is missing or not a directory yields one critical
    /// finding and no rule evaluation. The run is `Completed` either way.
    pub fn execute(mut self, rule_sets: &[RuleSet]) -> Self {
        self.state = RunState::Running;
        let root = self.probe.root();

        if !root.is_dir() {
            warn!(root = %root.display(), "target root is not a directory");
            self.findings.push(Finding {
                category: categories::TARGET.to_string(),
                rule: "target-root".to_string(),
                severity: Severity::Critical,
                message: format!(
                    "target root {} does not exist or is not a directory",
                    root.display()
                ),
            });
            self.state = RunState::Completed;
            return self;
        }

        for set in rule_sets {
            for rule in &set.rules {
                let finding = evaluate(rule, &set.name, self.probe);
                self.findings.push(finding);
            }
        }

        self.state = RunState::Completed;
        info!(
            root = %root.display(),
            findings = self.findings.len(),
            "validation run completed"
        );
        self
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn probe(dir: &TempDir) -> Probe {
        Probe::with_env(dir.path(), BTreeMap::new())
    }

    fn exists_rule(path: &'static str) -> Rule {
        Rule::new(format!("{path}-present"), path, move |p| {
            Ok(Outcome::from_bool(p.file_exists(path)))
        })
        .pass(Severity::Success, format!("{path} found"))
        .fail(Severity::Error, format!("{path} not found"))
    }

    #[test]
    fn pass_and_fail_use_rule_consequences() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let probe = probe(&dir);

        let found = evaluate(&exists_rule("package.json"), "Project Metadata", &probe);
        assert_eq!(found.severity, Severity::Success);
        assert_eq!(found.message, "package.json found");
        assert_eq!(found.category, "Project Metadata");
        assert_eq!(found.rule, "package.json-present");

        let missing = evaluate(&exists_rule("app.json"), "Project Metadata", &probe);
        assert_eq!(missing.severity, Severity::Error);
        assert_eq!(missing.message, "app.json not found");
    }

    #[test]
    fn probe_errors_become_unavailable_findings() {
        let dir = TempDir::new().unwrap();
        let probe = probe(&dir);
        let rule = Rule::new("bundle-id", "iOS bundle identifier", |p| {
            p.read_json("app.json").map(|_| Outcome::Pass(None))
        })
        .fail(Severity::Critical, "missing");

        let finding = evaluate(&rule, "App Identity", &probe);

        assert_eq!(finding.severity, Severity::Error);
        assert_eq!(
            finding.message,
            "cannot evaluate iOS bundle identifier: app.json not found"
        );
    }

    #[test]
    fn panicking_predicate_is_contained() {
        let dir = TempDir::new().unwrap();
        let probe = probe(&dir);
        let rule = Rule::new("boom", "exploding check", |_| -> Result<Outcome, ProbeError> {
            panic!("unexpected shape")
        })
        .fail(Severity::Warning, "never");

        let finding = evaluate(&rule, "Demo", &probe);

        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(
            finding.message,
            "cannot evaluate exploding check: unexpected shape"
        );
    }

    #[test]
    fn run_preserves_declaration_order_and_completes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        let probe = probe(&dir);
        let sets = vec![
            RuleSet::new("First")
                .rule(exists_rule("b.txt"))
                .rule(exists_rule("a.txt")),
            RuleSet::new("Second").rule(exists_rule("c.txt")),
        ];

        let run = Run::new(&probe);
        assert_eq!(run.state(), RunState::Idle);

        let run = run.execute(&sets);
        assert_eq!(run.state(), RunState::Completed);

        let order: Vec<(&str, &str)> = run
            .findings()
            .iter()
            .map(|f| (f.category.as_str(), f.rule.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("First", "b.txt-present"),
                ("First", "a.txt-present"),
                ("Second", "c.txt-present"),
            ]
        );
    }

    #[test]
    fn missing_root_yields_single_critical_finding() {
        let dir = TempDir::new().unwrap();
        let probe = Probe::with_env(dir.path().join("nope"), BTreeMap::new());
        let sets = vec![RuleSet::new("First").rule(exists_rule("a.txt"))];

        let run = Run::new(&probe).execute(&sets);

        assert_eq!(run.state(), RunState::Completed);
        let findings = run.into_findings();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, categories::TARGET);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let probe = probe(&dir);
        let sets = vec![RuleSet::new("First")
            .rule(exists_rule("a.txt"))
            .rule(exists_rule("b.txt"))];

        let first = Run::new(&probe).execute(&sets).into_findings();
        let second = Run::new(&probe).execute(&sets).into_findings();

        assert_eq!(first, second);
    }
}
