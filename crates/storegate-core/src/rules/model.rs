use std::fmt;

use serde::{Deserialize, Serialize};

use crate::probe::{Probe, ProbeError};

/// Finding severity, ordered by ascending blocking-ness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Success,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a rule predicate, optionally carrying an observed value
/// that is interpolated into the finding message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass(Option<String>),
    Fail(Option<String>),
}

impl Outcome {
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Outcome::Pass(None)
        } else {
            Outcome::Fail(None)
        }
    }

    pub fn pass_with(observed: impl Into<String>) -> Self {
        Outcome::Pass(Some(observed.into()))
    }

    pub fn fail_with(observed: impl Into<String>) -> Self {
        Outcome::Fail(Some(observed.into()))
    }
}

/// Severity and message template emitted for one side of a rule.
///
/// `{observed}` in the template is replaced by the predicate's detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consequence {
    pub severity: Severity,
    pub template: String,
}

impl Consequence {
    pub fn new(severity: Severity, template: impl Into<String>) -> Self {
        Self {
            severity,
            template: template.into(),
        }
    }

    pub fn render(&self, observed: Option<&str>) -> String {
        self.template
            .replace("{observed}", observed.unwrap_or("unknown"))
    }
}

pub type Predicate = Box<dyn Fn(&Probe) -> Result<Outcome, ProbeError> + Send + Sync>;

/// A named predicate over a probe with pass/fail consequences.
///
/// Rules hold no state; the same rule evaluated against an unchanged
/// tree always produces the same finding.
pub struct Rule {
    pub name: String,
    /// Noun phrase naming what the rule inspects, used when the rule
    /// cannot be evaluated.
    pub subject: String,
    pub on_pass: Consequence,
    pub on_fail: Consequence,
    pub on_unavailable: Severity,
    predicate: Predicate,
}

impl Rule {
    /// Defaults: pass → success, fail → error, unavailable → error.
    pub fn new<F>(name: impl Into<String>, subject: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Probe) -> Result<Outcome, ProbeError> + Send + Sync + 'static,
    {
        let subject = subject.into();
        Self {
            name: name.into(),
            on_pass: Consequence::new(Severity::Success, format!("{subject} ok")),
            on_fail: Consequence::new(Severity::Error, format!("{subject} failed")),
            on_unavailable: Severity::Error,
            subject,
            predicate: Box::new(predicate),
        }
    }

    pub fn pass(mut self, severity: Severity, template: impl Into<String>) -> Self {
        self.on_pass = Consequence::new(severity, template);
        self
    }

    /// Sets the failure consequence. The unavailable severity follows it,
    /// capped at `error`: a rule that cannot look at its input does not
    /// escalate to critical.
    pub fn fail(mut self, severity: Severity, template: impl Into<String>) -> Self {
        self.on_fail = Consequence::new(severity, template);
        self.on_unavailable = severity.min(Severity::Error);
        self
    }

    pub fn check(&self, probe: &Probe) -> Result<Outcome, ProbeError> {
        (self.predicate)(probe)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("subject", &self.subject)
            .field("on_pass", &self.on_pass)
            .field("on_fail", &self.on_fail)
            .field("on_unavailable", &self.on_unavailable)
            .finish_non_exhaustive()
    }
}

/// An ordered collection of rules under one category name.
#[derive(Debug)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Appends a rule. Names are unique within a set.
    pub fn rule(mut self, rule: Rule) -> Self {
        debug_assert!(
            self.rules.iter().all(|r| r.name != rule.name),
            "duplicate rule name {} in {}",
            rule.name,
            self.name
        );
        self.rules.push(rule);
        self
    }
}
