use serde::{Deserialize, Serialize};

use crate::{RULE_CATALOG_VERSION, SCHEMA_VERSION};
use crate::config::Profile;
use crate::report::aggregate::{self, Summary};
use crate::rules::eval::Finding;

/// Top-level storegate report.
///
/// This struct is the stable JSON contract of the tool. It must remain
/// deterministic for identical target trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub rule_catalog_version: String,
    pub tool: ToolInfo,
    pub target: TargetInfo,
    pub profile: String,
    pub findings: Vec<Finding>,
    pub summary: Summary,
    pub verdict: VerdictInfo,
}

impl Report {
    /// Assemble a report from a completed run.
    ///
    /// Findings keep their evaluation order; summary and verdict are
    /// derived here and nowhere else.
    pub fn new(tool: ToolInfo, target: TargetInfo, profile: &Profile, findings: Vec<Finding>) -> Self {
        let summary = aggregate::aggregate(&findings);
        let verdict = aggregate::verdict(&summary, &profile.thresholds);
        let exit_code = profile.exit_codes.code_for(verdict);

        let verdict = VerdictInfo {
            verdict,
            policy: profile.name.clone(),
            reason: aggregate::explain(&summary, verdict, &profile.thresholds),
            blocking: exit_code != 0,
            exit_code,
        };

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            rule_catalog_version: RULE_CATALOG_VERSION.to_string(),
            tool,
            target,
            profile: profile.name.clone(),
            findings,
            summary,
            verdict,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.verdict.exit_code
    }
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// The validated root and fingerprints of the artifacts rules inspect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInfo {
    pub root: String,
    pub artifacts: Vec<ArtifactInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub path: String,
    pub present: bool,
    pub size_bytes: Option<u64>,
    pub hash: Option<ArtifactHash>,
}

/// Cryptographic artifact fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactHash {
    pub algorithm: String,
    pub value: String,
}

/// Aggregate verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Attention,
    Failed,
    Critical,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "APPROVED",
            Verdict::Attention => "ATTENTION",
            Verdict::Failed => "FAILED",
            Verdict::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerdictInfo {
    pub verdict: Verdict,
    pub policy: String,
    pub reason: String,
    pub blocking: bool,
    pub exit_code: i32,
}
