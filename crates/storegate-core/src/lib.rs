pub mod config;
pub mod probe;
pub mod report;
pub mod rules;
pub mod util;

use std::path::Path;

use config::Profile;
use probe::{Probe, fingerprint};
use report::model::{Report, TargetInfo, ToolInfo};
use rules::{catalog, eval::Run};

pub const TOOL_NAME: &str = "storegate";

/// JSON schema version of storegate reports.
/// This must be bumped only when the report contract changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

pub const RULE_CATALOG_VERSION: &str = "0.1.0";

/// Validate the project at `root` under `profile`.
///
/// Captures the profile's credential variables from the process
/// environment, then delegates to [`validate_with`].
pub fn validate(root: &Path, profile: &Profile, tool: ToolInfo) -> Report {
    let probe = Probe::new(root, &profile.credentials.env);
    validate_with(&probe, profile, tool)
}

/// Validate through an existing probe.
///
/// Never fails: every problem in the target tree is a finding, and a
/// missing root is reported as a single critical finding.
pub fn validate_with(probe: &Probe, profile: &Profile, tool: ToolInfo) -> Report {
    let rule_sets = catalog::rule_sets(profile);
    let findings = Run::new(probe).execute(&rule_sets).into_findings();

    let target = TargetInfo {
        root: probe.root().display().to_string(),
        artifacts: fingerprint::fingerprint_all(probe, &profile.paths.files()),
    };

    Report::new(tool, target, profile, findings)
}
