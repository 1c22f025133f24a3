//! Validation profiles.
//!
//! A profile bundles everything a run is parameterized by: verdict
//! thresholds, the verdict → exit code policy, artifact locations and rule
//! inputs. Three profiles are built in; others are loaded from TOML, with
//! omitted tables falling back to the standard profile.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::report::model::Verdict;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub thresholds: Thresholds,
    pub exit_codes: ExitPolicy,
    pub paths: ArtifactPaths,
    pub privacy: PrivacyConfig,
    pub workflow: WorkflowConfig,
    pub credentials: CredentialsConfig,
}

impl Default for Profile {
    fn default() -> Self {
        Self::standard()
    }
}

impl Profile {
    /// Non-blocking on warnings; more than five warnings draws attention.
    pub fn standard() -> Self {
        Self {
            name: "standard".into(),
            thresholds: Thresholds {
                max_warnings_for_approval: Some(5),
            },
            exit_codes: ExitPolicy::default(),
            paths: ArtifactPaths::default(),
            privacy: PrivacyConfig::default(),
            workflow: WorkflowConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }

    /// Any warning draws attention, and attention blocks.
    pub fn strict() -> Self {
        Self {
            name: "strict".into(),
            thresholds: Thresholds {
                max_warnings_for_approval: Some(0),
            },
            exit_codes: ExitPolicy {
                attention: 1,
                ..ExitPolicy::default()
            },
            ..Self::standard()
        }
    }

    /// No warning threshold; only critical findings block.
    pub fn lenient() -> Self {
        Self {
            name: "lenient".into(),
            thresholds: Thresholds {
                max_warnings_for_approval: None,
            },
            exit_codes: ExitPolicy {
                failed: 0,
                ..ExitPolicy::default()
            },
            ..Self::standard()
        }
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::standard()),
            "strict" => Some(Self::strict()),
            "lenient" => Some(Self::lenient()),
            _ => None,
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse profile")
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading profile from '{}'", path.display());

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read profile '{}'", path.display()))?;

        toml::from_str(&text).with_context(|| format!("parse profile '{}'", path.display()))
    }
}

/// Verdict thresholds.
///
/// `max_warnings_for_approval = None` disables the warning gate. A
/// `[thresholds]` table without the key therefore disables it too.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Thresholds {
    pub max_warnings_for_approval: Option<u32>,
}

/// Exit code per verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExitPolicy {
    pub approved: i32,
    pub attention: i32,
    pub failed: i32,
    pub critical: i32,
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            approved: 0,
            attention: 0,
            failed: 1,
            critical: 1,
        }
    }
}

impl ExitPolicy {
    pub fn code_for(&self, verdict: Verdict) -> i32 {
        match verdict {
            Verdict::Approved => self.approved,
            Verdict::Attention => self.attention,
            Verdict::Failed => self.failed,
            Verdict::Critical => self.critical,
        }
    }
}

/// Artifact locations relative to the target root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactPaths {
    pub manifest: String,
    pub app_config: String,
    pub entitlements: String,
    pub export_options: String,
    pub workflow: String,
    pub metadata_dir: String,
    pub store_info: String,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            manifest: "package.json".into(),
            app_config: "app.json".into(),
            entitlements: "ios/App.entitlements".into(),
            export_options: "ios/ExportOptions.plist".into(),
            workflow: ".github/workflows/ios-release.yml".into(),
            metadata_dir: "store/metadata/en-US".into(),
            store_info: "store/app-store-info.json".into(),
        }
    }
}

impl ArtifactPaths {
    /// Every file the rules may read, in report order.
    pub fn files(&self) -> Vec<String> {
        use crate::rules::catalog::{DESCRIPTION_FILE, KEYWORDS_FILE, RELEASE_NOTES_FILE};

        let dir = self.metadata_dir.trim_end_matches('/');
        vec![
            self.manifest.clone(),
            self.app_config.clone(),
            self.entitlements.clone(),
            self.export_options.clone(),
            self.workflow.clone(),
            format!("{dir}/{DESCRIPTION_FILE}"),
            format!("{dir}/{KEYWORDS_FILE}"),
            format!("{dir}/{RELEASE_NOTES_FILE}"),
            self.store_info.clone(),
        ]
    }
}

/// Capabilities whose usage descriptions are always required.
///
/// Names refer to the capability table in `rules::catalog`; unknown names
/// match nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PrivacyConfig {
    pub required: Vec<String>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            required: ["camera", "microphone", "photos", "biometrics", "location"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub required_stages: Vec<String>,
    pub recommended_stages: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            required_stages: vec!["archive:".into(), "deploy:".into()],
            recommended_stages: vec!["environment:".into(), "steps:".into()],
        }
    }
}

/// Environment variables whose presence is checked. Values are never read
/// into reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialsConfig {
    pub env: Vec<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env: vec![
                "APP_STORE_CONNECT_API_KEY_ID".into(),
                "APP_STORE_CONNECT_ISSUER_ID".into(),
                "APPLE_TEAM_ID".into(),
            ],
        }
    }
}
