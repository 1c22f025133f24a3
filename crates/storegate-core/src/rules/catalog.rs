//! Built-in rule sets for App Store submission readiness.
//!
//! Each function below builds one category. Rules are parameterized by
//! the active `Profile` (artifact paths, required capabilities, workflow
//! stages, credential names) but carry no state of their own.
//!
//! Rules that depend on a file read it themselves and let probe errors
//! propagate; evaluation turns those into "cannot evaluate" findings
//! instead of misleading failures.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::config::{ArtifactPaths, Profile};
use crate::probe::{Probe, ProbeError, contains_substring, json_scalar, json_str};
use crate::rules::model::{Outcome, Rule, RuleSet, Severity};

/// Statically declared category names.
pub mod categories {
    /// Reserved for faults of the target root itself.
    pub const TARGET: &str = "Target";
    pub const PROJECT_METADATA: &str = "Project Metadata";
    pub const APP_IDENTITY: &str = "App Identity";
    pub const PRIVACY: &str = "Privacy Compliance";
    pub const CODE_SIGNING: &str = "Code Signing";
    pub const CI_CD: &str = "CI/CD";
    pub const STORE_METADATA: &str = "Store Metadata";
    pub const SECRETS: &str = "Secrets";
    pub const CREDENTIALS: &str = "Credentials";

    pub const ALL: [&str; 9] = [
        TARGET,
        PROJECT_METADATA,
        APP_IDENTITY,
        PRIVACY,
        CODE_SIGNING,
        CI_CD,
        STORE_METADATA,
        SECRETS,
        CREDENTIALS,
    ];
}

/// App Store Connect rejects keyword lists longer than this.
pub const MAX_KEYWORD_CHARS: usize = 100;

pub const DESCRIPTION_FILE: &str = "description.txt";
pub const KEYWORDS_FILE: &str = "keywords.txt";
pub const RELEASE_NOTES_FILE: &str = "release_notes.txt";

/// Declaring this Expo plugin makes the push entitlement mandatory.
pub const NOTIFICATIONS_PLUGIN: &str = "expo-notifications";

static BUNDLE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$").expect("bundle identifier pattern")
});

static SEMVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern"));

/// Secret-leak heuristics: (label, pattern). Labels are reported, matched
/// text never is.
static SECRET_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("stripe-style key", r"\b[spr]k_(live|test)_[A-Za-z0-9]{8,}"),
        ("AWS access key", r"\bAKIA[0-9A-Z]{16}\b"),
        ("private key block", r"-----BEGIN [A-Z ]*PRIVATE KEY-----"),
        ("google API key", r"\bAIza[0-9A-Za-z_\-]{35}\b"),
        ("\"secret\"", r"(?i)secret"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("secret pattern")))
    .collect()
});

/// What makes a privacy-sensitive capability required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Required only when the profile lists it.
    Profile,
    /// Required when the entitlements file contains this key.
    Entitlement(&'static str),
    /// Required when the app config declares this Expo plugin.
    Plugin(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct Capability {
    pub name: &'static str,
    pub label: &'static str,
    pub usage_keys: &'static [&'static str],
    pub trigger: Trigger,
}

pub const CAPABILITIES: &[Capability] = &[
    Capability {
        name: "camera",
        label: "Camera",
        usage_keys: &["NSCameraUsageDescription"],
        trigger: Trigger::Profile,
    },
    Capability {
        name: "microphone",
        label: "Microphone",
        usage_keys: &["NSMicrophoneUsageDescription"],
        trigger: Trigger::Profile,
    },
    Capability {
        name: "photos",
        label: "Photo library",
        usage_keys: &["NSPhotoLibraryUsageDescription"],
        trigger: Trigger::Profile,
    },
    Capability {
        name: "biometrics",
        label: "Face ID",
        usage_keys: &["NSFaceIDUsageDescription"],
        trigger: Trigger::Profile,
    },
    Capability {
        name: "location",
        label: "Location",
        usage_keys: &["NSLocationWhenInUseUsageDescription"],
        trigger: Trigger::Profile,
    },
    Capability {
        name: "health",
        label: "HealthKit",
        usage_keys: &["NSHealthShareUsageDescription", "NSHealthUpdateUsageDescription"],
        trigger: Trigger::Entitlement("com.apple.developer.healthkit"),
    },
    Capability {
        name: "contacts",
        label: "Contacts",
        usage_keys: &["NSContactsUsageDescription"],
        trigger: Trigger::Plugin("expo-contacts"),
    },
    Capability {
        name: "calendar",
        label: "Calendars",
        usage_keys: &["NSCalendarsUsageDescription"],
        trigger: Trigger::Plugin("expo-calendar"),
    },
    Capability {
        name: "reminders",
        label: "Reminders",
        usage_keys: &["NSRemindersUsageDescription"],
        trigger: Trigger::Plugin("expo-calendar"),
    },
];

/// The full ordered rule set list for a profile.
pub fn rule_sets(profile: &Profile) -> Vec<RuleSet> {
    vec![
        project_metadata(&profile.paths),
        app_identity(&profile.paths),
        privacy_compliance(profile),
        code_signing(&profile.paths),
        ci_cd(profile),
        store_metadata(&profile.paths),
        secrets(&profile.paths),
        credentials(profile),
    ]
}

/// Expo keeps its settings under a top-level `expo` key; plain app configs
/// are accepted as-is.
fn expo_section(config: &Value) -> &Value {
    config.get("expo").unwrap_or(config)
}

fn declares_plugin(expo: &Value, plugin: &str) -> bool {
    expo.get("plugins")
        .and_then(Value::as_array)
        .is_some_and(|plugins| {
            plugins.iter().any(|entry| match entry {
                Value::String(name) => name == plugin,
                Value::Array(parts) => parts.first().and_then(Value::as_str) == Some(plugin),
                _ => false,
            })
        })
}

fn app_version(probe: &Probe, paths: &ArtifactPaths) -> Option<String> {
    let from_config = probe
        .read_json(&paths.app_config)
        .ok()
        .and_then(|c| json_str(expo_section(&c), "/version").map(str::to_string));

    from_config.or_else(|| {
        probe
            .read_json(&paths.manifest)
            .ok()
            .and_then(|m| json_str(&m, "/version").map(str::to_string))
    })
}

fn bundle_identifier(probe: &Probe, paths: &ArtifactPaths) -> Result<String, ProbeError> {
    let config = probe.read_json(&paths.app_config)?;
    json_str(expo_section(&config), "/ios/bundleIdentifier")
        .map(str::to_string)
        .ok_or_else(|| ProbeError::MissingField {
            path: paths.app_config.clone(),
            field: "ios.bundleIdentifier".into(),
        })
}

pub fn project_metadata(paths: &ArtifactPaths) -> RuleSet {
    let manifest = paths.manifest.clone();
    let app_config = paths.app_config.clone();

    RuleSet::new(categories::PROJECT_METADATA)
        .rule({
            let m = manifest.clone();
            Rule::new("manifest-present", "project manifest", move |p| {
                Ok(Outcome::from_bool(p.file_exists(&m)))
            })
            .pass(Severity::Success, format!("manifest found: {manifest}"))
            .fail(Severity::Error, format!("manifest not found: {manifest}"))
        })
        .rule({
            let m = manifest.clone();
            Rule::new("manifest-name", "project name", move |p| {
                let value = p.read_json(&m)?;
                Ok(match json_str(&value, "/name") {
                    Some(name) => Outcome::pass_with(name),
                    None => Outcome::Fail(None),
                })
            })
            .pass(Severity::Success, "project name: {observed}")
            .fail(Severity::Error, format!("{manifest} declares no name"))
        })
        .rule({
            let m = manifest.clone();
            Rule::new("manifest-version", "project version", move |p| {
                let value = p.read_json(&m)?;
                Ok(match json_str(&value, "/version") {
                    Some(version) => Outcome::pass_with(version),
                    None => Outcome::Fail(None),
                })
            })
            .pass(Severity::Success, "project version: {observed}")
            .fail(Severity::Error, format!("{manifest} declares no version"))
        })
        .rule({
            let c = app_config.clone();
            Rule::new("app-config-present", "app configuration", move |p| {
                Ok(Outcome::from_bool(p.file_exists(&c)))
            })
            .pass(Severity::Success, format!("app configuration found: {app_config}"))
            .fail(
                Severity::Error,
                format!("app configuration not found: {app_config}"),
            )
        })
}

pub fn app_identity(paths: &ArtifactPaths) -> RuleSet {
    RuleSet::new(categories::APP_IDENTITY)
        .rule({
            let paths = paths.clone();
            Rule::new("bundle-identifier-present", "iOS bundle identifier", move |p| {
                match bundle_identifier(p, &paths) {
                    Ok(id) => Ok(Outcome::pass_with(id)),
                    Err(ProbeError::MissingField { .. }) => Ok(Outcome::Fail(None)),
                    Err(e) => Err(e),
                }
            })
            .pass(Severity::Success, "bundle identifier: {observed}")
            .fail(
                Severity::Error,
                "iOS bundle identifier missing (expo.ios.bundleIdentifier)",
            )
        })
        .rule({
            let paths = paths.clone();
            Rule::new(
                "bundle-identifier-format",
                "iOS bundle identifier format",
                move |p| {
                    let id = bundle_identifier(p, &paths)?;
                    Ok(if BUNDLE_ID.is_match(&id) {
                        Outcome::pass_with(id)
                    } else {
                        Outcome::fail_with(id)
                    })
                },
            )
            .pass(Severity::Success, "bundle identifier {observed} is reverse-DNS")
            .fail(
                Severity::Error,
                "bundle identifier {observed} is not a reverse-DNS identifier",
            )
        })
        .rule({
            let paths = paths.clone();
            Rule::new("app-version", "app version", move |p| {
                Ok(match app_version(p, &paths) {
                    Some(v) => Outcome::pass_with(v),
                    None => Outcome::Fail(None),
                })
            })
            .pass(Severity::Success, "app version: {observed}")
            .fail(Severity::Error, "app version not declared")
        })
        .rule({
            let paths = paths.clone();
            Rule::new("version-format", "app version format", move |p| {
                let version = app_version(p, &paths).ok_or_else(|| ProbeError::MissingField {
                    path: paths.app_config.clone(),
                    field: "version".into(),
                })?;
                Ok(if SEMVER.is_match(&version) {
                    Outcome::pass_with(version)
                } else {
                    Outcome::fail_with(version)
                })
            })
            .pass(Severity::Success, "version {observed} is MAJOR.MINOR.PATCH")
            .fail(
                Severity::Warning,
                "version {observed} is not in MAJOR.MINOR.PATCH form",
            )
        })
        .rule({
            let c = paths.app_config.clone();
            Rule::new("build-number", "iOS build number", move |p| {
                let config = p.read_json(&c)?;
                Ok(match json_scalar(expo_section(&config), "/ios/buildNumber") {
                    Some(n) => Outcome::pass_with(n),
                    None => Outcome::Fail(None),
                })
            })
            .pass(Severity::Success, "build number: {observed}")
            .fail(
                Severity::Warning,
                "iOS build number not declared (expo.ios.buildNumber)",
            )
        })
}

/// An absent entitlements file declares nothing.
fn declares_entitlement(probe: &Probe, entitlements: &str, key: &str) -> Result<bool, ProbeError> {
    match probe.read_text(entitlements) {
        Ok(text) => Ok(contains_substring(&text, key)),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

fn capability_rule(capability: Capability, required_by_profile: bool, paths: &ArtifactPaths) -> Rule {
    let paths = paths.clone();
    let label = capability.label;

    Rule::new(
        format!("privacy-{}", capability.name),
        format!("{label} usage description"),
        move |p| {
            // Resolve the trigger before touching the app config so an
            // unrequested capability never depends on it.
            let mut config = None;
            let required = required_by_profile
                || match capability.trigger {
                    Trigger::Profile => false,
                    Trigger::Entitlement(key) => declares_entitlement(p, &paths.entitlements, key)?,
                    Trigger::Plugin(plugin) => {
                        let value = p.read_json(&paths.app_config)?;
                        let declared = declares_plugin(expo_section(&value), plugin);
                        config = Some(value);
                        declared
                    }
                };

            if !required {
                return Ok(Outcome::pass_with("not requested"));
            }

            let config = match config {
                Some(value) => value,
                None => p.read_json(&paths.app_config)?,
            };
            let expo = expo_section(&config);

            let missing: Vec<&str> = capability
                .usage_keys
                .iter()
                .copied()
                .filter(|key| json_str(expo, &format!("/ios/infoPlist/{key}")).is_none())
                .collect();

            Ok(if missing.is_empty() {
                Outcome::pass_with("usage description present")
            } else {
                Outcome::fail_with(missing.join(", "))
            })
        },
    )
    .pass(Severity::Success, format!("{label}: {{observed}}"))
    .fail(Severity::Critical, format!("{label}: missing {{observed}}"))
}

pub fn privacy_compliance(profile: &Profile) -> RuleSet {
    CAPABILITIES
        .iter()
        .fold(RuleSet::new(categories::PRIVACY), |set, capability| {
            let required = profile
                .privacy
                .required
                .iter()
                .any(|name| name == capability.name);
            set.rule(capability_rule(*capability, required, &profile.paths))
        })
}

pub fn code_signing(paths: &ArtifactPaths) -> RuleSet {
    let app_config = paths.app_config.clone();
    let entitlements = paths.entitlements.clone();
    let export_options = paths.export_options.clone();

    RuleSet::new(categories::CODE_SIGNING)
        .rule({
            let e = entitlements.clone();
            Rule::new("entitlements-present", "entitlements file", move |p| {
                Ok(Outcome::from_bool(p.file_exists(&e)))
            })
            .pass(Severity::Success, format!("entitlements found: {entitlements}"))
            .fail(
                Severity::Error,
                format!("entitlements file not found: {entitlements}"),
            )
        })
        .rule({
            let e = entitlements.clone();
            let c = app_config.clone();
            Rule::new("push-entitlement", "push notification entitlement", move |p| {
                let config = p.read_json(&c)?;
                if !declares_plugin(expo_section(&config), NOTIFICATIONS_PLUGIN) {
                    return Ok(Outcome::pass_with("not requested"));
                }
                Ok(if declares_entitlement(p, &e, "aps-environment")? {
                    Outcome::pass_with("declared")
                } else {
                    Outcome::Fail(None)
                })
            })
            .pass(Severity::Success, "push notification entitlement: {observed}")
            .fail(
                Severity::Warning,
                format!("{NOTIFICATIONS_PLUGIN} is configured but aps-environment is not declared"),
            )
        })
        .rule({
            let x = export_options.clone();
            Rule::new("export-options-present", "export configuration", move |p| {
                Ok(Outcome::from_bool(p.file_exists(&x)))
            })
            .pass(
                Severity::Success,
                format!("export configuration found: {export_options}"),
            )
            .fail(
                Severity::Error,
                format!("export configuration not found: {export_options}"),
            )
        })
        .rule({
            let x = export_options.clone();
            Rule::new("export-method", "export signing method", move |p| {
                let text = p.read_text(&x)?;
                if contains_substring(&text, "app-store") {
                    return Ok(Outcome::pass_with("app-store"));
                }
                let declared = ["ad-hoc", "enterprise", "development", "release-testing"]
                    .into_iter()
                    .find(|m| contains_substring(&text, m))
                    .unwrap_or("undeclared");
                Ok(Outcome::fail_with(declared))
            })
            .pass(Severity::Success, "export method: {observed}")
            .fail(
                Severity::Error,
                "export method is {observed}, store submission requires app-store",
            )
        })
        .rule({
            let x = export_options.clone();
            Rule::new("signing-team", "signing team", move |p| {
                let text = p.read_text(&x)?;
                Ok(Outcome::from_bool(contains_substring(&text, "teamID")))
            })
            .pass(Severity::Success, "signing team declared")
            .fail(
                Severity::Warning,
                "signing team (teamID) not declared in export configuration",
            )
        })
}

fn missing_stages(text: &str, stages: &[String]) -> Vec<String> {
    stages
        .iter()
        .filter(|stage| !contains_substring(text, stage))
        .cloned()
        .collect()
}

pub fn ci_cd(profile: &Profile) -> RuleSet {
    let workflow = profile.paths.workflow.clone();
    let required = profile.workflow.required_stages.clone();
    let recommended = profile.workflow.recommended_stages.clone();

    RuleSet::new(categories::CI_CD)
        .rule({
            let w = workflow.clone();
            Rule::new("workflow-present", "CI workflow", move |p| {
                Ok(Outcome::from_bool(p.file_exists(&w)))
            })
            .pass(Severity::Success, format!("workflow found: {workflow}"))
            .fail(Severity::Error, format!("workflow not found: {workflow}"))
        })
        .rule({
            let w = workflow.clone();
            let listed = required.join(", ");
            Rule::new("workflow-required-stages", "CI workflow stages", move |p| {
                let text = p.read_text(&w)?;
                let missing = missing_stages(&text, &required);
                Ok(if missing.is_empty() {
                    Outcome::pass_with(listed.clone())
                } else {
                    Outcome::fail_with(missing.join(", "))
                })
            })
            .pass(Severity::Success, "workflow declares required stages: {observed}")
            .fail(
                Severity::Error,
                "workflow is missing required stages: {observed}",
            )
        })
        .rule({
            let w = workflow.clone();
            let listed = recommended.join(", ");
            Rule::new(
                "workflow-recommended-stages",
                "recommended CI workflow stages",
                move |p| {
                    let text = p.read_text(&w)?;
                    let missing = missing_stages(&text, &recommended);
                    Ok(if missing.is_empty() {
                        Outcome::pass_with(listed.clone())
                    } else {
                        Outcome::fail_with(missing.join(", "))
                    })
                },
            )
            .pass(
                Severity::Success,
                "workflow declares recommended stages: {observed}",
            )
            .fail(
                Severity::Warning,
                "workflow is missing recommended stages: {observed}",
            )
        })
}

/// Store listing content is optional for a build but needed for review.
/// Absences are reported once by `store-listing`; the content rules only
/// judge files that exist.
pub fn store_metadata(paths: &ArtifactPaths) -> RuleSet {
    let dir = paths.metadata_dir.trim_end_matches('/').to_string();

    RuleSet::new(categories::STORE_METADATA)
        .rule({
            let dir = dir.clone();
            let info = paths.store_info.clone();
            Rule::new("store-listing", "store listing files", move |p| {
                let mut problems = Vec::new();
                if p.dir_exists(&dir) {
                    for file in [DESCRIPTION_FILE, KEYWORDS_FILE, RELEASE_NOTES_FILE] {
                        match p.read_text(&format!("{dir}/{file}")) {
                            Ok(text) if text.trim().is_empty() => {
                                problems.push(format!("{file} is empty"))
                            }
                            Ok(_) => {}
                            Err(e) if e.is_not_found() => problems.push(format!("{file} missing")),
                            Err(e) => return Err(e),
                        }
                    }
                } else {
                    problems.push(format!("{dir}/ missing"));
                }
                if !p.file_exists(&info) {
                    problems.push(format!("{info} missing"));
                }
                Ok(if problems.is_empty() {
                    Outcome::pass_with(dir.clone())
                } else {
                    Outcome::fail_with(problems.join("; "))
                })
            })
            .pass(Severity::Success, "store listing complete in {observed}")
            .fail(Severity::Warning, "store listing incomplete: {observed}")
        })
        .rule({
            let keywords = format!("{dir}/{KEYWORDS_FILE}");
            Rule::new("keyword-length", "store keywords", move |p| {
                let text = match p.read_text(&keywords) {
                    Ok(text) => text,
                    Err(e) if e.is_not_found() => return Ok(Outcome::pass_with("not provided")),
                    Err(e) => return Err(e),
                };
                let chars = text.trim().chars().count();
                Ok(if chars <= MAX_KEYWORD_CHARS {
                    Outcome::pass_with(format!("{chars} characters"))
                } else {
                    Outcome::fail_with(chars.to_string())
                })
            })
            .pass(Severity::Success, "keywords: {observed}")
            .fail(
                Severity::Warning,
                format!("keywords use {{observed}} characters (limit {MAX_KEYWORD_CHARS})"),
            )
        })
        .rule({
            let info = paths.store_info.clone();
            Rule::new("store-info", "store listing info", move |p| {
                let value = match p.read_json(&info) {
                    Ok(value) => value,
                    Err(e) if e.is_not_found() => return Ok(Outcome::pass_with("not provided")),
                    Err(e) => return Err(e),
                };
                let category = json_str(&value, "/category");
                let rating = json_scalar(&value, "/ageRating");
                Ok(match (category, rating) {
                    (Some(c), Some(r)) => Outcome::pass_with(format!("{c}, age rating {r}")),
                    (None, Some(_)) => Outcome::fail_with("category"),
                    (Some(_), None) => Outcome::fail_with("ageRating"),
                    (None, None) => Outcome::fail_with("category, ageRating"),
                })
            })
            .pass(Severity::Success, "store listing info: {observed}")
            .fail(Severity::Warning, "store listing info missing {observed}")
        })
}

pub fn secrets(paths: &ArtifactPaths) -> RuleSet {
    let c = paths.app_config.clone();

    RuleSet::new(categories::SECRETS).rule(
        Rule::new("config-secrets", "app configuration secrets scan", move |p| {
            let config = p.read_json(&c)?;
            let serialized = config.to_string();
            let hits: Vec<&str> = SECRET_PATTERNS
                .iter()
                .filter(|(_, pattern)| pattern.is_match(&serialized))
                .map(|(label, _)| *label)
                .collect();
            Ok(if hits.is_empty() {
                Outcome::Pass(None)
            } else {
                Outcome::fail_with(hits.join(", "))
            })
        })
        .pass(Severity::Success, "no secrets detected in app configuration")
        .fail(
            Severity::Error,
            "app configuration looks like it embeds secrets: {observed}",
        ),
    )
}

pub fn credentials(profile: &Profile) -> RuleSet {
    let names = profile.credentials.env.clone();

    RuleSet::new(categories::CREDENTIALS).rule(
        Rule::new(
            "app-store-connect-credentials",
            "App Store Connect credentials",
            move |p| {
                let missing: Vec<&str> = names
                    .iter()
                    .filter(|name| !p.env_present(name))
                    .map(String::as_str)
                    .collect();
                Ok(if missing.is_empty() {
                    Outcome::pass_with(names.join(", "))
                } else {
                    Outcome::fail_with(missing.join(", "))
                })
            },
        )
        .pass(Severity::Success, "credentials configured: {observed}")
        .fail(Severity::Warning, "missing environment variables: {observed}"),
    )
}
