//! Read-only access to a target project root.
//!
//! A `Probe` answers existence and content queries for paths relative to
//! the root it was built for. It never writes, and it refuses to resolve
//! paths that would leave the root (absolute paths, `..` components, or
//! symlinks pointing elsewhere).
//!
//! Environment variables are captured once at construction so that rules
//! evaluated against the probe stay pure.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

pub mod fingerprint;

/// Reasons a probe query could not produce content.
///
/// None of these mean "the rule failed": callers translate them into a
/// "cannot evaluate" finding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("{path} not found")]
    NotFound { path: String },

    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    /// `message` is the parser's own message, kept verbatim.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("{path} resolves outside the target root")]
    OutsideRoot { path: String },

    #[error("{field} is not declared in {path}")]
    MissingField { path: String, field: String },
}

impl ProbeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeError::NotFound { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Probe {
    root: PathBuf,
    env: BTreeMap<String, String>,
}

impl Probe {
    /// Builds a probe over `root`, capturing the listed environment
    /// variables from the current process.
    pub fn new(root: impl Into<PathBuf>, env_names: &[String]) -> Self {
        let env = env_names
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.clone(), v)))
            .collect();

        Self {
            root: root.into(),
            env,
        }
    }

    /// Builds a probe with an explicit environment snapshot.
    pub fn with_env(root: impl Into<PathBuf>, env: BTreeMap<String, String>) -> Self {
        Self {
            root: root.into(),
            env,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `rel` against the root.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, ProbeError> {
        let relative = Path::new(rel);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ProbeError::OutsideRoot { path: rel.into() });
        }

        let full = self.root.join(relative);

        // Existing paths are canonicalized so a symlink cannot lead out.
        if let (Ok(root), Ok(target)) = (self.root.canonicalize(), full.canonicalize()) {
            if !target.starts_with(&root) {
                return Err(ProbeError::OutsideRoot { path: rel.into() });
            }
        }

        Ok(full)
    }

    /// True when `rel` is a regular file under the root. Never fails.
    pub fn file_exists(&self, rel: &str) -> bool {
        self.resolve(rel).map(|p| p.is_file()).unwrap_or(false)
    }

    /// True when `rel` is a directory under the root. Never fails.
    pub fn dir_exists(&self, rel: &str) -> bool {
        self.resolve(rel).map(|p| p.is_dir()).unwrap_or(false)
    }

    pub fn read_bytes(&self, rel: &str) -> Result<Vec<u8>, ProbeError> {
        let path = self.resolve(rel)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProbeError::NotFound { path: rel.into() },
            _ => ProbeError::Read {
                path: rel.into(),
                message: e.to_string(),
            },
        })
    }

    pub fn read_text(&self, rel: &str) -> Result<String, ProbeError> {
        let bytes = self.read_bytes(rel)?;
        String::from_utf8(bytes).map_err(|e| ProbeError::Read {
            path: rel.into(),
            message: e.to_string(),
        })
    }

    pub fn read_json(&self, rel: &str) -> Result<Value, ProbeError> {
        let text = self.read_text(rel)?;
        serde_json::from_str(&text).map_err(|e| ProbeError::Parse {
            path: rel.into(),
            message: e.to_string(),
        })
    }

    /// Whether `name` was set to a non-empty value when the probe was built.
    /// The value itself is never exposed.
    pub fn env_present(&self, name: &str) -> bool {
        self.env.get(name).is_some_and(|v| !v.trim().is_empty())
    }
}

/// Plain substring test used for plist/YAML-like files.
///
/// This is "text is present", not "document is semantically valid".
pub fn contains_substring(text: &str, needle: &str) -> bool {
    !needle.is_empty() && text.contains(needle)
}

/// Non-empty string at a JSON pointer, if any.
pub fn json_str<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// String or number at a JSON pointer, rendered as text.
pub fn json_scalar(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
