//! Configuration Management
//!
//! Handles the user-supplied configuration block that says which artifacts
//! to generate, and the defaults taken from the environment.

use crate::error::{HookError, Result};
use crate::exports::writer::ArtifactKind;
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

/// Region used when neither the command line nor the environment names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// One artifact to generate
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSpec {
    /// Output file name, relative to the output directory
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ArtifactKind,
    /// Logical id of the user pool client exposed in the configuration
    #[serde(default)]
    pub app_client: Option<String>,
}

impl ArtifactSpec {
    pub fn filename(&self) -> &str {
        self.filename
            .as_deref()
            .unwrap_or_else(|| self.kind.default_filename())
    }
}

impl Default for ArtifactSpec {
    fn default() -> Self {
        Self {
            filename: None,
            kind: ArtifactKind::TypeScript,
            app_client: None,
        }
    }
}

/// The configuration block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookConfig {
    entries: Vec<ArtifactSpec>,
}

impl HookConfig {
    pub fn new(entries: Vec<ArtifactSpec>) -> Self {
        Self { entries }
    }

    /// Load the block from a YAML or JSON file; no file means defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            HookError::configuration(format!("Cannot read configuration {}: {}", path.display(), e))
        })?;

        Self::from_yaml_str(&content).map_err(|e| match e {
            HookError::Configuration(message) => {
                HookError::configuration(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(content)
            .map_err(|e| HookError::configuration(format!("invalid configuration: {}", e)))?;
        Self::from_value(value)
    }

    /// Accepts a list of entries, a single entry, an `amplify` mapping, or a
    /// whole service document carrying `custom.amplify`
    pub fn from_value(value: Value) -> Result<Self> {
        let block = if value.get("custom").is_some() {
            value
                .get("custom")
                .and_then(|custom| custom.get("amplify"))
                .cloned()
                .unwrap_or(Value::Null)
        } else if let Some(amplify) = value.get("amplify") {
            amplify.clone()
        } else {
            value
        };

        let entries = match block {
            Value::Null => Vec::new(),
            Value::Sequence(items) => items
                .into_iter()
                .map(parse_entry)
                .collect::<Result<Vec<_>>>()?,
            entry @ Value::Mapping(_) => vec![parse_entry(entry)?],
            _ => {
                return Err(HookError::configuration(
                    "invalid configuration: expected a list of artifact entries",
                ))
            }
        };

        Ok(Self { entries })
    }

    /// Artifacts to generate; a single default TypeScript artifact when the
    /// block is empty
    pub fn artifacts(&self) -> Vec<ArtifactSpec> {
        if self.entries.is_empty() {
            vec![ArtifactSpec::default()]
        } else {
            self.entries.clone()
        }
    }
}

fn parse_entry(value: Value) -> Result<ArtifactSpec> {
    serde_yaml::from_value(value)
        .map_err(|e| HookError::configuration(format!("invalid artifact entry: {}", e)))
}

/// Get effective region (CLI > AWS_REGION > AWS_DEFAULT_REGION > default)
pub fn effective_region(cli_region: Option<&str>) -> String {
    if let Some(region) = cli_region.filter(|r| !r.is_empty()) {
        return region.to_string();
    }
    for var in ["AWS_REGION", "AWS_DEFAULT_REGION"] {
        if let Ok(region) = std::env::var(var) {
            if !region.trim().is_empty() {
                return region.trim().to_string();
            }
        }
    }
    DEFAULT_REGION.to_string()
}
