//! Compiled template access
//!
//! The deployment tool hands over the compiled CloudFormation template it
//! deployed. The hook only reads resource properties from it, to find which
//! parent resource a dependent resource refers to.

use crate::error::{HookError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// The `Resources` section of a compiled template
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompiledTemplate {
    #[serde(rename = "Resources", default)]
    resources: Map<String, Value>,
}

/// How a template property names another resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRef<'a> {
    /// `{ "Ref": "<LogicalId>" }`
    Ref(&'a str),
    /// A literal physical id
    Literal(&'a str),
}

impl CompiledTemplate {
    /// Load a template from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HookError::configuration(format!("Cannot read template {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content).map_err(|e| {
            HookError::configuration(format!("Cannot parse template {}: {}", path.display(), e))
        })
    }

    pub fn from_json_str(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn from_value(value: Value) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// `Resources.<logical_id>.Properties.<property>`
    pub fn property(&self, logical_id: &str, property: &str) -> Option<&Value> {
        self.resources
            .get(logical_id)?
            .get("Properties")?
            .get(property)
    }

    /// Resolve a property that refers to another resource
    pub fn reference(&self, logical_id: &str, property: &str) -> Option<PropertyRef<'_>> {
        match self.property(logical_id, property)? {
            Value::String(literal) => Some(PropertyRef::Literal(literal)),
            Value::Object(map) => map.get("Ref").and_then(|v| v.as_str()).map(PropertyRef::Ref),
            _ => None,
        }
    }
}
