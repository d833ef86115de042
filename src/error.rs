//! Hook errors
//!
//! Every stage of the pipeline reports failures through [`HookError`]. Provider
//! and configuration errors abort the run; write errors are only logged.

use std::path::PathBuf;
use thiserror::Error;

/// Maximum length of provider output kept in an error (to avoid logging sensitive data)
const MAX_REASON_LENGTH: usize = 200;

pub type Result<T> = std::result::Result<T, HookError>;

/// Errors raised while discovering resources or writing artifacts
#[derive(Debug, Error)]
pub enum HookError {
    /// A provider API call failed, timed out or returned an unexpected shape
    #[error("{service}.{operation} failed: {reason}")]
    Provider {
        service: &'static str,
        operation: String,
        reason: String,
    },

    /// A resource named by configuration or the template could not be located
    #[error("{0}")]
    Configuration(String),

    /// An artifact could not be written
    #[error("Writing to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HookError {
    pub fn provider(service: &'static str, operation: &str, reason: impl AsRef<str>) -> Self {
        Self::Provider {
            service,
            operation: operation.to_string(),
            reason: sanitize_for_log(reason.as_ref()),
        }
    }

    /// A describe response is missing a field the synthesizer relies on
    pub fn malformed(service: &'static str, operation: &str, field: &str) -> Self {
        Self::provider(service, operation, format!("response is missing `{}`", field))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Short category label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provider { .. } => "ProviderError",
            Self::Configuration(_) => "ConfigurationError",
            Self::Write { .. } => "WriteError",
        }
    }
}

/// Sanitize provider output for logging
/// Truncates long text and drops control characters
pub fn sanitize_for_log(body: &str) -> String {
    let body = body.trim();
    let truncated = if body.chars().count() > MAX_REASON_LENGTH {
        let head: String = body.chars().take(MAX_REASON_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = HookError::provider("CloudFormation", "listStackResources", "access denied");
        assert_eq!(
            err.to_string(),
            "CloudFormation.listStackResources failed: access denied"
        );
        assert_eq!(err.kind(), "ProviderError");
    }

    #[test]
    fn test_sanitize_truncates_long_output() {
        let long = "x".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.starts_with(&"x".repeat(MAX_REASON_LENGTH)));
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("line one\nline\ttwo\n"), "line one line two");
    }

    #[test]
    fn test_malformed_names_field() {
        let err = HookError::malformed("AppSync", "getGraphqlApi", "graphqlApi.arn");
        assert!(err.to_string().contains("`graphqlApi.arn`"));
    }
}
