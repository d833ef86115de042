//! AWS CLI gateway
//!
//! Executes provider requests through the `aws` command-line client, which
//! resolves credentials the same way the deployment tool does (profiles,
//! environment, instance roles). Requests are passed as `--cli-input-json`
//! and responses come back as the service's raw JSON.

use super::gateway::{ProviderGateway, Service};
use crate::error::{HookError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Operations whose payload is a blob the CLI only writes to an output file.
/// Each entry names the response member the file contents are returned under.
const BLOB_OUTPUT_OPERATIONS: &[(Service, &str, &str)] =
    &[(Service::AppSync, "getIntrospectionSchema", "schema")];

/// Gateway driving the `aws` CLI
#[derive(Debug, Clone)]
pub struct AwsCliGateway {
    program: String,
    region: String,
    profile: Option<String>,
}

impl AwsCliGateway {
    pub fn new(region: &str) -> Self {
        Self {
            program: "aws".to_string(),
            region: region.to_string(),
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    /// Use a different executable (e.g. a wrapper script)
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    /// Build the CLI arguments for one request
    pub fn build_args(
        &self,
        service: Service,
        operation: &str,
        params: &Value,
        outfile: Option<&Path>,
    ) -> Vec<String> {
        let mut args = vec![
            service.cli_name().to_string(),
            cli_operation_name(operation),
            "--cli-input-json".to_string(),
            params.to_string(),
            "--region".to_string(),
            self.region.clone(),
            "--output".to_string(),
            "json".to_string(),
            // Pagination is driven by the caller through NextToken
            "--no-paginate".to_string(),
        ];

        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }

        if let Some(outfile) = outfile {
            args.push(outfile.display().to_string());
        }

        args
    }

    async fn execute(&self, service: Service, operation: &str, args: &[String]) -> Result<Vec<u8>> {
        tracing::debug!("Executing: {} {} {}", self.program, args[0], args[1]);

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            // A call abandoned by its timeout must not leave the CLI running
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                HookError::provider(
                    service.name(),
                    operation,
                    format!("failed to execute {}: {}", self.program, e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                "{} exited with {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                crate::error::sanitize_for_log(&stderr)
            );
            return Err(HookError::provider(service.name(), operation, stderr));
        }

        Ok(output.stdout)
    }
}

/// Convert an SDK operation name to its CLI form
/// e.g., "listStackResources" -> "list-stack-resources"
pub fn cli_operation_name(operation: &str) -> String {
    let mut name = String::with_capacity(operation.len() + 4);
    for (i, c) in operation.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                name.push('-');
            }
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

fn blob_member(service: Service, operation: &str) -> Option<&'static str> {
    BLOB_OUTPUT_OPERATIONS
        .iter()
        .find(|(s, op, _)| *s == service && *op == operation)
        .map(|(_, _, member)| *member)
}

fn parse_output(service: Service, operation: &str, stdout: &[u8]) -> Result<Value> {
    if stdout.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(stdout).map_err(|e| {
        HookError::provider(service.name(), operation, format!("unparsable output: {}", e))
    })
}

#[async_trait]
impl ProviderGateway for AwsCliGateway {
    async fn request(&self, service: Service, operation: &str, params: Value) -> Result<Value> {
        let Some(member) = blob_member(service, operation) else {
            let args = self.build_args(service, operation, &params, None);
            let stdout = self.execute(service, operation, &args).await?;
            return parse_output(service, operation, &stdout);
        };

        // Removed when dropped, including when the call is abandoned mid-flight
        let outfile = tempfile::Builder::new()
            .prefix("amplify-hook-")
            .suffix(".out")
            .tempfile()
            .map_err(|e| HookError::provider(service.name(), operation, format!("creating payload file: {}", e)))?;
        let args = self.build_args(service, operation, &params, Some(outfile.path()));
        let stdout = self.execute(service, operation, &args).await?;

        let text = tokio::fs::read_to_string(outfile.path())
            .await
            .map_err(|e| HookError::provider(service.name(), operation, format!("reading payload: {}", e)))?;
        let mut response = parse_output(service, operation, &stdout)?;
        if let Value::Object(map) = &mut response {
            map.insert(member.to_string(), Value::String(text));
        }
        Ok(response)
    }
}
