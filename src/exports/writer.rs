//! Artifact Writer
//!
//! Renders configuration artifacts and writes them to disk. Rendering never
//! touches the filesystem, so a run can render every artifact before it
//! writes any of them.

use super::configuration::{first_graphql_schema, synthesize, Configuration};
use crate::config::ArtifactSpec;
use crate::context::DeploymentContext;
use crate::error::{HookError, Result};
use crate::resource::types::EnrichedResource;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::{Path, PathBuf};

const INDENT: &[u8] = b"    ";

const TYPESCRIPT_DECLARATIONS: &str = "\
interface IAWSAmplifyFederatedConfiguration {
    google_client_id?: string;
    facebook_app_id?: string;
    amazon_client_id?: string;
}

interface IAWSAmplifyCloudLogicConfiguration {
    [index: number]: {
        endpoint: string;
        name: string;
        region: string;
    };
}

interface IAWSAmplifyConfiguration {
    aws_appsync_authenticationType?: string;
    aws_appsync_graphqlEndpoint?: string;
    aws_appsync_region?: string;
    aws_cognito_identity_pool_id?: string;
    aws_cognito_region?: string;
    aws_cloud_logic_custom?: IAWSAmplifyCloudLogicConfiguration;
    aws_project_region: string;
    aws_user_files_s3_bucket?: string;
    aws_user_files_s3_bucket_region?: string;
    aws_user_pools_id?: string;
    aws_user_pools_web_client_id?: string;
    aws_user_pools_web_client_secret?: string;
    federated?: IAWSAmplifyFederatedConfiguration;
}
";

const FOOTER: &str = "\nexport default awsmobile;\n";

/// Kind of artifact to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArtifactKind {
    #[default]
    #[serde(rename = "typescript")]
    TypeScript,
    #[serde(rename = "javascript")]
    JavaScript,
    /// GraphQL introspection schema
    #[serde(rename = "schema.json")]
    Schema,
}

impl ArtifactKind {
    pub fn default_filename(&self) -> &'static str {
        match self {
            Self::TypeScript => "aws-exports.ts",
            Self::JavaScript => "aws-exports.js",
            Self::Schema => "schema.json",
        }
    }
}

/// A rendered artifact, ready to write
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

/// Serialize with keys sorted at every depth and 4-space indentation
pub fn to_stable_json<T: Serialize>(value: &T) -> std::result::Result<String, serde_json::Error> {
    // serde_json::Map is ordered by key, so converting to a Value sorts it
    let value: Value = serde_json::to_value(value)?;
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn header(generator: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "// WARNING: DO NOT EDIT.  This file is automatically generated\n// Written by {} on {}\n",
        generator,
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

fn serialization_error(e: serde_json::Error) -> HookError {
    HookError::configuration(format!("Cannot serialize configuration: {}", e))
}

pub fn render_typescript(config: &Configuration, generator: &str, generated_at: DateTime<Utc>) -> Result<String> {
    let literal = to_stable_json(config).map_err(serialization_error)?;
    Ok(format!(
        "{}\n{}\nconst awsmobile: IAWSAmplifyConfiguration = {};\n{}",
        header(generator, generated_at),
        TYPESCRIPT_DECLARATIONS,
        literal,
        FOOTER
    ))
}

pub fn render_javascript(config: &Configuration, generator: &str, generated_at: DateTime<Utc>) -> Result<String> {
    let literal = to_stable_json(config).map_err(serialization_error)?;
    Ok(format!(
        "{}\nconst awsmobile = {};\n{}",
        header(generator, generated_at),
        literal,
        FOOTER
    ))
}

pub fn render_schema(schema: &Value) -> Result<String> {
    let mut rendered = to_stable_json(schema).map_err(serialization_error)?;
    rendered.push('\n');
    Ok(rendered)
}

/// Render the artifact described by `spec`
pub fn render_artifact(
    spec: &ArtifactSpec,
    resources: &[EnrichedResource],
    context: &DeploymentContext,
    output_dir: &Path,
    generator: &str,
    generated_at: DateTime<Utc>,
) -> Result<Artifact> {
    let contents = match spec.kind {
        ArtifactKind::TypeScript => {
            let config = synthesize(resources, context, spec.app_client.as_deref())?;
            render_typescript(&config, generator, generated_at)?
        }
        ArtifactKind::JavaScript => {
            let config = synthesize(resources, context, spec.app_client.as_deref())?;
            render_javascript(&config, generator, generated_at)?
        }
        ArtifactKind::Schema => {
            let schema = first_graphql_schema(resources).ok_or_else(|| {
                HookError::configuration(format!(
                    "Cannot write {}: the stack has no GraphQL API",
                    spec.filename()
                ))
            })?;
            render_schema(schema)?
        }
    };

    Ok(Artifact {
        path: output_dir.join(spec.filename()),
        contents,
    })
}

/// Write one artifact, replacing any previous contents
pub async fn write_artifact(artifact: &Artifact) -> Result<()> {
    tracing::debug!("Writing {} bytes to {}", artifact.contents.len(), artifact.path.display());

    tokio::fs::write(&artifact.path, &artifact.contents)
        .await
        .map_err(|source| HookError::Write {
            path: artifact.path.clone(),
            source,
        })
}
