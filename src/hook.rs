//! Post-deploy hook
//!
//! Runs the discovery pipeline once: walk the stack, enrich its resources,
//! render every configured artifact, then write them. Any failure before the
//! write stage aborts the run without touching the output directory.

use crate::aws::ProviderClient;
use crate::config::HookConfig;
use crate::context::DeploymentContext;
use crate::error::{HookError, Result};
use crate::exports::writer::{render_artifact, write_artifact, Artifact};
use crate::resource::{enrich, walk};
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;

/// Default deadline for a whole run
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct HookOptions {
    pub output_dir: PathBuf,
    /// Describe calls in flight at once during enrichment
    pub concurrency: usize,
    pub deadline: Duration,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            concurrency: 1,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

/// What a run produced
#[derive(Debug)]
pub enum HookOutcome {
    Completed {
        written: Vec<PathBuf>,
        /// Artifacts that could not be written (already logged)
        write_failures: Vec<HookError>,
    },
    Failed(HookError),
}

impl HookOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Name and version recorded in generated artifacts
pub fn generator() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), crate::VERSION)
}

/// Discover resources and render every configured artifact
pub async fn render_all(
    client: &ProviderClient,
    context: &DeploymentContext,
    config: &HookConfig,
    options: &HookOptions,
) -> Result<Vec<Artifact>> {
    tracing::info!("Processing stack: {}", context.stack_name);

    let summaries = walk(client, &context.stack_name).await?;
    let resources = enrich(client, context, &summaries, options.concurrency).await?;
    tracing::debug!(
        "{} of {} resources are relevant to the configuration",
        resources.len(),
        summaries.len()
    );

    let generator = generator();
    let generated_at = Utc::now();
    config
        .artifacts()
        .iter()
        .map(|spec| {
            render_artifact(
                spec,
                &resources,
                context,
                &options.output_dir,
                &generator,
                generated_at,
            )
        })
        .collect()
}

/// Run the pipeline within the deadline
pub async fn run(
    client: &ProviderClient,
    context: &DeploymentContext,
    config: &HookConfig,
    options: &HookOptions,
) -> Result<Vec<Artifact>> {
    match tokio::time::timeout(options.deadline, render_all(client, context, config, options)).await {
        Ok(result) => result,
        Err(_) => Err(HookError::provider(
            "Hook",
            "afterDeploy",
            format!("provider calls exceeded the deadline of {}ms", options.deadline.as_millis()),
        )),
    }
}

/// Entry point for the deployment tool's `after:deploy` lifecycle event.
///
/// Never fails: errors are logged and reported in the outcome, so the
/// deployment itself is unaffected.
pub async fn after_deploy(
    client: &ProviderClient,
    context: &DeploymentContext,
    config: &HookConfig,
    options: &HookOptions,
) -> HookOutcome {
    let artifacts = match run(client, context, config, options).await {
        Ok(artifacts) => artifacts,
        Err(e) => {
            tracing::error!("Cannot load resources: {} ({})", e, e.kind());
            return HookOutcome::Failed(e);
        }
    };

    let mut written = Vec::new();
    let mut write_failures = Vec::new();
    for artifact in &artifacts {
        match write_artifact(artifact).await {
            Ok(()) => {
                tracing::info!("Wrote {}", artifact.path.display());
                written.push(artifact.path.clone());
            }
            Err(e) => {
                tracing::error!("{}", e);
                write_failures.push(e);
            }
        }
    }

    HookOutcome::Completed {
        written,
        write_failures,
    }
}
