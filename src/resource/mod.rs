//! Resource discovery layer
//!
//! Turns a deployed stack into the list of resources the configuration is
//! built from.
//!
//! # Architecture
//!
//! - [`types`] - Resource summaries, resource types and enriched records
//! - [`walker`] - Lists stack resources with pagination, following nested stacks
//! - [`enricher`] - Fetches per-type metadata, driven by a rule table
//! - [`template`] - Reads resource properties from the compiled template
//!
//! # Example
//!
//! ```ignore
//! use amplify_hook::resource::{enrich, walk};
//!
//! async fn discover(client: &ProviderClient, context: &DeploymentContext) -> Result<Vec<EnrichedResource>> {
//!     let summaries = walk(client, &context.stack_name).await?;
//!     enrich(client, context, &summaries, 1).await
//! }
//! ```

pub mod enricher;
pub mod template;
pub mod types;
pub mod walker;

pub use enricher::{enrich, rule_for, EnrichmentRule, ENRICHMENT_RULES};
pub use template::CompiledTemplate;
pub use types::{EnrichedResource, ResourceSummary, ResourceType};
pub use walker::walk;
