//! Resource Enricher
//!
//! Fetches full metadata for the resource types the configuration needs.
//! What to fetch is driven by [`ENRICHMENT_RULES`]; types without a rule are
//! dropped. Dependent rules run only after every independent resource has
//! been enriched, because they look their parent up among the results.

use super::template::PropertyRef;
use super::types::{
    segment_or_whole, EnrichedResource, ResourceSummary, GRAPHQL_API, IDENTITY_POOL, REST_API,
    S3_BUCKET, USER_POOL, USER_POOL_CLIENT,
};
use crate::aws::{ProviderClient, Service};
use crate::context::DeploymentContext;
use crate::error::{HookError, Result};
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::{Map, Value};

/// Which part of the physical id a describe call is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    PhysicalId,
    Segment { delimiter: char, index: usize },
}

impl IdSource {
    pub fn resolve<'a>(&self, physical_id: &'a str) -> &'a str {
        match self {
            Self::PhysicalId => physical_id,
            Self::Segment { delimiter, index } => segment_or_whole(physical_id, *delimiter, *index),
        }
    }
}

/// A single describe request
#[derive(Debug, Clone, Copy)]
pub struct DescribeCall {
    pub service: Service,
    pub operation: &'static str,
    pub id_param: &'static str,
    /// Fixed parameters sent along with the id
    pub extra: &'static [(&'static str, &'static str)],
}

impl DescribeCall {
    pub fn params(&self, id: &str) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(self.id_param.to_string(), Value::String(id.to_string()));
        for (key, value) in self.extra {
            params.insert(key.to_string(), Value::String(value.to_string()));
        }
        params
    }
}

/// Enrichment that needs nothing but the resource itself
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    /// The summary already identifies the resource
    PassThrough,
    Describe {
        id: IdSource,
        call: DescribeCall,
        /// Introspection schema, returned as JSON text under `schema`
        schema: Option<DescribeCall>,
    },
}

/// Enrichment keyed by another resource's physical id
#[derive(Debug, Clone, Copy)]
pub struct DependentLookup {
    pub parent_type: &'static str,
    /// Template property of the dependent that names its parent
    pub template_property: &'static str,
    pub call: DescribeCall,
    pub parent_param: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum EnrichmentRule {
    Independent(Lookup),
    Dependent(DependentLookup),
}

/// Resource type → enrichment rule
pub const ENRICHMENT_RULES: &[(&str, EnrichmentRule)] = &[
    (
        GRAPHQL_API,
        EnrichmentRule::Independent(Lookup::Describe {
            id: IdSource::Segment {
                delimiter: '/',
                index: 1,
            },
            call: DescribeCall {
                service: Service::AppSync,
                operation: "getGraphqlApi",
                id_param: "apiId",
                extra: &[],
            },
            schema: Some(DescribeCall {
                service: Service::AppSync,
                operation: "getIntrospectionSchema",
                id_param: "apiId",
                extra: &[("format", "JSON")],
            }),
        }),
    ),
    (
        IDENTITY_POOL,
        EnrichmentRule::Independent(Lookup::Describe {
            id: IdSource::PhysicalId,
            call: DescribeCall {
                service: Service::CognitoIdentity,
                operation: "describeIdentityPool",
                id_param: "IdentityPoolId",
                extra: &[],
            },
            schema: None,
        }),
    ),
    (
        USER_POOL,
        EnrichmentRule::Independent(Lookup::Describe {
            id: IdSource::PhysicalId,
            call: DescribeCall {
                service: Service::CognitoIdentityServiceProvider,
                operation: "describeUserPool",
                id_param: "UserPoolId",
                extra: &[],
            },
            schema: None,
        }),
    ),
    (S3_BUCKET, EnrichmentRule::Independent(Lookup::PassThrough)),
    (REST_API, EnrichmentRule::Independent(Lookup::PassThrough)),
    (
        USER_POOL_CLIENT,
        EnrichmentRule::Dependent(DependentLookup {
            parent_type: USER_POOL,
            template_property: "UserPoolId",
            call: DescribeCall {
                service: Service::CognitoIdentityServiceProvider,
                operation: "describeUserPoolClient",
                id_param: "ClientId",
                extra: &[],
            },
            parent_param: "UserPoolId",
        }),
    ),
];

/// Get the enrichment rule for a resource type
pub fn rule_for(type_name: &str) -> Option<&'static EnrichmentRule> {
    ENRICHMENT_RULES
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, rule)| rule)
}

fn describe(summary: &ResourceSummary) -> String {
    serde_json::to_string(summary).unwrap_or_else(|_| summary.logical_id.clone())
}

/// Enrich a stack's resources.
///
/// Independent resources come first in input order, followed by dependent
/// resources in input order. With `concurrency > 1` describe calls overlap,
/// but results keep input order.
pub async fn enrich(
    client: &ProviderClient,
    context: &DeploymentContext,
    resources: &[ResourceSummary],
    concurrency: usize,
) -> Result<Vec<EnrichedResource>> {
    let concurrency = concurrency.max(1);

    let mut independent = Vec::new();
    let mut dependent = Vec::new();
    for summary in resources {
        match rule_for(summary.resource_type.type_name()) {
            Some(EnrichmentRule::Independent(lookup)) => independent.push((summary, *lookup)),
            Some(EnrichmentRule::Dependent(lookup)) => dependent.push((summary, *lookup)),
            None => tracing::debug!("Skipping {}", describe(summary)),
        }
    }

    let mut enriched: Vec<EnrichedResource> = stream::iter(independent)
        .map(|(summary, lookup)| enrich_independent(client, summary, lookup))
        .buffered(concurrency)
        .try_collect()
        .await?;

    // Dependents look their parent up among the first-pass results
    let resolved: Vec<EnrichedResource> = stream::iter(dependent)
        .map(|(summary, lookup)| enrich_dependent(client, context, &enriched, summary, lookup))
        .buffered(concurrency)
        .try_collect()
        .await?;

    enriched.extend(resolved);
    Ok(enriched)
}

async fn enrich_independent(
    client: &ProviderClient,
    summary: &ResourceSummary,
    lookup: Lookup,
) -> Result<EnrichedResource> {
    tracing::debug!("Processing {}", describe(summary));

    match lookup {
        Lookup::PassThrough => Ok(EnrichedResource::passthrough(summary.clone())),
        Lookup::Describe { id, call, schema } => {
            let id = id.resolve(&summary.physical_id);
            let metadata = client
                .fetch(call.service, call.operation, Value::Object(call.params(id)))
                .await?;

            let mut enriched = EnrichedResource::with_metadata(summary.clone(), metadata);
            if let Some(schema_call) = schema {
                enriched.schema = Some(fetch_schema(client, schema_call, id).await?);
            }
            Ok(enriched)
        }
    }
}

/// Fetch an introspection schema and parse its JSON text
async fn fetch_schema(client: &ProviderClient, call: DescribeCall, id: &str) -> Result<Value> {
    let response = client
        .fetch(call.service, call.operation, Value::Object(call.params(id)))
        .await?;

    match response.get("schema") {
        Some(Value::String(text)) => serde_json::from_str(text).map_err(|e| {
            HookError::provider(
                call.service.name(),
                call.operation,
                format!("schema is not valid JSON: {}", e),
            )
        }),
        Some(Value::Object(_)) => Ok(response["schema"].clone()),
        _ => Err(HookError::malformed(call.service.name(), call.operation, "schema")),
    }
}

/// Physical id of the parent a dependent resource refers to
fn resolve_parent(
    context: &DeploymentContext,
    enriched: &[EnrichedResource],
    summary: &ResourceSummary,
    lookup: &DependentLookup,
) -> Result<String> {
    match context
        .template
        .reference(&summary.logical_id, lookup.template_property)
    {
        Some(PropertyRef::Ref(parent)) => enriched
            .iter()
            .find(|r| r.resource_type().type_name() == lookup.parent_type && r.logical_id() == parent)
            .map(|r| r.physical_id().to_string())
            .ok_or_else(|| {
                HookError::configuration(format!(
                    "{} {} refers to {} {} which is not part of the stack",
                    summary.resource_type, summary.logical_id, lookup.parent_type, parent
                ))
            }),
        Some(PropertyRef::Literal(physical_id)) => Ok(physical_id.to_string()),
        None => Err(HookError::configuration(format!(
            "Compiled template has no {} reference for {} {}",
            lookup.template_property, summary.resource_type, summary.logical_id
        ))),
    }
}

async fn enrich_dependent(
    client: &ProviderClient,
    context: &DeploymentContext,
    enriched: &[EnrichedResource],
    summary: &ResourceSummary,
    lookup: DependentLookup,
) -> Result<EnrichedResource> {
    tracing::debug!("Processing {}", describe(summary));

    let parent_id = resolve_parent(context, enriched, summary, &lookup)?;
    let mut params = lookup.call.params(&summary.physical_id);
    params.insert(lookup.parent_param.to_string(), Value::String(parent_id));

    let metadata = client
        .fetch(lookup.call.service, lookup.call.operation, Value::Object(params))
        .await?;

    Ok(EnrichedResource::with_metadata(summary.clone(), metadata))
}
