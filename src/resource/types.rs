//! Resource records
//!
//! Summaries as listed by CloudFormation and the enriched records produced
//! from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const NESTED_STACK: &str = "AWS::CloudFormation::Stack";
pub const GRAPHQL_API: &str = "AWS::AppSync::GraphQLApi";
pub const IDENTITY_POOL: &str = "AWS::Cognito::IdentityPool";
pub const USER_POOL: &str = "AWS::Cognito::UserPool";
pub const USER_POOL_CLIENT: &str = "AWS::Cognito::UserPoolClient";
pub const S3_BUCKET: &str = "AWS::S3::Bucket";
pub const REST_API: &str = "AWS::ApiGateway::RestApi";

/// CloudFormation resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    NestedStack,
    GraphqlApi,
    IdentityPool,
    UserPool,
    UserPoolClient,
    S3Bucket,
    RestApi,
    Other(String),
}

impl ResourceType {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            NESTED_STACK => Self::NestedStack,
            GRAPHQL_API => Self::GraphqlApi,
            IDENTITY_POOL => Self::IdentityPool,
            USER_POOL => Self::UserPool,
            USER_POOL_CLIENT => Self::UserPoolClient,
            S3_BUCKET => Self::S3Bucket,
            REST_API => Self::RestApi,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::NestedStack => NESTED_STACK,
            Self::GraphqlApi => GRAPHQL_API,
            Self::IdentityPool => IDENTITY_POOL,
            Self::UserPool => USER_POOL,
            Self::UserPoolClient => USER_POOL_CLIENT,
            Self::S3Bucket => S3_BUCKET,
            Self::RestApi => REST_API,
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ResourceType {
    fn from(name: String) -> Self {
        Self::from_type_name(&name)
    }
}

impl From<ResourceType> for String {
    fn from(resource_type: ResourceType) -> Self {
        resource_type.type_name().to_string()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One deployed resource, as returned by `listStackResources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    #[serde(rename = "LogicalResourceId")]
    pub logical_id: String,
    /// Missing for resources that failed to create
    #[serde(rename = "PhysicalResourceId", default)]
    pub physical_id: String,
    #[serde(rename = "ResourceType")]
    pub resource_type: ResourceType,
}

impl ResourceSummary {
    pub fn new(logical_id: &str, physical_id: &str, resource_type: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            physical_id: physical_id.to_string(),
            resource_type: ResourceType::from_type_name(resource_type),
        }
    }
}

/// A resource summary with the metadata fetched for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResource {
    #[serde(flatten)]
    pub summary: ResourceSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Introspection schema (GraphQL APIs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl EnrichedResource {
    /// A record that needs nothing beyond its summary
    pub fn passthrough(summary: ResourceSummary) -> Self {
        Self {
            summary,
            metadata: None,
            schema: None,
        }
    }

    pub fn with_metadata(summary: ResourceSummary, metadata: Value) -> Self {
        Self {
            summary,
            metadata: Some(metadata),
            schema: None,
        }
    }

    pub fn logical_id(&self) -> &str {
        &self.summary.logical_id
    }

    pub fn physical_id(&self) -> &str {
        &self.summary.physical_id
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.summary.resource_type
    }
}

/// Segment `index` of `id` split on `delimiter`, if present
pub fn segment(id: &str, delimiter: char, index: usize) -> Option<&str> {
    id.split(delimiter).nth(index)
}

/// Segment `index` of `id`, falling back to the whole id when the
/// delimiter scheme does not apply
pub fn segment_or_whole(id: &str, delimiter: char, index: usize) -> &str {
    match segment(id, delimiter, index) {
        Some(part) if id.contains(delimiter) && !part.is_empty() => part,
        _ => id,
    }
}
