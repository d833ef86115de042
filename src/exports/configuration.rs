//! Configuration Synthesizer
//!
//! Folds the enriched resources into the flat client configuration. Each
//! rule writes its own keys; where several resources could supply a value
//! the first one in input order wins.

use crate::aws::Service;
use crate::context::DeploymentContext;
use crate::error::{HookError, Result};
use crate::resource::types::{segment, EnrichedResource, ResourceType};
use serde::Serialize;
use serde_json::Value;

/// Logical id of the deployment tool's own artifact bucket
pub const DEPLOYMENT_BUCKET_LOGICAL_ID: &str = "ServerlessDeploymentBucket";

/// Identity provider domain → federated configuration key
const FEDERATION_PROVIDERS: &[(&str, FederatedKey)] = &[
    ("accounts.google.com", FederatedKey::Google),
    ("graph.facebook.com", FederatedKey::Facebook),
    ("www.amazon.com", FederatedKey::Amazon),
];

#[derive(Debug, Clone, Copy)]
enum FederatedKey {
    Google,
    Facebook,
    Amazon,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FederatedConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amazon_client_id: Option<String>,
}

impl FederatedConfiguration {
    fn set(&mut self, key: FederatedKey, value: String) {
        match key {
            FederatedKey::Google => self.google_client_id = Some(value),
            FederatedKey::Facebook => self.facebook_app_id = Some(value),
            FederatedKey::Amazon => self.amazon_client_id = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.google_client_id.is_none() && self.facebook_app_id.is_none() && self.amazon_client_id.is_none()
    }
}

/// One REST API endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudLogicRecord {
    pub endpoint: String,
    pub name: String,
    pub region: String,
}

/// The synthesized client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Configuration {
    pub aws_project_region: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_cognito_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_user_pools_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_user_pools_web_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_user_pools_web_client_secret: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_cognito_identity_pool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federated: Option<FederatedConfiguration>,

    #[serde(rename = "aws_appsync_graphqlEndpoint", skip_serializing_if = "Option::is_none")]
    pub aws_appsync_graphql_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_appsync_region: Option<String>,
    #[serde(rename = "aws_appsync_authenticationType", skip_serializing_if = "Option::is_none")]
    pub aws_appsync_authentication_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_user_files_s3_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_user_files_s3_bucket_region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_cloud_logic_custom: Option<Vec<CloudLogicRecord>>,
}

/// Read a string at a JSON pointer of a resource's metadata
fn metadata_str<'a>(
    resource: &'a EnrichedResource,
    pointer: &str,
    service: Service,
    operation: &str,
) -> Result<&'a str> {
    resource
        .metadata
        .as_ref()
        .and_then(|m| m.pointer(pointer))
        .and_then(|v| v.as_str())
        .ok_or_else(|| HookError::malformed(service.name(), operation, &pointer[1..].replace('/', ".")))
}

fn of_type(
    resources: &[EnrichedResource],
    resource_type: ResourceType,
) -> impl Iterator<Item = &EnrichedResource> {
    resources.iter().filter(move |r| *r.resource_type() == resource_type)
}

/// First resource of a type; more than one is a known ambiguity that is logged
fn first_of_type(resources: &[EnrichedResource], resource_type: ResourceType) -> Option<&EnrichedResource> {
    let mut candidates = of_type(resources, resource_type.clone());
    let first = candidates.next()?;
    let others = candidates.count();
    if others > 0 {
        tracing::debug!(
            "{} resources of type {} found, using {}",
            others + 1,
            resource_type,
            first.logical_id()
        );
    }
    Some(first)
}

/// Synthesize the configuration for one artifact.
///
/// `app_client` is the logical id of the user pool client to expose, if any.
pub fn synthesize(
    resources: &[EnrichedResource],
    context: &DeploymentContext,
    app_client: Option<&str>,
) -> Result<Configuration> {
    let mut config = Configuration {
        aws_project_region: context.region.clone(),
        ..Default::default()
    };

    if let Some(app_client) = app_client {
        apply_app_client(&mut config, resources, app_client)?;
    }
    apply_identity_pool(&mut config, resources);
    apply_graphql_api(&mut config, resources)?;
    apply_user_files(&mut config, resources, context);
    apply_cloud_logic(&mut config, resources, context);

    Ok(config)
}

fn apply_app_client(config: &mut Configuration, resources: &[EnrichedResource], app_client: &str) -> Result<()> {
    const OPERATION: &str = "describeUserPoolClient";
    let service = Service::CognitoIdentityServiceProvider;

    let client = of_type(resources, ResourceType::UserPoolClient)
        .find(|r| r.logical_id() == app_client)
        .ok_or_else(|| HookError::configuration(format!("Invalid appClient specified: {}", app_client)))?;

    let user_pool_id = metadata_str(client, "/UserPoolClient/UserPoolId", service, OPERATION)?;
    let client_id = metadata_str(client, "/UserPoolClient/ClientId", service, OPERATION)?;

    config.aws_cognito_region = segment(user_pool_id, '_', 0).map(str::to_string);
    config.aws_user_pools_id = Some(user_pool_id.to_string());
    config.aws_user_pools_web_client_id = Some(client_id.to_string());
    config.aws_user_pools_web_client_secret = client
        .metadata
        .as_ref()
        .and_then(|m| m.pointer("/UserPoolClient/ClientSecret"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(())
}

fn apply_identity_pool(config: &mut Configuration, resources: &[EnrichedResource]) {
    let Some(identity_pool) = first_of_type(resources, ResourceType::IdentityPool) else {
        return;
    };

    if config.aws_cognito_region.is_none() {
        config.aws_cognito_region = segment(identity_pool.physical_id(), ':', 0).map(str::to_string);
    }
    config.aws_cognito_identity_pool_id = Some(identity_pool.physical_id().to_string());

    let providers = identity_pool
        .metadata
        .as_ref()
        .and_then(|m| m.get("SupportedLoginProviders"))
        .and_then(Value::as_object);

    if let Some(providers) = providers {
        let mut federated = FederatedConfiguration::default();
        for (domain, key) in FEDERATION_PROVIDERS {
            if let Some(id) = providers.get(*domain).and_then(|v| v.as_str()) {
                federated.set(*key, id.to_string());
            }
        }
        if !federated.is_empty() {
            config.federated = Some(federated);
        }
    }
}

fn apply_graphql_api(config: &mut Configuration, resources: &[EnrichedResource]) -> Result<()> {
    const OPERATION: &str = "getGraphqlApi";
    let service = Service::AppSync;

    let Some(api) = first_of_type(resources, ResourceType::GraphqlApi) else {
        return Ok(());
    };

    let endpoint = metadata_str(api, "/graphqlApi/uris/GRAPHQL", service, OPERATION)?;
    let arn = metadata_str(api, "/graphqlApi/arn", service, OPERATION)?;
    let authentication_type = metadata_str(api, "/graphqlApi/authenticationType", service, OPERATION)?;

    config.aws_appsync_graphql_endpoint = Some(endpoint.to_string());
    config.aws_appsync_region = segment(arn, ':', 3).map(str::to_string);
    config.aws_appsync_authentication_type = Some(authentication_type.to_string());

    Ok(())
}

fn apply_user_files(config: &mut Configuration, resources: &[EnrichedResource], context: &DeploymentContext) {
    let bucket = of_type(resources, ResourceType::S3Bucket)
        .find(|r| r.logical_id() != DEPLOYMENT_BUCKET_LOGICAL_ID);

    if let Some(bucket) = bucket {
        config.aws_user_files_s3_bucket = Some(bucket.physical_id().to_string());
        config.aws_user_files_s3_bucket_region = Some(context.region.clone());
    }
}

/// `https://<api-id>.execute-api.<region>.amazonaws.com/<stage>`
pub fn rest_api_endpoint(api_id: &str, region: &str, stage: &str) -> String {
    format!("https://{}.execute-api.{}.amazonaws.com/{}", api_id, region, stage)
}

fn apply_cloud_logic(config: &mut Configuration, resources: &[EnrichedResource], context: &DeploymentContext) {
    let records: Vec<CloudLogicRecord> = of_type(resources, ResourceType::RestApi)
        .map(|api| CloudLogicRecord {
            endpoint: rest_api_endpoint(api.physical_id(), &context.region, &context.stage),
            name: api.logical_id().to_string(),
            region: context.region.clone(),
        })
        .collect();

    if !records.is_empty() {
        config.aws_cloud_logic_custom = Some(records);
    }
}

/// Introspection schema of the first GraphQL API, if any
pub fn first_graphql_schema(resources: &[EnrichedResource]) -> Option<&Value> {
    first_of_type(resources, ResourceType::GraphqlApi)?.schema.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::types::{
        ResourceSummary, GRAPHQL_API, IDENTITY_POOL, REST_API, S3_BUCKET, USER_POOL_CLIENT,
    };
    use serde_json::json;

    fn context() -> DeploymentContext {
        DeploymentContext::new("app-dev", "us-east-1", "dev")
    }

    fn identity_pool(logical: &str, physical: &str, metadata: Value) -> EnrichedResource {
        EnrichedResource::with_metadata(ResourceSummary::new(logical, physical, IDENTITY_POOL), metadata)
    }

    fn app_client(logical: &str, secret: Option<&str>) -> EnrichedResource {
        let mut client = json!({ "ClientId": "client123", "UserPoolId": "eu-west-1_pool" });
        if let Some(secret) = secret {
            client["ClientSecret"] = json!(secret);
        }
        EnrichedResource::with_metadata(
            ResourceSummary::new(logical, "client123", USER_POOL_CLIENT),
            json!({ "UserPoolClient": client }),
        )
    }

    fn graphql_api(logical: &str, region: &str) -> EnrichedResource {
        EnrichedResource::with_metadata(
            ResourceSummary::new(logical, &format!("arn:aws:appsync:{}:123:apis/{}", region, logical), GRAPHQL_API),
            json!({ "graphqlApi": {
                "arn": format!("arn:aws:appsync:{}:123456789012:apis/{}", region, logical),
                "uris": { "GRAPHQL": format!("https://{}.appsync-api.{}.amazonaws.com/graphql", logical, region) },
                "authenticationType": "AMAZON_COGNITO_USER_POOLS"
            }}),
        )
    }

    fn passthrough(logical: &str, physical: &str, resource_type: &str) -> EnrichedResource {
        EnrichedResource::passthrough(ResourceSummary::new(logical, physical, resource_type))
    }

    #[test]
    fn test_region_is_always_set() {
        let config = synthesize(&[], &context(), None).unwrap();
        assert_eq!(config, Configuration {
            aws_project_region: "us-east-1".to_string(),
            ..Default::default()
        });
    }

    #[test]
    fn test_google_federation_only() {
        let resources = vec![identity_pool(
            "IdentityPool",
            "us-east-1:1234-abcd",
            json!({ "SupportedLoginProviders": { "accounts.google.com": "g-123" } }),
        )];

        let config = synthesize(&resources, &context(), None).unwrap();

        let federated = config.federated.unwrap();
        assert_eq!(federated.google_client_id.as_deref(), Some("g-123"));
        assert!(federated.facebook_app_id.is_none());
        assert!(federated.amazon_client_id.is_none());
        assert_eq!(config.aws_cognito_region.as_deref(), Some("us-east-1"));
        assert_eq!(config.aws_cognito_identity_pool_id.as_deref(), Some("us-east-1:1234-abcd"));
    }

    #[test]
    fn test_all_federation_providers() {
        let resources = vec![identity_pool(
            "IdentityPool",
            "us-east-1:1234-abcd",
            json!({ "SupportedLoginProviders": {
                "accounts.google.com": "g-123",
                "graph.facebook.com": "fb-456",
                "www.amazon.com": "amzn-789"
            }}),
        )];

        let config = synthesize(&resources, &context(), None).unwrap();

        assert_eq!(
            config.federated,
            Some(FederatedConfiguration {
                google_client_id: Some("g-123".to_string()),
                facebook_app_id: Some("fb-456".to_string()),
                amazon_client_id: Some("amzn-789".to_string()),
            })
        );
        let rendered = serde_json::to_value(&config).unwrap();
        assert_eq!(
            rendered["federated"],
            json!({ "google_client_id": "g-123", "facebook_app_id": "fb-456", "amazon_client_id": "amzn-789" })
        );
    }

    #[test]
    fn test_unknown_providers_produce_no_federation() {
        let resources = vec![identity_pool(
            "IdentityPool",
            "us-east-1:1234",
            json!({ "SupportedLoginProviders": { "login.example.com": "x" } }),
        )];
        let config = synthesize(&resources, &context(), None).unwrap();
        assert!(config.federated.is_none());
    }

    #[test]
    fn test_first_identity_pool_wins() {
        let resources = vec![
            identity_pool("First", "us-west-2:first", json!({})),
            identity_pool("Second", "eu-west-1:second", json!({})),
        ];
        let config = synthesize(&resources, &context(), None).unwrap();
        assert_eq!(config.aws_cognito_identity_pool_id.as_deref(), Some("us-west-2:first"));
        assert_eq!(config.aws_cognito_region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn test_missing_app_client_names_identifier() {
        let resources = vec![app_client("OtherClient", None)];
        let err = synthesize(&resources, &context(), Some("MyClient")).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
        assert!(err.to_string().contains("MyClient"));
    }

    #[test]
    fn test_app_client_region_wins_over_identity_pool() {
        let resources = vec![
            identity_pool("IdentityPool", "us-east-1:1234", json!({})),
            app_client("WebClient", Some("s3cret")),
        ];

        let config = synthesize(&resources, &context(), Some("WebClient")).unwrap();

        assert_eq!(config.aws_cognito_region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.aws_user_pools_id.as_deref(), Some("eu-west-1_pool"));
        assert_eq!(config.aws_user_pools_web_client_id.as_deref(), Some("client123"));
        assert_eq!(config.aws_user_pools_web_client_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.aws_cognito_identity_pool_id.as_deref(), Some("us-east-1:1234"));
    }

    #[test]
    fn test_app_client_without_secret() {
        let resources = vec![app_client("WebClient", None)];
        let config = synthesize(&resources, &context(), Some("WebClient")).unwrap();
        assert!(config.aws_user_pools_web_client_secret.is_none());
    }

    #[test]
    fn test_first_graphql_api_wins() {
        let resources = vec![graphql_api("FirstApi", "ap-south-1"), graphql_api("SecondApi", "us-east-1")];

        let config = synthesize(&resources, &context(), None).unwrap();

        assert_eq!(
            config.aws_appsync_graphql_endpoint.as_deref(),
            Some("https://FirstApi.appsync-api.ap-south-1.amazonaws.com/graphql")
        );
        assert_eq!(config.aws_appsync_region.as_deref(), Some("ap-south-1"));
        assert_eq!(config.aws_appsync_authentication_type.as_deref(), Some("AMAZON_COGNITO_USER_POOLS"));
    }

    #[test]
    fn test_graphql_api_without_metadata_is_provider_error() {
        let resources = vec![passthrough("Api", "arn:aws:appsync:us-east-1:1:apis/x", GRAPHQL_API)];
        let err = synthesize(&resources, &context(), None).unwrap_err();
        assert_eq!(err.kind(), "ProviderError");
        assert!(err.to_string().contains("graphqlApi.uris.GRAPHQL"));
    }

    #[test]
    fn test_deployment_bucket_is_excluded() {
        let resources = vec![passthrough(DEPLOYMENT_BUCKET_LOGICAL_ID, "app-dev-serverlessdeploymentbucket", S3_BUCKET)];
        let config = synthesize(&resources, &context(), None).unwrap();
        assert!(config.aws_user_files_s3_bucket.is_none());
        assert!(config.aws_user_files_s3_bucket_region.is_none());
    }

    #[test]
    fn test_first_user_bucket_is_used() {
        let resources = vec![
            passthrough(DEPLOYMENT_BUCKET_LOGICAL_ID, "deploy-bucket", S3_BUCKET),
            passthrough("Uploads", "app-dev-uploads", S3_BUCKET),
            passthrough("Archive", "app-dev-archive", S3_BUCKET),
        ];
        let config = synthesize(&resources, &context(), None).unwrap();
        assert_eq!(config.aws_user_files_s3_bucket.as_deref(), Some("app-dev-uploads"));
        assert_eq!(config.aws_user_files_s3_bucket_region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_rest_apis_in_input_order() {
        let resources = vec![passthrough("Api1", "abc111", REST_API), passthrough("Api2", "def222", REST_API)];

        let config = synthesize(&resources, &context(), None).unwrap();

        assert_eq!(
            config.aws_cloud_logic_custom,
            Some(vec![
                CloudLogicRecord {
                    endpoint: "https://abc111.execute-api.us-east-1.amazonaws.com/dev".to_string(),
                    name: "Api1".to_string(),
                    region: "us-east-1".to_string(),
                },
                CloudLogicRecord {
                    endpoint: "https://def222.execute-api.us-east-1.amazonaws.com/dev".to_string(),
                    name: "Api2".to_string(),
                    region: "us-east-1".to_string(),
                },
            ])
        );
    }

    #[test]
    fn test_no_rest_apis_omits_key() {
        let config = synthesize(&[], &context(), None).unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("aws_cloud_logic_custom").is_none());
        assert!(value.get("federated").is_none());
    }

    #[test]
    fn test_serialized_key_names() {
        let resources = vec![graphql_api("Api", "us-east-1")];
        let value = serde_json::to_value(synthesize(&resources, &context(), None).unwrap()).unwrap();
        assert!(value.get("aws_appsync_graphqlEndpoint").is_some());
        assert!(value.get("aws_appsync_authenticationType").is_some());
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let resources = vec![
            graphql_api("Api", "us-east-1"),
            passthrough("Api1", "abc111", REST_API),
            passthrough("Api2", "def222", REST_API),
            identity_pool("IdentityPool", "us-east-1:1", json!({ "SupportedLoginProviders": { "www.amazon.com": "amzn" } })),
        ];
        let first = synthesize(&resources, &context(), None).unwrap();
        let second = synthesize(&resources, &context(), None).unwrap();
        assert_eq!(first, second);
    }
}
