//! AWS SDK gateway
//!
//! Issues provider requests through the AWS SDK clients and maps each
//! response onto the service's JSON shape, so the pipeline reads the same
//! field names whichever gateway is in use. Only the members the pipeline
//! reads are carried over.

use super::gateway::{ProviderGateway, Service};
use crate::error::{HookError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_appsync::types::{GraphqlApi, OutputType};
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::StackResourceSummary;
use aws_sdk_cognitoidentityprovider::types::{UserPoolClientType, UserPoolType};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// SDK getters return `&str` for required members and `Option<&str>` otherwise
trait MemberStr<'a> {
    fn member(self) -> Option<&'a str>;
}

impl<'a> MemberStr<'a> for &'a str {
    fn member(self) -> Option<&'a str> {
        Some(self)
    }
}

impl<'a> MemberStr<'a> for Option<&'a str> {
    fn member(self) -> Option<&'a str> {
        self
    }
}

fn text<'a>(value: impl MemberStr<'a>) -> Value {
    value
        .member()
        .map(|s| Value::String(s.to_string()))
        .unwrap_or(Value::Null)
}

fn string_map(map: Option<&HashMap<String, String>>) -> Value {
    match map {
        Some(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<String, Value>>(),
        ),
        None => Value::Null,
    }
}

/// Drop null members, as the service does for absent ones
fn compact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, compact(v)))
                .collect(),
        ),
        other => other,
    }
}

pub fn stack_resource_summary_json(summary: &StackResourceSummary) -> Value {
    compact(json!({
        "LogicalResourceId": text(summary.logical_resource_id()),
        "PhysicalResourceId": text(summary.physical_resource_id()),
        "ResourceType": text(summary.resource_type()),
    }))
}

pub fn graphql_api_json(api: &GraphqlApi) -> Value {
    compact(json!({
        "graphqlApi": {
            "apiId": text(api.api_id()),
            "name": text(api.name()),
            "arn": text(api.arn()),
            "authenticationType": text(api.authentication_type().map(|t| t.as_str())),
            "uris": string_map(api.uris()),
        }
    }))
}

pub fn user_pool_json(pool: &UserPoolType) -> Value {
    compact(json!({
        "UserPool": {
            "Id": text(pool.id()),
            "Name": text(pool.name()),
            "Arn": text(pool.arn()),
        }
    }))
}

pub fn user_pool_client_json(client: &UserPoolClientType) -> Value {
    compact(json!({
        "UserPoolClient": {
            "ClientId": text(client.client_id()),
            "ClientName": text(client.client_name()),
            "ClientSecret": text(client.client_secret()),
            "UserPoolId": text(client.user_pool_id()),
        }
    }))
}

fn sdk_error<E>(service: Service, operation: &str, err: E) -> HookError
where
    E: std::error::Error + 'static,
{
    HookError::provider(service.name(), operation, DisplayErrorContext(&err).to_string())
}

fn required_param<'a>(params: &'a Value, service: Service, operation: &str, name: &str) -> Result<&'a str> {
    params.get(name).and_then(Value::as_str).ok_or_else(|| {
        HookError::provider(
            service.name(),
            operation,
            format!("missing request parameter `{}`", name),
        )
    })
}

fn optional_param(params: &Value, name: &str) -> Option<String> {
    params.get(name).and_then(Value::as_str).map(str::to_string)
}

/// Gateway backed by the AWS SDK clients
#[derive(Debug, Clone)]
pub struct AwsSdkGateway {
    cloudformation: aws_sdk_cloudformation::Client,
    appsync: aws_sdk_appsync::Client,
    cognito_identity: aws_sdk_cognitoidentity::Client,
    cognito_idp: aws_sdk_cognitoidentityprovider::Client,
}

impl AwsSdkGateway {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            cloudformation: aws_sdk_cloudformation::Client::new(config),
            appsync: aws_sdk_appsync::Client::new(config),
            cognito_identity: aws_sdk_cognitoidentity::Client::new(config),
            cognito_idp: aws_sdk_cognitoidentityprovider::Client::new(config),
        }
    }

    /// Load credentials from the default provider chain (environment,
    /// shared config with an optional profile, instance roles)
    pub async fn from_env(region: &str, profile: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        tracing::debug!("Loaded AWS SDK configuration for region {}", region);
        Self::new(&config)
    }

    async fn list_stack_resources(&self, params: &Value) -> Result<Value> {
        const OPERATION: &str = "listStackResources";
        let service = Service::CloudFormation;

        let output = self
            .cloudformation
            .list_stack_resources()
            .stack_name(required_param(params, service, OPERATION, "StackName")?)
            .set_next_token(optional_param(params, "NextToken"))
            .send()
            .await
            .map_err(|e| sdk_error(service, OPERATION, e))?;

        let summaries: Vec<Value> = output
            .stack_resource_summaries()
            .iter()
            .map(stack_resource_summary_json)
            .collect();

        Ok(compact(json!({
            "StackResourceSummaries": summaries,
            "NextToken": text(output.next_token()),
        })))
    }

    async fn get_graphql_api(&self, params: &Value) -> Result<Value> {
        const OPERATION: &str = "getGraphqlApi";
        let service = Service::AppSync;

        let output = self
            .appsync
            .get_graphql_api()
            .api_id(required_param(params, service, OPERATION, "apiId")?)
            .send()
            .await
            .map_err(|e| sdk_error(service, OPERATION, e))?;

        output
            .graphql_api()
            .map(graphql_api_json)
            .ok_or_else(|| HookError::malformed(service.name(), OPERATION, "graphqlApi"))
    }

    async fn get_introspection_schema(&self, params: &Value) -> Result<Value> {
        const OPERATION: &str = "getIntrospectionSchema";
        let service = Service::AppSync;

        let format = optional_param(params, "format").unwrap_or_else(|| "JSON".to_string());
        let output = self
            .appsync
            .get_introspection_schema()
            .api_id(required_param(params, service, OPERATION, "apiId")?)
            .format(OutputType::from(format.as_str()))
            .send()
            .await
            .map_err(|e| sdk_error(service, OPERATION, e))?;

        let schema = output
            .schema()
            .ok_or_else(|| HookError::malformed(service.name(), OPERATION, "schema"))?;
        Ok(json!({ "schema": String::from_utf8_lossy(schema.as_ref()) }))
    }

    async fn describe_identity_pool(&self, params: &Value) -> Result<Value> {
        const OPERATION: &str = "describeIdentityPool";
        let service = Service::CognitoIdentity;

        let output = self
            .cognito_identity
            .describe_identity_pool()
            .identity_pool_id(required_param(params, service, OPERATION, "IdentityPoolId")?)
            .send()
            .await
            .map_err(|e| sdk_error(service, OPERATION, e))?;

        Ok(compact(json!({
            "IdentityPoolId": text(output.identity_pool_id()),
            "IdentityPoolName": text(output.identity_pool_name()),
            "SupportedLoginProviders": string_map(output.supported_login_providers()),
        })))
    }

    async fn describe_user_pool(&self, params: &Value) -> Result<Value> {
        const OPERATION: &str = "describeUserPool";
        let service = Service::CognitoIdentityServiceProvider;

        let output = self
            .cognito_idp
            .describe_user_pool()
            .user_pool_id(required_param(params, service, OPERATION, "UserPoolId")?)
            .send()
            .await
            .map_err(|e| sdk_error(service, OPERATION, e))?;

        output
            .user_pool()
            .map(user_pool_json)
            .ok_or_else(|| HookError::malformed(service.name(), OPERATION, "UserPool"))
    }

    async fn describe_user_pool_client(&self, params: &Value) -> Result<Value> {
        const OPERATION: &str = "describeUserPoolClient";
        let service = Service::CognitoIdentityServiceProvider;

        let output = self
            .cognito_idp
            .describe_user_pool_client()
            .user_pool_id(required_param(params, service, OPERATION, "UserPoolId")?)
            .client_id(required_param(params, service, OPERATION, "ClientId")?)
            .send()
            .await
            .map_err(|e| sdk_error(service, OPERATION, e))?;

        output
            .user_pool_client()
            .map(user_pool_client_json)
            .ok_or_else(|| HookError::malformed(service.name(), OPERATION, "UserPoolClient"))
    }
}

#[async_trait]
impl ProviderGateway for AwsSdkGateway {
    async fn request(&self, service: Service, operation: &str, params: Value) -> Result<Value> {
        match (service, operation) {
            (Service::CloudFormation, "listStackResources") => self.list_stack_resources(&params).await,
            (Service::AppSync, "getGraphqlApi") => self.get_graphql_api(&params).await,
            (Service::AppSync, "getIntrospectionSchema") => self.get_introspection_schema(&params).await,
            (Service::CognitoIdentity, "describeIdentityPool") => self.describe_identity_pool(&params).await,
            (Service::CognitoIdentityServiceProvider, "describeUserPool") => {
                self.describe_user_pool(&params).await
            }
            (Service::CognitoIdentityServiceProvider, "describeUserPoolClient") => {
                self.describe_user_pool_client(&params).await
            }
            _ => Err(HookError::provider(
                service.name(),
                operation,
                "operation is not supported by the SDK gateway",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_appsync::types::AuthenticationType;

    fn gateway() -> AwsSdkGateway {
        let config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        AwsSdkGateway::new(&config)
    }

    #[test]
    fn test_graphql_api_maps_to_service_shape() {
        let api = GraphqlApi::builder()
            .api_id("gql123")
            .arn("arn:aws:appsync:us-east-1:123456789012:apis/gql123")
            .authentication_type(AuthenticationType::ApiKey)
            .uris("GRAPHQL", "https://gql123.appsync-api.us-east-1.amazonaws.com/graphql")
            .build();

        let value = graphql_api_json(&api);

        assert_eq!(
            value,
            json!({ "graphqlApi": {
                "apiId": "gql123",
                "arn": "arn:aws:appsync:us-east-1:123456789012:apis/gql123",
                "authenticationType": "API_KEY",
                "uris": { "GRAPHQL": "https://gql123.appsync-api.us-east-1.amazonaws.com/graphql" }
            }})
        );
    }

    #[test]
    fn test_user_pool_client_omits_absent_secret() {
        let client = UserPoolClientType::builder()
            .client_id("client123")
            .user_pool_id("us-east-1_abc")
            .build();

        assert_eq!(
            user_pool_client_json(&client),
            json!({ "UserPoolClient": { "ClientId": "client123", "UserPoolId": "us-east-1_abc" } })
        );
    }

    #[test]
    fn test_compact_drops_nested_nulls() {
        let value = compact(json!({ "a": null, "b": { "c": null, "d": 1 }, "e": [null] }));
        assert_eq!(value, json!({ "b": { "d": 1 }, "e": [null] }));
    }

    #[tokio::test]
    async fn test_missing_parameter_fails_before_sending() {
        let err = gateway()
            .request(Service::CognitoIdentityServiceProvider, "describeUserPoolClient", json!({ "ClientId": "c" }))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ProviderError");
        assert!(err.to_string().contains("`UserPoolId`"));
    }

    #[tokio::test]
    async fn test_unknown_operation_is_provider_error() {
        let err = gateway()
            .request(Service::CloudFormation, "deleteStack", json!({ "StackName": "s" }))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "CloudFormation.deleteStack failed: operation is not supported by the SDK gateway");
    }
}
