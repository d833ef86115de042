//! In-memory gateway
//!
//! Answers requests from canned responses keyed by service, operation and
//! parameters, and records every call it receives. Used by the test suite
//! and by anything embedding the pipeline without live credentials.

use super::gateway::{ProviderGateway, Service};
use crate::error::{HookError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type RequestKey = (Service, String, String);

/// A request observed by [`MemoryGateway`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub service: Service,
    pub operation: String,
    pub params: Value,
}

#[derive(Debug, Clone)]
enum Canned {
    Response(Value),
    Failure(String),
}

/// Gateway answering from canned responses
#[derive(Debug, Default)]
pub struct MemoryGateway {
    responses: HashMap<RequestKey, Canned>,
    latency: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// Parameters are matched on their canonical (key-sorted) JSON text
fn request_key(service: Service, operation: &str, params: &Value) -> RequestKey {
    (service, operation.to_string(), params.to_string())
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `operation` with `params` by returning `response`
    pub fn with_response(
        mut self,
        service: Service,
        operation: &str,
        params: Value,
        response: Value,
    ) -> Self {
        self.responses.insert(
            request_key(service, operation, &params),
            Canned::Response(response),
        );
        self
    }

    /// Answer `operation` with `params` by failing with `reason`
    pub fn with_failure(mut self, service: Service, operation: &str, params: Value, reason: &str) -> Self {
        self.responses.insert(
            request_key(service, operation, &params),
            Canned::Failure(reason.to_string()),
        );
        self
    }

    /// Delay every response
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Calls received so far, in arrival order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Number of calls received for one operation
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }
}

#[async_trait]
impl ProviderGateway for MemoryGateway {
    async fn request(&self, service: Service, operation: &str, params: Value) -> Result<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                service,
                operation: operation.to_string(),
                params: params.clone(),
            });
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.responses.get(&request_key(service, operation, &params)) {
            Some(Canned::Response(value)) => Ok(value.clone()),
            Some(Canned::Failure(reason)) => Err(HookError::provider(service.name(), operation, reason)),
            None => Err(HookError::provider(
                service.name(),
                operation,
                format!("no canned response for {}", params),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_params_match_regardless_of_key_order() {
        let gateway = MemoryGateway::new().with_response(
            Service::CognitoIdentityServiceProvider,
            "describeUserPoolClient",
            json!({ "ClientId": "c1", "UserPoolId": "us-east-1_x" }),
            json!({ "UserPoolClient": { "ClientId": "c1" } }),
        );

        let response = gateway
            .request(
                Service::CognitoIdentityServiceProvider,
                "describeUserPoolClient",
                json!({ "UserPoolId": "us-east-1_x", "ClientId": "c1" }),
            )
            .await
            .unwrap();

        assert_eq!(response["UserPoolClient"]["ClientId"], "c1");
        assert_eq!(gateway.call_count("describeUserPoolClient"), 1);
    }

    #[tokio::test]
    async fn test_unknown_request_fails() {
        let gateway = MemoryGateway::new();
        let err = gateway
            .request(Service::AppSync, "getGraphqlApi", json!({ "apiId": "nope" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no canned response"));
    }

    #[tokio::test]
    async fn test_canned_failure() {
        let gateway = MemoryGateway::new().with_failure(
            Service::CloudFormation,
            "listStackResources",
            json!({ "StackName": "gone" }),
            "Stack with id gone does not exist",
        );
        let err = gateway
            .request(Service::CloudFormation, "listStackResources", json!({ "StackName": "gone" }))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "CloudFormation.listStackResources failed: Stack with id gone does not exist"
        );
    }
}
