//! Provider client
//!
//! Wraps a gateway with the per-call timeout and request logging shared by
//! every pipeline stage.

use super::gateway::{ProviderGateway, Service};
use crate::error::{HookError, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default per-call timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Main provider client
#[derive(Clone)]
pub struct ProviderClient {
    gateway: Arc<dyn ProviderGateway>,
    call_timeout: Duration,
}

impl ProviderClient {
    /// Create a new client around a gateway
    pub fn new(gateway: impl ProviderGateway + 'static) -> Self {
        Self::from_arc(Arc::new(gateway))
    }

    pub fn from_arc(gateway: Arc<dyn ProviderGateway>) -> Self {
        Self {
            gateway,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Issue a request, failing with a provider error if it exceeds the call timeout
    pub async fn fetch(&self, service: Service, operation: &str, params: Value) -> Result<Value> {
        tracing::debug!("fetch({}, {}, {})", service, operation, params);

        match tokio::time::timeout(
            self.call_timeout,
            self.gateway.request(service, operation, params),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(HookError::provider(
                service.name(),
                operation,
                format!("timed out after {}ms", self.call_timeout.as_millis()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::memory::MemoryGateway;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_returns_gateway_response() {
        let gateway = MemoryGateway::new().with_response(
            Service::CognitoIdentity,
            "describeIdentityPool",
            json!({ "IdentityPoolId": "us-east-1:abc" }),
            json!({ "IdentityPoolName": "pool" }),
        );
        let client = ProviderClient::new(gateway);

        let response = client
            .fetch(
                Service::CognitoIdentity,
                "describeIdentityPool",
                json!({ "IdentityPoolId": "us-east-1:abc" }),
            )
            .await
            .unwrap();

        assert_eq!(response["IdentityPoolName"], "pool");
    }

    #[tokio::test]
    async fn test_slow_call_times_out_as_provider_error() {
        let gateway = MemoryGateway::new()
            .with_response(
                Service::AppSync,
                "getGraphqlApi",
                json!({ "apiId": "abc" }),
                json!({}),
            )
            .with_latency(Duration::from_millis(500));
        let client = ProviderClient::new(gateway).with_call_timeout(Duration::from_millis(20));

        let err = client
            .fetch(Service::AppSync, "getGraphqlApi", json!({ "apiId": "abc" }))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ProviderError");
        assert!(err.to_string().contains("timed out"));
    }
}
