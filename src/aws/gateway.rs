//! Provider gateway
//!
//! The seam between the pipeline and the cloud control plane. A gateway takes
//! an API name, an operation and its parameters and returns the raw JSON
//! response; pagination and interpretation are left to the caller.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// AWS services the hook reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    CloudFormation,
    AppSync,
    CognitoIdentity,
    CognitoIdentityServiceProvider,
}

impl Service {
    /// API name as used in SDK request signatures
    pub fn name(&self) -> &'static str {
        match self {
            Self::CloudFormation => "CloudFormation",
            Self::AppSync => "AppSync",
            Self::CognitoIdentity => "CognitoIdentity",
            Self::CognitoIdentityServiceProvider => "CognitoIdentityServiceProvider",
        }
    }

    /// Command name understood by the `aws` CLI
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::CloudFormation => "cloudformation",
            Self::AppSync => "appsync",
            Self::CognitoIdentity => "cognito-identity",
            Self::CognitoIdentityServiceProvider => "cognito-idp",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Executes one provider request and returns the raw response
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Issue `operation` (camelCase SDK name, e.g. `listStackResources`)
    /// against `service` with the given request parameters.
    async fn request(&self, service: Service, operation: &str, params: Value) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(Service::CloudFormation.name(), "CloudFormation");
        assert_eq!(Service::CognitoIdentityServiceProvider.cli_name(), "cognito-idp");
        assert_eq!(Service::AppSync.to_string(), "AppSync");
    }
}
