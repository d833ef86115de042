//! AWS API interaction module
//!
//! This module provides the provider gateway used by the rest of the hook:
//! the [`ProviderGateway`] trait, the [`ProviderClient`] wrapper that every
//! stage calls through, and the concrete gateways.
//!
//! # Module Structure
//!
//! - [`gateway`] - The gateway trait and the set of services it talks to
//! - [`client`] - Timeout and logging wrapper around a gateway
//! - [`sdk`] - Gateway backed by the AWS SDK clients
//! - [`cli`] - Gateway backed by the `aws` command-line client
//! - [`memory`] - Gateway answering from canned responses
//!
//! # Example
//!
//! ```ignore
//! use amplify_hook::aws::{AwsSdkGateway, ProviderClient, Service};
//! use serde_json::json;
//!
//! async fn example() -> amplify_hook::error::Result<()> {
//!     let client = ProviderClient::new(AwsSdkGateway::from_env("us-east-1", None).await);
//!     let page = client
//!         .fetch(Service::CloudFormation, "listStackResources", json!({ "StackName": "demo-dev" }))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod gateway;
pub mod memory;
pub mod sdk;

pub use cli::AwsCliGateway;
pub use client::ProviderClient;
pub use gateway::{ProviderGateway, Service};
pub use memory::MemoryGateway;
pub use sdk::AwsSdkGateway;
