//! Stack Resource Walker
//!
//! Lists every resource of a stack, following nested stacks, into one flat
//! sequence.

use super::types::{segment_or_whole, ResourceSummary, ResourceType};
use crate::aws::{ProviderClient, Service};
use crate::error::{HookError, Result};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Nested stacks deeper than this are rejected
pub const MAX_NESTING_DEPTH: usize = 32;

const OPERATION: &str = "listStackResources";

/// Result of one list call
pub struct StackPage {
    pub summaries: Vec<ResourceSummary>,
    pub next_token: Option<String>,
}

/// Fetch one page of a stack's resources
pub async fn list_stack_page(
    client: &ProviderClient,
    stack_name: &str,
    next_token: Option<&str>,
) -> Result<StackPage> {
    let mut params = json!({ "StackName": stack_name });
    if let Some(token) = next_token {
        params["NextToken"] = Value::String(token.to_string());
    }

    let response = client.fetch(Service::CloudFormation, OPERATION, params).await?;

    let summaries = match response.get("StackResourceSummaries") {
        Some(items) => serde_json::from_value(items.clone()).map_err(|e| {
            HookError::provider(
                Service::CloudFormation.name(),
                OPERATION,
                format!("unexpected StackResourceSummaries: {}", e),
            )
        })?,
        None => Vec::new(),
    };

    let next_token = response
        .get("NextToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(StackPage {
        summaries,
        next_token,
    })
}

/// Fetch all resources of one stack level (auto-paginate)
pub async fn list_stack_resources(client: &ProviderClient, stack_name: &str) -> Result<Vec<ResourceSummary>> {
    let mut all_items = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page = list_stack_page(client, stack_name, next_token.as_deref()).await?;
        all_items.extend(page.summaries);

        if page.next_token.is_none() {
            break;
        }
        next_token = page.next_token;
    }

    Ok(all_items)
}

/// Stack name of a nested stack resource
/// e.g., "arn:aws:cloudformation:us-east-1:123:stack/app-dev-Api-1X/guid" -> "app-dev-Api-1X"
pub fn nested_stack_name(summary: &ResourceSummary) -> &str {
    segment_or_whole(&summary.physical_id, '/', 1)
}

/// Walk a stack and all of its nested stacks.
///
/// Resources come back depth-first: each stack's own resources, then each of
/// its nested stacks in the order they were listed. A nested stack that has
/// already been visited is skipped.
pub async fn walk(client: &ProviderClient, stack_name: &str) -> Result<Vec<ResourceSummary>> {
    let mut resources = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut pending: Vec<(String, usize)> = vec![(stack_name.to_string(), 0)];
    visited.insert(stack_name.to_string());

    while let Some((name, depth)) = pending.pop() {
        if depth > MAX_NESTING_DEPTH {
            return Err(HookError::configuration(format!(
                "Nested stack {} exceeds the maximum nesting depth of {}",
                name, MAX_NESTING_DEPTH
            )));
        }
        if depth > 0 {
            tracing::info!("Processing nested stack: {}", name);
        }

        let level = list_stack_resources(client, &name).await?;

        let mut nested = Vec::new();
        for summary in level.iter().filter(|r| r.resource_type == ResourceType::NestedStack) {
            let child = nested_stack_name(summary);
            if visited.insert(child.to_string()) {
                nested.push(child.to_string());
            } else {
                tracing::warn!(
                    "Skipping nested stack {} ({}): already visited",
                    child,
                    summary.logical_id
                );
            }
        }

        resources.extend(level);

        // Reversed so the first listed child is walked first
        pending.extend(nested.into_iter().rev().map(|child| (child, depth + 1)));
    }

    tracing::debug!("Stack {} has {} resources", stack_name, resources.len());
    Ok(resources)
}
