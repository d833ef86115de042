//! amplify-hook
//!
//! Post-deploy hook that discovers the resources of a deployed CloudFormation
//! stack (following nested stacks) and writes an Amplify client
//! configuration describing how to reach them.

pub mod aws;
pub mod config;
pub mod context;
pub mod error;
pub mod exports;
pub mod hook;
pub mod resource;

/// Version injected at compile time via AMPLIFY_HOOK_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("AMPLIFY_HOOK_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
