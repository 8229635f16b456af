// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables read by bisheng are defined here.
//! Use these accessors instead of calling `std::env::var()` directly.

/// Generated env var name constants.
mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

// Re-export name constants for callers that need the raw name string.
pub use names::*;

/// `BISHENG_LOG`: tracing filter directive used when neither `--debug`
/// nor `--verbose` is given.
pub fn log_filter() -> Option<String> {
    non_empty(names::BISHENG_LOG)
}

/// `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`.
pub fn aws_region() -> Option<String> {
    non_empty(names::AWS_REGION).or_else(|| non_empty(names::AWS_DEFAULT_REGION))
}

/// `AWS_BEARER_TOKEN_BEDROCK`: Bedrock API key.
pub fn bedrock_api_key() -> Option<String> {
    non_empty(names::AWS_BEARER_TOKEN_BEDROCK)
}

/// Arbitrary lookup used for `${VAR}` expansion in config files.
pub fn lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
