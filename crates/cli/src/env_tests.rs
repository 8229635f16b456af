// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn aws_region_prefers_aws_region() {
    std::env::set_var(AWS_REGION, "eu-west-1");
    std::env::set_var(AWS_DEFAULT_REGION, "us-east-1");
    let result = aws_region();
    std::env::remove_var(AWS_REGION);
    std::env::remove_var(AWS_DEFAULT_REGION);
    assert_eq!(result.as_deref(), Some("eu-west-1"));
}

#[test]
#[serial]
fn aws_region_falls_back_to_default_region() {
    std::env::remove_var(AWS_REGION);
    std::env::set_var(AWS_DEFAULT_REGION, "us-east-1");
    let result = aws_region();
    std::env::remove_var(AWS_DEFAULT_REGION);
    assert_eq!(result.as_deref(), Some("us-east-1"));
}

#[test]
#[serial]
fn empty_values_count_as_unset() {
    std::env::set_var(AWS_BEARER_TOKEN_BEDROCK, "");
    let result = bedrock_api_key();
    std::env::remove_var(AWS_BEARER_TOKEN_BEDROCK);
    assert_eq!(result, None);
}

#[test]
#[serial]
fn log_filter_returns_directive_when_set() {
    std::env::set_var(BISHENG_LOG, "bisheng=trace");
    let result = log_filter();
    std::env::remove_var(BISHENG_LOG);
    assert_eq!(result.as_deref(), Some("bisheng=trace"));
}

#[test]
#[serial]
fn lookup_returns_none_when_unset() {
    std::env::remove_var("BISHENG_TEST_UNSET_VARIABLE");
    assert_eq!(lookup("BISHENG_TEST_UNSET_VARIABLE"), None);
}
