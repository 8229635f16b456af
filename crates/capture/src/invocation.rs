// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Captured invocation data types.

use super::duration_serde;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// One engine invocation as seen by the dispatcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapturedInvocation {
    /// Sequence number in recording order (not prompt order)
    pub seq: u64,

    /// Wall-clock timestamp
    pub timestamp: SystemTime,

    /// Elapsed time since capture started
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,

    /// Prompt that was sent
    pub prompt: CapturedPrompt,

    /// Response returned (or error)
    pub outcome: CapturedOutcome,
}

/// The prompt side of an invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPrompt {
    /// Position of the prompt in extraction order
    pub index: usize,
    /// Engine type the prompt was sent to
    pub engine: String,
    pub system_prompt: String,
    pub instruction: String,
}

/// Captured outcome (response or failure)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CapturedOutcome {
    Response {
        response: String,
        rationale: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        sources: String,
    },
    Failure {
        failure_type: String,
        message: String,
    },
}

#[cfg(test)]
#[path = "invocation_tests.rs"]
mod tests;
