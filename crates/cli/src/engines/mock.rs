// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline engine returning configured text.
//!
//! Useful for rehearsing a deck without credentials and for tests. With no
//! `response` configured the instruction is echoed back. `fail_on` makes
//! every prompt whose instruction contains the given text fail, and
//! `connected: true` exercises the handshake path.

use std::time::Duration;

use serde::Deserialize;

use super::{ConnectedEngine, Engine, EngineError, EngineInstance};
use crate::plugin::PluginParams;
use crate::prompt::{Prompt, Response};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    /// Fixed response text; the instruction is echoed when absent
    #[serde(default)]
    pub response: Option<String>,

    #[serde(default)]
    pub rationale: String,

    #[serde(default)]
    pub sources: String,

    /// Fail prompts whose instruction contains this text
    #[serde(default)]
    pub fail_on: Option<String>,

    /// Simulated latency per invocation
    #[serde(default)]
    pub delay_ms: u64,

    /// Require `connect` before `invoke`
    #[serde(default)]
    pub connected: bool,
}

/// Mock engine that answers from its config.
#[derive(Clone, Debug)]
pub struct MockEngine {
    config: MockConfig,
    connect_requested: bool,
    ready: bool,
}

impl MockEngine {
    pub fn new(config: MockConfig) -> Self {
        let ready = !config.connected;
        Self {
            config,
            connect_requested: false,
            ready,
        }
    }
}

impl Engine for MockEngine {
    fn invoke(&mut self, prompt: &Prompt) -> Result<Response, EngineError> {
        if !self.ready {
            return Err(EngineError::Connection(
                "invoked before the session was ready".to_string(),
            ));
        }
        if self.config.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.delay_ms));
        }
        if let Some(ref needle) = self.config.fail_on {
            if prompt.instruction().contains(needle.as_str()) {
                return Err(EngineError::Backend(format!(
                    "mock failure for instruction containing '{needle}'"
                )));
            }
        }
        let text = self
            .config
            .response
            .clone()
            .unwrap_or_else(|| prompt.instruction().to_string());
        Ok(Response::new(text, self.config.rationale.clone())
            .with_sources(self.config.sources.clone()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

impl ConnectedEngine for MockEngine {
    fn connect(&mut self) -> Result<(), EngineError> {
        self.connect_requested = true;
        Ok(())
    }

    fn wait_for_connection(&mut self, _timeout: Duration) -> bool {
        self.ready = self.connect_requested;
        self.ready
    }
}

pub(super) fn construct(params: &PluginParams) -> Result<EngineInstance, EngineError> {
    let config: MockConfig = params.deserialize("mock engine")?;
    let connected = config.connected;
    let engine = MockEngine::new(config);
    Ok(if connected {
        EngineInstance::Connected(Box::new(engine))
    } else {
        EngineInstance::Direct(Box::new(engine))
    })
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
