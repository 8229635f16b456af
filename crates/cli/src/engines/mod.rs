// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engines: the backends prompts are sent to.
//!
//! An engine turns one [`Prompt`] into one [`Response`]. Engines are
//! stateful and not assumed safe to share, so the dispatcher asks the
//! [`EngineFactory`] for a fresh instance per task.
//!
//! Two shapes exist. A [`Engine`] is request/response. A
//! [`ConnectedEngine`] additionally needs a handshake (`connect` followed by
//! `wait_for_connection`) before its first invocation. Which one a
//! constructor returns is fixed by the [`EngineInstance`] variant it picks.

mod bedrock;
mod gaab;
mod mock;
mod tags;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::plugin::{ConfigurationError, PluginConfig, PluginKind, PluginParams, Registry};
use crate::prompt::{Prompt, Response};

pub use bedrock::{BedrockConfig, BedrockEngine, Hyperparameters};
pub use gaab::{merge_tokens, GaabConfig, GaabEngine, StreamItem, END_OF_CONVERSATION};
pub use mock::{MockConfig, MockEngine};
pub use tags::{extract_tag, ExtractedText};

/// Errors raised while constructing or invoking an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Backend(String),
}

impl EngineError {
    /// Short machine-readable category, used in capture logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "configuration",
            EngineError::Authentication(_) => "authentication",
            EngineError::Connection(_) => "connection",
            EngineError::Http(_) => "http",
            EngineError::Status { .. } => "status",
            EngineError::MalformedResponse(_) => "malformed_response",
            EngineError::Backend(_) => "backend",
        }
    }
}

/// Request/response engine.
pub trait Engine: Send {
    /// Send one prompt and wait for its response.
    fn invoke(&mut self, prompt: &Prompt) -> Result<Response, EngineError>;

    /// Get the name of this engine for logging.
    fn name(&self) -> &'static str;
}

/// Engine that must establish a session before invoking.
pub trait ConnectedEngine: Engine {
    /// Start opening the session. May return before it is usable.
    fn connect(&mut self) -> Result<(), EngineError>;

    /// Block until the session is usable or `timeout` elapses.
    ///
    /// Returns whether the session is ready.
    fn wait_for_connection(&mut self, timeout: Duration) -> bool;
}

/// A constructed engine, tagged with its capability.
pub enum EngineInstance {
    Direct(Box<dyn Engine>),
    Connected(Box<dyn ConnectedEngine>),
}

impl EngineInstance {
    pub fn name(&self) -> &'static str {
        match self {
            EngineInstance::Direct(engine) => engine.name(),
            EngineInstance::Connected(engine) => engine.name(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, EngineInstance::Connected(_))
    }

    pub fn invoke(&mut self, prompt: &Prompt) -> Result<Response, EngineError> {
        match self {
            EngineInstance::Direct(engine) => engine.invoke(prompt),
            EngineInstance::Connected(engine) => engine.invoke(prompt),
        }
    }
}

impl std::fmt::Debug for EngineInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = if self.is_connected() {
            "Connected"
        } else {
            "Direct"
        };
        f.debug_tuple(variant).field(&self.name()).finish()
    }
}

/// Engine constructor stored in the registry.
pub type EngineCtor =
    Arc<dyn Fn(&PluginParams) -> Result<EngineInstance, EngineError> + Send + Sync>;

/// Makes one engine per task from the run's `engine` mapping.
#[derive(Clone)]
pub struct EngineFactory {
    type_name: String,
    ctor: EngineCtor,
    params: PluginParams,
}

impl EngineFactory {
    /// Resolve the engine type named by `config`.
    ///
    /// Fails if the mapping has no `type` or the type cannot be resolved.
    /// Constructor parameters are only checked when [`create`](Self::create)
    /// runs.
    pub fn from_config(
        config: &Value,
        registry: &Registry<EngineCtor>,
    ) -> Result<Self, ConfigurationError> {
        let PluginConfig { type_name, params } =
            PluginConfig::from_value(PluginKind::Engine, config, &[])?;
        let ctor = registry.resolve(&type_name)?;
        Ok(Self {
            type_name,
            ctor,
            params,
        })
    }

    /// Build a fresh engine instance.
    pub fn create(&self) -> Result<EngineInstance, EngineError> {
        (self.ctor)(&self.params)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl std::fmt::Debug for EngineFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineFactory")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Registry with the built-in engines.
pub fn builtin_registry() -> Registry<EngineCtor> {
    Registry::new(PluginKind::Engine)
        .with_builtin("bedrock", Arc::new(bedrock::construct) as EngineCtor)
        .with_builtin("gaab", Arc::new(gaab::construct) as EngineCtor)
        .with_builtin("mock", Arc::new(mock::construct) as EngineCtor)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "test_server.rs"]
pub(crate) mod test_server;
