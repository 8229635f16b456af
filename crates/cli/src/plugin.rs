// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin resolution: symbolic type names to constructors.
//!
//! Every configurable part of a run (engine, decoder, encoders, instruction
//! template) is selected by a `type` string. A name is looked up first among
//! the built-ins of its [`Registry`], then among extensions registered by the
//! embedding program. Extension names must look like `<module>.<Type>` where
//! the last module segment ends in one of [`APPROVED_SUFFIXES`]; the check is
//! applied both at registration and at lookup, so a misspelled name fails
//! with a naming error before anything else happens.
//!
//! Resolution never performs I/O.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::decoders::{self, DecoderCtor};
use crate::encoders::{self, EncoderCtor};
use crate::engines::{self, EngineCtor};
use crate::templates::{self, TemplateCtor};

/// Module-name suffixes an extension type name may use.
pub const APPROVED_SUFFIXES: &[&str] = &["_decoder", "_encoder", "_engine", "_template"];

/// `<module>(.<module>)*.<Type>` with an approved suffix on the last module.
static EXTENSION_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let suffixes: Vec<String> = APPROVED_SUFFIXES.iter().map(|s| regex::escape(s)).collect();
    Regex::new(&format!(
        r"^(?:[A-Za-z_][A-Za-z0-9_]*\.)*(?:[A-Za-z_][A-Za-z0-9_]*)?(?:{})\.[A-Za-z_][A-Za-z0-9_]*$",
        suffixes.join("|")
    ))
    .ok()
});

/// Key holding the discriminator in every plugin mapping.
pub const TYPE_KEY: &str = "type";

/// Capability a registry hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Engine,
    Decoder,
    Encoder,
    Template,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PluginKind::Engine => "engine",
            PluginKind::Decoder => "decoder",
            PluginKind::Encoder => "encoder",
            PluginKind::Template => "instruction template",
        };
        f.write_str(name)
    }
}

/// Invalid configuration detected before any prompt is dispatched.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{kind} configuration must be a mapping")]
    NotAMapping { kind: PluginKind },

    #[error("{kind} configuration is missing the `type` key")]
    MissingType { kind: PluginKind },

    #[error("unknown {kind} type '{name}'")]
    UnknownType { kind: PluginKind, name: String },

    #[error(
        "{kind} type '{name}' is not a valid extension name; expected <module>.<Type> \
         with a module ending in one of {}",
        APPROVED_SUFFIXES.join(", ")
    )]
    InvalidName { kind: PluginKind, name: String },

    #[error("{kind} type '{name}' is already registered")]
    Duplicate { kind: PluginKind, name: String },

    #[error("invalid parameters for {context}: {message}")]
    InvalidParams { context: String, message: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("invalid worker pool size {0}; at least one worker is required")]
    PoolSize(i64),
}

/// Constructor parameters: a plugin mapping with its reserved keys removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PluginParams(Map<String, Value>);

impl PluginParams {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserialize the parameters into a typed config struct.
    ///
    /// `context` names the plugin in error messages.
    pub fn deserialize<T: DeserializeOwned>(&self, context: &str) -> Result<T, ConfigurationError> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(|e| {
            ConfigurationError::InvalidParams {
                context: context.to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl From<Map<String, Value>> for PluginParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A plugin mapping split into its discriminator and constructor parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PluginConfig {
    pub type_name: String,
    pub params: PluginParams,
}

impl PluginConfig {
    /// Split a configuration mapping, dropping `type` and any `reserved` keys.
    pub fn from_value(
        kind: PluginKind,
        value: &Value,
        reserved: &[&str],
    ) -> Result<Self, ConfigurationError> {
        let map = value
            .as_object()
            .ok_or(ConfigurationError::NotAMapping { kind })?;
        let type_name = match map.get(TYPE_KEY) {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => return Err(ConfigurationError::MissingType { kind }),
        };
        let params = map
            .iter()
            .filter(|(key, _)| key.as_str() != TYPE_KEY && !reserved.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Self {
            type_name,
            params: PluginParams(params),
        })
    }
}

/// Check that `name` is acceptable as an extension type name.
pub fn validate_extension_name(kind: PluginKind, name: &str) -> Result<(), ConfigurationError> {
    match EXTENSION_NAME.as_ref() {
        Some(pattern) if pattern.is_match(name) => Ok(()),
        _ => Err(ConfigurationError::InvalidName {
            kind,
            name: name.to_string(),
        }),
    }
}

/// Built-in and registered constructors for one capability.
#[derive(Clone)]
pub struct Registry<C> {
    kind: PluginKind,
    builtins: BTreeMap<&'static str, C>,
    extensions: BTreeMap<String, C>,
}

impl<C: Clone> Registry<C> {
    /// Create an empty registry.
    pub fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            builtins: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }

    pub(crate) fn with_builtin(mut self, name: &'static str, ctor: C) -> Self {
        self.builtins.insert(name, ctor);
        self
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Register an extension constructor under a `<module>.<Type>` name.
    pub fn register(&mut self, name: impl Into<String>, ctor: C) -> Result<(), ConfigurationError> {
        let name = name.into();
        if self.builtins.contains_key(name.as_str()) || self.extensions.contains_key(&name) {
            return Err(ConfigurationError::Duplicate {
                kind: self.kind,
                name,
            });
        }
        validate_extension_name(self.kind, &name)?;
        tracing::debug!(kind = %self.kind, %name, "registered extension");
        self.extensions.insert(name, ctor);
        Ok(())
    }

    /// Look up the constructor for `name`.
    pub fn resolve(&self, name: &str) -> Result<C, ConfigurationError> {
        if let Some(ctor) = self.builtins.get(name) {
            return Ok(ctor.clone());
        }
        validate_extension_name(self.kind, name)?;
        self.extensions
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownType {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name) || self.extensions.contains_key(name)
    }

    /// All resolvable names, built-ins first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builtins
            .keys()
            .copied()
            .chain(self.extensions.keys().map(String::as_str))
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("builtins", &self.builtins.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The four registries a run resolves against.
#[derive(Clone, Debug)]
pub struct Plugins {
    pub engines: Registry<EngineCtor>,
    pub decoders: Registry<DecoderCtor>,
    pub encoders: Registry<EncoderCtor>,
    pub templates: Registry<TemplateCtor>,
}

impl Plugins {
    /// Registries holding only the built-in plugins.
    pub fn builtin() -> Self {
        Self {
            engines: engines::builtin_registry(),
            decoders: decoders::builtin_registry(),
            encoders: encoders::builtin_registry(),
            templates: templates::builtin_registry(),
        }
    }
}

impl Default for Plugins {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
