// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Instruction templates: how extracted deck text becomes an instruction.
//!
//! A decoder gathers every parameter it knows about (generated prompt, shot
//! text, context, output filter) and hands the template only the ones it
//! declares as required.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::plugin::{ConfigurationError, PluginConfig, PluginKind, PluginParams, Registry};

/// Parameter names decoders supply.
pub mod params {
    pub const GENERATE_PROMPT: &str = "generate_prompt";
    pub const SHOT_TEXT: &str = "shot_text";
    pub const CONTEXT: &str = "context";
    pub const OUTPUT_FILTER: &str = "output_filter";
}

/// Named string inputs to a template.
pub type TemplateParams = BTreeMap<String, String>;

pub trait InstructionTemplate: Send + Sync {
    /// Parameters `create_instruction` needs.
    fn required_params(&self) -> &[&'static str];

    /// Render the instruction. Fails if a required parameter is missing.
    fn create_instruction(&self, params: &TemplateParams) -> Result<String, ConfigurationError>;

    /// Keep only the parameters this template asks for.
    fn select(&self, all: &TemplateParams) -> TemplateParams {
        let required = self.required_params();
        all.iter()
            .filter(|(k, _)| required.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn required<'a>(params: &'a TemplateParams, name: &str) -> Result<&'a str, ConfigurationError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| ConfigurationError::MissingParameter(name.to_string()))
}

/// `one-shot-with-context`: input, example, context and output format.
#[derive(Clone, Copy, Debug, Default)]
pub struct OneShotWithContext;

impl InstructionTemplate for OneShotWithContext {
    fn required_params(&self) -> &[&'static str] {
        &[
            params::GENERATE_PROMPT,
            params::SHOT_TEXT,
            params::CONTEXT,
            params::OUTPUT_FILTER,
        ]
    }

    fn create_instruction(&self, params: &TemplateParams) -> Result<String, ConfigurationError> {
        Ok(format!(
            "INPUT DATA:{}\nEXAMPLES:{}\nCONTEXT:{}\nOUTPUT FORMAT:{}",
            required(params, params::GENERATE_PROMPT)?,
            required(params, params::SHOT_TEXT)?,
            required(params, params::CONTEXT)?,
            required(params, params::OUTPUT_FILTER)?,
        ))
    }
}

/// `gaab-with-knowledge-base`: context comes from the knowledge base, so it
/// is left out of the instruction.
#[derive(Clone, Copy, Debug, Default)]
pub struct GaabWithKnowledgeBase;

impl InstructionTemplate for GaabWithKnowledgeBase {
    fn required_params(&self) -> &[&'static str] {
        &[
            params::GENERATE_PROMPT,
            params::SHOT_TEXT,
            params::OUTPUT_FILTER,
        ]
    }

    fn create_instruction(&self, params: &TemplateParams) -> Result<String, ConfigurationError> {
        Ok(format!(
            "INPUT DATA:{}\nEXAMPLES:{}\nOUTPUT FORMAT:{}",
            required(params, params::GENERATE_PROMPT)?,
            required(params, params::SHOT_TEXT)?,
            required(params, params::OUTPUT_FILTER)?,
        ))
    }
}

/// Template constructor stored in the registry.
pub type TemplateCtor = Arc<
    dyn Fn(&PluginParams) -> Result<Box<dyn InstructionTemplate>, ConfigurationError> + Send + Sync,
>;

/// Built-in templates take no parameters.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

fn builtin<T>(name: &'static str) -> TemplateCtor
where
    T: InstructionTemplate + Default + 'static,
{
    Arc::new(
        move |params: &PluginParams| -> Result<Box<dyn InstructionTemplate>, ConfigurationError> {
            let NoParams {} = params.deserialize(name)?;
            Ok(Box::new(T::default()))
        },
    )
}

/// Registry with the built-in templates.
pub fn builtin_registry() -> Registry<TemplateCtor> {
    Registry::new(PluginKind::Template)
        .with_builtin(
            "one-shot-with-context",
            builtin::<OneShotWithContext>("one-shot-with-context template"),
        )
        .with_builtin(
            "gaab-with-knowledge-base",
            builtin::<GaabWithKnowledgeBase>("gaab-with-knowledge-base template"),
        )
}

/// Build the template named by an `instruction` mapping.
pub fn create_template(
    config: &Value,
    registry: &Registry<TemplateCtor>,
) -> Result<Box<dyn InstructionTemplate>, ConfigurationError> {
    let PluginConfig { type_name, params } =
        PluginConfig::from_value(PluginKind::Template, config, &[])?;
    let ctor = registry.resolve(&type_name)?;
    ctor(&params)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
