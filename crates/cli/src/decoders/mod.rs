// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Decoders: where prompts come from.
//!
//! A decoder is built from the run's `decoder` mapping, asked to
//! [`decode`](Decoder::decode) once, and then read for its ordered prompts
//! and the metadata encoders need.

mod markers;
mod pptx;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::deck::DeckError;
use crate::plugin::{ConfigurationError, PluginConfig, PluginKind, PluginParams, Plugins, Registry};
use crate::prompt::Prompt;
use crate::templates::TemplateCtor;

pub use markers::{
    generate_prompt, output_filter, system_prompt, DEFAULT_OUTPUT_INDICATOR,
    DEFAULT_SYSTEM_PROMPT,
};
pub use pptx::{PptxDecoder, PptxDecoderConfig};

/// Reserved key in the decoder mapping that is never passed on.
pub const DECORATORS_KEY: &str = "decorators";

/// Failure to construct a decoder or extract its prompts.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Deck(#[from] DeckError),

    #[error("cannot extract prompts: {0}")]
    Extraction(String),
}

/// What a decoder tells encoders about its input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderMetadata {
    /// Background text shared by every prompt
    pub context: String,
    /// Deck the prompts were read from
    pub source_deck: Option<PathBuf>,
    pub slide_count: usize,
}

pub trait Decoder: Send {
    /// Extract prompts from the input. Replaces any earlier extraction.
    fn decode(&mut self) -> Result<(), DecodeError>;

    /// Prompts in extraction order.
    fn prompts(&self) -> &[Arc<Prompt>];

    fn num_prompts(&self) -> usize {
        self.prompts().len()
    }

    fn encoder_metadata(&self) -> EncoderMetadata;
}

/// Decoder constructor stored in the registry.
///
/// Decoders receive the template registry so they can build the instruction
/// template named in their own configuration.
pub type DecoderCtor = Arc<
    dyn Fn(&PluginParams, &Registry<TemplateCtor>) -> Result<Box<dyn Decoder>, DecodeError>
        + Send
        + Sync,
>;

/// Registry with the built-in decoders.
pub fn builtin_registry() -> Registry<DecoderCtor> {
    let pptx = Arc::new(pptx::construct) as DecoderCtor;
    Registry::new(PluginKind::Decoder)
        .with_builtin("pptx", Arc::clone(&pptx))
        .with_builtin("one-shot-pptx-with-context", pptx)
}

/// Build the decoder named by the `decoder` mapping.
pub fn create_decoder(config: &Value, plugins: &Plugins) -> Result<Box<dyn Decoder>, DecodeError> {
    let PluginConfig { type_name, params } =
        PluginConfig::from_value(PluginKind::Decoder, config, &[DECORATORS_KEY])?;
    let ctor = plugins.decoders.resolve(&type_name)?;
    tracing::debug!(decoder = %type_name, "constructing decoder");
    ctor(&params, &plugins.templates)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
