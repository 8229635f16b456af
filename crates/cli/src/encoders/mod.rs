// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Encoders: where results go.
//!
//! Every configured encoder receives the complete result map together with
//! the decoder's metadata, in configuration order. Encoders only produce side
//! effects (files); they never change the results.

mod pptx;
mod transparency;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::deck::DeckError;
use crate::decoders::EncoderMetadata;
use crate::plugin::{ConfigurationError, PluginConfig, PluginKind, PluginParams, Plugins, Registry};
use crate::results::ResultMap;

pub use pptx::{PptxEncoder, PptxEncoderConfig, NOTES_SEPARATOR, RESPONSE_FONT_PT};
pub use transparency::{report_file_name, TransparencyReportConfig, TransparencyReportEncoder};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Deck(#[from] DeckError),

    #[error("prompt {index} has no slide position to write back to")]
    MissingAnchor { index: usize },

    #[error(
        "artifact deck {} has {found} slides but {} has {expected}",
        artifact.display(),
        source_deck.display()
    )]
    SlideCountMismatch {
        artifact: PathBuf,
        source_deck: PathBuf,
        expected: usize,
        found: usize,
    },
}

/// Everything an encoder gets.
#[derive(Clone, Copy, Debug)]
pub struct EncoderPayload<'a> {
    pub results: &'a ResultMap,
    pub metadata: &'a EncoderMetadata,
}

pub trait Encoder: Send {
    /// Name used when reporting failures.
    fn name(&self) -> &str;

    fn encode(&mut self, payload: &EncoderPayload<'_>) -> Result<(), EncodeError>;
}

/// Encoder constructor stored in the registry.
pub type EncoderCtor =
    Arc<dyn Fn(&PluginParams) -> Result<Box<dyn Encoder>, EncodeError> + Send + Sync>;

/// Registry with the built-in encoders.
pub fn builtin_registry() -> Registry<EncoderCtor> {
    Registry::new(PluginKind::Encoder)
        .with_builtin(
            "transparency-report",
            Arc::new(transparency::construct) as EncoderCtor,
        )
        .with_builtin("pptx", Arc::new(pptx::construct) as EncoderCtor)
}

/// Build one encoder per `encoders` entry, in order.
pub fn create_encoders(
    configs: &[Value],
    plugins: &Plugins,
) -> Result<Vec<Box<dyn Encoder>>, EncodeError> {
    configs
        .iter()
        .map(|config| {
            let PluginConfig { type_name, params } =
                PluginConfig::from_value(PluginKind::Encoder, config, &[])?;
            let ctor = plugins.encoders.resolve(&type_name)?;
            tracing::debug!(encoder = %type_name, "constructing encoder");
            ctor(&params)
        })
        .collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
