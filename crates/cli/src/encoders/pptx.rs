// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Writes responses back into a copy of the prompt deck.
//!
//! The artifact deck must share the prompt deck's layout: each response goes
//! to the shape at its prompt's slide and shape position. Rationale and
//! sources are appended to that slide's notes, which are created for slides
//! that have none. A deck whose slide count differs from the decoded deck is
//! rejected before anything is written.

use std::path::PathBuf;

use serde::Deserialize;

use super::{EncodeError, Encoder, EncoderPayload};
use crate::deck::Deck;
use crate::plugin::PluginParams;

/// Between the rationale and the sources in slide notes.
pub const NOTES_SEPARATOR: &str = "\n\n\n";

/// Font size of appended response paragraphs.
pub const RESPONSE_FONT_PT: u32 = 12;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PptxEncoderConfig {
    pub path: PathBuf,
    /// Add the response under the existing text instead of replacing it
    #[serde(default)]
    pub append: bool,
}

#[derive(Debug)]
pub struct PptxEncoder {
    deck: Deck,
    append: bool,
}

impl PptxEncoder {
    pub fn new(config: PptxEncoderConfig) -> Result<Self, EncodeError> {
        if !config.path.is_file() {
            return Err(EncodeError::FileNotFound(config.path));
        }
        Ok(Self {
            deck: Deck::open(&config.path)?,
            append: config.append,
        })
    }
}

impl Encoder for PptxEncoder {
    fn name(&self) -> &str {
        "pptx"
    }

    fn encode(&mut self, payload: &EncoderPayload<'_>) -> Result<(), EncodeError> {
        if let Some(source_deck) = &payload.metadata.source_deck {
            let found = self.deck.slide_count();
            if found != payload.metadata.slide_count {
                return Err(EncodeError::SlideCountMismatch {
                    artifact: self.deck.path().to_path_buf(),
                    source_deck: source_deck.clone(),
                    expected: payload.metadata.slide_count,
                    found,
                });
            }
        }

        let mut written = 0;
        for (index, entry) in payload.results.iter().enumerate() {
            let Some(response) = entry.response.as_ref() else {
                continue;
            };
            let anchor = entry
                .prompt
                .slide_anchor()
                .ok_or(EncodeError::MissingAnchor { index })?;

            let notes = format!("{}{NOTES_SEPARATOR}{}", response.rationale, response.sources);
            self.deck.append_notes(anchor.slide_index, &notes)?;

            let text = response.response.trim();
            if self.append {
                self.deck.append_shape_paragraph(
                    anchor.slide_index,
                    anchor.shape_index,
                    text,
                    RESPONSE_FONT_PT,
                )?;
            } else {
                self.deck
                    .set_shape_text(anchor.slide_index, anchor.shape_index, text)?;
            }
            written += 1;
        }

        self.deck.save()?;
        tracing::info!(path = %self.deck.path().display(), responses = written, "updated deck");
        Ok(())
    }
}

pub(super) fn construct(params: &PluginParams) -> Result<Box<dyn Encoder>, EncodeError> {
    let config: PptxEncoderConfig = params.deserialize("pptx encoder")?;
    Ok(Box::new(PptxEncoder::new(config)?))
}

#[cfg(test)]
#[path = "pptx_tests.rs"]
mod tests;
