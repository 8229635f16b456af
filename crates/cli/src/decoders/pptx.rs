// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot prompts from a pair of decks and a context file.
//!
//! The prompt deck holds the `<GENERATE>` shapes. The shots deck has the same
//! layout and supplies, at the same slide and shape position, an example of
//! the wanted output. The context file is shared by every prompt.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::markers;
use super::{DecodeError, Decoder, EncoderMetadata};
use crate::deck::Deck;
use crate::plugin::{PluginParams, Registry};
use crate::prompt::{Prompt, PromptAnchor, SlideAnchor};
use crate::templates::{self, params, InstructionTemplate, TemplateCtor};

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PptxDecoderConfig {
    pub prompts_path: PathBuf,
    pub shots_path: PathBuf,
    pub context_path: PathBuf,
    /// Instruction template mapping (`type` plus parameters)
    pub instruction: Value,
}

pub struct PptxDecoder {
    prompts_path: PathBuf,
    prompts_deck: Deck,
    shots_deck: Deck,
    context: String,
    template: Box<dyn InstructionTemplate>,
    prompts: Vec<Arc<Prompt>>,
}

fn require_file(path: &Path) -> Result<(), DecodeError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DecodeError::FileNotFound(path.to_path_buf()))
    }
}

impl PptxDecoder {
    /// Open both decks and read the context file.
    pub fn new(
        config: PptxDecoderConfig,
        templates: &Registry<TemplateCtor>,
    ) -> Result<Self, DecodeError> {
        require_file(&config.prompts_path)?;
        require_file(&config.shots_path)?;
        require_file(&config.context_path)?;

        let prompts_deck = Deck::open(&config.prompts_path)?;
        let shots_deck = Deck::open(&config.shots_path)?;
        let context = std::fs::read_to_string(&config.context_path).map_err(|source| {
            DecodeError::Io {
                path: config.context_path.clone(),
                source,
            }
        })?;
        let template = templates::create_template(&config.instruction, templates)?;

        Ok(Self {
            prompts_path: config.prompts_path,
            prompts_deck,
            shots_deck,
            context,
            template,
            prompts: Vec::new(),
        })
    }

    fn shot_text(&self, slide: usize, shape: usize) -> Result<String, DecodeError> {
        if slide >= self.shots_deck.slide_count() {
            return Err(DecodeError::Extraction(format!(
                "shots deck has no slide {}",
                slide + 1
            )));
        }
        let shot_slide = self.shots_deck.slide(slide)?;
        let text = shot_slide
            .shapes
            .get(shape)
            .and_then(|s| s.text.as_deref())
            .ok_or_else(|| {
                DecodeError::Extraction(format!(
                    "shots deck has no text shape {} on slide {}",
                    shape + 1,
                    slide + 1
                ))
            })?;
        Ok(text.trim().to_string())
    }
}

impl Decoder for PptxDecoder {
    fn decode(&mut self) -> Result<(), DecodeError> {
        let mut prompts = Vec::new();
        for slide_index in 0..self.prompts_deck.slide_count() {
            let slide = self.prompts_deck.slide(slide_index)?;
            let notes = self.prompts_deck.notes_text(slide_index)?;
            let system_prompt = markers::system_prompt(notes.as_deref());

            for shape in &slide.shapes {
                let Some(text) = shape.text.as_deref() else {
                    continue;
                };
                let Some(generate) = markers::generate_prompt(text) else {
                    continue;
                };

                let all: BTreeMap<String, String> = [
                    (params::GENERATE_PROMPT, generate),
                    (params::SHOT_TEXT, self.shot_text(slide_index, shape.index)?),
                    (params::CONTEXT, self.context.clone()),
                    (params::OUTPUT_FILTER, markers::output_filter(text)),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
                let instruction = self
                    .template
                    .create_instruction(&self.template.select(&all))?;

                let anchor = SlideAnchor {
                    slide_index,
                    slide_id: slide.id,
                    slide_name: slide.name.clone(),
                    shape_index: shape.index,
                    shape_id: shape.id,
                    shape_name: shape.name.clone(),
                };
                prompts.push(Arc::new(Prompt::new(
                    system_prompt.clone(),
                    instruction,
                    PromptAnchor::Slide(anchor),
                )));
            }
        }

        tracing::debug!(
            deck = %self.prompts_path.display(),
            prompts = prompts.len(),
            "decoded prompt deck"
        );
        self.prompts = prompts;
        Ok(())
    }

    fn prompts(&self) -> &[Arc<Prompt>] {
        &self.prompts
    }

    fn encoder_metadata(&self) -> EncoderMetadata {
        EncoderMetadata {
            context: self.context.clone(),
            source_deck: Some(self.prompts_path.clone()),
            slide_count: self.prompts_deck.slide_count(),
        }
    }
}

pub(super) fn construct(
    params: &PluginParams,
    templates: &Registry<TemplateCtor>,
) -> Result<Box<dyn super::Decoder>, DecodeError> {
    let config: PptxDecoderConfig = params.deserialize("pptx decoder")?;
    Ok(Box::new(PptxDecoder::new(config, templates)?))
}

#[cfg(test)]
#[path = "pptx_tests.rs"]
mod tests;
