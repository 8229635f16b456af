// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Prompts produced by decoders and responses produced by engines.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Location of a prompt inside a slide deck.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideAnchor {
    /// Zero-based position of the slide in presentation order
    pub slide_index: usize,
    pub slide_id: u32,
    pub slide_name: String,
    /// Zero-based position of the shape among the slide's top-level shapes
    pub shape_index: usize,
    pub shape_id: u32,
    pub shape_name: String,
}

/// Where a prompt came from.
#[derive(Clone, Debug, PartialEq)]
pub enum PromptAnchor {
    /// A shape on a slide; encoders writing decks rely on this.
    Slide(SlideAnchor),
    /// Free-form reporting fields for decoders that do not read decks.
    Record(Map<String, Value>),
}

/// A single unit of work: system prompt plus instruction.
///
/// Prompts are compared by position in the decoder's output, never by
/// content. Two prompts with the same text are still two prompts.
#[derive(Clone, Debug, PartialEq)]
pub struct Prompt {
    system_prompt: String,
    instruction: String,
    anchor: PromptAnchor,
}

impl Prompt {
    pub fn new(
        system_prompt: impl Into<String>,
        instruction: impl Into<String>,
        anchor: PromptAnchor,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            instruction: instruction.into(),
            anchor,
        }
    }

    /// A prompt with no structured origin.
    pub fn plain(system_prompt: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self::new(system_prompt, instruction, PromptAnchor::Record(Map::new()))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn anchor(&self) -> &PromptAnchor {
        &self.anchor
    }

    pub fn slide_anchor(&self) -> Option<&SlideAnchor> {
        match &self.anchor {
            PromptAnchor::Slide(anchor) => Some(anchor),
            PromptAnchor::Record(_) => None,
        }
    }

    /// Structured form used by reports.
    pub fn to_record(&self) -> Value {
        match &self.anchor {
            PromptAnchor::Slide(anchor) => json!({
                "instruction": self.instruction,
                "system_prompt": self.system_prompt,
                "slide_id": anchor.slide_id,
                "slide_name": anchor.slide_name,
                "shape_id": anchor.shape_id,
                "shape_name": anchor.shape_name,
            }),
            PromptAnchor::Record(fields) => {
                let mut record = fields.clone();
                record.insert("instruction".into(), Value::from(self.instruction.as_str()));
                record.insert(
                    "system_prompt".into(),
                    Value::from(self.system_prompt.as_str()),
                );
                Value::Object(record)
            }
        }
    }
}

/// What an engine returns for one prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// The primary answer
    pub response: String,
    /// The model's explanation
    pub rationale: String,
    /// Supporting documents; empty for engines without retrieval
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sources: String,
}

impl Response {
    pub fn new(response: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            rationale: rationale.into(),
            sources: String::new(),
        }
    }

    pub fn with_sources(mut self, sources: impl Into<String>) -> Self {
        self.sources = sources.into();
        self
    }

    /// Structured form used by reports. Empty sources are omitted.
    pub fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert("response".into(), Value::from(self.response.as_str()));
        record.insert("rationale".into(), Value::from(self.rationale.as_str()));
        if !self.sources.is_empty() {
            record.insert("sources".into(), Value::from(self.sources.as_str()));
        }
        Value::Object(record)
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
