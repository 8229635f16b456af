// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Extraction of `<rationale>` and `<response>` sections from model output.

use std::sync::LazyLock;

use regex::Regex;

static RATIONALE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<rationale>(.*)</rationale>").ok());
static RESPONSE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<response>(.*)</response>").ok());

/// Rationale and response pulled out of a model's raw text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub rationale: String,
    pub response: String,
}

impl ExtractedText {
    pub fn from_model_output(text: &str) -> Self {
        Self {
            rationale: capture(RATIONALE.as_ref(), text),
            response: capture(RESPONSE.as_ref(), text),
        }
    }
}

/// First capture of `<tag>(.*)</tag>` (greedy, across newlines), or "".
pub fn extract_tag(tag: &str, text: &str) -> String {
    let pattern = format!("(?s)<{0}>(.*)</{0}>", regex::escape(tag));
    capture(Regex::new(&pattern).ok().as_ref(), text)
}

fn capture(re: Option<&Regex>, text: &str) -> String {
    re.and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tags_tests.rs"]
mod tests;
