// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Markup authors put in decks to mark prompts.
//!
//! `<GENERATE>…</GENERATE>` in a shape makes it a prompt, `<FORMAT>…</FORMAT>`
//! in the same shape overrides the output format, and `<SYSTEM>…</SYSTEM>` in
//! the slide notes overrides the system prompt. Markers span newlines and
//! match greedily, so the first opening tag pairs with the last closing tag.

use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a business development manager. Your primary job is to take the text you read and \
re-word it, summarize it, and generally modify it to address particular business outcomes. \
In the absence of concrete business outcomes, adhere to a default tone and diction fitting \
a business-professional context. Keep responses simple and unstructured, avoiding common \
templates like e-mail or instant message. Where possible, lean on the output format \
specified in the prompt. Absent this, keep responses short, not to exceed the word count \
in the instruction. It is perfectly acceptable to respond with the unaltered prompt where \
appropriate. Put your explanation within the <rationale/> XML tags. Put your response in \
the <response> XML tags.\
You can expect prompts to have the following elements: INPUT DATA, CONTEXT, and OUTPUT \
FORMAT. The input data is what you're being asked to do. The context is background \
information on the customer or scenario you're performing this task for; the context \
contains many important pieces of information for contextualizing your responses. The \
output format describes how the output should be formatted.";

pub const DEFAULT_OUTPUT_INDICATOR: &str = "Output should be succinct and maintain a business-professional tone. Limit to between \
10 - 50 words. Avoid run-on sentences, but combine ideas to reduce the number of \
paragraphs.";

static SYSTEM: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<SYSTEM>(.*)</SYSTEM>").ok());

static GENERATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<GENERATE>(.*)</GENERATE>").ok());

static FORMAT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<FORMAT>(.*)</FORMAT>").ok());

fn capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    re.as_ref()?
        .captures(text.trim())?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// The generate instruction of a shape, if the shape is a prompt.
pub fn generate_prompt(shape_text: &str) -> Option<String> {
    capture(&GENERATE, shape_text)
}

/// The shape's output format, or the default indicator.
pub fn output_filter(shape_text: &str) -> String {
    capture(&FORMAT, shape_text).unwrap_or_else(|| DEFAULT_OUTPUT_INDICATOR.to_string())
}

/// The slide's system prompt, or the default one.
pub fn system_prompt(notes_text: Option<&str>) -> String {
    notes_text
        .and_then(|notes| capture(&SYSTEM, notes))
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
}

#[cfg(test)]
#[path = "markers_tests.rs"]
mod tests;
