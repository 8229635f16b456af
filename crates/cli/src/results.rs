// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered prompt → response map filled in by the dispatcher.

use std::sync::Arc;

use thiserror::Error;

use crate::prompt::{Prompt, Response};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultError {
    #[error("prompt index {index} is out of range for {len} prompts")]
    OutOfRange { index: usize, len: usize },

    #[error("prompt {index} already has a response")]
    AlreadyResolved { index: usize },
}

/// One prompt and its response, if any.
#[derive(Clone, Debug)]
pub struct ResultEntry {
    pub prompt: Arc<Prompt>,
    pub response: Option<Response>,
}

/// Results keyed by prompt position.
///
/// Created with one unresolved entry per prompt; entries are never added or
/// removed afterwards and each may be filled exactly once.
#[derive(Clone, Debug, Default)]
pub struct ResultMap {
    entries: Vec<ResultEntry>,
}

impl ResultMap {
    pub fn new(prompts: &[Arc<Prompt>]) -> Self {
        Self {
            entries: prompts
                .iter()
                .map(|prompt| ResultEntry {
                    prompt: Arc::clone(prompt),
                    response: None,
                })
                .collect(),
        }
    }

    /// Record the response for the prompt at `index`.
    pub fn fill(&mut self, index: usize, response: Response) -> Result<(), ResultError> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(ResultError::OutOfRange { index, len })?;
        if entry.response.is_some() {
            return Err(ResultError::AlreadyResolved { index });
        }
        entry.response = Some(response);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResultEntry> {
        self.entries.get(index)
    }

    /// All entries in extraction order.
    pub fn iter(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter()
    }

    /// Resolved entries in extraction order.
    pub fn resolved(&self) -> impl Iterator<Item = (&Prompt, &Response)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.response.as_ref().map(|r| (entry.prompt.as_ref(), r)))
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.response.is_some()).count()
    }

    /// Positions still waiting for a response.
    pub fn unresolved(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.response.is_none())
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
