// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Invocation log implementation.

use crate::invocation::{CapturedInvocation, CapturedOutcome, CapturedPrompt};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Shared log of engine invocations.
///
/// Clones share the same storage, so one log can be handed to every worker.
pub struct InvocationLog {
    start: Instant,
    invocations: Arc<Mutex<Vec<CapturedInvocation>>>,
    file_writer: Option<Arc<Mutex<BufWriter<File>>>>,
}

impl InvocationLog {
    /// Create a new in-memory invocation log
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            invocations: Arc::new(Mutex::new(Vec::new())),
            file_writer: None,
        }
    }

    /// Create a log that also appends every record to a JSONL file
    pub fn with_file(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            start: Instant::now(),
            invocations: Arc::new(Mutex::new(Vec::new())),
            file_writer: Some(Arc::new(Mutex::new(BufWriter::new(file)))),
        })
    }

    /// Record an invocation
    pub fn record(&self, prompt: CapturedPrompt, outcome: CapturedOutcome) {
        let mut invocations = self.invocations.lock();
        let invocation = CapturedInvocation {
            seq: invocations.len() as u64,
            timestamp: SystemTime::now(),
            elapsed: self.start.elapsed(),
            prompt,
            outcome,
        };

        // Written while the list lock is held so file order matches `seq`.
        if let Some(ref writer) = self.file_writer {
            use std::io::Write;
            let mut w = writer.lock();
            if let Ok(json) = serde_json::to_string(&invocation) {
                let _ = writeln!(w, "{}", json);
                let _ = w.flush();
            }
        }

        invocations.push(invocation);
    }

    /// Get all captured invocations
    pub fn invocations(&self) -> Vec<CapturedInvocation> {
        self.invocations.lock().clone()
    }

    /// Find invocations that produced a response
    pub fn find_responses(&self) -> Vec<CapturedInvocation> {
        self.invocations
            .lock()
            .iter()
            .filter(|i| matches!(i.outcome, CapturedOutcome::Response { .. }))
            .cloned()
            .collect()
    }

    /// Find invocations that failed
    pub fn find_failures(&self) -> Vec<CapturedInvocation> {
        self.invocations
            .lock()
            .iter()
            .filter(|i| matches!(i.outcome, CapturedOutcome::Failure { .. }))
            .cloned()
            .collect()
    }

    /// Prompt indices seen so far, sorted.
    pub fn prompt_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .invocations
            .lock()
            .iter()
            .map(|i| i.prompt.index)
            .collect();
        indices.sort_unstable();
        indices
    }

    pub fn len(&self) -> usize {
        self.invocations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.lock().is_empty()
    }
}

impl Default for InvocationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InvocationLog {
    fn clone(&self) -> Self {
        Self {
            start: self.start,
            invocations: Arc::clone(&self.invocations),
            file_writer: self.file_writer.as_ref().map(Arc::clone),
        }
    }
}

impl std::fmt::Debug for InvocationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationLog")
            .field("len", &self.len())
            .field("file", &self.file_writer.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
