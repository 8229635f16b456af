// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The run orchestrator.
//!
//! A run moves through fixed phases (see [`RunPhase`]). Invocation errors are
//! gathered until the pool drains and then reported together.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bisheng_capture::InvocationLog;
use thiserror::Error;
use uuid::Uuid;

use super::pool::{TaskFailure, WorkerPool};
use super::progress::ProgressTracker;
use crate::config::{ConfigError, RunConfig, MAX_NUM_THREADS};
use crate::decoders::{create_decoder, DecodeError};
use crate::encoders::{create_encoders, EncodeError, EncoderPayload};
use crate::engines::EngineFactory;
use crate::plugin::{ConfigurationError, Plugins};
use crate::results::ResultMap;

/// Worker count for `num_prompts` prompts.
///
/// An explicit request wins as-is, even when it is not positive; the pool
/// rejects those. Otherwise one worker per prompt, capped at
/// [`MAX_NUM_THREADS`].
pub fn resolve_num_threads(num_prompts: usize, requested: Option<i64>) -> i64 {
    requested.unwrap_or_else(|| {
        i64::try_from(num_prompts)
            .unwrap_or(i64::MAX)
            .min(MAX_NUM_THREADS)
    })
}

/// Where a run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Preparing,
    Decoding,
    Dispatching,
    Aggregating,
    Encoding,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Preparing => "preparing",
            RunPhase::Decoding => "decoding",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Aggregating => "aggregating",
            RunPhase::Encoding => "encoding",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Worker count; defaults to [`resolve_num_threads`]
    pub num_threads: Option<i64>,
    /// Log the resolved worker count
    pub verbose: bool,
}

/// What a successful run did.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub prompts: usize,
    pub threads: i64,
    pub completed: usize,
    pub results: ResultMap,
    pub elapsed: Duration,
    /// Phases entered, in order
    pub phases: Vec<RunPhase>,
}

/// Every task that failed in one run.
#[derive(Debug)]
pub struct InvocationFailures {
    pub failures: Vec<TaskFailure>,
    /// Prompts that did get a response
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for InvocationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} prompts failed", self.failures.len(), self.total)?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for InvocationFailures {}

/// Every encoder that failed, by name.
#[derive(Debug)]
pub struct EncodingFailures {
    pub failures: Vec<(String, EncodeError)>,
}

impl fmt::Display for EncodingFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} encoder(s) failed", self.failures.len())?;
        for (name, error) in &self.failures {
            write!(f, "\n  {name}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EncodingFailures {}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("cannot set up encoders: {0}")]
    EncoderSetup(#[source] EncodeError),

    #[error(transparent)]
    Invocation(#[from] InvocationFailures),

    #[error(transparent)]
    Encoding(#[from] EncodingFailures),
}

/// Phase history with debug logging of every transition.
struct PhaseLog {
    current: RunPhase,
    history: Vec<RunPhase>,
}

impl PhaseLog {
    fn new() -> Self {
        Self {
            current: RunPhase::Idle,
            history: vec![RunPhase::Idle],
        }
    }

    fn enter(&mut self, next: RunPhase) {
        tracing::debug!(from = %self.current, to = %next, "run phase");
        self.current = next;
        self.history.push(next);
    }
}

/// Runs one configuration. Reusable: every [`run`](Runner::run) starts over.
pub struct Runner {
    config: RunConfig,
    plugins: Plugins,
    capture: Option<InvocationLog>,
    progress: ProgressTracker,
}

impl Runner {
    /// A runner with only the built-in plugins.
    pub fn new(config: RunConfig) -> Self {
        Self::with_parts(config, Plugins::builtin(), None)
    }

    pub(crate) fn with_parts(
        config: RunConfig,
        plugins: Plugins,
        capture: Option<InvocationLog>,
    ) -> Self {
        Self {
            config,
            plugins,
            capture,
            progress: ProgressTracker::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    /// Handle for observing progress from another thread.
    pub fn progress(&self) -> ProgressTracker {
        self.progress.clone()
    }

    pub fn capture(&self) -> Option<&InvocationLog> {
        self.capture.as_ref()
    }

    /// Execute the run.
    pub fn run(&self, options: &RunOptions) -> Result<RunSummary, RunError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        let _guard = span.enter();

        let mut phases = PhaseLog::new();
        match self.execute(options, run_id, &mut phases) {
            Ok(summary) => Ok(summary),
            Err(error) => {
                phases.enter(RunPhase::Failed);
                tracing::debug!(%error, "run failed");
                Err(error)
            }
        }
    }

    fn execute(
        &self,
        options: &RunOptions,
        run_id: Uuid,
        phases: &mut PhaseLog,
    ) -> Result<RunSummary, RunError> {
        let started = Instant::now();

        phases.enter(RunPhase::Preparing);
        let factory = EngineFactory::from_config(&self.config.engine, &self.plugins.engines)?;
        let mut encoders =
            create_encoders(&self.config.encoders, &self.plugins).map_err(RunError::EncoderSetup)?;
        let mut decoder = create_decoder(&self.config.decoder, &self.plugins)?;

        phases.enter(RunPhase::Decoding);
        decoder.decode()?;
        let prompts: Vec<Arc<_>> = decoder.prompts().to_vec();
        let threads = resolve_num_threads(prompts.len(), options.num_threads);

        tracing::info!("Starting generation...");
        if options.verbose {
            tracing::info!("Number of threads: {threads}");
        }
        tracing::debug!(prompts = prompts.len(), engine = factory.type_name(), "decoded");

        phases.enter(RunPhase::Dispatching);
        let results = if prompts.is_empty() {
            self.progress.reset(0);
            ResultMap::new(&prompts)
        } else {
            let pool = WorkerPool::new(threads)?;
            let outcome = pool.dispatch(&prompts, &factory, &self.progress, self.capture.as_ref());

            phases.enter(RunPhase::Aggregating);
            if let Some(log) = &self.capture {
                tracing::debug!(
                    responses = log.find_responses().len(),
                    failures = log.find_failures().len(),
                    "captured invocations"
                );
            }
            if !outcome.failures.is_empty() {
                return Err(InvocationFailures {
                    completed: outcome.results.resolved_count(),
                    total: prompts.len(),
                    failures: outcome.failures,
                }
                .into());
            }
            outcome.results
        };

        if !results.is_empty() {
            phases.enter(RunPhase::Encoding);
            let metadata = decoder.encoder_metadata();
            let payload = EncoderPayload {
                results: &results,
                metadata: &metadata,
            };
            let mut failures = Vec::new();
            for encoder in &mut encoders {
                if let Err(error) = encoder.encode(&payload) {
                    tracing::warn!(encoder = encoder.name(), %error, "encoder failed");
                    failures.push((encoder.name().to_string(), error));
                }
            }
            if !failures.is_empty() {
                return Err(EncodingFailures { failures }.into());
            }
        }

        phases.enter(RunPhase::Done);
        let summary = RunSummary {
            run_id,
            prompts: prompts.len(),
            threads,
            completed: results.resolved_count(),
            results,
            elapsed: started.elapsed(),
            phases: phases.history.clone(),
        };
        tracing::info!(
            prompts = summary.prompts,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "generation finished"
        );
        Ok(summary)
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("capture", &self.capture.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "core_tests.rs"]
mod tests;
