// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool running one engine invocation per prompt.
//!
//! Workers pull prompt positions from a shared queue until it is empty.
//! Each task builds its own engine, invokes it outside the run lock, and
//! then records the outcome and advances progress while holding the lock.
//! A failing or panicking task is recorded and never stops its siblings;
//! [`WorkerPool::dispatch`] only returns once every task has finished.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bisheng_capture::{CapturedOutcome, CapturedPrompt, InvocationLog};
use parking_lot::Mutex;
use thiserror::Error;

use super::progress::ProgressTracker;
use crate::engines::{EngineError, EngineFactory, EngineInstance};
use crate::plugin::ConfigurationError;
use crate::prompt::{Prompt, Response};
use crate::results::{ResultError, ResultMap};

/// How long a task waits for a connected engine's handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Why one task produced no response.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Result(#[from] ResultError),
}

impl TaskError {
    /// Short category for capture logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Engine(e) => e.kind(),
            TaskError::Panicked(_) => "panic",
            TaskError::Result(_) => "result",
        }
    }
}

/// A task failure tied to its prompt position.
#[derive(Debug)]
pub struct TaskFailure {
    pub index: usize,
    pub error: TaskError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prompt {}: {}", self.index + 1, self.error)
    }
}

/// Everything the pool produced for one batch.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub results: ResultMap,
    /// Failures ordered by prompt position
    pub failures: Vec<TaskFailure>,
}

/// State only touched under the run lock.
struct Aggregator {
    results: ResultMap,
    failures: Vec<TaskFailure>,
}

impl Aggregator {
    fn complete(
        &mut self,
        index: usize,
        outcome: Result<Response, TaskError>,
        progress: &ProgressTracker,
    ) {
        let outcome = outcome
            .and_then(|response| self.results.fill(index, response).map_err(TaskError::from));
        match outcome {
            Ok(()) => {
                let done = progress.advance();
                tracing::debug!(prompt = index, done, "prompt completed");
            }
            Err(error) => {
                tracing::warn!(prompt = index, %error, "prompt failed");
                self.failures.push(TaskFailure { index, error });
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// A pool of `size` workers. At least one is required.
    pub fn new(size: i64) -> Result<Self, ConfigurationError> {
        match usize::try_from(size) {
            Ok(size) if size > 0 => Ok(Self { size }),
            _ => Err(ConfigurationError::PoolSize(size)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run every prompt and collect the outcomes.
    ///
    /// The result map is pre-populated from `prompts`, so its order is the
    /// prompt order no matter in which order tasks finish.
    pub fn dispatch(
        &self,
        prompts: &[Arc<Prompt>],
        factory: &EngineFactory,
        progress: &ProgressTracker,
        capture: Option<&InvocationLog>,
    ) -> DispatchOutcome {
        progress.reset(prompts.len());
        let aggregator = Mutex::new(Aggregator {
            results: ResultMap::new(prompts),
            failures: Vec::new(),
        });

        let (tx, rx) = mpsc::channel();
        for index in 0..prompts.len() {
            // The receiver is alive until the end of this function.
            let _ = tx.send(index);
        }
        drop(tx);
        let queue = Mutex::new(rx);

        let worker = || loop {
            let next = queue.lock().recv();
            let Ok(index) = next else {
                break;
            };
            let Some(prompt) = prompts.get(index) else {
                continue;
            };
            let outcome = run_task(index, prompt, factory, capture);
            aggregator.lock().complete(index, outcome, progress);
        };

        let workers = self.size.min(prompts.len());
        std::thread::scope(|scope| {
            let mut spawned = 0;
            for n in 0..workers {
                let result = std::thread::Builder::new()
                    .name(format!("bisheng-worker-{n}"))
                    .spawn_scoped(scope, worker);
                match result {
                    Ok(_) => spawned += 1,
                    Err(e) => tracing::warn!(error = %e, "could not spawn worker"),
                }
            }
            if spawned == 0 && workers > 0 {
                tracing::warn!("no worker threads available; running inline");
                worker();
            }
        });

        let Aggregator {
            results,
            mut failures,
        } = aggregator.into_inner();
        failures.sort_by_key(|f| f.index);
        DispatchOutcome { results, failures }
    }
}

/// One task: fresh engine, optional handshake, invocation.
fn run_task(
    index: usize,
    prompt: &Prompt,
    factory: &EngineFactory,
    capture: Option<&InvocationLog>,
) -> Result<Response, TaskError> {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| invoke_fresh(prompt, factory)))
        .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))));
    tracing::trace!(
        prompt = index,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "invocation finished"
    );

    if let Some(log) = capture {
        log.record(
            CapturedPrompt {
                index,
                engine: factory.type_name().to_string(),
                system_prompt: prompt.system_prompt().to_string(),
                instruction: prompt.instruction().to_string(),
            },
            match &outcome {
                Ok(r) => CapturedOutcome::Response {
                    response: r.response.clone(),
                    rationale: r.rationale.clone(),
                    sources: r.sources.clone(),
                },
                Err(e) => CapturedOutcome::Failure {
                    failure_type: e.kind().to_string(),
                    message: e.to_string(),
                },
            },
        );
    }
    outcome
}

fn invoke_fresh(prompt: &Prompt, factory: &EngineFactory) -> Result<Response, TaskError> {
    let mut engine = factory.create()?;
    if let EngineInstance::Connected(session) = &mut engine {
        session.connect()?;
        if !session.wait_for_connection(CONNECT_TIMEOUT) {
            tracing::warn!(
                engine = session.name(),
                timeout_secs = CONNECT_TIMEOUT.as_secs(),
                "connection not ready; invoking anyway"
            );
        }
    }
    Ok(engine.invoke(prompt)?)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
