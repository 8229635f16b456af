// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime module for executing a run.
//!
//! This module provides:
//! - [`Runner`] - Decodes, dispatches and encodes one run
//! - [`RunnerBuilder`] - Fluent API for constructing Runner instances
//! - [`WorkerPool`] - Bounded thread pool invoking engines
//! - [`ProgressTracker`] - Completed/total counters shared with the display

mod builder;
mod core;
mod pool;
mod progress;

pub use builder::{RunnerBuildError, RunnerBuilder};
pub use core::{
    resolve_num_threads, EncodingFailures, InvocationFailures, RunError, RunOptions, RunPhase,
    RunSummary, Runner,
};
pub use pool::{DispatchOutcome, TaskError, TaskFailure, WorkerPool, CONNECT_TIMEOUT};
pub use progress::{render_line, ProgressDisplay, ProgressTracker};
