// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Invocation capture and recording.
//!
//! Records every engine invocation made during a bisheng run, in memory and
//! optionally as JSONL on disk, so runs can be audited and tests can count
//! what actually reached an engine.

mod duration_serde;
mod invocation;
mod log;

pub use invocation::{CapturedInvocation, CapturedOutcome, CapturedPrompt};
pub use log::InvocationLog;
