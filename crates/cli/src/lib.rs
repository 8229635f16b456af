// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! bisheng
//!
//! Runs the prompts embedded in a PowerPoint deck against a language model
//! and writes the answers back out. A run is described by a YAML config
//! naming three kinds of plugin:
//!
//! - a **decoder** that extracts prompts from input files,
//! - an **engine** that answers one prompt at a time,
//! - any number of **encoders** that persist the collected results.
//!
//! Prompts are dispatched concurrently on a bounded worker pool; see
//! [`runtime::Runner`].

pub mod cli;
pub mod config;
pub mod deck;
pub mod decoders;
pub mod encoders;
pub mod engines;
pub mod env;
pub mod failure;
pub mod output;
pub mod plugin;
pub mod prompt;
pub mod results;
pub mod runtime;
pub mod templates;

/// Re-exported capture types from the bisheng-capture crate.
pub mod capture {
    pub use bisheng_capture::{
        CapturedInvocation, CapturedOutcome, CapturedPrompt, InvocationLog,
    };
}
