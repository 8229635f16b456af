// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! End-to-end runs through the library API with the offline engine.

mod common;

use std::sync::Arc;

use bisheng::capture::InvocationLog;
use bisheng::config::RunConfig;
use bisheng::engines::{EngineCtor, EngineError, EngineInstance};
use bisheng::plugin::{ConfigurationError, PluginParams, Plugins};
use bisheng::runtime::{resolve_num_threads, RunError, RunOptions, RunnerBuilder};
use common::Workspace;
use serde_json::{json, Value};

fn config(ws: &Workspace, engine: Value) -> RunConfig {
    RunConfig {
        engine,
        encoders: vec![ws.report_encoder()],
        decoder: ws.decoder(),
    }
}

#[test]
fn two_prompts_produce_one_report_with_two_records() {
    let ws = Workspace::with_prompts(&["Write a tagline", "Write a slogan"]);
    let runner = RunnerBuilder::new()
        .config(config(&ws, json!({ "type": "mock", "response": "Done." })))
        .build()
        .unwrap();

    let summary = runner
        .run(&RunOptions {
            num_threads: Some(2),
            verbose: false,
        })
        .unwrap();
    assert_eq!(summary.completed, 2);

    let reports = ws.reports();
    assert_eq!(reports.len(), 1);
    let name = reports[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("transparency_") && name.ends_with(".json"), "{name}");

    let report: Value =
        serde_json::from_str(&std::fs::read_to_string(&reports[0]).unwrap()).unwrap();
    let records = report["results"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["response"]["response"], "Done.");
}

#[test]
fn one_failure_among_three_is_reported_after_the_rest_complete() {
    let ws = Workspace::with_prompts(&["alpha", "explode", "gamma"]);
    let log = InvocationLog::new();
    let runner = RunnerBuilder::new()
        .config(config(&ws, json!({ "type": "mock", "fail_on": "explode" })))
        .capture(log.clone())
        .build()
        .unwrap();

    let err = runner.run(&RunOptions::default()).unwrap_err();

    let RunError::Invocation(failures) = err else {
        panic!("expected invocation failures, got {err}");
    };
    assert_eq!(failures.failures.len(), 1);
    assert_eq!(failures.completed, 2);
    assert_eq!(log.len(), 3);
    assert_eq!(log.find_failures().len(), 1);
    assert_eq!(log.find_responses().len(), 2);
    assert!(ws.reports().is_empty());
}

#[test]
fn unknown_engine_type_is_rejected() {
    let ws = Workspace::with_prompts(&["alpha"]);
    let runner = RunnerBuilder::new()
        .config(config(&ws, json!({ "type": "mystery" })))
        .build()
        .unwrap();

    let err = runner.run(&RunOptions::default()).unwrap_err();
    assert!(
        matches!(err, RunError::Configuration(ConfigurationError::InvalidName { .. })),
        "{err}"
    );
}

#[test]
fn thread_count_is_capped() {
    assert_eq!(resolve_num_threads(100, None), 45);
    assert_eq!(resolve_num_threads(2, None), 2);
}

#[test]
fn every_prompt_is_invoked_exactly_once() {
    let prompts: Vec<String> = (0..12).map(|i| format!("prompt {i}")).collect();
    let refs: Vec<&str> = prompts.iter().map(String::as_str).collect();
    let ws = Workspace::with_prompts(&refs);
    let log = InvocationLog::new();
    let runner = RunnerBuilder::new()
        .config(config(&ws, json!({ "type": "mock", "delay_ms": 5 })))
        .capture(log.clone())
        .build()
        .unwrap();

    runner
        .run(&RunOptions {
            num_threads: Some(4),
            verbose: true,
        })
        .unwrap();

    assert_eq!(log.len(), 12);
    assert_eq!(log.prompt_indices(), (0..12).collect::<Vec<_>>());
}

#[test]
fn registered_engine_is_used() {
    struct Upper;
    impl bisheng::engines::Engine for Upper {
        fn invoke(
            &mut self,
            prompt: &bisheng::prompt::Prompt,
        ) -> Result<bisheng::prompt::Response, EngineError> {
            Ok(bisheng::prompt::Response::new(
                prompt.instruction().to_uppercase(),
                "",
            ))
        }

        fn name(&self) -> &'static str {
            "upper"
        }
    }

    let mut plugins = Plugins::builtin();
    plugins
        .engines
        .register(
            "acme.upper_engine.UpperEngine",
            Arc::new(|_: &PluginParams| -> Result<EngineInstance, EngineError> {
                Ok(EngineInstance::Direct(Box::new(Upper)))
            }) as EngineCtor,
        )
        .unwrap();

    let ws = Workspace::with_prompts(&["shout"]);
    let runner = RunnerBuilder::new()
        .config(config(
            &ws,
            json!({ "type": "acme.upper_engine.UpperEngine" }),
        ))
        .plugins(plugins)
        .build()
        .unwrap();

    let summary = runner.run(&RunOptions::default()).unwrap();
    let entry = summary.results.iter().next().unwrap();
    assert!(entry
        .response
        .as_ref()
        .unwrap()
        .response
        .contains("SHOUT"));
}
