// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use proptest::prelude::*;
use std::thread;

fn make_prompt(index: usize, instruction: &str) -> CapturedPrompt {
    CapturedPrompt {
        index,
        engine: "mock".to_string(),
        system_prompt: String::new(),
        instruction: instruction.to_string(),
    }
}

fn make_response(text: &str) -> CapturedOutcome {
    CapturedOutcome::Response {
        response: text.to_string(),
        rationale: String::new(),
        sources: String::new(),
    }
}

fn make_failure(message: &str) -> CapturedOutcome {
    CapturedOutcome::Failure {
        failure_type: "backend".to_string(),
        message: message.to_string(),
    }
}

#[test]
fn record_and_retrieve() {
    let log = InvocationLog::new();

    log.record(make_prompt(0, "hello"), make_response("Hi!"));

    assert_eq!(log.len(), 1);
    let invocations = log.invocations();
    assert_eq!(invocations[0].seq, 0);
    assert_eq!(invocations[0].prompt.instruction, "hello");
}

#[test]
fn outcome_filters_split_responses_and_failures() {
    let log = InvocationLog::new();

    log.record(make_prompt(0, "a"), make_response("ok"));
    log.record(make_prompt(1, "b"), make_failure("boom"));
    log.record(make_prompt(2, "c"), make_response("ok"));

    let failures = log.find_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].prompt.index, 1);
    assert_eq!(log.find_responses().len(), 2);
}

#[test]
fn prompt_indices_are_sorted() {
    let log = InvocationLog::new();

    for index in [2, 0, 1] {
        log.record(make_prompt(index, "x"), make_response("ok"));
    }

    assert_eq!(log.prompt_indices(), vec![0, 1, 2]);
}

#[test]
fn default_log_starts_empty() {
    let log = InvocationLog::default();
    assert!(log.is_empty());

    log.record(make_prompt(0, "test"), make_response("ok"));
    assert!(!log.is_empty());
}

#[test]
fn clone_shares_state() {
    let log1 = InvocationLog::new();
    let log2 = log1.clone();

    log1.record(make_prompt(0, "from log1"), make_response("ok"));
    log2.record(make_prompt(1, "from log2"), make_response("ok"));

    assert_eq!(log1.len(), 2);
    assert_eq!(log2.len(), 2);
}

#[test]
fn file_capture_writes_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.jsonl");

    {
        let log = InvocationLog::with_file(&path).unwrap();
        log.record(make_prompt(0, "prompt1"), make_response("response1"));
        log.record(make_prompt(1, "prompt2"), make_failure("timeout"));
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: CapturedInvocation = serde_json::from_str(lines[0]).unwrap();
    let second: CapturedInvocation = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(first.prompt.instruction, "prompt1");
    assert_eq!(second.seq, 1);
    assert!(matches!(second.outcome, CapturedOutcome::Failure { .. }));
}

#[test]
fn file_capture_invalid_path() {
    let result = InvocationLog::with_file(std::path::Path::new("/nonexistent/dir/file.jsonl"));
    assert!(result.is_err());
}

#[test]
fn concurrent_recording_keeps_every_entry() {
    let log = InvocationLog::new();

    thread::scope(|scope| {
        for worker in 0..4 {
            let log = log.clone();
            scope.spawn(move || {
                for i in 0..50 {
                    log.record(make_prompt(worker * 50 + i, "x"), make_response("ok"));
                }
            });
        }
    });

    assert_eq!(log.len(), 200);
    let seqs: Vec<u64> = log.invocations().iter().map(|i| i.seq).collect();
    assert_eq!(seqs, (0..200).collect::<Vec<u64>>());
    assert_eq!(log.prompt_indices(), (0..200).collect::<Vec<usize>>());
}

proptest! {
    #[test]
    fn len_equals_record_count(responses in 0usize..30, failures in 0usize..30) {
        let log = InvocationLog::new();
        for i in 0..responses {
            log.record(make_prompt(i, "r"), make_response("ok"));
        }
        for i in 0..failures {
            log.record(make_prompt(i, "f"), make_failure("error"));
        }

        prop_assert_eq!(log.find_responses().len(), responses);
        prop_assert_eq!(log.find_failures().len(), failures);
        prop_assert_eq!(log.len(), responses + failures);
    }
}
