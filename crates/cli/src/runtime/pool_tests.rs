// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::engines::{builtin_registry, Engine, EngineCtor};
use crate::plugin::PluginParams;
use proptest::prelude::*;
use rstest::rstest;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

fn prompts(n: usize) -> Vec<Arc<Prompt>> {
    (0..n)
        .map(|i| Arc::new(Prompt::plain("sys", format!("prompt {i}"))))
        .collect()
}

fn mock_factory(config: serde_json::Value) -> EngineFactory {
    EngineFactory::from_config(&config, &builtin_registry()).unwrap()
}

#[rstest]
#[case(0)]
#[case(-3)]
fn non_positive_pool_sizes_are_rejected(#[case] size: i64) {
    assert!(matches!(
        WorkerPool::new(size),
        Err(ConfigurationError::PoolSize(s)) if s == size
    ));
}

#[rstest]
#[case(1, 5)]
#[case(3, 5)]
#[case(8, 5)]
#[case(4, 0)]
fn every_prompt_is_invoked_once(#[case] workers: i64, #[case] n: usize) {
    let pool = WorkerPool::new(workers).unwrap();
    let log = InvocationLog::new();
    let progress = ProgressTracker::new();
    let prompts = prompts(n);

    let outcome = pool.dispatch(&prompts, &mock_factory(json!({ "type": "mock" })), &progress, Some(&log));

    assert_eq!(log.len(), n);
    assert_eq!(log.prompt_indices(), (0..n).collect::<Vec<_>>());
    assert_eq!(outcome.results.len(), n);
    assert_eq!(outcome.results.resolved_count(), n);
    assert!(outcome.failures.is_empty());
    assert_eq!(progress.completed(), n);
    for (i, entry) in outcome.results.iter().enumerate() {
        assert_eq!(entry.response.as_ref().unwrap().response, format!("prompt {i}"));
    }
}

#[test]
fn failures_do_not_stop_siblings() {
    let pool = WorkerPool::new(2).unwrap();
    let prompts = vec![
        Arc::new(Prompt::plain("", "ok one")),
        Arc::new(Prompt::plain("", "boom")),
        Arc::new(Prompt::plain("", "ok two")),
    ];
    let progress = ProgressTracker::new();
    let factory = mock_factory(json!({ "type": "mock", "fail_on": "boom", "response": "fine" }));

    let outcome = pool.dispatch(&prompts, &factory, &progress, None);

    assert_eq!(outcome.results.resolved_count(), 2);
    assert_eq!(outcome.results.unresolved(), vec![1]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert!(matches!(
        outcome.failures[0].error,
        TaskError::Engine(EngineError::Backend(_))
    ));
    assert_eq!(outcome.failures[0].to_string(), "prompt 2: mock failure for instruction containing 'boom'");
    assert_eq!(progress.completed(), 2);
}

#[test]
fn connected_engines_handshake_before_invoking() {
    let pool = WorkerPool::new(3).unwrap();
    let outcome = pool.dispatch(
        &prompts(4),
        &mock_factory(json!({ "type": "mock", "connected": true })),
        &ProgressTracker::new(),
        None,
    );
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.results.resolved_count(), 4);
}

#[test]
fn engine_construction_errors_are_task_failures() {
    let pool = WorkerPool::new(2).unwrap();
    let log = InvocationLog::new();
    let outcome = pool.dispatch(
        &prompts(2),
        &mock_factory(json!({ "type": "mock", "unexpected": 1 })),
        &ProgressTracker::new(),
        Some(&log),
    );

    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(log.find_failures().len(), 2);
    assert!(outcome
        .failures
        .iter()
        .all(|f| f.error.kind() == "configuration"));
}

struct Panicky;

impl Engine for Panicky {
    fn invoke(&mut self, prompt: &Prompt) -> Result<Response, EngineError> {
        if prompt.instruction().contains('1') {
            panic!("engine exploded");
        }
        Ok(Response::new("ok", ""))
    }

    fn name(&self) -> &'static str {
        "panicky"
    }
}

#[test]
fn panicking_task_is_isolated() {
    let mut registry = builtin_registry();
    registry
        .register(
            "test.panicky_engine.Panicky",
            Arc::new(|_: &PluginParams| -> Result<EngineInstance, EngineError> {
                Ok(EngineInstance::Direct(Box::new(Panicky)))
            }) as EngineCtor,
        )
        .unwrap();
    let factory =
        EngineFactory::from_config(&json!({ "type": "test.panicky_engine.Panicky" }), &registry)
            .unwrap();

    let outcome = WorkerPool::new(2)
        .unwrap()
        .dispatch(&prompts(3), &factory, &ProgressTracker::new(), None);

    assert_eq!(outcome.results.resolved_count(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(
        outcome.failures[0].error,
        TaskError::Panicked(ref m) if m == "engine exploded"
    ));
}

struct Counting(Arc<AtomicUsize>, Arc<parking_lot::Mutex<HashSet<std::thread::ThreadId>>>);

impl Engine for Counting {
    fn invoke(&mut self, _prompt: &Prompt) -> Result<Response, EngineError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        self.1.lock().insert(std::thread::current().id());
        std::thread::sleep(Duration::from_millis(5));
        Ok(Response::new("ok", ""))
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[test]
fn worker_count_is_bounded_by_pool_size() {
    let calls = Arc::new(AtomicUsize::new(0));
    let threads = Arc::new(parking_lot::Mutex::new(HashSet::new()));
    let mut registry = builtin_registry();
    let (c, t) = (Arc::clone(&calls), Arc::clone(&threads));
    registry
        .register(
            "test.counting_engine.Counting",
            Arc::new(move |_: &PluginParams| -> Result<EngineInstance, EngineError> {
                Ok(EngineInstance::Direct(Box::new(Counting(
                    Arc::clone(&c),
                    Arc::clone(&t),
                ))))
            }) as EngineCtor,
        )
        .unwrap();
    let factory =
        EngineFactory::from_config(&json!({ "type": "test.counting_engine.Counting" }), &registry)
            .unwrap();

    WorkerPool::new(3)
        .unwrap()
        .dispatch(&prompts(12), &factory, &ProgressTracker::new(), None);

    assert_eq!(calls.load(Ordering::SeqCst), 12);
    let used = threads.lock().len();
    assert!((1..=3).contains(&used), "{used} threads used");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn map_order_matches_prompt_order(n in 0usize..20, workers in 1i64..6) {
        let prompts = prompts(n);
        let outcome = WorkerPool::new(workers).unwrap().dispatch(
            &prompts,
            &mock_factory(json!({ "type": "mock" })),
            &ProgressTracker::new(),
            None,
        );
        prop_assert_eq!(outcome.results.len(), n);
        for (entry, prompt) in outcome.results.iter().zip(&prompts) {
            prop_assert!(Arc::ptr_eq(&entry.prompt, prompt));
        }
    }
}
