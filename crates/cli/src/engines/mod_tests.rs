// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use serde_json::json;

struct Fixed(&'static str);

impl Engine for Fixed {
    fn invoke(&mut self, _prompt: &Prompt) -> Result<Response, EngineError> {
        Ok(Response::new(self.0, ""))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[test]
fn factory_creates_fresh_instances() {
    let registry = builtin_registry();
    let factory =
        EngineFactory::from_config(&json!({ "type": "mock", "response": "hi" }), &registry)
            .unwrap();

    assert_eq!(factory.type_name(), "mock");
    let mut first = factory.create().unwrap();
    let mut second = factory.create().unwrap();
    let prompt = Prompt::plain("", "x");
    assert_eq!(first.invoke(&prompt).unwrap().response, "hi");
    assert_eq!(second.invoke(&prompt).unwrap().response, "hi");
}

#[test]
fn unknown_type_fails_before_construction() {
    let registry = builtin_registry();
    let err = EngineFactory::from_config(&json!({ "type": "mystery" }), &registry).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidName { .. }), "{err}");
}

#[test]
fn missing_type_is_reported() {
    let registry = builtin_registry();
    let err = EngineFactory::from_config(&json!({ "model_id": "x" }), &registry).unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingType { .. }));
}

#[test]
fn registered_extension_resolves() {
    let mut registry = builtin_registry();
    registry
        .register(
            "acme.fixed_engine.FixedEngine",
            Arc::new(
                |_: &PluginParams| -> Result<EngineInstance, EngineError> {
                    Ok(EngineInstance::Direct(Box::new(Fixed("fixed"))))
                },
            ) as EngineCtor,
        )
        .unwrap();

    let factory = EngineFactory::from_config(
        &json!({ "type": "acme.fixed_engine.FixedEngine" }),
        &registry,
    )
    .unwrap();
    let mut engine = factory.create().unwrap();
    assert_eq!(engine.name(), "fixed");
    assert_eq!(
        engine.invoke(&Prompt::plain("", "x")).unwrap().response,
        "fixed"
    );
}

#[test]
fn constructor_errors_surface_from_create() {
    let registry = builtin_registry();
    let factory =
        EngineFactory::from_config(&json!({ "type": "mock", "bogus": true }), &registry).unwrap();
    assert!(matches!(
        factory.create(),
        Err(EngineError::Configuration(_))
    ));
}

#[test]
fn error_kinds_are_stable() {
    assert_eq!(EngineError::Backend("x".into()).kind(), "backend");
    assert_eq!(
        EngineError::Status {
            status: 500,
            body: String::new()
        }
        .kind(),
        "status"
    );
}
