// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration: loading `bisheng.yaml` and writing starter configs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::env;

/// Config file looked up in the config directory by default.
pub const CONFIG_FILE_NAME: &str = "bisheng.yaml";

/// Upper bound on the default worker count, below the Bedrock service quota.
pub const MAX_NUM_THREADS: i64 = 45;

/// Directory created next to a fresh config for reports.
pub const REPORTS_DIR: &str = "reports";

const INPUT_PLACEHOLDER: &str = "<PATH_TO_INPUT>";
const OUTPUT_PLACEHOLDER: &str = "<PATH_TO_OUTPUT>";

static ENV_REFERENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// The three plugin sections of a run.
///
/// Plugin mappings stay untyped here; each plugin deserializes its own
/// parameters when it is constructed.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub engine: Value,
    pub encoders: Vec<Value>,
    pub decoder: Value,
}

impl RunConfig {
    /// Load and expand the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text, path)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse YAML text. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut value: Value = serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: origin.to_path_buf(),
            source,
        })?;
        expand_env_in(&mut value, &env::lookup);
        serde_json::from_value(value).map_err(|e| ConfigError::Invalid {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// `<dir>/<file>`, defaulting to the current directory and [`CONFIG_FILE_NAME`].
pub fn config_path(config_dir: Option<&Path>, file_name: Option<&str>) -> PathBuf {
    config_dir
        .unwrap_or_else(|| Path::new("."))
        .join(file_name.unwrap_or(CONFIG_FILE_NAME))
}

/// Replace `${NAME}` with the value `lookup` returns; unknown names stay.
pub fn expand_vars(text: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let Some(re) = ENV_REFERENCE.as_ref() else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &Captures<'_>| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// Expand references in every string of a config tree.
pub fn expand_env_in(value: &mut Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        Value::String(s) if s.contains("${") => *s = expand_vars(s, lookup),
        Value::Array(items) => items.iter_mut().for_each(|v| expand_env_in(v, lookup)),
        Value::Object(map) => map.values_mut().for_each(|v| expand_env_in(v, lookup)),
        _ => {}
    }
}

/// Engine flavour of a starter config.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineType {
    #[default]
    Bedrock,
    Gaab,
}

impl EngineType {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineType::Bedrock => "bedrock",
            EngineType::Gaab => "gaab",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = InitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bedrock" => Ok(EngineType::Bedrock),
            "gaab" => Ok(EngineType::Gaab),
            other => Err(InitError::InvalidEngineType(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Config already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid engine type: {0}")]
    InvalidEngineType(String),

    #[error("cannot create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot render config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Starter config shapes. Field order is the order written to YAML.

#[derive(Serialize)]
struct StarterConfig<E> {
    engine: E,
    encoders: Vec<StarterEncoder>,
    decoder: StarterDecoder,
}

#[derive(Serialize)]
struct BedrockStarter {
    #[serde(rename = "type")]
    kind: &'static str,
    aws_profile: &'static str,
    aws_region: &'static str,
    endpoint_url: &'static str,
    max_retry: u32,
    retry_mode: &'static str,
    model_id: &'static str,
    version: &'static str,
    trace: &'static str,
    guardrail_id: &'static str,
    guardrail_version: &'static str,
    hyperparameters: StarterHyperparameters,
}

#[derive(Serialize)]
struct StarterHyperparameters {
    max_tokens: u32,
    temperature: u32,
    top_p: u32,
    top_k: u32,
    role: &'static str,
}

#[derive(Serialize)]
struct GaabStarter {
    #[serde(rename = "type")]
    kind: &'static str,
    ws_url: &'static str,
    app_client_id: &'static str,
    user_name: &'static str,
    password: &'static str,
    aws_profile: &'static str,
    aws_region: &'static str,
    endpoint_url: &'static str,
    max_retry: u32,
    retry_mode: &'static str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StarterEncoder {
    Report {
        #[serde(rename = "type")]
        kind: &'static str,
        report_dir: &'static str,
    },
    Pptx {
        #[serde(rename = "type")]
        kind: &'static str,
        path: &'static str,
        append: bool,
    },
}

#[derive(Serialize)]
struct StarterDecoder {
    #[serde(rename = "type")]
    kind: &'static str,
    prompts_path: &'static str,
    shots_path: &'static str,
    context_path: &'static str,
    instruction: StarterInstruction,
}

#[derive(Serialize)]
struct StarterInstruction {
    #[serde(rename = "type")]
    kind: &'static str,
}

const BEDROCK_CONTROL_ENDPOINT: &str = "https://bedrock.${AWS_REGION}.amazonaws.com";

fn starter_io() -> (Vec<StarterEncoder>, StarterDecoder) {
    let encoders = vec![
        StarterEncoder::Report {
            kind: "transparency-report",
            report_dir: OUTPUT_PLACEHOLDER,
        },
        StarterEncoder::Pptx {
            kind: "pptx",
            path: OUTPUT_PLACEHOLDER,
            append: false,
        },
    ];
    let decoder = StarterDecoder {
        kind: "one-shot-pptx-with-context",
        prompts_path: INPUT_PLACEHOLDER,
        shots_path: INPUT_PLACEHOLDER,
        context_path: INPUT_PLACEHOLDER,
        instruction: StarterInstruction {
            kind: "one-shot-with-context",
        },
    };
    (encoders, decoder)
}

/// YAML text of the starter config for `engine_type`.
pub fn starter_config(engine_type: EngineType) -> Result<String, serde_yaml::Error> {
    let (encoders, decoder) = starter_io();
    match engine_type {
        EngineType::Bedrock => serde_yaml::to_string(&StarterConfig {
            engine: BedrockStarter {
                kind: "bedrock",
                aws_profile: "${AWS_PROFILE}",
                aws_region: "${AWS_REGION}",
                endpoint_url: BEDROCK_CONTROL_ENDPOINT,
                max_retry: 10,
                retry_mode: "adaptive",
                model_id: "anthropic.claude-3-sonnet-20240229-v1:0",
                version: "bedrock-2023-05-31",
                trace: "ENABLED",
                guardrail_id: "None",
                guardrail_version: "None",
                hyperparameters: StarterHyperparameters {
                    max_tokens: 30000,
                    temperature: 0,
                    top_p: 1,
                    top_k: 250,
                    role: "user",
                },
            },
            encoders,
            decoder,
        }),
        EngineType::Gaab => serde_yaml::to_string(&StarterConfig {
            engine: GaabStarter {
                kind: "gaab",
                ws_url: "${WSS_URL}",
                app_client_id: "${APP_CLIENT_ID}",
                user_name: "${USER_NAME}",
                password: "${PASSWORD}",
                aws_profile: "${AWS_PROFILE}",
                aws_region: "${AWS_REGION}",
                endpoint_url: BEDROCK_CONTROL_ENDPOINT,
                max_retry: 10,
                retry_mode: "adaptive",
            },
            encoders,
            decoder,
        }),
    }
}

/// Write a starter config to `<config_dir>/<file_name>` and create the
/// reports directory beside it.
///
/// Fails without touching anything if the config file already exists.
pub fn init_plan(
    config_dir: Option<&Path>,
    engine_type: EngineType,
    file_name: &str,
) -> Result<PathBuf, InitError> {
    let dir = config_dir.unwrap_or_else(|| Path::new("."));
    let path = dir.join(file_name);
    tracing::debug!(path = %path.display(), "set configuration path");

    if path.exists() {
        tracing::error!(dir = %dir.display(), "config already exists");
        return Err(InitError::AlreadyExists(path));
    }
    std::fs::create_dir_all(dir).map_err(|source| InitError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    tracing::debug!(engine = %engine_type, "writing default config");
    let yaml = starter_config(engine_type)?;
    std::fs::write(&path, yaml).map_err(|source| InitError::Io {
        path: path.clone(),
        source,
    })?;

    let reports = dir.join(REPORTS_DIR);
    std::fs::create_dir_all(&reports).map_err(|source| InitError::Io {
        path: reports,
        source,
    })?;

    tracing::info!(path = %path.display(), "config created");
    Ok(path)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
