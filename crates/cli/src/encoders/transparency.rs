// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON report pairing every prompt with its response.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{EncodeError, Encoder, EncoderPayload};
use crate::plugin::PluginParams;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransparencyReportConfig {
    pub report_dir: PathBuf,
}

#[derive(Debug)]
pub struct TransparencyReportEncoder {
    report_dir: PathBuf,
}

/// `transparency_<YYYYmmdd_HHMMSS>.json` for the given time.
pub fn report_file_name(at: &DateTime<Local>) -> String {
    format!("transparency_{}.json", at.format("%Y%m%d_%H%M%S"))
}

impl TransparencyReportEncoder {
    pub fn new(config: TransparencyReportConfig) -> Result<Self, EncodeError> {
        if !config.report_dir.is_dir() {
            return Err(EncodeError::NotADirectory(config.report_dir));
        }
        Ok(Self {
            report_dir: config.report_dir,
        })
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Report body: context without newlines (`null` when empty) and one
    /// record per resolved prompt, in map order.
    pub fn report(payload: &EncoderPayload<'_>) -> Value {
        let context = payload.metadata.context.replace('\n', "");
        let context = if context.is_empty() {
            Value::Null
        } else {
            Value::from(context)
        };
        let results: Vec<Value> = payload
            .results
            .resolved()
            .map(|(prompt, response)| {
                json!({
                    "prompt": prompt.to_record(),
                    "response": response.to_record(),
                })
            })
            .collect();
        json!({
            "context": context,
            "results": results,
        })
    }
}

impl Encoder for TransparencyReportEncoder {
    fn name(&self) -> &str {
        "transparency-report"
    }

    fn encode(&mut self, payload: &EncoderPayload<'_>) -> Result<(), EncodeError> {
        let path = self.report_dir.join(report_file_name(&Local::now()));
        let body = serde_json::to_string_pretty(&Self::report(payload))?;
        std::fs::write(&path, body).map_err(|source| EncodeError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "wrote transparency report");
        Ok(())
    }
}

pub(super) fn construct(params: &PluginParams) -> Result<Box<dyn Encoder>, EncodeError> {
    let config: TransparencyReportConfig = params.deserialize("transparency-report encoder")?;
    Ok(Box::new(TransparencyReportEncoder::new(config)?))
}

#[cfg(test)]
#[path = "transparency_tests.rs"]
mod tests;
