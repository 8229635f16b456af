// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! RunnerBuilder for constructing a Runner with a fluent API.

use std::path::{Path, PathBuf};

use bisheng_capture::InvocationLog;
use thiserror::Error;

use super::core::Runner;
use crate::config::{config_path, ConfigError, RunConfig};
use crate::plugin::Plugins;

/// Error raised while assembling a runner.
#[derive(Debug, Error)]
pub enum RunnerBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot open capture file {}: {source}", path.display())]
    CaptureFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Builder for [`Runner`] instances.
///
/// ```ignore
/// let runner = RunnerBuilder::new()
///     .config_dir(Some(dir))
///     .capture_file(Some(path))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RunnerBuilder {
    config_dir: Option<PathBuf>,
    config_file: Option<String>,
    config: Option<RunConfig>,
    plugins: Option<Plugins>,
    capture: Option<InvocationLog>,
    capture_file: Option<PathBuf>,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the config file; defaults to the current directory.
    pub fn config_dir(mut self, dir: Option<&Path>) -> Self {
        self.config_dir = dir.map(Path::to_path_buf);
        self
    }

    /// Config file name inside the config directory.
    pub fn config_file(mut self, name: Option<&str>) -> Self {
        self.config_file = name.map(str::to_string);
        self
    }

    /// Use an already-loaded config instead of reading one from disk.
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Plugin registries; defaults to the built-in plugins.
    pub fn plugins(mut self, plugins: Plugins) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// Record every engine invocation in `log`.
    pub fn capture(mut self, log: InvocationLog) -> Self {
        self.capture = Some(log);
        self
    }

    /// Record every engine invocation as JSONL in `path`.
    pub fn capture_file(mut self, path: Option<&Path>) -> Self {
        self.capture_file = path.map(Path::to_path_buf);
        self
    }

    /// Path the config will be read from when none was given directly.
    pub fn resolved_config_path(&self) -> PathBuf {
        config_path(self.config_dir.as_deref(), self.config_file.as_deref())
    }

    pub fn build(self) -> Result<Runner, RunnerBuildError> {
        let config = match self.config {
            Some(ref config) => config.clone(),
            None => RunConfig::load(&self.resolved_config_path())?,
        };

        let capture = match (self.capture, self.capture_file) {
            (Some(log), _) => Some(log),
            (None, Some(path)) => Some(
                InvocationLog::with_file(&path)
                    .map_err(|source| RunnerBuildError::CaptureFile { path, source })?,
            ),
            (None, None) => None,
        };

        let plugins = self.plugins.unwrap_or_else(Plugins::builtin);
        Ok(Runner::with_parts(config, plugins, capture))
    }
}

impl Runner {
    /// Load `<config_dir>/<file_name>` with the built-in plugins.
    pub fn load(config_dir: Option<&Path>, file_name: Option<&str>) -> Result<Self, RunnerBuildError> {
        RunnerBuilder::new()
            .config_dir(config_dir)
            .config_file(file_name)
            .build()
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
