// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface: `init` and `run`.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::config::{EngineType, CONFIG_FILE_NAME};

/// Run prompts embedded in slide decks against language models
#[derive(Parser, Debug)]
#[command(name = "bisheng", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a YAML config.
    Init(InitArgs),

    /// Run a print job.
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// The directory location of the config yaml file
    #[arg(long, value_name = "PATH", value_parser = parse_config_dir)]
    pub config_dir: PathBuf,

    /// The engine type to use
    #[arg(long, value_name = "ENGINE_TYPE", value_parser = ["bedrock", "gaab"], default_value = "bedrock")]
    pub engine_type: String,

    /// Enables debug mode
    #[arg(long)]
    pub debug: bool,

    /// Name of the config file to create
    #[arg(value_name = "FILENAME", default_value = CONFIG_FILE_NAME)]
    pub filename: String,
}

impl InitArgs {
    /// The engine type; clap has already restricted the choices.
    pub fn engine(&self) -> Result<EngineType, crate::config::InitError> {
        self.engine_type.parse()
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The directory location of the config yaml file
    #[arg(long, value_name = "PATH", value_parser = parse_config_dir)]
    pub config_dir: PathBuf,

    /// Number of worker threads. Defaults to one per prompt, at most 45
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub num_threads: Option<i64>,

    /// Print verbose logs
    #[arg(long)]
    pub verbose: bool,

    /// Enables debug mode
    #[arg(long)]
    pub debug: bool,

    /// Record every engine invocation as JSONL
    #[arg(long, value_name = "FILE")]
    pub capture: Option<PathBuf>,

    /// Name of the config file to run
    #[arg(value_name = "FILENAME")]
    pub filename: Option<String>,
}

impl Cli {
    /// Whether debug logging was requested.
    pub fn debug(&self) -> bool {
        match &self.command {
            Command::Init(args) => args.debug,
            Command::Run(args) => args.debug,
        }
    }

    /// Whether info logging was requested.
    pub fn verbose(&self) -> bool {
        matches!(&self.command, Command::Run(args) if args.verbose)
    }
}

/// Accept only existing directories we can read and write.
fn parse_config_dir(value: &str) -> Result<PathBuf, String> {
    let path = Path::new(value);
    if !path.is_dir() {
        return Err(format!("{value} is not a directory"));
    }
    let readable = std::fs::read_dir(path).is_ok();
    let writable = std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false);
    if !readable || !writable {
        return Err(format!("No read/write permissions for {value}"));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
