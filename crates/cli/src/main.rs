// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! bisheng binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bisheng::cli::{Cli, Command, InitArgs, RunArgs};
use bisheng::config::{init_plan, InitError};
use bisheng::env;
use bisheng::failure::exit_codes;
use bisheng::output::{print_error, print_summary};
use bisheng::runtime::{ProgressDisplay, RunOptions, RunnerBuilder};

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let code = match cli.command {
        Command::Init(args) => init(&args),
        Command::Run(args) => run(&args),
    };
    std::process::exit(code);
}

/// `--debug` > `--verbose` > `BISHENG_LOG` > `warn`.
fn init_tracing(cli: &Cli) {
    let filter = if cli.debug() {
        EnvFilter::new("debug,hyper=warn,h2=warn,reqwest=warn,rustls=warn,tungstenite=warn")
    } else if cli.verbose() {
        EnvFilter::new("info")
    } else {
        env::log_filter()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn init(args: &InitArgs) -> i32 {
    let engine = match args.engine() {
        Ok(engine) => engine,
        Err(e) => {
            print_error(e);
            return exit_codes::FAILURE;
        }
    };
    match init_plan(Some(args.config_dir.as_path()), engine, &args.filename) {
        Ok(path) => {
            println!("Created {}", path.display());
            exit_codes::SUCCESS
        }
        Err(e @ InitError::AlreadyExists(_)) => {
            print_error(e);
            exit_codes::CONFIG_ALREADY_EXISTS
        }
        Err(e) => {
            print_error(e);
            exit_codes::FAILURE
        }
    }
}

fn run(args: &RunArgs) -> i32 {
    let runner = match RunnerBuilder::new()
        .config_dir(Some(args.config_dir.as_path()))
        .config_file(args.filename.as_deref())
        .capture_file(args.capture.as_deref())
        .build()
    {
        Ok(runner) => runner,
        Err(e) => {
            print_error(e);
            return exit_codes::FAILURE;
        }
    };

    let options = RunOptions {
        num_threads: args.num_threads,
        verbose: args.verbose,
    };
    let display = ProgressDisplay::start(runner.progress());
    let outcome = runner.run(&options);
    display.finish();

    match outcome {
        Ok(summary) => {
            print_summary(&summary);
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(e);
            exit_codes::FAILURE
        }
    }
}
