// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Process exit codes.

/// Exit codes of the `bisheng` binary
pub mod exit_codes {
    /// Successful execution
    pub const SUCCESS: i32 = 0;
    /// Run failed (config, decode, invocation or encoding error)
    pub const FAILURE: i32 = 1;
    /// `init` found an existing config file
    pub const CONFIG_ALREADY_EXISTS: i32 = 1;
}
