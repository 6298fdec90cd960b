/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use thiserror::Error;

/// Why a single merge invocation did not succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("failed to launch `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    #[error("`{program}` exited with status {code}")]
    Exited { program: String, code: u32 },

    #[error("`{program}` was killed by signal {signal}")]
    Signaled { program: String, signal: u8 },

    #[error("`{program}` finished abnormally: {detail}")]
    Abnormal { program: String, detail: String },

    #[error("could not open output redirect: {0}")]
    Redirect(String),

    #[error("merge command expanded to an empty argument list")]
    EmptyCommand,
}

/// Problems with the configuration that are caught before any job is dispatched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{list} entry #{position} is empty")]
    EmptyName { list: &'static str, position: usize },

    #[error("{list} entry `{name}` contains a path separator")]
    NameWithSeparator { list: &'static str, name: String },

    #[error("merge command is empty")]
    EmptyCommand,

    #[error("merge command is not POSIX compliant: {0}")]
    InvalidCommand(String),

    #[error("`{{inputs}}` must be a word of its own in the merge command, found `{0}`")]
    EmbeddedInputs(String),
}
