/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod clap_args;
pub mod collaborator;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod execution_plan;
pub mod summary;

use collaborator::MergeCollaborator;
use config::Config;
use dispatcher::RunReport;
use execution_plan::ExecutionPlan;
use std::sync::atomic::AtomicBool;

/// Validates the config, builds the job matrix from it and dispatches every job to the
/// collaborator.
pub fn run(
    config: &Config,
    collaborator: &mut dyn MergeCollaborator,
    interrupted: &AtomicBool,
) -> Result<RunReport, errors::ConfigError> {
    config.validate()?;
    let plan = ExecutionPlan::from_config(config);
    Ok(dispatcher::dispatch(
        &plan,
        collaborator,
        config.on_failure,
        interrupted,
    ))
}
