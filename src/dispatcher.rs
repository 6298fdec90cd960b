/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{
    collaborator::MergeCollaborator,
    config::FailurePolicy,
    errors::MergeError,
    execution_plan::{ExecutionPlan, Job},
};
use chrono::Utc;
use colored::*;
use itertools::*;
use nanoid::nanoid;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, info_span, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded { elapsed_ms: i64 },
    Failed { error: MergeError, elapsed_ms: i64 },
}

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: Job,
    pub status: JobStatus,
}
impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, JobStatus::Succeeded { .. })
    }

    pub fn elapsed_ms(&self) -> i64 {
        match self.status {
            JobStatus::Succeeded { elapsed_ms } | JobStatus::Failed { elapsed_ms, .. } => elapsed_ms,
        }
    }

    pub fn error(&self) -> Option<&MergeError> {
        match &self.status {
            JobStatus::Failed { error, .. } => Some(error),
            JobStatus::Succeeded { .. } => None,
        }
    }
}

/// What happened to every job of a run. Jobs that were never dispatched have no outcome.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub policy: FailurePolicy,
    pub planned: usize,
    pub outcomes: Vec<JobOutcome>,
    pub interrupted: bool,
}
impl RunReport {
    pub fn dispatched(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> Vec<&JobOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect_vec()
    }

    /// Time spent inside the collaborator, summed over all dispatched jobs.
    pub fn elapsed_ms(&self) -> i64 {
        self.outcomes.iter().map(JobOutcome::elapsed_ms).sum()
    }

    pub fn skipped(&self) -> usize {
        self.planned - self.dispatched()
    }

    /// True when every planned job ran and succeeded. An empty plan is a success.
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.skipped() == 0 && self.failures().is_empty()
    }
}

/// Runs every job of the plan, one after the other, in plan order.
///
/// A progress line naming the output file is printed before each job. With
/// [`FailurePolicy::FailFast`] the first failure ends the run and the remaining jobs are not
/// dispatched; with [`FailurePolicy::KeepGoing`] all jobs run and the failures are collected in
/// the report. `interrupted` is checked before each job is started.
pub fn dispatch(
    plan: &ExecutionPlan,
    collaborator: &mut dyn MergeCollaborator,
    policy: FailurePolicy,
    interrupted: &AtomicBool,
) -> RunReport {
    let run_id = nanoid!(5, &nanoid::alphabet::SAFE);
    let span = info_span!("run", id = %run_id);
    let _guard = span.enter();

    let total = plan.len();
    info!("Dispatching {} merge jobs ({:?})", total, policy);

    let mut report = RunReport {
        run_id: run_id.clone(),
        policy,
        planned: total,
        outcomes: Vec::with_capacity(total),
        interrupted: false,
    };

    for job in plan.jobs() {
        if interrupted.load(Ordering::SeqCst) {
            warn!("Interrupted before job {}, stopping", job.index);
            report.interrupted = true;
            break;
        }

        println!(
            "> merging {} [{}/{}]",
            job.output.to_string_lossy().green(),
            job.index + 1,
            total
        );
        info!(
            job = job.index,
            workload = %job.workload,
            traffic = %job.traffic,
            "Generating {}",
            job.output.to_string_lossy()
        );

        let start = Utc::now().timestamp_millis();
        let res = collaborator.merge(job);
        let elapsed_ms = Utc::now().timestamp_millis() - start;

        match res {
            Ok(()) => {
                println!("\t{}", "✓".green());
                report.outcomes.push(JobOutcome {
                    job: job.clone(),
                    status: JobStatus::Succeeded { elapsed_ms },
                });
            }

            Err(err) => {
                println!("\t{} {}", "✗".red(), err);
                let stop = policy == FailurePolicy::FailFast;
                if stop {
                    error!(
                        "Merging {} with {} failed, stopping: {}",
                        job.workload, job.traffic, err
                    );
                } else {
                    warn!(
                        "Merging {} with {} failed, continuing: {}",
                        job.workload, job.traffic, err
                    );
                }

                report.outcomes.push(JobOutcome {
                    job: job.clone(),
                    status: JobStatus::Failed {
                        error: err,
                        elapsed_ms,
                    },
                });

                if stop {
                    break;
                }
            }
        }
    }

    info!(
        "Run finished: {} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failures().len(),
        report.skipped()
    );

    report
}
