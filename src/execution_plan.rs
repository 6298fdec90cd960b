/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::config::{Config, Layout};
use itertools::*;
use std::path::{Path, PathBuf};

/// One merge to perform: a workload dataset combined with a traffic dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Position of the job in dispatch order, starting at 0.
    pub index: usize,
    pub workload: String,
    pub traffic: String,
    pub input_a: PathBuf,
    pub input_b: PathBuf,
    pub output: PathBuf,
}
impl Job {
    pub fn new(index: usize, workload: &str, traffic: &str, layout: &Layout) -> Self {
        Self {
            index,
            workload: workload.to_string(),
            traffic: traffic.to_string(),
            input_a: layout.input_path(workload),
            input_b: layout.input_path(traffic),
            output: layout.output_path(workload, traffic),
        }
    }

    pub fn inputs(&self) -> [&Path; 2] {
        [&self.input_a, &self.input_b]
    }

    /// `workload_traffic`, the stem of the output file.
    pub fn name(&self) -> String {
        format!("{}_{}", self.workload, self.traffic)
    }
}

/// Every (workload, traffic) pair in row-major order: the outer loop walks `workloads` and the
/// inner loop walks `traffics`. Duplicates are kept.
pub fn cross_product<'a>(
    workloads: &'a [String],
    traffics: &'a [String],
) -> Vec<(&'a str, &'a str)> {
    workloads
        .iter()
        .cartesian_product(traffics.iter())
        .map(|(w, t)| (w.as_str(), t.as_str()))
        .collect_vec()
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    jobs: Vec<Job>,
}
impl ExecutionPlan {
    pub fn new(workloads: &[String], traffics: &[String], layout: &Layout) -> Self {
        let jobs = cross_product(workloads, traffics)
            .into_iter()
            .enumerate()
            .map(|(index, (workload, traffic))| Job::new(index, workload, traffic, layout))
            .collect_vec();

        Self { jobs }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.workloads, &config.traffics, &config.layout)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
