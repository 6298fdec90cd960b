/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{config::FailurePolicy, dispatcher::RunReport, execution_plan::ExecutionPlan};
use colored::*;
use term_table::{row, row::Row, rows, table_cell::*, Table, TableStyle};

/// Counts for the run followed by one row per failed pair.
pub fn render_summary(report: &RunReport) -> String {
    let counts = Table::builder()
        .rows(rows![
            row![
                TableCell::builder("Run".bold()).build(),
                TableCell::builder("Policy".bold()).build(),
                TableCell::builder("Planned".bold()).build(),
                TableCell::builder("Succeeded".bold()).build(),
                TableCell::builder("Failed".bold()).build(),
                TableCell::builder("Skipped".bold()).build(),
                TableCell::builder("Duration (s)".bold()).build()
            ],
            row![
                TableCell::new(&report.run_id),
                TableCell::new(policy_name(report.policy)),
                TableCell::new(report.planned),
                TableCell::new(report.succeeded().to_string().green()),
                TableCell::new(match report.failures().len() {
                    0 => "0".normal(),
                    n => n.to_string().red(),
                }),
                TableCell::new(report.skipped()),
                TableCell::new(seconds(report.elapsed_ms()))
            ]
        ])
        .style(TableStyle::rounded())
        .build();

    let mut out = counts.render();

    let failures = report.failures();
    if !failures.is_empty() {
        let mut rows = rows![row![
            TableCell::builder("Workload".bold()).build(),
            TableCell::builder("Traffic".bold()).build(),
            TableCell::builder("Output".bold()).build(),
            TableCell::builder("Duration (s)".bold()).build(),
            TableCell::builder("Reason".bold()).build()
        ]];
        for outcome in failures {
            let reason = outcome
                .error()
                .map(|err| err.to_string())
                .unwrap_or_default();
            rows.push(row![
                TableCell::new(&outcome.job.workload),
                TableCell::new(&outcome.job.traffic),
                TableCell::new(outcome.job.output.to_string_lossy()),
                TableCell::new(seconds(outcome.elapsed_ms())),
                TableCell::new(reason.red())
            ]);
        }

        let table = Table::builder()
            .rows(rows)
            .style(TableStyle::rounded())
            .build();
        out.push('\n');
        out.push_str(&table.render());
    }

    if report.interrupted {
        out.push('\n');
        out.push_str(&"Run was interrupted.".yellow().to_string());
    }

    out
}

fn policy_name(policy: FailurePolicy) -> &'static str {
    match policy {
        FailurePolicy::FailFast => "fail-fast",
        FailurePolicy::KeepGoing => "keep-going",
    }
}

fn seconds(elapsed_ms: i64) -> String {
    format!("{:.3}", elapsed_ms as f64 / 1000.0)
}

/// The job matrix in dispatch order.
pub fn render_plan(plan: &ExecutionPlan) -> String {
    let mut rows = rows![row![
        TableCell::builder("#".bold()).build(),
        TableCell::builder("Workload".bold()).build(),
        TableCell::builder("Traffic".bold()).build(),
        TableCell::builder("Inputs".bold()).build(),
        TableCell::builder("Output".bold()).build()
    ]];
    for job in plan.jobs() {
        rows.push(row![
            TableCell::new(job.index),
            TableCell::new(&job.workload),
            TableCell::new(&job.traffic),
            TableCell::new(format!(
                "{}\n{}",
                job.input_a.to_string_lossy(),
                job.input_b.to_string_lossy()
            )),
            TableCell::new(job.output.to_string_lossy())
        ]);
    }

    Table::builder()
        .rows(rows)
        .style(TableStyle::rounded())
        .build()
        .render()
}
