/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use anyhow::Context;
use colored::*;
use merge_matrix::{
    clap_args::{self, Commands, MatrixArgs},
    collaborator::{DryRunCollaborator, MergeCollaborator, ProcessCollaborator},
    config::{Config, DEFAULT_CONFIG_PATH},
    execution_plan::ExecutionPlan,
    summary,
};
use std::{
    path::Path,
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, Subscriber};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // lets RUST_LOG live in a .env file
    dotenvy::dotenv().ok();

    let args = clap_args::parse();
    init_subscriber(args.verbose);

    let command = args.command.unwrap_or(Commands::Run {
        matrix: MatrixArgs::default(),
        keep_going: false,
        dry_run: false,
    });

    match run_command(command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the command succeeded; errors are problems with the setup rather than with
/// any merge.
fn run_command(command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Run {
            matrix,
            keep_going,
            dry_run,
        } => {
            let config = load_config(&matrix, keep_going)?;

            let interrupted = Arc::new(AtomicBool::new(false));
            let flag = interrupted.clone();
            ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
                .context("Unable to install Ctrl-C handler")?;

            let mut collaborator: Box<dyn MergeCollaborator> = if dry_run {
                Box::new(DryRunCollaborator::new(&config.merge)?)
            } else {
                Box::new(ProcessCollaborator::new(&config.merge)?)
            };

            let report = merge_matrix::run(&config, collaborator.as_mut(), &interrupted)?;

            println!("\n{}", " Summary ".reversed().green());
            println!("{}", summary::render_summary(&report));

            Ok(report.is_success())
        }

        Commands::Plan { matrix } => {
            let config = load_config(&matrix, false)?;
            config.validate()?;
            let plan = ExecutionPlan::from_config(&config);
            println!("{}", summary::render_plan(&plan));
            println!("{} jobs", plan.len());
            Ok(true)
        }

        Commands::Init => {
            Config::write_example_to_file(Path::new(DEFAULT_CONFIG_PATH))?;
            println!("{}", format!("{} created!", DEFAULT_CONFIG_PATH).green());
            Ok(true)
        }
    }
}

fn load_config(matrix: &MatrixArgs, keep_going: bool) -> anyhow::Result<Config> {
    let config = Config::load(matrix.file.as_deref())
        .context("Unable to load config")?
        .with_overrides(matrix.overrides(keep_going));
    debug!("Using config {:?}", config);
    Ok(config)
}

fn get_subscriber(env_filter: &str) -> impl Subscriber + Sync + Send {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish()
}

fn init_subscriber(verbose: bool) {
    let env_filter = if verbose { "merge_matrix=debug" } else { "warn" };
    if tracing::subscriber::set_global_default(get_subscriber(env_filter)).is_err() {
        eprintln!("Failed to set global default subscriber");
    }
}
