/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::config::Overrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbose logging (-v, --verbose)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to `run` with no overrides
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge every workload dataset with every traffic dataset
    Run {
        #[command(flatten)]
        matrix: MatrixArgs,

        /// Keep going after a failed merge and report all failures at the end
        #[arg(long)]
        keep_going: bool,

        /// Print the merge commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the job matrix without running anything
    Plan {
        #[command(flatten)]
        matrix: MatrixArgs,
    },

    /// Write an example merge-matrix.toml to the current directory
    Init,
}

#[derive(Args, Debug, Default, Clone)]
pub struct MatrixArgs {
    /// Config file, defaults to ./merge-matrix.toml when present
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Comma separated workload profiles
    #[arg(short, long, value_delimiter = ',')]
    pub workloads: Option<Vec<String>>,

    /// Comma separated traffic profiles
    #[arg(short, long, value_delimiter = ',')]
    pub traffics: Option<Vec<String>>,

    /// Directory holding the input datasets
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory the merged datasets are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Merge command template, e.g. "merge {inputs} -o {output}"
    #[arg(long)]
    pub command: Option<String>,
}
impl MatrixArgs {
    pub fn overrides(&self, keep_going: bool) -> Overrides {
        Overrides {
            workloads: self.workloads.clone(),
            traffics: self.traffics.clone(),
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            command: self.command.clone(),
            keep_going,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
