/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::errors::ConfigError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

static EXAMPLE_CONFIG: &str = include_str!("templates/merge-matrix.toml");

pub const DEFAULT_CONFIG_PATH: &str = "merge-matrix.toml";

pub const DEFAULT_WORKLOADS: [&str; 6] = [
    "mining_2t_nicehash",
    "mining_4t_nicehash",
    "mining_gpu_nicehash_equihash_1070_60p",
    "mining_gpu_nicehash_equihash_1080ti_85p",
    "mining_gpu_nicehash_equihash_1080ti_100p",
    "browsing",
];

pub const DEFAULT_TRAFFICS: [&str; 4] = ["browsing", "netflix", "youtube", "social-network"];

pub const DEFAULT_MERGE_COMMAND: &str = "python3 merge_datasets.py -i {inputs} -o {output}";

// ******** ******** ********
// **    CONFIGURATION     **
// ******** ******** ********
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub workloads: Vec<String>,
    pub traffics: Vec<String>,
    pub on_failure: FailurePolicy,
    pub layout: Layout,
    pub merge: MergeCommand,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            workloads: DEFAULT_WORKLOADS.iter().map(|s| s.to_string()).collect(),
            traffics: DEFAULT_TRAFFICS.iter().map(|s| s.to_string()).collect(),
            on_failure: FailurePolicy::default(),
            layout: Layout::default(),
            merge: MergeCommand::default(),
        }
    }
}
impl Config {
    /// Writes the annotated example config to `path`. Fails if the file already exists.
    pub fn write_example_to_file(path: &Path) -> anyhow::Result<File> {
        let mut file = File::create_new(path)
            .context(format!("Unable to create {}", path.to_string_lossy()))?;
        file.write_all(EXAMPLE_CONFIG.as_bytes())?;
        Ok(file)
    }

    pub fn try_from_path(path: &Path) -> anyhow::Result<Config> {
        let mut config_str = String::new();
        fs::File::open(path)
            .context(format!("Unable to open {}", path.to_string_lossy()))?
            .read_to_string(&mut config_str)?;
        Config::try_from_str(&config_str)
    }

    pub fn try_from_str(conf_str: &str) -> anyhow::Result<Config> {
        toml::from_str::<Config>(conf_str).map_err(|e| anyhow::anyhow!("TOML parsing error: {}", e))
    }

    /// Loads the config at `path`. Without an explicit path the default config file in the
    /// working directory is used if there is one, otherwise the built-in job matrix.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        match path {
            Some(path) => Config::try_from_path(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    debug!("Loading config from {}", DEFAULT_CONFIG_PATH);
                    Config::try_from_path(default_path)
                } else {
                    debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(workloads) = overrides.workloads {
            self.workloads = workloads;
        }
        if let Some(traffics) = overrides.traffics {
            self.traffics = traffics;
        }
        if let Some(input_dir) = overrides.input_dir {
            self.layout.input_dir = input_dir;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.layout.output_dir = output_dir;
        }
        if let Some(command) = overrides.command {
            self.merge.command = command;
        }
        if overrides.keep_going {
            self.on_failure = FailurePolicy::KeepGoing;
        }
        self
    }

    /// Checks the profile names. Names become file names so they can be neither empty nor
    /// contain a path separator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_names("workloads", &self.workloads)?;
        validate_names("traffics", &self.traffics)
    }
}

fn validate_names(list: &'static str, names: &[String]) -> Result<(), ConfigError> {
    for (position, name) in names.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyName { list, position });
        }
        if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
            return Err(ConfigError::NameWithSeparator {
                list,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Values supplied on the command line which take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub workloads: Option<Vec<String>>,
    pub traffics: Option<Vec<String>>,
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub command: Option<String>,
    pub keep_going: bool,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Serialize, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed merge.
    #[default]
    FailFast,
    /// Run every job and report all failures at the end.
    KeepGoing,
}

#[derive(Debug, Deserialize, PartialEq, Serialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extension: String,
}
impl Default for Layout {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("datasets"),
            output_dir: PathBuf::from("merge-datasets"),
            extension: ".dat".to_string(),
        }
    }
}
impl Layout {
    pub fn input_path(&self, name: &str) -> PathBuf {
        self.input_dir.join(format!("{}{}", name, self.extension))
    }

    pub fn output_path(&self, workload: &str, traffic: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}{}", workload, traffic, self.extension))
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy, Serialize, Default)]
#[serde(tag = "to", rename_all = "lowercase")]
pub enum Redirect {
    Null,
    #[default]
    Parent,
    File,
}

#[derive(Debug, Deserialize, PartialEq, Serialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct MergeCommand {
    pub command: String,
    pub redirect: Redirect,
}
impl Default for MergeCommand {
    fn default() -> Self {
        Self {
            command: DEFAULT_MERGE_COMMAND.to_string(),
            redirect: Redirect::default(),
        }
    }
}
