/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{
    config::{MergeCommand, Redirect},
    errors::{ConfigError, MergeError},
    execution_plan::Job,
};
use colored::*;
use std::{
    borrow::Cow,
    fs::OpenOptions,
    path::{Path, PathBuf},
};
use subprocess::{Exec, ExitStatus, NullFile, Redirection};
use tracing::debug;

const INPUTS: &str = "{inputs}";

/// Something that can merge the two input datasets of a job into its output file.
///
/// The call blocks until the merge has finished.
pub trait MergeCollaborator {
    fn merge(&mut self, job: &Job) -> Result<(), MergeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    InputA,
    InputB,
    Output,
    Workload,
    Traffic,
}
impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "input_a" => Some(Self::InputA),
            "input_b" => Some(Self::InputB),
            "output" => Some(Self::Output),
            "workload" => Some(Self::Workload),
            "traffic" => Some(Self::Traffic),
            _ => None,
        }
    }

    fn value(self, job: &Job) -> Cow<'_, str> {
        match self {
            Self::InputA => job.input_a.to_string_lossy(),
            Self::InputB => job.input_b.to_string_lossy(),
            Self::Output => job.output.to_string_lossy(),
            Self::Workload => Cow::Borrowed(job.workload.as_str()),
            Self::Traffic => Cow::Borrowed(job.traffic.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Word {
    /// `{inputs}` on its own, expands to two arguments.
    Inputs,
    Parts(Vec<Segment>),
}

/// A merge command split into POSIX words, each word already split into literal text and
/// placeholders. Braces around anything that is not a placeholder name are kept as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    words: Vec<Word>,
}
impl CommandTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        // break command string into POSIX words
        let words =
            shlex::split(template).ok_or_else(|| ConfigError::InvalidCommand(template.to_string()))?;
        if words.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }

        let mut parsed = Vec::with_capacity(words.len());
        for word in words {
            if word == INPUTS {
                parsed.push(Word::Inputs);
            } else if word.contains(INPUTS) {
                return Err(ConfigError::EmbeddedInputs(word));
            } else {
                parsed.push(Word::Parts(segments(&word)));
            }
        }

        Ok(Self { words: parsed })
    }

    /// Substitutes the job's paths and names into the template in a single pass, so values
    /// containing braces are never substituted again. A word that is exactly `{inputs}`
    /// becomes two arguments.
    pub fn expand(&self, job: &Job) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.words.len() + 1);
        for word in self.words.iter() {
            match word {
                Word::Inputs => {
                    argv.push(job.input_a.to_string_lossy().to_string());
                    argv.push(job.input_b.to_string_lossy().to_string());
                }
                Word::Parts(parts) => {
                    let mut expanded = String::new();
                    for part in parts {
                        match part {
                            Segment::Text(text) => expanded.push_str(text),
                            Segment::Slot(placeholder) => expanded.push_str(&placeholder.value(job)),
                        }
                    }
                    argv.push(expanded);
                }
            }
        }
        argv
    }
}

/// Splits a word into text and known `{name}` placeholders.
fn segments(word: &str) -> Vec<Segment> {
    let mut parts = vec![];
    let mut text = String::new();
    let mut rest = word;
    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let slot = after
            .find('}')
            .and_then(|close| Placeholder::from_name(&after[..close]).map(|p| (p, close)));
        match slot {
            Some((placeholder, close)) => {
                if !text.is_empty() {
                    parts.push(Segment::Text(std::mem::take(&mut text)));
                }
                parts.push(Segment::Slot(placeholder));
                rest = &after[close + 1..];
            }
            None => {
                text.push('{');
                rest = after;
            }
        }
    }
    text.push_str(rest);
    if !text.is_empty() {
        parts.push(Segment::Text(text));
    }
    parts
}

/// Runs the configured merge command as a child process and waits for it.
#[derive(Debug)]
pub struct ProcessCollaborator {
    template: CommandTemplate,
    redirect: Redirect,
    log_dir: PathBuf,
}
impl ProcessCollaborator {
    pub fn new(merge: &MergeCommand) -> Result<Self, ConfigError> {
        Ok(Self {
            template: CommandTemplate::parse(&merge.command)?,
            redirect: merge.redirect,
            log_dir: PathBuf::from("."),
        })
    }

    /// Directory receiving `.stdout` and `.stderr` when output is redirected to files.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }
}
impl MergeCollaborator for ProcessCollaborator {
    fn merge(&mut self, job: &Job) -> Result<(), MergeError> {
        let argv = self.template.expand(job);
        debug!("Running merge command {:?}", argv);
        run_command(&argv, self.redirect, &self.log_dir)
    }
}

/// Runs the given command and blocks until it exits.
///
/// # Arguments
///
/// * argv - Program followed by its arguments.
/// * redirect - Where the child's stdout and stderr go.
/// * log_dir - Where the `.stdout` and `.stderr` files live for [`Redirect::File`].
fn run_command(argv: &[String], redirect: Redirect, log_dir: &Path) -> Result<(), MergeError> {
    match argv {
        [command, args @ ..] => {
            let exec = Exec::cmd(command).args(args);

            let exec = match redirect {
                Redirect::Null => exec.stdout(NullFile).stderr(NullFile),
                Redirect::Parent => exec,
                Redirect::File => {
                    let out_file = OpenOptions::new()
                        .append(true)
                        .create(true)
                        .open(log_dir.join(".stdout"))
                        .map_err(|e| MergeError::Redirect(e.to_string()))?;
                    let err_file = OpenOptions::new()
                        .append(true)
                        .create(true)
                        .open(log_dir.join(".stderr"))
                        .map_err(|e| MergeError::Redirect(e.to_string()))?;
                    exec.stdout(Redirection::File(out_file))
                        .stderr(Redirection::File(err_file))
                }
            };

            let status = exec.join().map_err(|e| MergeError::Spawn {
                program: command.clone(),
                reason: e.to_string(),
            })?;

            match status {
                ExitStatus::Exited(0) => Ok(()),
                ExitStatus::Exited(code) => Err(MergeError::Exited {
                    program: command.clone(),
                    code,
                }),
                ExitStatus::Signaled(signal) => Err(MergeError::Signaled {
                    program: command.clone(),
                    signal,
                }),
                other => Err(MergeError::Abnormal {
                    program: command.clone(),
                    detail: format!("{:?}", other),
                }),
            }
        }
        [] => Err(MergeError::EmptyCommand),
    }
}

/// Prints the command each job would run instead of running it.
#[derive(Debug)]
pub struct DryRunCollaborator {
    template: CommandTemplate,
    commands: Vec<Vec<String>>,
}
impl DryRunCollaborator {
    pub fn new(merge: &MergeCommand) -> Result<Self, ConfigError> {
        Ok(Self {
            template: CommandTemplate::parse(&merge.command)?,
            commands: vec![],
        })
    }

    pub fn commands(&self) -> &[Vec<String>] {
        &self.commands
    }
}
impl MergeCollaborator for DryRunCollaborator {
    fn merge(&mut self, job: &Job) -> Result<(), MergeError> {
        let argv = self.template.expand(job);
        let line = shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "));
        println!("\t{}", format!("- {}", line).bright_black());
        self.commands.push(argv);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;

    fn job(workload: &str, traffic: &str) -> Job {
        Job::new(0, workload, traffic, &Layout::default())
    }

    #[test]
    fn inputs_placeholder_expands_to_two_arguments() -> anyhow::Result<()> {
        let template = CommandTemplate::parse("python3 merge_datasets.py -i {inputs} -o {output}")?;
        let argv = template.expand(&job("mining_2t_nicehash", "browsing"));

        assert_eq!(
            argv,
            vec![
                "python3",
                "merge_datasets.py",
                "-i",
                "datasets/mining_2t_nicehash.dat",
                "datasets/browsing.dat",
                "-o",
                "merge-datasets/mining_2t_nicehash_browsing.dat",
            ]
        );
        Ok(())
    }

    #[test]
    fn placeholders_inside_words_are_substituted() -> anyhow::Result<()> {
        let template = CommandTemplate::parse("merge --a={input_a} --b={input_b} --tag '{workload} x {traffic}'")?;
        let argv = template.expand(&job("netflix", "youtube"));

        assert_eq!(argv[1], "--a=datasets/netflix.dat");
        assert_eq!(argv[2], "--b=datasets/youtube.dat");
        assert_eq!(argv[4], "netflix x youtube");
        Ok(())
    }

    #[test]
    fn quoted_paths_stay_single_arguments() -> anyhow::Result<()> {
        let layout = Layout {
            input_dir: "my data".into(),
            ..Layout::default()
        };
        let template = CommandTemplate::parse("merge {inputs}")?;
        let argv = template.expand(&Job::new(0, "a", "b", &layout));

        assert_eq!(argv, vec!["merge", "my data/a.dat", "my data/b.dat"]);
        Ok(())
    }

    #[test]
    fn bad_templates_are_rejected() {
        assert_eq!(CommandTemplate::parse(""), Err(ConfigError::EmptyCommand));
        assert!(matches!(
            CommandTemplate::parse("merge 'unclosed"),
            Err(ConfigError::InvalidCommand(_))
        ));
        assert!(matches!(
            CommandTemplate::parse("merge --in={inputs}"),
            Err(ConfigError::EmbeddedInputs(_))
        ));
    }

    #[test]
    fn names_containing_placeholders_are_not_substituted_twice() -> anyhow::Result<()> {
        let template = CommandTemplate::parse("merge {input_a} {traffic} -o {output}")?;
        let argv = template.expand(&job("w{traffic}", "netflix"));

        assert_eq!(
            argv,
            vec![
                "merge",
                "datasets/w{traffic}.dat",
                "netflix",
                "-o",
                "merge-datasets/w{traffic}_netflix.dat",
            ]
        );
        Ok(())
    }

    #[test]
    fn braces_that_are_not_placeholders_are_kept() -> anyhow::Result<()> {
        let template =
            CommandTemplate::parse(r#"sh -c 'awk "{print}" "$1" "$2" > "$3"' sh {inputs} {output}"#)?;
        let argv = template.expand(&job("browsing", "netflix"));

        assert_eq!(argv[2], r#"awk "{print}" "$1" "$2" > "$3""#);
        assert_eq!(argv.len(), 7);

        let template = CommandTemplate::parse("merge {x}{output}{ {workload}}")?;
        let argv = template.expand(&job("browsing", "netflix"));
        assert_eq!(argv[1], "{x}merge-datasets/browsing_netflix.dat{ browsing}");
        Ok(())
    }

    #[test]
    fn dry_run_records_without_running() -> anyhow::Result<()> {
        let mut dry_run = DryRunCollaborator::new(&MergeCommand {
            command: "definitely-not-a-program {inputs} {output}".to_string(),
            redirect: Redirect::Null,
        })?;

        dry_run.merge(&job("browsing", "netflix"))?;

        assert_eq!(dry_run.commands().len(), 1);
        assert_eq!(dry_run.commands()[0][0], "definitely-not-a-program");
        Ok(())
    }

    #[cfg(target_family = "unix")]
    mod unix {
        use super::*;
        use std::fs;

        fn collaborator(command: &str) -> ProcessCollaborator {
            ProcessCollaborator::new(&MergeCommand {
                command: command.to_string(),
                redirect: Redirect::Null,
            })
            .expect("template should parse")
        }

        #[test]
        fn successful_command_is_ok() -> anyhow::Result<()> {
            collaborator("true").merge(&job("browsing", "netflix"))?;
            Ok(())
        }

        #[test]
        fn non_zero_exit_is_reported() {
            let res = collaborator("sh -c 'exit 3'").merge(&job("browsing", "netflix"));
            assert_eq!(
                res,
                Err(MergeError::Exited {
                    program: "sh".to_string(),
                    code: 3
                })
            );
        }

        #[test]
        fn missing_program_is_a_spawn_error() {
            let res = collaborator("merge-matrix-no-such-program {inputs}").merge(&job("a", "b"));
            assert!(matches!(res, Err(MergeError::Spawn { .. })));
        }

        #[test]
        fn command_receives_job_paths() -> anyhow::Result<()> {
            let dir = tempfile::tempdir()?;
            let layout = Layout {
                input_dir: dir.path().join("datasets"),
                output_dir: dir.path().join("merge-datasets"),
                extension: ".dat".to_string(),
            };
            fs::create_dir_all(&layout.input_dir)?;
            fs::create_dir_all(&layout.output_dir)?;
            fs::write(layout.input_path("mining_2t_nicehash"), "1 2 3 4\n")?;
            fs::write(layout.input_path("browsing"), "5 6 7 8\n")?;

            let job = Job::new(0, "mining_2t_nicehash", "browsing", &layout);
            collaborator(r#"sh -c 'cat "$1" "$2" > "$3"' sh {inputs} {output}"#).merge(&job)?;

            assert_eq!(fs::read_to_string(&job.output)?, "1 2 3 4\n5 6 7 8\n");
            Ok(())
        }

        #[test]
        fn missing_input_surfaces_as_exit_failure() -> anyhow::Result<()> {
            let dir = tempfile::tempdir()?;
            let layout = Layout {
                input_dir: dir.path().join("datasets"),
                output_dir: dir.path().to_path_buf(),
                extension: ".dat".to_string(),
            };

            let job = Job::new(0, "youtube", "netflix", &layout);
            let res = collaborator(r#"sh -c 'cat "$1" "$2" > "$3"' sh {inputs} {output}"#).merge(&job);

            assert!(matches!(res, Err(MergeError::Exited { .. })));
            Ok(())
        }

        #[test]
        fn killed_command_is_reported_as_signaled() {
            let res = collaborator("sh -c 'kill -9 $$'").merge(&job("browsing", "netflix"));
            assert_eq!(
                res,
                Err(MergeError::Signaled {
                    program: "sh".to_string(),
                    signal: 9
                })
            );
        }

        #[test]
        fn file_redirect_appends_to_log_files() -> anyhow::Result<()> {
            let dir = tempfile::tempdir()?;
            let mut collaborator = ProcessCollaborator::new(&MergeCommand {
                command: "sh -c 'echo out $1; echo err $1 >&2' sh {workload}".to_string(),
                redirect: Redirect::File,
            })?
            .with_log_dir(dir.path());

            collaborator.merge(&job("browsing", "netflix"))?;
            collaborator.merge(&job("youtube", "netflix"))?;

            assert_eq!(
                fs::read_to_string(dir.path().join(".stdout"))?,
                "out browsing\nout youtube\n"
            );
            assert_eq!(
                fs::read_to_string(dir.path().join(".stderr"))?,
                "err browsing\nerr youtube\n"
            );
            Ok(())
        }

        #[test]
        fn unwritable_log_dir_is_a_redirect_error() {
            let mut to_files = collaborator("true").with_log_dir("/nonexistent/merge-matrix");
            to_files.redirect = Redirect::File;

            let res = to_files.merge(&job("browsing", "netflix"));
            assert!(matches!(res, Err(MergeError::Redirect(_))));
        }
    }
}
