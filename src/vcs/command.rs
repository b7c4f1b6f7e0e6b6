//! Subprocess plumbing shared by every git operation. Captures stdout and
//! stderr in full so a failing command's error carries the original
//! invocation and its stderr verbatim (§4.1, §7 `VcsCommandFailed`).

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        stdout: String,
        stderr: String,
    },

    #[error("output of `{command}` was not valid UTF-8")]
    NonUtf8 { command: String },
}

/// Author/committer date overrides and the editor to forward to subprocess
/// environments (§6). Built once per logical operation rather than read
/// from `std::env` at every call site, per §9's "Context object" note;
/// `with_dates` produces a scoped copy for the one commit that needs it.
#[derive(Debug, Clone, Default)]
pub struct VcsEnv {
    pub editor: Option<String>,
    pub author_date: Option<String>,
    pub committer_date: Option<String>,
}

impl VcsEnv {
    pub fn from_process_env() -> Self {
        Self {
            editor: std::env::var(crate::paths::EDITOR_ENV).ok(),
            author_date: std::env::var("GIT_AUTHOR_DATE").ok(),
            committer_date: std::env::var("GIT_COMMITTER_DATE").ok(),
        }
    }

    pub fn with_dates(&self, author_date: Option<String>, committer_date: Option<String>) -> Self {
        Self {
            editor: self.editor.clone(),
            author_date: author_date.or_else(|| self.author_date.clone()),
            committer_date: committer_date.or_else(|| self.committer_date.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// A thin wrapper over invoking the `git` binary in a given directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
    env: VcsEnv,
}

impl GitCli {
    pub fn new(env: VcsEnv) -> Self {
        Self {
            binary: PathBuf::from("git"),
            env,
        }
    }

    pub fn env(&self) -> &VcsEnv {
        &self.env
    }

    /// Run a git subcommand, returning its captured output on success or a
    /// `VcsError::CommandFailed` carrying the exact command line and stderr
    /// on a non-zero exit.
    pub fn run<I, S>(&self, cwd: &Path, args: I) -> Result<GitOutput, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let owned_args: Vec<OsString> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();

        let mut command = Command::new(&self.binary);
        command.current_dir(cwd);
        command.args(&owned_args);
        if let Some(editor) = &self.env.editor {
            command.env(crate::paths::EDITOR_ENV, editor);
        }
        if let Some(date) = &self.env.author_date {
            command.env("GIT_AUTHOR_DATE", date);
        }
        if let Some(date) = &self.env.committer_date {
            command.env("GIT_COMMITTER_DATE", date);
        }

        let rendered = render_command(&self.binary, &owned_args);
        let output = command.output().map_err(|source| VcsError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| VcsError::NonUtf8 {
                command: rendered.clone(),
            })?;
        let stderr = String::from_utf8(output.stderr)
            .map_err(|_| VcsError::NonUtf8 {
                command: rendered.clone(),
            })?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command: rendered,
                stdout,
                stderr,
            });
        }

        Ok(GitOutput { stdout, stderr })
    }

    /// Like `run`, but a non-zero exit is reported as `Ok(false)` instead of
    /// an error. Used for probes such as `git diff --quiet`.
    pub fn run_status<I, S>(&self, cwd: &Path, args: I) -> Result<bool, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        match self.run(cwd, args) {
            Ok(_) => Ok(true),
            Err(VcsError::CommandFailed { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }
}

fn render_command(binary: &Path, args: &[OsString]) -> String {
    let mut rendered = binary.to_string_lossy().into_owned();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}
