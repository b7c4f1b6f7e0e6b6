//! The one supported VCS backend (§1: "single supported protocol").
//! `GitRepo` is a capability set over a working directory, implementing the
//! contract of §4.1 by shelling out to the real `git` binary — library
//! bindings (as the teacher's `gix` dependency would give) can't reproduce
//! real hook execution or verbatim subprocess stderr, both of which the
//! contract depends on (§4.1, §7).

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::command::{GitCli, GitOutput, VcsEnv, VcsError};
use super::hooks;
use super::options::{
    CheckoutOptions, CloneOptions, CommitOptions, CreateBranchOptions, DeleteBranchOptions,
    MergeOptions, MergeStrategy, PushOptions, ResetMode,
};

#[derive(Debug, Clone)]
pub struct GitRepo {
    cli: GitCli,
    dir: PathBuf,
}

impl GitRepo {
    pub fn open(dir: impl Into<PathBuf>, env: VcsEnv) -> Self {
        Self {
            cli: GitCli::new(env),
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn env(&self) -> &VcsEnv {
        self.cli.env()
    }

    fn run<I, S>(&self, args: I) -> Result<GitOutput, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.cli.run(&self.dir, args)
    }

    /// `git init <path>`. Free function rather than a method on an existing
    /// `GitRepo` since there is no repository yet.
    pub fn init(path: &Path, env: VcsEnv) -> Result<GitRepo, VcsError> {
        fs::create_dir_all(path).map_err(|source| VcsError::Spawn {
            command: format!("mkdir -p {}", path.display()),
            source,
        })?;
        let cli = GitCli::new(env);
        cli.run(path, ["init"])?;
        Ok(GitRepo {
            cli,
            dir: path.to_path_buf(),
        })
    }

    /// `git clone [--recursive] <url> <path>`.
    pub fn clone_into(
        url: &str,
        path: &Path,
        opts: CloneOptions,
        env: VcsEnv,
    ) -> Result<GitRepo, VcsError> {
        let cli = GitCli::new(env);
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut args: Vec<String> = vec!["clone".into()];
        if opts.recursive {
            args.push("--recursive".into());
        }
        args.push(url.to_string());
        args.push(path.display().to_string());
        cli.run(parent, &args)?;
        Ok(GitRepo {
            cli,
            dir: path.to_path_buf(),
        })
    }

    pub fn current_branch(&self) -> Result<String, VcsError> {
        let out = self.run(["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(out.stdout_trimmed().to_string())
    }

    pub fn current_revision(&self, reference: Option<&str>) -> Result<String, VcsError> {
        let target = reference.unwrap_or("HEAD");
        let out = self.run(["rev-parse", target])?;
        Ok(out.stdout_trimmed().to_string())
    }

    pub fn count_commits(&self, branch: &str, base: Option<&str>) -> Result<u32, VcsError> {
        let range = match base {
            Some(base) => format!("{base}..{branch}"),
            None => branch.to_string(),
        };
        let out = self.run(["rev-list", "--count", &range])?;
        let count = out.stdout_trimmed().parse().unwrap_or(0);
        Ok(count)
    }

    pub fn branch_exists(&self, name: &str) -> Result<bool, VcsError> {
        self.run_status([
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{name}"),
        ])
    }

    fn run_status<I, S>(&self, args: I) -> Result<bool, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.cli.run_status(&self.dir, args)
    }

    pub fn create_branch(&self, name: &str, opts: CreateBranchOptions) -> Result<(), VcsError> {
        let mut args: Vec<String> = vec![if opts.checkout {
            "checkout".into()
        } else {
            "branch".into()
        }];
        if opts.checkout {
            args.push("-b".into());
        }
        args.push(name.to_string());
        if let Some(upstream) = &opts.upstream {
            args.push(upstream.clone());
        }
        self.run(&args)?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str, opts: DeleteBranchOptions) -> Result<(), VcsError> {
        let flag = if opts.force { "-D" } else { "-d" };
        self.run(["branch", flag, name])?;
        Ok(())
    }

    pub fn checkout(&self, reference: &str, opts: CheckoutOptions) -> Result<(), VcsError> {
        let mut args = vec!["checkout"];
        if opts.force {
            args.push("--force");
        }
        args.push(reference);
        self.run(&args)?;
        Ok(())
    }

    pub fn add(&self, path: &Path) -> Result<(), VcsError> {
        self.run(["add", "--", &path.display().to_string()])?;
        Ok(())
    }

    pub fn remove(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        let mut args: Vec<String> = vec!["rm".into(), "--".into()];
        args.extend(paths.iter().map(|p| p.display().to_string()));
        self.run(&args)?;
        Ok(())
    }

    pub fn commit(&self, opts: CommitOptions) -> Result<(), VcsError> {
        let mut args: Vec<String> = vec!["commit".into()];
        if opts.amend {
            args.push("--amend".into());
        }
        if opts.allow_empty {
            args.push("--allow-empty".into());
        }
        if opts.no_verify {
            args.push("--no-verify".into());
        }
        if opts.edit {
            args.push("--edit".into());
        } else {
            args.push("--no-edit".into());
        }
        if let Some(message) = &opts.message {
            args.push("-m".into());
            args.push(message.clone());
        }
        self.run(&args)?;
        Ok(())
    }

    /// `git log <range> --format=<format>`. `range` may be a single
    /// revision or an `a..b` range; each line of stdout is one log record.
    pub fn log(&self, range: &str, format: &str) -> Result<Vec<String>, VcsError> {
        let out = self.run([
            "log",
            "--no-merges",
            "--reverse",
            &format!("--format={format}"),
            range,
        ])?;
        Ok(out
            .stdout
            .split('\n')
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Like `log`, but returns one entry per *commit* even when `format`
    /// spans multiple lines (e.g. `%B`), by separating records with a NUL.
    pub fn log_records(&self, range: &str, format: &str) -> Result<Vec<String>, VcsError> {
        let out = self.run([
            "log",
            "--no-merges",
            "--reverse",
            &format!("--format={format}%x00"),
            range,
        ])?;
        Ok(out
            .stdout
            .split('\0')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn merge(&self, reference: &str, opts: MergeOptions) -> Result<(), VcsError> {
        let mut args: Vec<String> = vec!["merge".into()];
        if opts.squash {
            args.push("--squash".into());
        } else {
            args.push("--no-edit".into());
        }
        if let Some(strategy) = opts.strategy {
            args.push("--strategy".into());
            args.push(
                match strategy {
                    MergeStrategy::Recursive => "recursive",
                    MergeStrategy::Ours => "ours",
                    MergeStrategy::Theirs => "theirs",
                }
                .to_string(),
            );
        }
        args.push(reference.to_string());
        match self.run(&args) {
            Ok(_) => Ok(()),
            Err(err) => {
                if opts.reset_on_failure {
                    let _ = self.reset("HEAD", ResetMode::Hard);
                    let _ = self.run(["merge", "--abort"]);
                }
                Err(err)
            }
        }
    }

    pub fn pull(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.run(["pull", remote, branch])?;
        Ok(())
    }

    pub fn fetch(&self, remote: &str, refspec: Option<&str>) -> Result<(), VcsError> {
        let mut args = vec!["fetch", remote];
        if let Some(refspec) = refspec {
            args.push(refspec);
        }
        self.run(&args)?;
        Ok(())
    }

    pub fn push(&self, remote: &str, refspec: &str, opts: PushOptions) -> Result<(), VcsError> {
        let mut args: Vec<String> = vec!["push".into()];
        if !opts.verify {
            args.push("--no-verify".into());
        }
        args.push(remote.to_string());
        args.push(refspec.to_string());
        self.run(&args)?;
        Ok(())
    }

    pub fn stash(&self) -> Result<bool, VcsError> {
        let before = self.stash_size()?;
        self.run(["stash", "push", "--include-untracked"])?;
        let after = self.stash_size()?;
        Ok(after > before)
    }

    pub fn stash_pop(&self) -> Result<(), VcsError> {
        self.run(["stash", "pop"])?;
        Ok(())
    }

    pub fn stash_size(&self) -> Result<usize, VcsError> {
        let out = self.run(["stash", "list"])?;
        Ok(out.stdout.lines().filter(|l| !l.is_empty()).count())
    }

    pub fn reset(&self, target: &str, mode: ResetMode) -> Result<(), VcsError> {
        self.run(["reset", mode.as_flag(), target])?;
        Ok(())
    }

    pub fn top_level(&self) -> Result<PathBuf, VcsError> {
        let out = self.run(["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.stdout_trimmed()))
    }

    pub fn is_file_committed(&self, path: &Path) -> Result<bool, VcsError> {
        self.run_status(["ls-files", "--error-unmatch", &path.display().to_string()])
    }

    pub fn files_with_uncommitted_changes(&self) -> Result<Vec<PathBuf>, VcsError> {
        let out = self.run(["diff", "--name-only", "HEAD"])?;
        Ok(out.stdout.lines().filter(|l| !l.is_empty()).map(PathBuf::from).collect())
    }

    pub fn untracked_files(&self) -> Result<Vec<PathBuf>, VcsError> {
        let out = self.run(["ls-files", "--others", "--exclude-standard"])?;
        Ok(out.stdout.lines().filter(|l| !l.is_empty()).map(PathBuf::from).collect())
    }

    pub fn remote_url(&self, name: &str) -> Result<String, VcsError> {
        let out = self.run(["remote", "get-url", name])?;
        Ok(out.stdout_trimmed().to_string())
    }

    pub fn set_remote_url(&self, name: &str, url: &str) -> Result<(), VcsError> {
        self.run(["remote", "set-url", name, url])?;
        Ok(())
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), VcsError> {
        self.run(["remote", "add", name, url])?;
        Ok(())
    }

    pub fn version(&self) -> Result<(u32, u32), VcsError> {
        let out = self.cli.run(Path::new("."), ["version"])?;
        let digits: Vec<u32> = out
            .stdout_trimmed()
            .split_whitespace()
            .last()
            .unwrap_or("0.0")
            .split('.')
            .filter_map(|p| p.parse().ok())
            .collect();
        Ok((
            digits.first().copied().unwrap_or(0),
            digits.get(1).copied().unwrap_or(0),
        ))
    }

    /// §4.1: writes an executable commit-msg hook that appends a stable
    /// Change-Id trailer if one is missing.
    pub fn install_commit_msg_hook(&self) -> Result<(), VcsError> {
        self.write_hook("commit-msg", hooks::commit_msg_hook_script())
    }

    pub fn install_pre_push_hook(&self) -> Result<(), VcsError> {
        self.write_hook("pre-push", hooks::pre_push_hook_script())
    }

    fn write_hook(&self, name: &str, contents: &str) -> Result<(), VcsError> {
        let hooks_dir = self.dir.join(".git").join("hooks");
        fs::create_dir_all(&hooks_dir).map_err(|source| VcsError::Spawn {
            command: format!("mkdir -p {}", hooks_dir.display()),
            source,
        })?;
        let path = hooks_dir.join(name);
        fs::write(&path, contents).map_err(|source| VcsError::Spawn {
            command: format!("write {}", path.display()),
            source,
        })?;
        let mut perms = fs::metadata(&path)
            .map_err(|source| VcsError::Spawn {
                command: format!("stat {}", path.display()),
                source,
            })?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).map_err(|source| VcsError::Spawn {
            command: format!("chmod {}", path.display()),
            source,
        })?;
        Ok(())
    }

    /// `git diff --quiet a b`: true when the trees are byte-identical. Used
    /// by the CL pipeline's cleanup step, which must identify a merged
    /// branch by content rather than ancestry since squash-pushes produce a
    /// commit with no merge-base relationship to the local branch (§4.7).
    pub fn content_matches(&self, a: &str, b: &str) -> Result<bool, VcsError> {
        self.run_status(["diff", "--quiet", a, b])
    }
}
