//! End-to-end scenario (§8 #5): a stacked pair of review branches where
//! mailing the dependent branch first hits a real merge conflict against
//! its ancestor, and succeeds once the conflict is resolved by hand,
//! driven against a real local git remote.

use std::fs;
use std::path::Path;
use std::process::Command;

use jirust::cl::{self, MailConfig, PresubmitMode};
use jirust::vcs::{CommitOptions, GitRepo, VcsEnv};

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git available");
    assert!(status.success(), "git {:?} failed in {:?}", args, dir);
}

fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]);
    git(
        dir,
        &["-c", "user.email=t@example.com", "-c", "user.name=t", "commit", "-m", message],
    );
}

fn read_ref_file(bare_repo: &Path, reference: &str, file: &str) -> String {
    let output = Command::new("git")
        .args(["show", &format!("{reference}:{file}")])
        .current_dir(bare_repo)
        .output()
        .expect("git available");
    assert!(output.status.success(), "{:?}", output);
    String::from_utf8(output.stdout).unwrap()
}

fn mail_config(remote: &Path) -> MailConfig {
    MailConfig {
        autosubmit: false,
        ccs: vec![],
        draft: false,
        presubmit: PresubmitMode::All,
        remote: remote.to_string_lossy().into_owned(),
        remote_branch: "master".to_string(),
        reviewers: vec![],
        set_topic: false,
        topic: None,
        verify: false,
        check_uncommitted: true,
    }
}

#[test]
fn conflicting_stacked_branches_resolve_and_push_combined_change() {
    let workdir = tempfile::tempdir().unwrap();

    let remote = workdir.path().join("review.git");
    fs::create_dir_all(&remote).unwrap();
    git(&remote, &["init", "--bare", "--initial-branch=master"]);

    let project_dir = workdir.path().join("project");
    git(
        workdir.path(),
        &["clone", remote.to_str().unwrap(), project_dir.to_str().unwrap()],
    );
    fs::write(project_dir.join("f"), "base\n").unwrap();
    commit_all(&project_dir, "init");
    git(&project_dir, &["push", "origin", "master"]);

    let env = VcsEnv::default();
    let repo = GitRepo::open(project_dir.clone(), env.clone());
    repo.install_commit_msg_hook().unwrap();

    // B branches from master and commits one change to `f`.
    cl::new_branch(&repo, &project_dir, "feature-b", "master").unwrap();
    fs::write(project_dir.join("f"), "base\nb-line-1\n").unwrap();
    commit_all(&project_dir, "b1");

    // A is stacked on top of B (chain: master -> feature-b -> feature-a)
    // and makes its own edit to the same line B will later revise.
    cl::new_branch(&repo, &project_dir, "feature-a", "master").unwrap();
    fs::write(project_dir.join("f"), "base\na-line-1\n").unwrap();
    commit_all(&project_dir, "a1");

    // B gets a follow-up commit that conflicts with A's edit to the same
    // line, after A has already branched off B's first commit.
    repo.checkout("feature-b", Default::default()).unwrap();
    fs::write(project_dir.join("f"), "base\nb-line-2\n").unwrap();
    commit_all(&project_dir, "b2");

    let config = mail_config(&remote);

    cl::mail(&repo, &project_dir, "master", &config).expect("B mails cleanly");

    repo.checkout("feature-a", Default::default()).unwrap();
    let err = cl::sync(&repo, &project_dir, "feature-a").expect_err("B and A conflict on `f`");
    assert!(matches!(err, cl::ClError::MergeConflict { .. }), "{err:?}");

    // Manual conflict resolution: combine both sides and finish the merge
    // commit that `sync` left in progress.
    fs::write(project_dir.join("f"), "base\na-line-1\nb-line-2\n").unwrap();
    repo.add(Path::new("f")).unwrap();
    repo.commit(CommitOptions {
        message: Some("resolve f".to_string()),
        amend: false,
        allow_empty: false,
        no_verify: false,
        edit: false,
    })
    .unwrap();

    cl::mail(&repo, &project_dir, "master", &config).expect("A mails after resolution");

    let pushed = read_ref_file(&remote, "refs/for/master", "f");
    assert!(pushed.contains("a-line-1"), "missing A's change: {pushed:?}");
    assert!(pushed.contains("b-line-2"), "missing B's change: {pushed:?}");
}
