//! Source checkout.
//!
//! Remote mode keeps a mirror of the source repository under
//! `.docship/checkout` and pins it to the remote tip of the triggering
//! branch. In-place mode verifies the project root is a git work tree and
//! leaves it alone. Both modes bring nested repositories (submodules) to
//! their recorded revisions afterwards.

use super::{PipelineContext, StepOutcome, short_hex};
use crate::utils::exec::FilterRule;
use crate::utils::git;
use crate::{exec, log};
use anyhow::{Context, Result, bail};
use std::fs;

/// git narrates clones and fetches on stderr even when everything is fine.
const GIT_FILTER: FilterRule = FilterRule::new(&[
    "Cloning into",
    "remote:",
    "Receiving objects",
    "Resolving deltas",
    "Updating files",
    "From ",
]);

pub fn run(ctx: &mut PipelineContext) -> Result<StepOutcome> {
    let config = ctx.config;

    match &config.checkout.url {
        Some(url) => checkout_remote(ctx, url)?,
        None => verify_in_place(ctx)?,
    }

    update_submodules(ctx)?;

    let repo = git::open_repo(&ctx.workdir)?;
    if let Some(revision) = git::head_revision(&repo)? {
        let short = short_hex(&revision);
        log!("checkout"; "work tree at {short}");
        ctx.revision = Some(short);
    }

    Ok(StepOutcome::Completed)
}

/// Clone on the first run, fetch afterwards, then hard-update the work tree
/// to `origin/<branch>`. Build output and other untracked state survive the
/// update; `--fresh` exists for a clean slate.
fn checkout_remote(ctx: &mut PipelineContext, url: &str) -> Result<()> {
    let dir = ctx.workdir.clone();
    let cached = dir.join(".git").exists();

    if cached {
        log!("checkout"; "fetching origin");
        exec!(filter=&GIT_FILTER; &dir; ["git"]; "fetch", "--prune", "origin")?;
    } else {
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create `{}`", parent.display()))?;
        }
        log!("checkout"; "cloning {url}");
        match &ctx.event_ref {
            Some(event_ref) => {
                exec!(filter=&GIT_FILTER; ["git"]; "clone", "--branch", event_ref, url, dir.clone())?
            }
            None => exec!(filter=&GIT_FILTER; ["git"]; "clone", url, dir.clone())?,
        };
    }

    // Without --ref the branch becomes known only now
    let event_ref = match ctx.event_ref.clone() {
        Some(event_ref) => event_ref,
        None if cached => {
            // The remote's default branch can move between runs; ask it
            let output = exec!(&dir; ["git"]; "ls-remote", "--symref", "origin", "HEAD")?;
            let branch = parse_symref_head(&String::from_utf8_lossy(&output.stdout))?;
            log!("checkout"; "remote HEAD is `{branch}`");
            ctx.event_ref = Some(branch.clone());
            branch
        }
        None => {
            let repo = git::open_repo(&dir)?;
            let branch =
                git::head_branch(&repo)?.context("Cloned repository has a detached HEAD")?;
            ctx.event_ref = Some(branch.clone());
            branch
        }
    };

    exec!(&dir; ["git"]; "checkout", "-q", "-B", &event_ref, format!("origin/{event_ref}"))?;
    Ok(())
}

/// In-place runs build whatever the work tree holds; the only requirements
/// are that it is a repository and, when an explicit ref was given, that the
/// work tree is actually on that branch.
fn verify_in_place(ctx: &PipelineContext) -> Result<()> {
    let repo = git::open_repo(&ctx.workdir)
        .with_context(|| format!("`{}` is not a git work tree", ctx.workdir.display()))?;

    if let Some(event_ref) = &ctx.event_ref
        && let Some(branch) = git::head_branch(&repo)?
        && branch != *event_ref
    {
        bail!("Work tree is on `{branch}` but the event names `{event_ref}`");
    }

    Ok(())
}

fn update_submodules(ctx: &PipelineContext) -> Result<()> {
    if !ctx.config.checkout.submodules || !ctx.workdir.join(".gitmodules").exists() {
        return Ok(());
    }

    log!("checkout"; "updating nested repositories");
    exec!(filter=&GIT_FILTER; &ctx.workdir; ["git"]; "submodule", "update", "--init", "--recursive")?;
    Ok(())
}

/// Parse `git ls-remote --symref origin HEAD` output, e.g.
/// `ref: refs/heads/main HEAD`.
fn parse_symref_head(output: &str) -> Result<String> {
    output
        .lines()
        .find_map(|line| {
            let rest = line.strip_prefix("ref:")?.trim();
            let name = rest.split_whitespace().next()?;
            Some(name.strip_prefix("refs/heads/").unwrap_or(name).to_string())
        })
        .context("Remote did not report a HEAD branch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::path::Path;
    use std::process::Command;

    fn make_ctx(root: &Path, url: Option<&str>) -> PipelineContext {
        let mut config = PipelineConfig::default();
        config.checkout.url = url.map(str::to_string);
        config.set_root(root);
        let config: &'static PipelineConfig = Box::leak(Box::new(config));
        PipelineContext::new(config, config.workdir())
    }

    /// A local origin repository with one commit on `master`.
    fn make_origin(dir: &Path) -> String {
        git::create_repo(dir).unwrap();
        for args in [
            vec!["symbolic-ref", "HEAD", "refs/heads/master"],
            vec!["config", "user.name", "docship"],
            vec!["config", "user.email", "docship@localhost"],
        ] {
            Command::new("git")
                .args(&args)
                .current_dir(dir)
                .status()
                .unwrap();
        }
        std::fs::write(dir.join("README.md"), "docs project").unwrap();
        let repo = git::open_repo(dir).unwrap();
        git::commit_all(&repo, "initial commit").unwrap();
        dir.to_str().unwrap().to_string()
    }

    #[test]
    fn test_parse_symref_head() {
        let output = "ref: refs/heads/main\tHEAD\n1234abcd\tHEAD\n";
        assert_eq!(parse_symref_head(output).unwrap(), "main");

        let output = "ref: refs/heads/docs/site\tHEAD\n";
        assert_eq!(parse_symref_head(output).unwrap(), "docs/site");

        assert!(parse_symref_head("1234abcd\tHEAD\n").is_err());
        assert!(parse_symref_head("").is_err());
    }

    #[test]
    fn test_clone_then_update() {
        let origin_dir = tempfile::tempdir().unwrap();
        let runner_dir = tempfile::tempdir().unwrap();
        let url = make_origin(origin_dir.path());

        let mut ctx = make_ctx(runner_dir.path(), Some(&url));
        ctx.event_ref = Some("master".into());

        // First run clones
        let outcome = run(&mut ctx).unwrap();
        assert!(matches!(outcome, StepOutcome::Completed));
        assert!(ctx.workdir.join("README.md").exists());
        let first_revision = ctx.revision.clone().unwrap();

        // Push a new commit to the origin
        std::fs::write(origin_dir.path().join("CHANGES.md"), "more").unwrap();
        let origin = git::open_repo(origin_dir.path()).unwrap();
        git::commit_all(&origin, "second commit").unwrap();

        // Second run fetches and hard-updates
        let outcome = run(&mut ctx).unwrap();
        assert!(matches!(outcome, StepOutcome::Completed));
        assert!(ctx.workdir.join("CHANGES.md").exists());
        assert_ne!(ctx.revision.unwrap(), first_revision);
    }

    #[test]
    fn test_clone_without_ref_resolves_default_branch() {
        let origin_dir = tempfile::tempdir().unwrap();
        let runner_dir = tempfile::tempdir().unwrap();
        let url = make_origin(origin_dir.path());

        let mut ctx = make_ctx(runner_dir.path(), Some(&url));
        let outcome = run(&mut ctx).unwrap();

        assert!(matches!(outcome, StepOutcome::Completed));
        assert_eq!(ctx.event_ref.as_deref(), Some("master"));
    }

    #[test]
    fn test_in_place_requires_repository() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path(), None);

        let err = run(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("not a git work tree"));
    }

    #[test]
    fn test_in_place_branch_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        git::create_repo(dir.path()).unwrap();
        Command::new("git")
            .args(["symbolic-ref", "HEAD", "refs/heads/master"])
            .current_dir(dir.path())
            .status()
            .unwrap();

        let mut ctx = make_ctx(dir.path(), None);
        ctx.event_ref = Some("docs".into());

        let err = run(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("Work tree is on `master`"));
    }
}
