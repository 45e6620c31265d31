//! Artifact publication.
//!
//! The build directory doubles as a git work tree: a repository embedded in
//! it carries the publish branch. Each run snapshots the directory into a
//! tree, commits only when that tree differs from the branch head, and
//! pushes the branch when a URL is configured. Paths matching
//! `[publish.exclude]` never enter the tree.

use super::{PipelineContext, StepOutcome};
use crate::log;
use crate::utils::{git, pattern::PathMatcher};
use anyhow::{Result, bail};

pub fn run(ctx: &mut PipelineContext) -> Result<StepOutcome> {
    let config = ctx.config;
    let branch = &config.publish.branch;
    let artifact = ctx.workdir.join(&config.docs.build);

    if !artifact.is_dir() {
        bail!("Build output `{}` not found", artifact.display());
    }

    let repo = git::ensure_branch_repo(&artifact, branch)?;
    let matcher = PathMatcher::from_patterns(&config.publish.exclude);
    let tree_id = git::write_dir_tree(&repo, &artifact, &matcher)?;
    let unchanged = git::branch_tree_id(&repo, branch)? == Some(tree_id);

    if ctx.dry_run {
        if unchanged {
            log!("publish"; "dry run: output already matches `{branch}`");
        } else {
            match config.publish_url() {
                Some(url) => {
                    log!("publish"; "dry run: would commit to `{branch}` and push to {url}");
                }
                None => log!("publish"; "dry run: would commit to `{branch}`, no push URL configured"),
            }
        }
        return Ok(StepOutcome::Completed);
    }

    if unchanged {
        log!("publish"; "output matches `{branch}`, nothing to commit");
        return Ok(StepOutcome::Unchanged);
    }

    let message = match &ctx.revision {
        Some(revision) => format!("docs: deploy {revision}"),
        None => "docs: deploy (manual)".to_owned(),
    };
    let commit_id = git::commit_tree(&repo, &format!("refs/heads/{branch}"), &message, tree_id)?;
    log!("publish"; "commit {} on `{}`", super::short_hex(&commit_id), branch);

    match config.publish_url() {
        Some(url) => git::push(&repo, url, &config.publish)?,
        None => log!("publish"; "no push URL configured, `{branch}` stays local"),
    }

    Ok(StepOutcome::Completed)
}
