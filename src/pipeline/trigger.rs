//! Trigger filtering.
//!
//! Decides whether the pushed branch starts the pipeline at all. A
//! non-matching branch halts the run successfully: most pushes to a busy
//! repository are not documentation pushes.

use super::{PipelineContext, StepOutcome};
use crate::log;
use crate::utils::{git, pattern::PatternSet};
use anyhow::{Context, Result};

/// Resolve the branch this run is about and match it against
/// `[trigger] branches`.
pub fn run(ctx: &mut PipelineContext) -> Result<StepOutcome> {
    let Some(event_ref) = resolve_event_ref(ctx)? else {
        return Ok(StepOutcome::SkipRun(
            "HEAD is detached, no branch to match".into(),
        ));
    };

    let patterns = PatternSet::new(&ctx.config.trigger.branches);
    if !patterns.matches(&event_ref) {
        return Ok(StepOutcome::SkipRun(format!(
            "branch `{event_ref}` does not match [trigger.branches], nothing to do"
        )));
    }

    log!("trigger"; "branch `{event_ref}` matches");
    ctx.event_ref = Some(event_ref);
    Ok(StepOutcome::Completed)
}

/// The explicit `--ref` when given, otherwise the HEAD branch of the work
/// tree. For remote runs without `--ref` the checkout step has already
/// resolved the branch by the time this runs.
fn resolve_event_ref(ctx: &PipelineContext) -> Result<Option<String>> {
    if let Some(event_ref) = &ctx.event_ref {
        return Ok(Some(normalize_ref(event_ref)));
    }

    let repo = git::open_repo(&ctx.workdir)
        .with_context(|| format!("`{}` is not a git work tree", ctx.workdir.display()))?;
    git::head_branch(&repo)
}

/// Hooks often hand over the full ref name; patterns match the short
/// branch name.
fn normalize_ref(event_ref: &str) -> String {
    event_ref
        .strip_prefix("refs/heads/")
        .unwrap_or(event_ref)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::path::Path;
    use std::process::Command;

    fn make_ctx(root: &Path, branches: &[&str]) -> PipelineContext {
        let mut config = PipelineConfig::default();
        config.trigger.branches = branches.iter().map(|s| (*s).to_string()).collect();
        config.set_root(root);
        let config: &'static PipelineConfig = Box::leak(Box::new(config));
        PipelineContext::new(config, config.workdir())
    }

    #[test]
    fn test_normalize_ref() {
        assert_eq!(normalize_ref("master"), "master");
        assert_eq!(normalize_ref("refs/heads/master"), "master");
        assert_eq!(normalize_ref("refs/heads/docs/sphinx"), "docs/sphinx");
        // Tags are not branches; leave them alone and let matching reject them
        assert_eq!(normalize_ref("refs/tags/v1.0"), "refs/tags/v1.0");
    }

    #[test]
    fn test_explicit_ref_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path(), &["master"]);
        ctx.event_ref = Some("master".into());

        let outcome = run(&mut ctx).unwrap();
        assert!(matches!(outcome, StepOutcome::Completed));
        assert_eq!(ctx.event_ref.as_deref(), Some("master"));
    }

    #[test]
    fn test_full_ref_is_normalized_before_matching() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path(), &["master"]);
        ctx.event_ref = Some("refs/heads/master".into());

        let outcome = run(&mut ctx).unwrap();
        assert!(matches!(outcome, StepOutcome::Completed));
        assert_eq!(ctx.event_ref.as_deref(), Some("master"));
    }

    #[test]
    fn test_non_matching_ref_halts_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path(), &["master", "release/*"]);
        ctx.event_ref = Some("fix/typo".into());

        let outcome = run(&mut ctx).unwrap();
        match outcome {
            StepOutcome::SkipRun(reason) => assert!(reason.contains("does not match")),
            _ => panic!("expected SkipRun"),
        }
    }

    #[test]
    fn test_wildcard_patterns() {
        let dir = tempfile::tempdir().unwrap();

        let mut ctx = make_ctx(dir.path(), &["release/*"]);
        ctx.event_ref = Some("release/1.2".into());
        assert!(matches!(run(&mut ctx).unwrap(), StepOutcome::Completed));

        // A single `*` never crosses a slash
        let mut ctx = make_ctx(dir.path(), &["release/*"]);
        ctx.event_ref = Some("release/1.2/hotfix".into());
        assert!(matches!(run(&mut ctx).unwrap(), StepOutcome::SkipRun(_)));
    }

    #[test]
    fn test_head_branch_resolution() {
        let dir = tempfile::tempdir().unwrap();
        git::create_repo(dir.path()).unwrap();
        // Pin the branch name; the host default is not predictable
        Command::new("git")
            .args(["symbolic-ref", "HEAD", "refs/heads/master"])
            .current_dir(dir.path())
            .status()
            .unwrap();

        let mut ctx = make_ctx(dir.path(), &["master"]);
        let outcome = run(&mut ctx).unwrap();

        assert!(matches!(outcome, StepOutcome::Completed));
        assert_eq!(ctx.event_ref.as_deref(), Some("master"));
    }

    #[test]
    fn test_missing_work_tree_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path(), &["master"]);

        let err = run(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("not a git work tree"));
    }
}
