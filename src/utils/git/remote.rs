use crate::{config::PublishConfig, exec, log};
use anyhow::{Context, Result, bail};
use gix::{Repository, ThreadSafeRepository, remote::Direction};
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::repo::get_repo_root;

/// Push the publish branch of the artifact repository to its remote.
///
/// The remote `origin` is (re)configured to the authenticated URL first, so
/// a changed config takes effect without manual cleanup.
pub fn push(repo: &ThreadSafeRepository, url: &str, publish: &'static PublishConfig) -> Result<()> {
    log!("publish"; "pushing {} to {}", publish.branch, url);

    let repo_local = repo.to_thread_local();
    let root = get_repo_root(&repo_local)?;

    let token = read_token(publish.token_path.as_ref())?;
    let remote_url = build_push_url(url, token.as_deref())?;

    let result = configure_origin_remote(root, &repo_local, &remote_url)
        .and_then(|()| push_to_remote(root, &publish.branch, publish.force));

    // Keep the token out of error output; git prints the full URL on failure
    if let Err(err) = result {
        let msg = token
            .as_deref()
            .map_or_else(|| err.to_string(), |t| err.to_string().replace(t, "***"));
        bail!("{msg}");
    }

    // Verify remote configuration
    if !publish.force && !Remote::origin_matches(&repo_local, &remote_url)? {
        bail!(
            "Remote origin URL in `{root:?}` doesn't match the [publish] config. \
             Enable [publish.force] or fix manually."
        );
    }

    Ok(())
}

struct Remote;

impl Remote {
    /// Check if origin remote exists with matching URL
    fn origin_matches(repo: &Repository, expected_url: &str) -> Result<bool> {
        let matches = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| {
                remote
                    .url(Direction::Push)
                    .or_else(|| remote.url(Direction::Fetch))
                    .map(|url| url.to_bstring() == expected_url)
            })
            .unwrap_or(false);
        Ok(matches)
    }

    /// Check if origin remote exists
    fn origin_exists(repo: &Repository) -> Result<bool> {
        Ok(repo.find_remote("origin").is_ok())
    }
}

/// Configure origin remote (add or update URL)
fn configure_origin_remote(root: &Path, repo: &Repository, url: &str) -> Result<()> {
    let action = if Remote::origin_exists(repo)? {
        "set-url"
    } else {
        "add"
    };
    exec!(root; ["git"]; "remote", action, "origin", url)?;
    Ok(())
}

/// Push to remote with optional force flag
fn push_to_remote(root: &Path, branch: &str, force: bool) -> Result<()> {
    if force {
        exec!(root; ["git"]; "push", "--set-upstream", "origin", branch, "-f")?;
    } else {
        exec!(root; ["git"]; "push", "--set-upstream", "origin", branch)?;
    }
    Ok(())
}

/// Read and validate the push token, if one is configured.
fn read_token(token_path: Option<&PathBuf>) -> Result<Option<String>> {
    let Some(path) = token_path else {
        return Ok(None);
    };
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read token file {path:?}"))?;
    let token = raw.trim().to_owned();
    if token.is_empty() {
        bail!("Token file {path:?} is empty");
    }
    Ok(Some(token))
}

/// Build the push URL, embedding the token when one is configured.
///
/// A token only makes sense over https; tokenless URLs pass through
/// untouched so ssh remotes keep working.
fn build_push_url(url: &str, token: Option<&str>) -> Result<String> {
    match token {
        Some(token) => {
            let base_url = url
                .strip_prefix("https://")
                .context("A push token requires an https:// remote URL")?;
            Ok(format!("https://{token}@{base_url}"))
        }
        None => Ok(url.to_owned()),
    }
}
