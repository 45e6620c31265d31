use crate::{exec, log, utils::pattern::PathMatcher};
use anyhow::{Result, anyhow, bail};
use gix::{Repository, ThreadSafeRepository, commit::NO_PARENT_IDS, index::State};
use std::{fs, path::Path};

use super::tree::TreeBuilder;

/// Create a new git repository at the given path
pub fn create_repo(root: &Path) -> Result<ThreadSafeRepository> {
    let repo = gix::init(root)?;
    Ok(repo.into_sync())
}

/// Open an existing git repository
pub fn open_repo(root: &Path) -> Result<ThreadSafeRepository> {
    let repo = gix::open(root)?;
    Ok(repo.into_sync())
}

/// Open the artifact repository, creating it if necessary.
///
/// A fresh repository gets its HEAD pointed at the publish branch before the
/// first commit, and a repo-local identity so commits never depend on host
/// git configuration.
pub fn ensure_branch_repo(root: &Path, branch: &str) -> Result<ThreadSafeRepository> {
    if !root.join(".git").exists() {
        {
            gix::init(root)?;
        }
        exec!(root; ["git"]; "symbolic-ref", "HEAD", format!("refs/heads/{branch}"))?;
        exec!(root; ["git"]; "config", "user.name", "docship")?;
        exec!(root; ["git"]; "config", "user.email", "docship@localhost")?;
    }
    open_repo(root)
}

/// Write a tree (and matching index) from the contents of `dir`.
///
/// Blobs and sub-trees land in the object database; the returned id is the
/// root tree. The caller decides whether anything gets committed.
pub fn write_dir_tree(
    repo: &ThreadSafeRepository,
    dir: &Path,
    matcher: &PathMatcher,
) -> Result<gix::ObjectId> {
    let repo_local = repo.to_thread_local();

    let mut index = State::new(repo_local.object_hash());
    let tree = TreeBuilder::new(repo, matcher).build_from_dir(dir, &mut index)?;
    index.sort_entries();

    // Write index file so the work tree reads as clean
    let mut index_file = gix::index::File::from_state(index, repo_local.index_path());
    index_file.write(gix::index::write::Options::default())?;

    let tree_id = repo_local.write_object(&tree)?.detach();
    Ok(tree_id)
}

/// Commit a tree onto a reference, chaining onto its current head.
pub fn commit_tree(
    repo: &ThreadSafeRepository,
    reference: &str,
    message: &str,
    tree_id: gix::ObjectId,
) -> Result<gix::ObjectId> {
    if message.trim().is_empty() {
        bail!("Commit message cannot be empty");
    }

    let repo_local = repo.to_thread_local();
    let parent_ids = parent_commit_ids(&repo_local, reference);
    let commit_id = repo_local.commit(reference, message, tree_id, parent_ids)?;
    Ok(commit_id.detach())
}

/// Commit all changes in the repository, respecting .gitignore
pub fn commit_all(repo: &ThreadSafeRepository, message: &str) -> Result<gix::ObjectId> {
    let repo_local = repo.to_thread_local();
    let root = get_repo_root(&repo_local)?;
    let matcher = PathMatcher::new(&read_gitignore(root)?);

    let tree_id = write_dir_tree(repo, root, &matcher)?;
    let commit_id = commit_tree(repo, "HEAD", message, tree_id)?;

    log!("git"; "commit {commit_id}");
    Ok(commit_id)
}

/// Tree id at the head of a local branch, if the branch exists.
pub fn branch_tree_id(repo: &ThreadSafeRepository, branch: &str) -> Result<Option<gix::ObjectId>> {
    let repo_local = repo.to_thread_local();
    let Ok(reference) = repo_local.find_reference(&format!("refs/heads/{branch}")) else {
        return Ok(None);
    };
    let commit_id = reference.target().id().to_owned();
    let commit = repo_local.find_commit(commit_id)?;
    Ok(Some(commit.tree_id()?.detach()))
}

/// Name of the branch HEAD points to, or None when detached.
pub fn head_branch(repo: &ThreadSafeRepository) -> Result<Option<String>> {
    let repo_local = repo.to_thread_local();
    let head = repo_local.head()?;
    Ok(head.referent_name().map(|name| name.shorten().to_string()))
}

/// Commit id HEAD resolves to, or None for an unborn branch.
pub fn head_revision(repo: &ThreadSafeRepository) -> Result<Option<gix::ObjectId>> {
    let repo_local = repo.to_thread_local();
    Ok(repo_local.head_id().ok().map(|id| id.detach()))
}

/// Get repository root path
pub fn get_repo_root(repo: &Repository) -> Result<&Path> {
    repo.path()
        .parent()
        .ok_or_else(|| anyhow!("Invalid repository path"))
}

/// Read .gitignore file if it exists
fn read_gitignore(root: &Path) -> Result<Vec<u8>> {
    let path = root.join(".gitignore");
    if path.exists() {
        Ok(fs::read(path)?)
    } else {
        Ok(Vec::new())
    }
}

/// Get parent commit IDs for a reference (empty for initial commit)
fn parent_commit_ids(repo: &Repository, reference: &str) -> Vec<gix::ObjectId> {
    let resolved = if reference == "HEAD" {
        repo.head_id().ok().map(gix::Id::detach)
    } else {
        repo.find_reference(reference)
            .ok()
            .map(|refs| refs.target().id().to_owned())
    };

    resolved.map_or_else(|| NO_PARENT_IDS.to_vec(), |id| vec![id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn with_temp_repo<F>(f: F)
    where
        F: FnOnce(&Path, &ThreadSafeRepository),
    {
        let temp_dir = TempDir::new().unwrap();
        create_repo(temp_dir.path()).expect("Failed to create repo");
        // Commits must not depend on the host's git identity. The config
        // snapshot is taken at open time, so configure first, then reopen.
        for args in [
            ["config", "user.name", "docship"],
            ["config", "user.email", "docship@localhost"],
        ] {
            std::process::Command::new("git")
                .args(args)
                .current_dir(temp_dir.path())
                .status()
                .unwrap();
        }
        let repo = open_repo(temp_dir.path()).expect("Failed to reopen repo");
        f(temp_dir.path(), &repo);
        // TempDir automatically cleans up on drop
    }

    #[test]
    fn test_create_and_open_repo() {
        with_temp_repo(|dir, _repo| {
            assert!(dir.join(".git").exists());

            let opened = open_repo(dir);
            assert!(opened.is_ok());
        });
    }

    #[test]
    fn test_commit_all() {
        with_temp_repo(|dir, repo| {
            let file_path = dir.join("test.txt");
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "Hello World").unwrap();

            commit_all(repo, "Initial commit").expect("Commit failed");

            // Verify commit exists
            let repo_local = repo.to_thread_local();
            let mut head = repo_local.head().unwrap();
            let commit = head.peel_to_commit_in_place().unwrap();

            assert_eq!(
                commit.message().unwrap().summary().to_string(),
                "Initial commit"
            );
        });
    }

    #[test]
    fn test_commit_empty_message() {
        with_temp_repo(|_dir, repo| {
            let tree_id = gix::ObjectId::null(gix::hash::Kind::Sha1);
            let result = commit_tree(repo, "HEAD", "   ", tree_id);
            assert!(result.is_err());
            assert_eq!(
                result.unwrap_err().to_string(),
                "Commit message cannot be empty"
            );
        });
    }

    #[test]
    fn test_commit_tree_onto_branch() {
        with_temp_repo(|dir, repo| {
            fs::write(dir.join("index.html"), "v1").unwrap();
            let matcher = PathMatcher::from_patterns::<String>(&[]);

            let tree_v1 = write_dir_tree(repo, dir, &matcher).unwrap();
            let first = commit_tree(repo, "refs/heads/gh-pages", "docs: deploy aaaaaaa", tree_v1)
                .unwrap();

            fs::write(dir.join("index.html"), "v2").unwrap();
            let tree_v2 = write_dir_tree(repo, dir, &matcher).unwrap();
            let second = commit_tree(repo, "refs/heads/gh-pages", "docs: deploy bbbbbbb", tree_v2)
                .unwrap();

            // Second commit chains onto the first
            let repo_local = repo.to_thread_local();
            let commit = repo_local.find_commit(second).unwrap();
            let parents: Vec<_> = commit.parent_ids().map(gix::Id::detach).collect();
            assert_eq!(parents, vec![first]);

            assert_eq!(branch_tree_id(repo, "gh-pages").unwrap(), Some(tree_v2));
        });
    }

    #[test]
    fn test_branch_tree_id_missing_branch() {
        with_temp_repo(|_dir, repo| {
            assert_eq!(branch_tree_id(repo, "gh-pages").unwrap(), None);
        });
    }

    #[test]
    fn test_head_branch_and_revision() {
        with_temp_repo(|dir, repo| {
            // Unborn HEAD still names its branch, but resolves to no commit
            let branch = head_branch(repo).unwrap();
            assert!(branch.is_some());
            assert_eq!(head_revision(repo).unwrap(), None);

            fs::write(dir.join("test.txt"), "content").unwrap();
            let commit_id = commit_all(repo, "Initial commit").unwrap();

            assert_eq!(head_revision(repo).unwrap(), Some(commit_id));
        });
    }

    #[test]
    fn test_read_gitignore() {
        with_temp_repo(|dir, _repo| {
            let gitignore_path = dir.join(".gitignore");
            let mut file = File::create(&gitignore_path).unwrap();
            writeln!(file, "*.log").unwrap();

            let content = read_gitignore(dir).unwrap();
            assert_eq!(String::from_utf8_lossy(&content).trim(), "*.log");
        });
    }

    #[test]
    fn test_read_gitignore_missing() {
        with_temp_repo(|dir, _repo| {
            let content = read_gitignore(dir).unwrap();
            assert!(content.is_empty());
        });
    }
}
