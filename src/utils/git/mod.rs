//! Git plumbing for the pipeline.
//!
//! Local object work (trees, commits, refs) goes through gix; network
//! operations (clone, fetch, push) go through the `git` CLI via `exec!`.

pub mod remote;
pub mod repo;
pub mod tree;

pub use remote::push;
pub use repo::{
    branch_tree_id, commit_all, commit_tree, create_repo, ensure_branch_repo, head_branch,
    head_revision, open_repo, write_dir_tree,
};
