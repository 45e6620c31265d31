//! Utility modules for the pipeline.

pub mod exec;
pub mod git;
pub mod pattern;
