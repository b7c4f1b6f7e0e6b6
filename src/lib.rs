//! Workspace reconciliation and change-review engine for multi-repo
//! checkouts (§1, §2): a manifest-driven sync of many git projects under a
//! single root, a snapshot/restore flow built on the same planner and
//! executor, and a Gerrit-style squash-and-push review pipeline.

pub mod cl;
pub mod command;
pub mod executor;
pub mod manifest_store;
pub mod metadata;
pub mod paths;
pub mod plan;
pub mod project;
pub mod registry;
pub mod retry;
pub mod snapshot;
pub mod vcs;
