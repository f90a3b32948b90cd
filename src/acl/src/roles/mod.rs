//! Role graph builder
//!
//! Merges role definitions from any number of providers. A role grants
//! everything its parents grant unless a rule on the role itself overrides it.

pub mod graph;

pub use graph::{RoleGraph, RoleGraphBuilder, RoleNode};
