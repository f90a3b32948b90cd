//! Resource tree builder
//!
//! Resources form a single-parent tree. Rules attached to a resource apply to
//! its descendants unless a rule closer to the queried resource overrides them.

pub mod tree;

pub use tree::{ResourceNode, ResourceTree, ResourceTreeBuilder};
