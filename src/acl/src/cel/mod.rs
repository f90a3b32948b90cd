//! CEL (Common Expression Language) support for rule assertions
//!
//! Assertions written as expressions see `principal`, `resource`, `request` and
//! `context` (plus the `P` / `R` aliases). `request.role`, `request.resource` and
//! `request.privilege` describe the query being answered.

pub mod context;
pub mod convert;
pub mod engine;
pub mod error;

pub use context::EvalContext;
pub use engine::Engine;
pub use error::{CelError, Result};
