//! precheck-core - Shared functionality for the precheck runner
//!
//! Standard locations on disk and lookup of the external tools a check
//! pipeline shells out to.

pub mod paths;
pub mod tools;

pub use paths::Paths;
pub use tools::{program_of, resolve, ToolStatus};
