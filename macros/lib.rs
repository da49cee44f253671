//! Facade crate re-exporting the proc-macro attributes and helpers used to
//! declare solver options across the workspace.

pub use options::{build_option_enum, build_options, explicit_options, use_option};
