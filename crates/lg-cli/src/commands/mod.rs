//! CLI command implementations

pub(crate) mod analyze;
pub(crate) mod common;
pub(crate) mod lineage;
pub(crate) mod path;
