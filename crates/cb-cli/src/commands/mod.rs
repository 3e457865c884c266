//! CLI subcommand implementations.

pub mod buckets;
pub mod stages;
pub mod summary;
pub mod util;
pub mod worklog;
