//! Version resolution and tag ordering.

pub mod git;
pub mod manifest;
pub mod ordering;
pub mod resolver;

pub use ordering::{compare_tags, highest_tag, parse_tag};
pub use resolver::VersionResolver;

/// Reported whenever a version cannot be determined.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Length of abbreviated commit ids used as versions.
pub const SHORT_ID_LEN: usize = 7;
