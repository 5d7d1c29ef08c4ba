//! Git helpers for resolving the version of a checkout.

use std::path::Path;

use git2::{DescribeFormatOptions, DescribeOptions, Repository};

use super::SHORT_ID_LEN;

/// Name of the nearest tag reachable from HEAD (`describe --tags
/// --abbrev=0`). Lightweight tags count.
pub fn nearest_tag(repo_path: &Path) -> anyhow::Result<Option<String>> {
    let repo = Repository::open(repo_path)?;
    let mut opts = DescribeOptions::new();
    opts.describe_tags();

    let describe = match repo.describe(&opts) {
        Ok(describe) => describe,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut format = DescribeFormatOptions::new();
    format.abbreviated_size(0);
    Ok(Some(describe.format(Some(&format))?))
}

/// First [`SHORT_ID_LEN`] hex characters of HEAD's commit id.
pub fn short_head_id(repo_path: &Path) -> anyhow::Result<String> {
    let repo = Repository::open(repo_path)?;
    let commit = repo.head()?.peel_to_commit()?;
    let id = commit.id().to_string();
    Ok(id[..SHORT_ID_LEN].to_string())
}
