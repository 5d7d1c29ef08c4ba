//! Version resolution for built, deployed and remote trees.
//!
//! None of these lookups fail: anything that cannot be determined is
//! reported as [`UNKNOWN_VERSION`].

use std::path::Path;

use tracing::debug;

use super::git::{nearest_tag, short_head_id};
use super::manifest::read_manifest_version;
use super::ordering::highest_tag;
use super::{SHORT_ID_LEN, UNKNOWN_VERSION};
use crate::git::{list_remote_tags, remote_head};

#[derive(Debug, Default, Clone)]
pub struct VersionResolver;

impl VersionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Version of a freshly built workspace.
    ///
    /// Manifest version, else nearest tag, else short HEAD id.
    pub fn resolve_built_version(&self, workspace: &Path) -> String {
        match read_manifest_version(workspace) {
            Ok(Some(version)) => return version,
            Ok(None) => {}
            Err(err) => debug!(error = %format!("{err:#}"), "manifest version unavailable"),
        }
        match nearest_tag(workspace) {
            Ok(Some(tag)) => return tag,
            Ok(None) => {}
            Err(err) => debug!(error = %err, "tag lookup failed"),
        }
        match short_head_id(workspace) {
            Ok(id) => id,
            Err(err) => {
                debug!(error = %err, "HEAD lookup failed");
                UNKNOWN_VERSION.to_string()
            }
        }
    }

    /// Manifest version of the live deployment.
    pub fn resolve_deployed_version(&self, deploy_path: &Path) -> String {
        match read_manifest_version(deploy_path) {
            Ok(Some(version)) => version,
            Ok(None) => UNKNOWN_VERSION.to_string(),
            Err(err) => {
                debug!(
                    deploy_path = %deploy_path.display(),
                    error = %format!("{err:#}"),
                    "deployed manifest unreadable"
                );
                UNKNOWN_VERSION.to_string()
            }
        }
    }

    /// Highest remote tag, else the short id of the remote HEAD.
    pub fn resolve_latest_remote_version(&self, remote: &str) -> String {
        let tags = match list_remote_tags(remote) {
            Ok(tags) => tags,
            Err(err) => {
                debug!(remote, error = %format!("{err:#}"), "remote tags unavailable");
                return UNKNOWN_VERSION.to_string();
            }
        };
        if let Some(tag) = highest_tag(&tags) {
            return tag;
        }
        match remote_head(remote) {
            Ok(id) => id.chars().take(SHORT_ID_LEN).collect(),
            Err(err) => {
                debug!(remote, error = %format!("{err:#}"), "remote HEAD unavailable");
                UNKNOWN_VERSION.to_string()
            }
        }
    }
}
