//! Remote inspection without a local checkout.

use anyhow::Context;

use super::run_git;

/// Tag names advertised by `remote`, peeled duplicates removed.
pub fn list_remote_tags(remote: &str) -> anyhow::Result<Vec<String>> {
    let stdout = run_git(None, &["ls-remote", "--tags", remote])
        .with_context(|| format!("Failed to list tags of {}", remote))?;
    Ok(parse_tag_refs(&stdout))
}

/// Full object id of the remote's default-branch head.
pub fn remote_head(remote: &str) -> anyhow::Result<String> {
    let stdout = run_git(None, &["ls-remote", remote, "HEAD"])
        .with_context(|| format!("Failed to read HEAD of {}", remote))?;
    stdout
        .lines()
        .find_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Remote {} does not advertise a HEAD", remote))
}

fn parse_tag_refs(output: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for line in output.lines() {
        let Some((_, reference)) = line.split_once('\t') else {
            continue;
        };
        let Some(name) = reference.strip_prefix("refs/tags/") else {
            continue;
        };
        let name = name.strip_suffix("^{}").unwrap_or(name);
        if !tags.iter().any(|t| t == name) {
            tags.push(name.to_string());
        }
    }
    tags
}
