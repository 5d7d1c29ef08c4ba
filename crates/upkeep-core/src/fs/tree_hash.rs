//! Deployment fingerprints.
//!
//! The digest of a deployed tree identifies what was deployed: two upgrades
//! that produced identical output get identical digests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

const FILE_MARKER: u8 = 0x00;
const SYMLINK_MARKER: u8 = 0xFE;
const DIR_MARKER: u8 = 0xFF;

/// blake3 digest (hex) of the tree rooted at `root`.
///
/// Each directory's entries are fed to the hasher in name order as
/// `relative_path || marker || payload`, followed by its subdirectories in
/// name order:
/// - file: marker `0x00`, payload is the content
/// - symlink: marker `0xFE`, payload is the link target (never followed)
/// - directory: marker `0xFF`, no payload
///
/// ```no_run
/// use upkeep_core::fs::hash_tree;
/// use std::path::Path;
///
/// let digest = hash_tree(Path::new("/srv/www/shell"))?;
/// assert_eq!(digest.len(), 64);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn hash_tree(root: &Path) -> anyhow::Result<String> {
    let mut hasher = blake3::Hasher::new();
    // Directories still to visit, with their path relative to `root`.
    // Pushed in reverse so they pop in name order.
    let mut pending: Vec<(PathBuf, String)> = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, rel_dir)) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        entries.sort_by_key(|e| e.file_name());

        let mut subdirs = Vec::new();
        for entry in entries {
            let path = entry.path();
            let name = entry.file_name();
            let rel = if rel_dir.is_empty() {
                name.to_string_lossy().into_owned()
            } else {
                format!("{}/{}", rel_dir, name.to_string_lossy())
            };
            let ty = entry
                .file_type()
                .with_context(|| format!("Failed to stat: {}", path.display()))?;

            hasher.update(rel.as_bytes());
            if ty.is_symlink() {
                let target = fs::read_link(&path)
                    .with_context(|| format!("Failed to read link: {}", path.display()))?;
                hasher.update(&[SYMLINK_MARKER]);
                hasher.update(target.to_string_lossy().as_bytes());
            } else if ty.is_file() {
                let content = fs::read(&path)
                    .with_context(|| format!("Failed to read file: {}", path.display()))?;
                hasher.update(&[FILE_MARKER]);
                hasher.update(&content);
            } else if ty.is_dir() {
                hasher.update(&[DIR_MARKER]);
                subdirs.push((path, rel));
            } else {
                anyhow::bail!("Unsupported file type: {}", path.display());
            }
        }

        pending.extend(subdirs.into_iter().rev());
    }

    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn build_output(root: &Path) {
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::write(root.join("index.html"), "<h1>shell</h1>").unwrap();
        fs::write(root.join("assets/app.js"), "render()").unwrap();
    }

    #[test]
    fn deployed_copy_matches_build_output() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        build_output(&dist);
        let deployed = tmp.path().join("www");
        crate::fs::copy_tree(&dist, &deployed).unwrap();

        let digest = hash_tree(&deployed).unwrap();
        assert_eq!(digest, hash_tree(&dist).unwrap());
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn rebuilt_asset_changes_digest() {
        let tmp = TempDir::new().unwrap();
        build_output(tmp.path());
        let before = hash_tree(tmp.path()).unwrap();

        fs::write(tmp.path().join("assets/app.js"), "render(v2)").unwrap();
        assert_ne!(hash_tree(tmp.path()).unwrap(), before);
    }

    #[test]
    fn renamed_bundle_changes_digest() {
        let tmp = TempDir::new().unwrap();
        build_output(tmp.path());
        let before = hash_tree(tmp.path()).unwrap();

        fs::rename(
            tmp.path().join("assets/app.js"),
            tmp.path().join("assets/app.1f3a.js"),
        )
        .unwrap();
        assert_ne!(hash_tree(tmp.path()).unwrap(), before);
    }

    #[test]
    fn file_moved_between_directories_changes_digest() {
        let a = TempDir::new().unwrap();
        fs::create_dir_all(a.path().join("x")).unwrap();
        fs::write(a.path().join("x/y"), "z").unwrap();

        let b = TempDir::new().unwrap();
        fs::write(b.path().join("x"), "").unwrap();
        fs::create_dir_all(b.path().join("y")).unwrap();

        assert_ne!(hash_tree(a.path()).unwrap(), hash_tree(b.path()).unwrap());
    }

    #[test]
    fn empty_asset_directory_counts() {
        let tmp = TempDir::new().unwrap();
        build_output(tmp.path());
        let before = hash_tree(tmp.path()).unwrap();

        fs::create_dir(tmp.path().join("fonts")).unwrap();
        assert_ne!(hash_tree(tmp.path()).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_is_hashed_by_target() {
        let tmp = TempDir::new().unwrap();
        build_output(tmp.path());
        std::os::unix::fs::symlink("index.html", tmp.path().join("current")).unwrap();
        let before = hash_tree(tmp.path()).unwrap();

        fs::remove_file(tmp.path().join("current")).unwrap();
        std::os::unix::fs::symlink("assets/app.js", tmp.path().join("current")).unwrap();
        assert_ne!(hash_tree(tmp.path()).unwrap(), before);
    }

    #[test]
    fn missing_deploy_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(hash_tree(&tmp.path().join("never-deployed")).is_err());

        fs::write(tmp.path().join("file"), "x").unwrap();
        assert!(hash_tree(&tmp.path().join("file")).is_err());
    }
}
