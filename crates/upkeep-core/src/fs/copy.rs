//! Recursive tree copy and removal.

use std::fs;
use std::path::Path;

use anyhow::Context;

/// Copy the contents of `src` into `dst`, creating `dst` if needed.
pub fn copy_tree(src: &Path, dst: &Path) -> anyhow::Result<()> {
    copy_tree_filtered(src, dst, &[])
}

/// Copy the contents of `src` into `dst`, skipping entries whose name is in
/// `skip` at any depth. Symlinks are recreated, not followed.
pub fn copy_tree_filtered(src: &Path, dst: &Path, skip: &[&str]) -> anyhow::Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("Failed to create directory: {}", dst.display()))?;

    let entries =
        fs::read_dir(src).with_context(|| format!("Failed to read directory: {}", src.display()))?;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("Failed to read directory entry in {}", src.display()))?;
        let file_name = entry.file_name();
        if skip.iter().any(|s| file_name == *s) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&file_name);
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to stat: {}", src_path.display()))?;

        if file_type.is_dir() {
            copy_tree_filtered(&src_path, &dst_path, skip)?;
        } else if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> anyhow::Result<()> {
    let target =
        fs::read_link(src).with_context(|| format!("Failed to read link: {}", src.display()))?;
    std::os::unix::fs::symlink(&target, dst)
        .with_context(|| format!("Failed to create link: {}", dst.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> anyhow::Result<()> {
    fs::copy(src, dst)
        .map(|_| ())
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))
}

/// Remove a file or directory tree. Returns whether anything was removed.
pub fn remove_path_if_exists(path: &Path) -> anyhow::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read metadata: {}", path.display()));
        }
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    } else {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove file: {}", path.display()))?;
    }
    Ok(true)
}
