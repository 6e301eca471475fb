use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the manifest written into every processed bundle.
pub const MANIFEST_FILE_NAME: &str = "metadata.json";

/// Fixed name of the collage produced for image-bearing bundles.
pub const THUMBNAIL_FILE_NAME: &str = "t-100.jpg";

pub fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn folder_basename(p: &Path) -> String {
    p.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string())
}

/// Immediate subdirectories of `root`, sorted. Symlinked directories count;
/// hidden ones (`.git`, `.cache`, ...) do not.
pub fn list_bundle_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("input root must be a directory: {}", root.display());
    }
    let mut dirs = vec![];
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let e = entry.with_context(|| format!("failed to list {}", root.display()))?;
        if e.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        // path().is_dir() follows links; the entry's own file type does not.
        if e.path().is_dir() {
            dirs.push(e.into_path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Regular files directly inside `dir` (no recursion), sorted by name.
/// Symlinks to files are members; dangling links are not. The tool's own
/// outputs are left out so a re-run sees the same members.
pub fn list_member_files(dir: &Path) -> Result<Vec<OsString>> {
    let mut names = vec![];
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let e = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        if !e.path().is_file() {
            continue;
        }
        let name = e.file_name();
        if name == MANIFEST_FILE_NAME || name == THUMBNAIL_FILE_NAME {
            continue;
        }
        names.push(name.to_os_string());
    }
    names.sort();
    Ok(names)
}
