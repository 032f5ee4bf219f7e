//! Input traversal (C4): enumerate regular files beneath manifest
//! path-prefixes, relative to a base directory.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

use gasfs_core::GasFsError;

/// A single traversed input file: its logical path (forward-slash
/// separated, relative to the base directory), size and mtime.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Byte length of the source file.
    pub size: u64,
    /// Source file's last-modified time.
    pub mtime: SystemTime,
}

/// Enumerate regular files under each of `prefixes`, relative to
/// `base_dir`, returning a map keyed by logical path (forward-slash
/// separated).
///
/// Fails with [`GasFsError::PathNotFound`] if a listed prefix does not
/// exist under `base_dir`.
pub fn traverse(
    base_dir: &Path,
    prefixes: &[String],
) -> Result<BTreeMap<String, InputFile>, GasFsError> {
    let mut files = BTreeMap::new();
    for prefix in prefixes {
        let full_path = base_dir.join(prefix);
        if !full_path.exists() {
            return Err(GasFsError::PathNotFound(full_path));
        }
        visit(base_dir, &full_path, &mut files)?;
    }
    Ok(files)
}

fn visit(
    base_dir: &Path,
    path: &Path,
    files: &mut BTreeMap<String, InputFile>,
) -> Result<(), GasFsError> {
    let metadata =
        std::fs::symlink_metadata(path).map_err(|e| GasFsError::io(path.to_path_buf(), e))?;

    if metadata.is_dir() {
        let entries =
            std::fs::read_dir(path).map_err(|e| GasFsError::io(path.to_path_buf(), e))?;
        // std::fs::read_dir never yields "." or "..", matching the C4
        // requirement to skip them.
        for entry in entries {
            let entry = entry.map_err(|e| GasFsError::io(path.to_path_buf(), e))?;
            visit(base_dir, &entry.path(), files)?;
        }
    } else if metadata.is_file() {
        let logical_path = logical_path(base_dir, path);
        let mtime = metadata
            .modified()
            .map_err(|e| GasFsError::io(path.to_path_buf(), e))?;
        files.insert(
            logical_path,
            InputFile {
                size: metadata.len(),
                mtime,
            },
        );
    }
    // Symlinks and other non-regular entries are silently skipped.
    Ok(())
}

fn logical_path(base_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn enumerates_nested_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/sub")).unwrap();
        fs::write(dir.path().join("a/x"), "hello").unwrap();
        fs::write(dir.path().join("a/sub/y"), "world!").unwrap();

        let files = traverse(dir.path(), &["a/".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["a/x"].size, 5);
        assert_eq!(files["a/sub/y"].size, 6);
    }

    #[test]
    fn missing_prefix_is_path_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = traverse(dir.path(), &["missing/".to_string()]);
        assert!(matches!(result, Err(GasFsError::PathNotFound(_))));
    }
}
