use super::error::{Result, ScribeError};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolves `user_path` against `base_dir`.
///
/// Absolute inputs are returned unchanged and are NOT confined to `base_dir`:
/// an operator may point at any file on the system. Relative inputs are joined
/// to the base and normalised lexically; symlinks are left to the OS.
pub fn resolve(base_dir: &Path, user_path: &Path) -> PathBuf {
    if user_path.is_absolute() {
        return user_path.to_path_buf();
    }

    let joined = base_dir.join(user_path);
    let absolute = if joined.is_absolute() {
        joined
    } else {
        std::path::absolute(&joined).unwrap_or(joined)
    };
    normalize(&absolute)
}

/// Resolves the path and checks that it exists and has the expected type.
///
/// This is only a pre-flight gate; the tool that later opens the path still
/// performs its own validation.
pub fn check_type(base_dir: &Path, user_path: &Path, must_be_file: bool) -> Result<PathBuf> {
    let path = resolve(base_dir, user_path);

    let metadata = fs::metadata(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ScribeError::PathNotFound(path.clone())
        } else {
            ScribeError::Io(e)
        }
    })?;

    if must_be_file && metadata.is_dir() {
        return Err(ScribeError::WrongPathType {
            path,
            expected: "file",
        });
    }
    if !must_be_file && !metadata.is_dir() {
        return Err(ScribeError::WrongPathType {
            path,
            expected: "directory",
        });
    }

    Ok(path)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(
            normalize(Path::new("/case/./images/../exports/a.json")),
            PathBuf::from("/case/exports/a.json")
        );
    }

    #[test]
    fn test_normalize_parent_of_root() {
        assert_eq!(normalize(Path::new("/../etc")), PathBuf::from("/etc"));
    }
}
