// src/paths.rs
use std::path::{Component, Path, PathBuf};

/// Makes `path` absolute against `cwd` and collapses `.`/`..` components
/// without touching the filesystem.
#[must_use]
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    clean(&joined)
}

/// Lexically normalizes a path: drops `.`, folds `..` into its parent.
#[must_use]
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(comp.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonical form for result paths. Dereferences symlinks when
/// `follow_symlinks` is set and the path exists; falls back to the lexical
/// absolute form otherwise.
#[must_use]
pub fn normalize(path: &Path, cwd: &Path, follow_symlinks: bool) -> PathBuf {
    let abs = absolutize(path, cwd);
    if follow_symlinks {
        if let Ok(real) = std::fs::canonicalize(&abs) {
            return real;
        }
    }
    abs
}

/// Path relative to `base` when `path` lives under it, unchanged otherwise.
#[must_use]
pub fn display_relative(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_folds_dots() {
        assert_eq!(clean(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(clean(Path::new("/a/./b")), PathBuf::from("/a/b"));
    }

    #[test]
    fn absolutize_joins_relative() {
        let got = absolutize(Path::new("x/y.py"), Path::new("/work"));
        assert_eq!(got, PathBuf::from("/work/x/y.py"));
    }

    #[test]
    fn relative_display_outside_base_is_unchanged() {
        let p = Path::new("/elsewhere/m.py");
        assert_eq!(display_relative(p, Path::new("/work")), PathBuf::from("/elsewhere/m.py"));
        assert_eq!(
            display_relative(Path::new("/work/m.py"), Path::new("/work")),
            PathBuf::from("m.py")
        );
    }
}
