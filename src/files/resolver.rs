//! Request path resolution
//!
//! Maps a request target onto a file below the document root. The
//! containment check is done on path components after lexical
//! normalization, so `/srv/www2` is never mistaken for a child of
//! `/srv/www`.

use anyhow::Context;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Served in place of a directory.
pub const INDEX_FILE: &str = "index.html";

/// A regular file that may be served, with the metadata needed for the
/// response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub len: u64,
    pub modified: SystemTime,
}

/// The directory all served files must live under.
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    root: PathBuf,
}

impl DocumentRoot {
    /// Canonicalizes `path` and checks that it is a directory.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let root = path
            .canonicalize()
            .with_context(|| format!("document root {} is not accessible", path.display()))?;
        if !root.is_dir() {
            anyhow::bail!("document root {} is not a directory", root.display());
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub async fn resolve(&self, url: &str) -> Option<ResolvedFile> {
        resolve(&self.root, url).await
    }
}

/// Resolves `url` against `root`.
///
/// Returns `None` (not found) when the path leaves the root, does not
/// exist, or is a directory without an index file.
pub async fn resolve(root: &Path, url: &str) -> Option<ResolvedFile> {
    let Some(candidate) = contained_path(root, url) else {
        tracing::warn!(url, root = %root.display(), "Request path escapes document root");
        return None;
    };

    let metadata = fs::metadata(&candidate).await.ok()?;
    let (path, metadata) = if metadata.is_dir() {
        let index = candidate.join(INDEX_FILE);
        let metadata = fs::metadata(&index).await.ok()?;
        (index, metadata)
    } else {
        (candidate, metadata)
    };

    if !metadata.is_file() {
        return None;
    }

    Some(ResolvedFile {
        path,
        len: metadata.len(),
        modified: metadata.modified().unwrap_or(UNIX_EPOCH),
    })
}

/// Joins `url` onto `root` and normalizes the result, returning it only if
/// it is `root` itself or lies below it.
pub fn contained_path(root: &Path, url: &str) -> Option<PathBuf> {
    let root = normalize(root);

    let mut joined = root.clone();
    for segment in url.split('/').filter(|s| !s.is_empty()) {
        joined.push(segment);
    }
    let candidate = normalize(&joined);

    let rest = candidate.strip_prefix(&root).ok()?;
    if rest.components().all(|c| matches!(c, Component::Normal(_))) {
        Some(candidate)
    } else {
        None
    }
}

/// Lexically collapses `.` and `..` segments without touching the
/// filesystem. `..` at the filesystem root stays at the root; leading `..`
/// segments of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(segment) => out.push(segment),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn sibling_with_shared_prefix_is_outside() {
        let root = Path::new("/srv/www");
        assert_eq!(contained_path(root, "/../www2/secret"), None);
        assert_eq!(
            contained_path(root, "/a/../b.txt"),
            Some(PathBuf::from("/srv/www/b.txt"))
        );
    }

    #[test]
    fn relative_root_cannot_be_escaped() {
        assert_eq!(contained_path(Path::new("."), "/../x"), None);
        assert_eq!(contained_path(Path::new("docs"), "/../x"), None);
        assert_eq!(contained_path(Path::new("docs"), "/"), Some(PathBuf::from("docs")));
    }
}
