//! Maps decoded request paths onto the document root.

use std::path::{Path, PathBuf};

/// File served for a request of `/`.
pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// The decoded path contains a `..` segment
    PathTraversal,
    /// Nothing servable at the resolved location
    NotFound,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::PathTraversal => f.write_str("path contains a parent-directory segment"),
            ResolveError::NotFound => f.write_str("path not found"),
        }
    }
}

impl std::error::Error for ResolveError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

/// A location under the document root together with the result of its stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub kind: PathKind,
    /// Size reported by the stat; directories report whatever the OS says
    pub len: u64,
}

pub fn has_parent_segment(decoded: &str) -> bool {
    decoded.split(['/', '\\']).any(|segment| segment == "..")
}

/// Joins a decoded path onto `root` without touching the filesystem.
pub fn resolve_target(root: &Path, decoded: &str) -> Result<PathBuf, ResolveError> {
    if has_parent_segment(decoded) {
        return Err(ResolveError::PathTraversal);
    }

    let relative = decoded.trim_start_matches(['/', '\\']);
    if relative.is_empty() {
        return Ok(root.join(INDEX_FILE));
    }
    Ok(root.join(relative))
}

/// Resolves and stats the target. Exactly one `stat` is issued.
pub async fn resolve(root: &Path, decoded: &str) -> Result<ResolvedPath, ResolveError> {
    let path = resolve_target(root, decoded)?;

    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Stat failed");
            return Err(ResolveError::NotFound);
        }
    };

    let kind = if meta.is_dir() {
        PathKind::Directory
    } else if meta.is_file() {
        PathKind::File
    } else {
        return Err(ResolveError::NotFound);
    };

    Ok(ResolvedPath {
        path,
        kind,
        len: meta.len(),
    })
}
