use std::collections::HashMap;

use crate::error::{LoopError, Result};

/// Registry of mount points, keyed by URL path.
///
/// Holds one factory per path. Registering a path again replaces the
/// earlier factory.
#[derive(Debug)]
pub struct MountTable<F> {
    mounts: HashMap<String, F>,
}

impl<F> MountTable<F> {
    pub fn new() -> Self {
        Self {
            mounts: HashMap::new(),
        }
    }

    /// Register a factory at `path`. Returns the factory it replaced, if any.
    pub fn insert(&mut self, path: &str, factory: F) -> Result<Option<F>> {
        let path = normalize_mount_path(path)?;
        let replaced = self.mounts.insert(path.clone(), factory);
        if replaced.is_some() {
            tracing::info!(%path, "mount replaced");
        } else {
            tracing::info!(%path, "mount registered");
        }
        Ok(replaced)
    }

    /// Look up a factory by path. The path is normalized first.
    pub fn get(&self, path: &str) -> Option<&F> {
        let path = normalize_mount_path(path).ok()?;
        self.mounts.get(&path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.mounts.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl<F> Default for MountTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a mount path.
///
/// `/test`   → `/test`
/// `/test/`  → `/test`
/// `/a/b//`  → `/a/b`
/// `test`    → error (must be absolute)
/// `/`       → error (nothing to mount at)
pub fn normalize_mount_path(path: &str) -> Result<String> {
    let trimmed = path.trim();
    if !trimmed.starts_with('/') {
        return Err(LoopError::InvalidMountPath(path.to_string()));
    }
    let normalized = trimmed.trim_end_matches('/');
    if normalized.is_empty() {
        return Err(LoopError::InvalidMountPath(path.to_string()));
    }
    Ok(normalized.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_absolute_path() {
        assert_eq!(normalize_mount_path("/test").unwrap(), "/test");
    }

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(normalize_mount_path("/test/").unwrap(), "/test");
        assert_eq!(normalize_mount_path("/a/b//").unwrap(), "/a/b");
    }

    #[test]
    fn normalize_rejects_relative_path() {
        assert!(matches!(
            normalize_mount_path("test"),
            Err(LoopError::InvalidMountPath(_))
        ));
    }

    #[test]
    fn normalize_rejects_root() {
        assert!(normalize_mount_path("/").is_err());
        assert!(normalize_mount_path("").is_err());
    }

    #[test]
    fn insert_and_get() {
        let mut table = MountTable::new();
        table.insert("/test", "factory-a").unwrap();

        assert_eq!(table.get("/test"), Some(&"factory-a"));
        assert_eq!(table.get("/test/"), Some(&"factory-a"));
        assert!(table.get("/other").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn insert_overwrites_existing_path() {
        let mut table = MountTable::new();
        assert!(table.insert("/test", 1).unwrap().is_none());
        assert_eq!(table.insert("/test/", 2).unwrap(), Some(1));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("/test"), Some(&2));
    }

    #[test]
    fn insert_rejects_invalid_path() {
        let mut table = MountTable::new();
        assert!(table.insert("test", ()).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn paths_are_sorted() {
        let mut table = MountTable::new();
        table.insert("/b", ()).unwrap();
        table.insert("/a", ()).unwrap();
        assert_eq!(table.paths(), vec!["/a", "/b"]);
        assert!(table.contains("/a"));
    }
}
