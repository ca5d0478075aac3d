//! Loading stylesheet modules referenced by `xsl:include` / `xsl:import`

use crate::error::TransformError;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Supplies the bytes of stylesheets referenced from other stylesheets.
///
/// Implement this to serve stylesheets from somewhere other than the local
/// filesystem (a database, an embedded bundle). `Ok(None)` means "not found".
pub trait StylesheetResolver {
    fn load(&self, href: &str) -> Result<Option<Vec<u8>>, TransformError>;
}

impl<R: StylesheetResolver + ?Sized> StylesheetResolver for &R {
    fn load(&self, href: &str) -> Result<Option<Vec<u8>>, TransformError> {
        (**self).load(href)
    }
}

/// Filesystem resolver.
///
/// - An absolute href is anchored at `base_path` (its leading separator is
///   dropped before joining). Without a base path it is read as-is.
/// - A relative href is joined onto `relative_to` and lexically normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResolver {
    pub base_path: Option<PathBuf>,
    pub relative_to: PathBuf,
}

impl FileResolver {
    /// A resolver anchored at the current working directory.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            base_path: None,
            relative_to: env::current_dir()?,
        })
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn relative_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.relative_to = dir.into();
        self
    }

    /// Filesystem location for `href`.
    pub fn path_for(&self, href: &str) -> PathBuf {
        let href_path = Path::new(href);
        if href_path.is_absolute() {
            match &self.base_path {
                Some(base) => {
                    let stripped: PathBuf = href_path
                        .components()
                        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
                        .collect();
                    base.join(stripped)
                }
                None => href_path.to_path_buf(),
            }
        } else {
            normalize_path(&self.relative_to.join(href_path))
        }
    }
}

impl StylesheetResolver for FileResolver {
    fn load(&self, href: &str) -> Result<Option<Vec<u8>>, TransformError> {
        let path = self.path_for(href);
        debug!(href, path = %path.display(), "resolving stylesheet");
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(TransformError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
///
/// Leading `..` components of a relative path are kept, and `..` directly
/// under the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
