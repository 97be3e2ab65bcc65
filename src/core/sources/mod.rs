//! Source Resolution
//!
//! Maps a clip's declared source locator onto a readable local path. The
//! plan builder only normalizes locators; readability is checked when the
//! renderer actually opens the file.

use std::path::{Path, PathBuf};

use crate::core::{CoreError, CoreResult};

/// Resolves source locators to readable local paths.
///
/// Remote acquisition (download/caching) lives behind this seam; the engine
/// treats the collaborator as opaque.
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, locator: &str) -> CoreResult<PathBuf>;
}

/// Resolver for locally-addressed sources: plain paths and `file://` URIs.
///
/// An optional base directory anchors relative locators, which is how
/// project files shipped alongside their media are addressed.
#[derive(Debug, Default)]
pub struct LocalSources {
    base: Option<PathBuf>,
}

impl LocalSources {
    pub fn new() -> Self {
        Self { base: None }
    }

    pub fn with_base(base: impl AsRef<Path>) -> Self {
        Self {
            base: Some(base.as_ref().to_path_buf()),
        }
    }
}

impl SourceResolver for LocalSources {
    fn resolve(&self, locator: &str) -> CoreResult<PathBuf> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(CoreError::UnsupportedSource("empty locator".to_string()));
        }

        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Err(CoreError::UnsupportedSource(format!(
                "remote URL requires a fetching resolver: {locator}"
            )));
        }

        let path = if let Some(stripped) = locator.strip_prefix("file://") {
            PathBuf::from(stripped)
        } else {
            PathBuf::from(locator)
        };

        if path.is_relative() {
            if let Some(base) = &self.base {
                return Ok(base.join(path));
            }
        }

        Ok(path)
    }
}
