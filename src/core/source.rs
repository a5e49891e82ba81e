//! TR-003: Raw-document sources.
//!
//! A `DocumentSource` turns a URI into raw bytes. The resolver never touches
//! the network itself; callers plug in whatever source fits their environment.

use super::error::SourceError;
use rustc_hash::FxHashMap;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Fetches raw document bytes by URI.
pub trait DocumentSource {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, SourceError>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, SourceError> {
        (**self).fetch(uri)
    }
}

/// Reads local paths and `file://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl DocumentSource for FsSource {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, SourceError> {
        let path = local_path(uri)?;
        tracing::debug!(uri, path = %path.display(), "reading document");
        std::fs::read(&path).map_err(|source| SourceError::Io {
            uri: uri.to_string(),
            source,
        })
    }
}

/// In-memory URI → bytes map.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    docs: FxHashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, builder style.
    pub fn with(mut self, uri: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, content);
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.docs.insert(uri.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl DocumentSource for MemorySource {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, SourceError> {
        self.docs
            .get(uri)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                uri: uri.to_string(),
            })
    }
}

/// Parse `uri` as a URL only when it carries a real scheme. Single-letter
/// schemes are drive letters, not URLs.
fn as_url(uri: &str) -> Option<Url> {
    Url::parse(uri).ok().filter(|u| u.scheme().len() > 1)
}

fn local_path(uri: &str) -> Result<PathBuf, SourceError> {
    match as_url(uri) {
        None => Ok(PathBuf::from(uri)),
        Some(url) if url.scheme() == "file" => {
            url.to_file_path().map_err(|()| SourceError::InvalidUri {
                uri: uri.to_string(),
                reason: "not a local file path".to_string(),
            })
        }
        Some(_) => Err(SourceError::UnsupportedScheme {
            uri: uri.to_string(),
        }),
    }
}

/// Resolve `uri` relative to the location of the document that references it.
///
/// Absolute URLs and absolute paths are returned unchanged. A relative URI is
/// joined against the directory of `base`, which may be a local path or a URL.
pub fn join_uri(base: &str, uri: &str) -> Result<String, SourceError> {
    if as_url(uri).is_some() || Path::new(uri).is_absolute() || base.is_empty() {
        return Ok(uri.to_string());
    }
    if let Some(base_url) = as_url(base) {
        return base_url
            .join(uri)
            .map(String::from)
            .map_err(|e| SourceError::InvalidUri {
                uri: uri.to_string(),
                reason: e.to_string(),
            });
    }
    let dir = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(uri).to_string_lossy().into_owned())
}

/// Identity of a URI for cycle detection: URLs in their parsed form, paths
/// with `.` and `..` collapsed lexically. Symlinks are not followed.
pub fn normalize_uri(uri: &str) -> String {
    if let Some(url) = as_url(uri) {
        return url.to_string();
    }
    let mut parts: Vec<Component<'_>> = Vec::new();
    for part in Path::new(uri).components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(part),
            },
            _ => parts.push(part),
        }
    }
    parts.iter().collect::<PathBuf>().to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tr003_join_relative_path() {
        assert_eq!(
            join_uri("/work/app/devfile.yaml", "../base/parent.yaml").unwrap(),
            "/work/app/../base/parent.yaml"
        );
        assert_eq!(
            join_uri("devfile.yaml", "parent.yaml").unwrap(),
            "parent.yaml"
        );
    }

    #[test]
    fn test_tr003_join_relative_url() {
        assert_eq!(
            join_uri("https://registry.example/stacks/node/devfile.yaml", "../base.yaml").unwrap(),
            "https://registry.example/stacks/base.yaml"
        );
    }

    #[test]
    fn test_tr003_join_absolute_unchanged() {
        assert_eq!(
            join_uri("/a/devfile.yaml", "https://x.example/p.yaml").unwrap(),
            "https://x.example/p.yaml"
        );
        assert_eq!(join_uri("/a/devfile.yaml", "/etc/p.yaml").unwrap(), "/etc/p.yaml");
        assert_eq!(join_uri("", "p.yaml").unwrap(), "p.yaml");
    }

    #[test]
    fn test_tr003_fs_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.yaml");
        std::fs::write(&path, "schemaVersion: 2.2.0\n").unwrap();
        let bytes = FsSource.fetch(path.to_str().unwrap()).unwrap();
        assert_eq!(bytes, b"schemaVersion: 2.2.0\n");

        let url = Url::from_file_path(&path).unwrap();
        assert_eq!(FsSource.fetch(url.as_str()).unwrap(), bytes);
    }

    #[test]
    fn test_tr003_fs_source_errors() {
        assert!(matches!(
            FsSource.fetch("https://registry.example/devfile.yaml"),
            Err(SourceError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            FsSource.fetch("/definitely/not/here.yaml"),
            Err(SourceError::Io { .. })
        ));
    }

    #[test]
    fn test_tr003_memory_source() {
        let src = MemorySource::new().with("mem://p", "schemaVersion: 2.2.0");
        assert_eq!(src.len(), 1);
        assert_eq!(src.fetch("mem://p").unwrap(), b"schemaVersion: 2.2.0");
        assert!(matches!(
            src.fetch("mem://q"),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_tr003_normalize_uri() {
        assert_eq!(normalize_uri("s/x/../devfile.yaml"), "s/devfile.yaml");
        assert_eq!(normalize_uri("./a/./b.yaml"), "a/b.yaml");
        assert_eq!(normalize_uri("s/x/../../../p.yaml"), "../p.yaml");
        assert_eq!(normalize_uri("/work/app/../base/p.yaml"), "/work/base/p.yaml");
        assert_eq!(normalize_uri("/../p.yaml"), "/p.yaml");
        assert_eq!(
            normalize_uri("https://registry.example/a/../b.yaml"),
            "https://registry.example/b.yaml"
        );
        assert_ne!(normalize_uri("s/x/devfile.yaml"), normalize_uri("s/x/../devfile.yaml"));
    }
}
