//! Filesystem-backed article storage and content-root file access.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs;
use tracing::debug;

use crate::application::repos::{ArticleRepo, RepoError, StoredArticle};
use crate::domain::articles::ArticleName;

/// Articles stored as markdown files in a single directory.
#[derive(Debug, Clone)]
pub struct FsArticleRepository {
    dir: PathBuf,
}

impl FsArticleRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &ArticleName) -> PathBuf {
        self.dir.join(name.as_str())
    }
}

fn map_io(err: std::io::Error) -> RepoError {
    if err.kind() == ErrorKind::NotFound {
        RepoError::NotFound
    } else {
        RepoError::from_storage(err)
    }
}

async fn file_modified(path: &Path) -> Result<OffsetDateTime, RepoError> {
    let metadata = fs::metadata(path).await.map_err(map_io)?;
    if !metadata.is_file() {
        return Err(RepoError::NotFound);
    }
    let modified = metadata.modified().map_err(RepoError::from_storage)?;
    Ok(OffsetDateTime::from(modified))
}

#[async_trait]
impl ArticleRepo for FsArticleRepository {
    async fn list_names(&self) -> Result<Vec<ArticleName>, RepoError> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(RepoError::from_storage)?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(RepoError::from_storage)? {
            let is_file = fs::metadata(entry.path())
                .await
                .map(|metadata| metadata.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }

            let file_name = entry.file_name();
            let Some(raw) = file_name.to_str() else {
                debug!(
                    target = "infra::fs",
                    path = %entry.path().display(),
                    "Skipping article with non UTF-8 file name"
                );
                continue;
            };
            match ArticleName::parse(raw) {
                Ok(name) => names.push(name),
                Err(err) => debug!(
                    target = "infra::fs",
                    file_name = raw,
                    reason = %err,
                    "Skipping unlisted file"
                ),
            }
        }

        Ok(names)
    }

    async fn modified(&self, name: &ArticleName) -> Result<OffsetDateTime, RepoError> {
        file_modified(&self.path_for(name)).await
    }

    async fn read(&self, name: &ArticleName) -> Result<StoredArticle, RepoError> {
        let path = self.path_for(name);
        let modified = file_modified(&path).await?;
        let bytes = fs::read(&path).await.map_err(map_io)?;
        let markdown = String::from_utf8(bytes).map_err(|_| RepoError::Encoding {
            name: name.to_string(),
        })?;
        Ok(StoredArticle { markdown, modified })
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        fs::read_dir(&self.dir)
            .await
            .map(|_| ())
            .map_err(RepoError::from_storage)
    }
}

#[derive(Debug, Error)]
pub enum ContentFileError {
    #[error("invalid content path")]
    InvalidPath,
    #[error("content file not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read-only access to files below the content root.
#[derive(Debug, Clone)]
pub struct ContentFiles {
    root: PathBuf,
}

impl ContentFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read a regular file addressed by a request path such as `/img/a.png`.
    /// Directories are never served.
    pub async fn read(&self, request_path: &str) -> Result<Bytes, ContentFileError> {
        let absolute = self.resolve(request_path)?;
        let metadata = fs::metadata(&absolute).await.map_err(not_found_or_io)?;
        if !metadata.is_file() {
            return Err(ContentFileError::NotFound);
        }
        let data = fs::read(&absolute).await.map_err(not_found_or_io)?;
        Ok(Bytes::from(data))
    }

    /// Map a request path onto the content root. Each segment is
    /// percent-decoded on its own, so an encoded separator cannot introduce a
    /// new path component.
    fn resolve(&self, request_path: &str) -> Result<PathBuf, ContentFileError> {
        let mut relative = PathBuf::new();
        for segment in request_path.split('/').filter(|segment| !segment.is_empty()) {
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|_| ContentFileError::InvalidPath)?;
            if decoded.contains(['/', '\\', '\0']) {
                return Err(ContentFileError::InvalidPath);
            }
            relative.push(&*decoded);
        }

        if relative.as_os_str().is_empty() {
            return Err(ContentFileError::InvalidPath);
        }
        let escapes = relative.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if relative.is_absolute() || escapes {
            return Err(ContentFileError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn not_found_or_io(err: std::io::Error) -> ContentFileError {
    if err.kind() == ErrorKind::NotFound {
        ContentFileError::NotFound
    } else {
        ContentFileError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> ArticleName {
        ArticleName::parse(raw).expect("valid")
    }

    #[tokio::test]
    async fn lists_regular_files_and_skips_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.md"), "# A").expect("write");
        std::fs::write(dir.path().join(".hidden.md"), "x").expect("write");
        std::fs::create_dir(dir.path().join("drafts")).expect("mkdir");

        let repo = FsArticleRepository::new(dir.path());
        let names = repo.list_names().await.expect("list");
        assert_eq!(names, vec![name("a.md")]);
    }

    #[tokio::test]
    async fn read_returns_markdown_and_mtime() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.md"), "# A\n").expect("write");

        let repo = FsArticleRepository::new(dir.path());
        let stored = repo.read(&name("a.md")).await.expect("read");
        assert_eq!(stored.markdown, "# A\n");
        assert_eq!(
            repo.modified(&name("a.md")).await.expect("mtime"),
            stored.modified
        );
    }

    #[tokio::test]
    async fn missing_article_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FsArticleRepository::new(dir.path());
        assert!(matches!(
            repo.read(&name("missing.md")).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn invalid_utf8_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bin.md"), [0xff, 0xfe, 0x00]).expect("write");
        let repo = FsArticleRepository::new(dir.path());
        assert!(matches!(
            repo.read(&name("bin.md")).await,
            Err(RepoError::Encoding { .. })
        ));
    }

    #[tokio::test]
    async fn health_check_fails_for_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FsArticleRepository::new(dir.path().join("absent"));
        assert!(repo.health_check().await.is_err());
    }

    #[tokio::test]
    async fn content_files_reject_traversal_and_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("img")).expect("mkdir");
        std::fs::write(dir.path().join("img/a.txt"), "hi").expect("write");
        let files = ContentFiles::new(dir.path());

        assert_eq!(
            files.read("/img/a.txt").await.expect("read"),
            Bytes::from_static(b"hi")
        );
        assert!(matches!(
            files.read("/../secret").await,
            Err(ContentFileError::InvalidPath)
        ));
        assert!(matches!(
            files.read("/img").await,
            Err(ContentFileError::NotFound)
        ));
        assert!(matches!(
            files.read("/").await,
            Err(ContentFileError::InvalidPath)
        ));
    }

    #[tokio::test]
    async fn content_paths_are_percent_decoded_per_segment() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("café")).expect("mkdir");
        std::fs::write(dir.path().join("café/my notes.txt"), "decoded").expect("write");
        let files = ContentFiles::new(dir.path());

        assert_eq!(
            files.read("/caf%C3%A9/my%20notes.txt").await.expect("read"),
            Bytes::from_static(b"decoded")
        );
        let rejected = [
            "/%2e%2e/secret",
            "/caf%C3%A9%2Fmy%20notes.txt",
            "/a%5Cb",
            "/a%00b",
            "/%FF",
        ];
        for path in rejected {
            assert!(
                matches!(files.read(path).await, Err(ContentFileError::InvalidPath)),
                "{path} should be rejected"
            );
        }
    }
}
