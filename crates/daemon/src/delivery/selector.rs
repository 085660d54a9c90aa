//! Choice between single-file and archive delivery.

use std::io;
use std::path::{Path, PathBuf};

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use futures_util::StreamExt;
use thiserror::Error;
use tokio_util::io::ReaderStream;

use super::archive::{archive_stream, scan_tree, ARCHIVE_CHUNK_SIZE, ARCHIVE_EXTENSION};
use super::ByteStream;
use crate::access::ResolvedShare;

/// Errors raised before any byte of a delivery has been sent.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The share's path could not be stat'ed or opened.
    #[error("share path unavailable {path}: {source}")]
    PathUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The directory tree could not be scanned for archiving.
    #[error("cannot archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A response header could not be built from the share data.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

/// What kind of body a delivery produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    /// The raw bytes of a regular file.
    File,
    /// A tar.gz archive of a directory tree.
    Archive,
}

/// A prepared response: headers plus a body that has not started yet.
pub struct Delivery {
    pub kind: DeliveryKind,
    /// Attachment name advertised to the client.
    pub file_name: String,
    pub headers: HeaderMap,
    /// Value of the `Content-Length` header, when one is sent.
    pub length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("kind", &self.kind)
            .field("file_name", &self.file_name)
            .field("headers", &self.headers)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Prepares the response for a resolved share.
///
/// Regular files are streamed as-is under their base name. Directories are
/// streamed as `<share name>.tar.gz`. `content_type` is copied to the response
/// unchanged when present.
///
/// A share path ending in `/` archives the directory's contents at the archive
/// root; otherwise entries sit under the directory's own name.
pub async fn prepare(
    resolved: &ResolvedShare,
    content_type: Option<&HeaderValue>,
) -> Result<Delivery, DeliveryError> {
    let path = resolved.target_path();
    let share = resolved.share();

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|source| DeliveryError::PathUnavailable {
            path: path.clone(),
            source,
        })?;

    let (kind, file_name, body, length) = if metadata.is_dir() {
        let scan_path = path.clone();
        let entries = tokio::task::spawn_blocking(move || scan_tree(&scan_path))
            .await
            .map_err(|e| DeliveryError::Archive {
                path: path.clone(),
                source: io::Error::other(e),
            })?
            .map_err(|source| DeliveryError::Archive {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Archiving {} entries from {:?}", entries, path);

        let file_name = format!("{}.{}", share.name, ARCHIVE_EXTENSION);
        let root_name = if share.path.ends_with('/') {
            String::new()
        } else {
            archive_root_name(&path)
        };
        let body = archive_stream(path.clone(), root_name);
        (DeliveryKind::Archive, file_name, body, None)
    } else {
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|source| DeliveryError::PathUnavailable {
                path: path.clone(),
                source,
            })?;
        let file_name = base_name(&share.path).unwrap_or_else(|| share.name.clone());
        let body = ReaderStream::with_capacity(file, ARCHIVE_CHUNK_SIZE).boxed();
        // Empty files go out chunked so the body is still polled to its end.
        let length = Some(metadata.len()).filter(|&len| len > 0);
        (DeliveryKind::File, file_name, body, length)
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_DISPOSITION, attachment(&file_name)?);
    if let Some(value) = content_type {
        headers.insert(CONTENT_TYPE, value.clone());
    }
    if let Some(length) = length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok(Delivery {
        kind,
        file_name,
        headers,
        length,
        body,
    })
}

/// `Content-Disposition: attachment; filename=<name>`.
fn attachment(file_name: &str) -> Result<HeaderValue, DeliveryError> {
    HeaderValue::from_bytes(format!("attachment; filename={}", file_name).as_bytes())
        .map_err(|_| DeliveryError::InvalidHeader(file_name.to_string()))
}

/// Last component of a descriptor path, ignoring trailing separators.
fn base_name(path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Name of the top-level directory inside the archive.
fn archive_root_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use descriptor::{PasswordEntry, Share, ShareDescriptorSet};
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    use crate::access::AccessResolver;
    use crate::config::UshareEntry;
    use crate::registry::NamespaceRegistry;
    use crate::store::DescriptorStore;

    fn resolve(root: &Path, share: Share) -> ResolvedShare {
        let name = share.name.clone();
        let set = ShareDescriptorSet::new(vec![share]);
        DescriptorStore::default().save(root, &set).unwrap();
        let registry = NamespaceRegistry::new(&[UshareEntry::new("alice", root)]);
        AccessResolver::new(Arc::new(registry), DescriptorStore::default())
            .resolve("alice", &name, "pw")
            .unwrap()
    }

    async fn collect(body: ByteStream) -> Vec<u8> {
        let body = axum::body::Body::from_stream(body);
        body.collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_prepare_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        fs::write(temp_dir.path().join("docs/report.pdf"), b"%PDF-1.7").unwrap();
        let resolved = resolve(
            temp_dir.path(),
            Share::new("docs", "docs/report.pdf", vec![PasswordEntry::new("pw", 1)]),
        );

        let content_type = HeaderValue::from_static("application/x-www-form-urlencoded");
        let delivery = prepare(&resolved, Some(&content_type)).await.unwrap();

        assert_eq!(delivery.kind, DeliveryKind::File);
        assert_eq!(delivery.file_name, "report.pdf");
        assert_eq!(
            delivery.headers[CONTENT_DISPOSITION],
            "attachment; filename=report.pdf"
        );
        assert_eq!(delivery.headers[CONTENT_TYPE], content_type);
        assert_eq!(delivery.headers[CONTENT_LENGTH], "8");
        assert_eq!(delivery.length, Some(8));
        assert_eq!(collect(delivery.body).await, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_prepare_file_without_content_type() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();
        let resolved = resolve(
            temp_dir.path(),
            Share::new("a", "a.txt", vec![PasswordEntry::new("pw", -1)]),
        );

        let delivery = prepare(&resolved, None).await.unwrap();
        assert!(delivery.headers.get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_prepare_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("album")).unwrap();
        fs::write(temp_dir.path().join("album/1.jpg"), b"jpeg").unwrap();
        let resolved = resolve(
            temp_dir.path(),
            Share::new("photos", "album/", vec![PasswordEntry::new("pw", 1)]),
        );

        let delivery = prepare(&resolved, None).await.unwrap();

        assert_eq!(delivery.kind, DeliveryKind::Archive);
        assert_eq!(delivery.file_name, "photos.tar.gz");
        assert_eq!(
            delivery.headers[CONTENT_DISPOSITION],
            "attachment; filename=photos.tar.gz"
        );
        assert!(delivery.headers.get(CONTENT_LENGTH).is_none());

        let bytes = collect(delivery.body).await;
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes.as_slice()));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.jpg"]);
    }

    #[tokio::test]
    async fn test_prepare_directory_without_trailing_slash() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("album/2024")).unwrap();
        fs::write(temp_dir.path().join("album/2024/1.jpg"), b"jpeg").unwrap();
        let resolved = resolve(
            temp_dir.path(),
            Share::new("photos", "album", vec![PasswordEntry::new("pw", 1)]),
        );

        let delivery = prepare(&resolved, None).await.unwrap();
        let bytes = collect(delivery.body).await;
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes.as_slice()));
        let mut names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| {
                let path = e.unwrap().path().unwrap().to_string_lossy().into_owned();
                path.trim_end_matches('/').to_string()
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["album", "album/2024", "album/2024/1.jpg"]);
    }

    #[tokio::test]
    async fn test_prepare_empty_file_has_no_length() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("empty.txt"), b"").unwrap();
        let resolved = resolve(
            temp_dir.path(),
            Share::new("empty", "empty.txt", vec![PasswordEntry::new("pw", 1)]),
        );

        let delivery = prepare(&resolved, None).await.unwrap();
        assert_eq!(delivery.length, None);
        assert!(delivery.headers.get(CONTENT_LENGTH).is_none());
    }

    #[tokio::test]
    async fn test_prepare_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let resolved = resolve(
            temp_dir.path(),
            Share::new("gone", "missing.bin", vec![PasswordEntry::new("pw", 1)]),
        );

        let result = prepare(&resolved, None).await;
        assert!(matches!(result, Err(DeliveryError::PathUnavailable { .. })));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(base_name("a/b/report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(base_name("album/").as_deref(), Some("album"));
        assert_eq!(base_name(""), None);
    }

    #[test]
    fn test_attachment_rejects_control_characters() {
        assert!(attachment("ok name.txt").is_ok());
        assert!(matches!(
            attachment("bad\nname"),
            Err(DeliveryError::InvalidHeader(_))
        ));
    }
}
