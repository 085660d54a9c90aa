//! Load and save of per-namespace descriptor files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use descriptor::{CodecError, ShareDescriptorSet, DEFAULT_DESCRIPTOR_FILE};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while reading or writing a descriptor file.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor file does not exist.
    #[error("descriptor not found: {0}")]
    NotFound(PathBuf),

    /// The descriptor file exists but could not be read.
    #[error("failed to read descriptor {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The descriptor content could not be decoded.
    #[error("malformed descriptor {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// The descriptor could not be encoded for writing.
    #[error("failed to encode descriptor {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// Writing or replacing the descriptor file failed.
    #[error("failed to write descriptor {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads and writes descriptor files located directly under namespace roots.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    file_name: String,
}

impl Default for DescriptorStore {
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTOR_FILE)
    }
}

impl DescriptorStore {
    /// Creates a store using `file_name` inside every namespace root.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Returns the descriptor path for a namespace root.
    pub fn path_for(&self, namespace_root: &Path) -> PathBuf {
        namespace_root.join(&self.file_name)
    }

    /// Reads and decodes the descriptor of a namespace.
    pub fn load(&self, namespace_root: &Path) -> Result<ShareDescriptorSet, DescriptorError> {
        let path = self.path_for(namespace_root);

        let contents = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                DescriptorError::NotFound(path.clone())
            } else {
                DescriptorError::ReadFailed {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let set = ShareDescriptorSet::from_yaml(&contents).map_err(|source| {
            DescriptorError::Malformed {
                path: path.clone(),
                source,
            }
        })?;

        tracing::debug!("Loaded {} shares from {:?}", set.shares.len(), path);
        Ok(set)
    }

    /// Encodes `set` and replaces the descriptor of a namespace.
    ///
    /// The content goes to a uniquely named sibling file that is then renamed
    /// over the descriptor, so concurrent writers never interleave inside one
    /// file. The last rename wins.
    pub fn save(
        &self,
        namespace_root: &Path,
        set: &ShareDescriptorSet,
    ) -> Result<(), DescriptorError> {
        let path = self.path_for(namespace_root);

        let contents = set.to_yaml().map_err(|source| DescriptorError::Encode {
            path: path.clone(),
            source,
        })?;

        let temp_path =
            namespace_root.join(format!(".{}.{}.tmp", self.file_name, Uuid::new_v4().simple()));

        if let Err(source) = fs::write(&temp_path, &contents) {
            let _ = fs::remove_file(&temp_path);
            return Err(DescriptorError::WriteFailed { path, source });
        }

        if let Err(source) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(DescriptorError::WriteFailed { path, source });
        }

        tracing::debug!("Saved {} shares to {:?}", set.shares.len(), path);
        Ok(())
    }
}
