//! Resolution of (login, share, password) to a deliverable share.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use descriptor::{PasswordEntry, PasswordIndex, Share, ShareDescriptorSet, ShareIndex};
use thiserror::Error;

use crate::registry::NamespaceRegistry;
use crate::store::{DescriptorError, DescriptorStore};

/// Reasons a resolution can fail.
///
/// The first three variants are distinct for diagnostics only; callers facing
/// a client must report them identically (see [`AccessError::is_forbidden`]).
#[derive(Debug, Error)]
pub enum AccessError {
    /// No namespace is registered for the login.
    #[error("unknown login: {0}")]
    UnknownLogin(String),

    /// The namespace has no share with the requested name.
    #[error("unknown share {share:?} for login {login:?}")]
    UnknownShare { login: String, share: String },

    /// No non-exhausted password entry of the share matches.
    #[error("invalid or exhausted password for share {share:?} of login {login:?}")]
    InvalidPassword { login: String, share: String },

    /// The namespace descriptor could not be loaded.
    #[error("descriptor unavailable for login {login:?}: {source}")]
    StoreUnavailable {
        login: String,
        #[source]
        source: DescriptorError,
    },
}

impl AccessError {
    /// Returns true for failures that must surface as an opaque "forbidden".
    pub fn is_forbidden(&self) -> bool {
        !matches!(self, AccessError::StoreUnavailable { .. })
    }
}

/// A successfully resolved request.
///
/// Carries the descriptor snapshot it was resolved against together with the
/// positions of the matched share and password entry, so the ledger can apply
/// its mutation to the same slot.
#[derive(Debug, Clone)]
pub struct ResolvedShare {
    login: String,
    namespace_root: PathBuf,
    share: ShareIndex,
    password: PasswordIndex,
    descriptor: ShareDescriptorSet,
}

impl ResolvedShare {
    /// Login the request authenticated as.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Root directory of the namespace.
    pub fn namespace_root(&self) -> &Path {
        &self.namespace_root
    }

    /// Position of the matched share in the snapshot.
    pub fn share_index(&self) -> ShareIndex {
        self.share
    }

    /// Position of the matched entry within its share.
    pub fn password_index(&self) -> PasswordIndex {
        self.password
    }

    /// The matched share.
    pub fn share(&self) -> &Share {
        &self.descriptor.shares[self.share.get()]
    }

    /// The matched password entry.
    pub fn entry(&self) -> &PasswordEntry {
        &self.share().passwords[self.password.get()]
    }

    /// Absolute filesystem path of the share's content.
    pub fn target_path(&self) -> PathBuf {
        join_share_path(&self.namespace_root, &self.share().path)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (PathBuf, ShareIndex, PasswordIndex, ShareDescriptorSet) {
        (self.namespace_root, self.share, self.password, self.descriptor)
    }
}

/// Joins a descriptor path onto a namespace root.
///
/// Leading separators are dropped, so `/report.pdf` stays inside the root
/// instead of replacing it.
pub fn join_share_path(root: &Path, relative: &str) -> PathBuf {
    let relative = Path::new(relative);
    let trimmed: PathBuf = relative
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(trimmed)
}

/// Resolves requests against the namespace registry and descriptor store.
#[derive(Debug, Clone)]
pub struct AccessResolver {
    registry: Arc<NamespaceRegistry>,
    store: DescriptorStore,
    log_secrets: bool,
}

impl AccessResolver {
    pub fn new(registry: Arc<NamespaceRegistry>, store: DescriptorStore) -> Self {
        Self {
            registry,
            store,
            log_secrets: false,
        }
    }

    /// Include the supplied password in failed-attempt log lines.
    pub fn log_secrets(mut self, enabled: bool) -> Self {
        self.log_secrets = enabled;
        self
    }

    /// Returns the namespace root for `login`, if registered.
    pub fn namespace_root(&self, login: &str) -> Option<&Path> {
        self.registry.root(login)
    }

    /// Resolves a request, short-circuiting on the first failing step.
    pub fn resolve(
        &self,
        login: &str,
        share_name: &str,
        password: &str,
    ) -> Result<ResolvedShare, AccessError> {
        let Some(namespace) = self.registry.lookup(login) else {
            tracing::warn!(login, "Unknown login");
            return Err(AccessError::UnknownLogin(login.to_string()));
        };

        let descriptor = self.store.load(&namespace.root).map_err(|source| {
            tracing::error!(login, error = %source, "Failed to load share descriptor");
            AccessError::StoreUnavailable {
                login: login.to_string(),
                source,
            }
        })?;

        let Some(share) = descriptor.find_share(share_name) else {
            tracing::warn!(login, share = share_name, "Unknown share");
            return Err(AccessError::UnknownShare {
                login: login.to_string(),
                share: share_name.to_string(),
            });
        };

        let Some(entry) = descriptor.shares[share.get()].find_password(password) else {
            if self.log_secrets {
                tracing::warn!(login, share = share_name, password, "Wrong password");
            } else {
                tracing::warn!(login, share = share_name, "Wrong password");
            }
            return Err(AccessError::InvalidPassword {
                login: login.to_string(),
                share: share_name.to_string(),
            });
        };

        tracing::debug!(
            login,
            share = share_name,
            entry = entry.get(),
            "Resolved share access"
        );

        Ok(ResolvedShare {
            login: login.to_string(),
            namespace_root: namespace.root.clone(),
            share,
            password: entry,
            descriptor,
        })
    }
}
