//! Login → namespace root registry.
//!
//! Built once from the configuration and shared read-only between requests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::UshareEntry;

/// A resolved namespace: the directory owned by one login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Login that owns the namespace.
    pub login: String,
    /// Root directory of the namespace.
    pub root: PathBuf,
}

/// Immutable registry of namespaces, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    entries: Vec<Namespace>,
}

impl NamespaceRegistry {
    /// Builds the registry from configured entries.
    ///
    /// Duplicate logins are kept but only the first can ever match; a warning
    /// is logged for each shadowed entry.
    pub fn new(ushares: &[UshareEntry]) -> Self {
        let mut seen = HashSet::new();
        let entries = ushares
            .iter()
            .map(|entry| {
                if !seen.insert(entry.login.as_str()) {
                    tracing::warn!(
                        login = %entry.login,
                        root = %entry.root.display(),
                        "Duplicate login in ushares; only the first entry is used"
                    );
                }
                Namespace {
                    login: entry.login.clone(),
                    root: entry.root.clone(),
                }
            })
            .collect();

        Self { entries }
    }

    /// Finds the namespace for `login` by exact match.
    pub fn lookup(&self, login: &str) -> Option<&Namespace> {
        self.entries.iter().find(|ns| ns.login == login)
    }

    /// Returns the root for `login`, if registered.
    pub fn root(&self, login: &str) -> Option<&Path> {
        self.lookup(login).map(|ns| ns.root.as_path())
    }

    /// Number of configured entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no login is configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
