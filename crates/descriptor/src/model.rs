//! Share descriptor model.
//!
//! A [`ShareDescriptorSet`] is the decoded content of one namespace's
//! descriptor file. Lookups return typed indexes rather than references so a
//! caller can resolve a password first and mutate the same slot later without
//! holding a borrow across I/O.

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;

/// Position of a [`Share`] inside a [`ShareDescriptorSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShareIndex(usize);

impl ShareIndex {
    /// Returns the raw list position.
    pub fn get(self) -> usize {
        self.0
    }
}

/// Position of a [`PasswordEntry`] inside its [`Share`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PasswordIndex(usize);

impl PasswordIndex {
    /// Returns the raw list position.
    pub fn get(self) -> usize {
        self.0
    }
}

/// All shares exposed by one namespace.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShareDescriptorSet {
    /// Shares in file order. Lookups are first-match.
    #[serde(rename = "list", default)]
    pub shares: Vec<Share>,

    /// Top-level keys this model does not interpret.
    #[serde(flatten)]
    pub extra: Mapping,
}

/// A named file or directory exposed from a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    /// Share name, matched exactly against the requested share.
    pub name: String,

    /// File or directory path relative to the namespace root.
    pub path: String,

    /// Password entries in file order.
    #[serde(rename = "passes", default)]
    pub passwords: Vec<PasswordEntry>,

    /// Keys this model does not interpret.
    #[serde(flatten)]
    pub extra: Mapping,
}

/// A secret plus the number of deliveries it still permits.
///
/// `remaining_uses` is `> 0` for a limited password, `0` once exhausted and
/// negative for unlimited use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordEntry {
    /// The shared secret.
    #[serde(rename = "pass", deserialize_with = "scalar_string")]
    pub secret: String,

    /// Remaining deliveries. A missing value reads as exhausted.
    #[serde(rename = "left", default)]
    pub remaining_uses: i64,

    /// Keys this model does not interpret.
    #[serde(flatten)]
    pub extra: Mapping,
}

impl ShareDescriptorSet {
    /// Creates a descriptor set from a list of shares.
    pub fn new(shares: Vec<Share>) -> Self {
        Self {
            shares,
            extra: Mapping::new(),
        }
    }

    /// Finds the first share named exactly `name`.
    pub fn find_share(&self, name: &str) -> Option<ShareIndex> {
        self.shares
            .iter()
            .position(|share| share.name == name)
            .map(ShareIndex)
    }

    /// Returns the share at `index`, if it still exists.
    pub fn share(&self, index: ShareIndex) -> Option<&Share> {
        self.shares.get(index.0)
    }

    /// Returns the password entry addressed by a share/password index pair.
    pub fn entry(&self, share: ShareIndex, password: PasswordIndex) -> Option<&PasswordEntry> {
        self.shares.get(share.0)?.passwords.get(password.0)
    }

    /// Mutable variant of [`ShareDescriptorSet::entry`].
    pub fn entry_mut(
        &mut self,
        share: ShareIndex,
        password: PasswordIndex,
    ) -> Option<&mut PasswordEntry> {
        self.shares.get_mut(share.0)?.passwords.get_mut(password.0)
    }
}

impl Share {
    /// Creates a share with no extra keys.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        passwords: Vec<PasswordEntry>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            passwords,
            extra: Mapping::new(),
        }
    }

    /// Finds the first non-exhausted entry whose secret equals `secret`.
    ///
    /// Exhausted entries never match, even when the secret is identical.
    pub fn find_password(&self, secret: &str) -> Option<PasswordIndex> {
        self.passwords
            .iter()
            .position(|entry| entry.matches(secret))
            .map(PasswordIndex)
    }
}

impl PasswordEntry {
    /// Creates a password entry with no extra keys.
    pub fn new(secret: impl Into<String>, remaining_uses: i64) -> Self {
        Self {
            secret: secret.into(),
            remaining_uses,
            extra: Mapping::new(),
        }
    }

    /// Returns true once the entry has no uses left.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_uses == 0
    }

    /// Returns true for entries that are never decremented.
    pub fn is_unlimited(&self) -> bool {
        self.remaining_uses < 0
    }

    /// Exact comparison against a supplied secret, skipping exhausted entries.
    pub fn matches(&self, secret: &str) -> bool {
        !self.is_exhausted() && self.secret == secret
    }

    /// Records one use.
    ///
    /// Decrements a positive counter by one and returns `true`. Unlimited and
    /// exhausted entries are left unchanged and return `false`.
    pub fn consume(&mut self) -> bool {
        if self.remaining_uses > 0 {
            self.remaining_uses -= 1;
            true
        } else {
            false
        }
    }
}

/// Accepts any YAML scalar as a string, so `pass: 1234` reads as `"1234"`.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarVisitor;

    impl serde::de::Visitor<'_> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a string or scalar value")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: serde::de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(ScalarVisitor)
}
