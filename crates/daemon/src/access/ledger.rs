//! Consumption accounting for delivered shares.

use crate::store::DescriptorStore;

use super::resolver::ResolvedShare;

/// Result of recording one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// A limited entry was decremented and the descriptor rewritten.
    Decremented { remaining: i64 },
    /// The entry does not count uses; nothing was written.
    Unlimited,
    /// Nothing to record: the entry was already exhausted or no longer exists.
    Skipped,
    /// The counter was decremented in memory but the save failed.
    NotPersisted,
}

/// Decrements password entries after successful deliveries.
#[derive(Debug, Clone)]
pub struct UsageLedger {
    store: DescriptorStore,
}

impl UsageLedger {
    pub fn new(store: DescriptorStore) -> Self {
        Self { store }
    }

    /// Records one completed delivery for `resolved`.
    ///
    /// Must only be called once the response body was fully written. Save
    /// failures are logged and reported as [`Consumption::NotPersisted`];
    /// they never fail the request that was already served.
    pub fn consume(&self, resolved: ResolvedShare) -> Consumption {
        let login = resolved.login().to_string();
        let share_name = resolved.share().name.clone();
        let (root, share, password, mut descriptor) = resolved.into_parts();

        let Some(entry) = descriptor.entry_mut(share, password) else {
            tracing::warn!(login, share = %share_name, "Matched password entry vanished");
            return Consumption::Skipped;
        };

        if entry.is_unlimited() {
            return Consumption::Unlimited;
        }
        if !entry.consume() {
            return Consumption::Skipped;
        }
        let remaining = entry.remaining_uses;

        if let Err(e) = self.store.save(&root, &descriptor) {
            tracing::error!(
                login,
                share = %share_name,
                error = %e,
                "Failed to persist password usage"
            );
            return Consumption::NotPersisted;
        }

        tracing::info!(login, share = %share_name, remaining, "Password use consumed");
        Consumption::Decremented { remaining }
    }
}
