//! Subscription tier lookup
//!
//! The session never caches the tier: it asks its [`TierSource`] on every
//! skip decision, so an upgrade takes effect on the very next skip.

use crate::types::Tier;
use std::sync::{Arc, RwLock};

/// Supplier of the current user's tier (the auth collaborator)
pub trait TierSource: Send + Sync {
    /// Tier right now
    fn tier(&self) -> Tier;
}

impl TierSource for Tier {
    fn tier(&self) -> Tier {
        *self
    }
}

impl<F> TierSource for F
where
    F: Fn() -> Tier + Send + Sync,
{
    fn tier(&self) -> Tier {
        self()
    }
}

/// Tier shared between an auth layer and a session
///
/// Clones observe the same value.
#[derive(Debug, Clone, Default)]
pub struct SharedTier {
    tier: Arc<RwLock<Tier>>,
}

impl SharedTier {
    /// Create a shared tier starting at `tier`
    pub fn new(tier: Tier) -> Self {
        Self {
            tier: Arc::new(RwLock::new(tier)),
        }
    }

    /// Replace the tier (e.g. after an upgrade)
    pub fn set(&self, tier: Tier) {
        let mut current = self.tier.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = tier;
    }
}

impl TierSource for SharedTier {
    fn tier(&self) -> Tier {
        *self.tier.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_tier_updates_all_clones() {
        let tier = SharedTier::new(Tier::Free);
        let seen_by_session = tier.clone();

        tier.set(Tier::Premium);
        assert_eq!(seen_by_session.tier(), Tier::Premium);
    }

    #[test]
    fn closures_are_tier_sources() {
        let source = || Tier::Premium;
        assert_eq!(TierSource::tier(&source), Tier::Premium);
    }
}
