//! Per-collection collateral boost requirements.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use ebb_core::error::{StateError, ValidationError};
use ebb_core::types::{CollateralItem, CollectionId};

/// Boost granted for locking at least `required_count` items of a collection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct NftRequirement {
    pub is_active: bool,
    pub required_count: u32,
    pub boost_bps: u64,
}

impl NftRequirement {
    pub fn active(required_count: u32, boost_bps: u64) -> Self {
        Self {
            is_active: true,
            required_count,
            boost_bps,
        }
    }
}

#[derive(Debug, Clone, Default, bincode::Encode, bincode::Decode)]
pub struct BoostRegistry {
    requirements: HashMap<CollectionId, NftRequirement>,
}

impl BoostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the requirement for `collection`.
    pub fn set_requirement(
        &mut self,
        collection: CollectionId,
        requirement: NftRequirement,
        max_boost_bps: u64,
    ) -> Result<(), ValidationError> {
        collection.ensure_nonzero()?;
        if requirement.required_count == 0 {
            return Err(ValidationError::ZeroRequiredCount);
        }
        if requirement.boost_bps > max_boost_bps {
            return Err(ValidationError::BoostTooHigh {
                bps: requirement.boost_bps,
                max: max_boost_bps,
            });
        }
        self.requirements.insert(collection, requirement);
        Ok(())
    }

    pub fn requirement(&self, collection: &CollectionId) -> Option<&NftRequirement> {
        self.requirements.get(collection)
    }

    /// Reject collateral from a configured but deactivated collection.
    ///
    /// Unconfigured collections are accepted; they simply grant no boost.
    pub fn ensure_accepts(&self, collection: &CollectionId) -> Result<(), StateError> {
        match self.requirements.get(collection) {
            Some(req) if !req.is_active => Err(StateError::CollectionInactive(*collection)),
            _ => Ok(()),
        }
    }

    fn counts<'a>(
        items: impl IntoIterator<Item = &'a CollateralItem>,
    ) -> HashMap<CollectionId, u32> {
        let mut counts = HashMap::new();
        for item in items {
            *counts.entry(item.collection).or_insert(0u32) += 1;
        }
        counts
    }

    /// Sum of boosts over every active collection whose requirement `items` meets.
    pub fn total_boost<'a>(&self, items: impl IntoIterator<Item = &'a CollateralItem>) -> u64 {
        Self::counts(items)
            .into_iter()
            .filter_map(|(collection, count)| {
                self.requirements
                    .get(&collection)
                    .filter(|req| req.is_active && count >= req.required_count)
                    .map(|req| req.boost_bps)
            })
            .fold(0u64, u64::saturating_add)
    }

    /// Whether `items` meets the active requirement for `collection`.
    pub fn qualifies<'a>(
        &self,
        items: impl IntoIterator<Item = &'a CollateralItem>,
        collection: &CollectionId,
    ) -> bool {
        let Some(req) = self.requirements.get(collection).filter(|req| req.is_active) else {
            return false;
        };
        let held = items
            .into_iter()
            .filter(|item| item.collection == *collection)
            .count();
        held >= req.required_count as usize
    }
}
