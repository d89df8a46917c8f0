// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

use std::sync::Arc;

use super::store::ScoredSetStore;
use crate::config::NegativeCacheConfig;

/// A TTL-bounded record of pools confirmed absent, keyed by pool key.
///
/// Entries are scored with the time they were added. An entry older than the TTL counts as
/// absent even before a prune removes it.
#[derive(Debug)]
pub struct NegativeExistenceCache<S: ScoredSetStore + ?Sized = dyn ScoredSetStore> {
    store: Arc<S>,
    set_name: String,
    ttl_ms: u64,
}

impl<S: ScoredSetStore + ?Sized> NegativeExistenceCache<S> {
    /// Creates a new [`NegativeExistenceCache`] instance.
    #[must_use]
    pub fn new(store: Arc<S>, config: &NegativeCacheConfig) -> Self {
        Self {
            store,
            set_name: config.set_name.clone(),
            ttl_ms: config.ttl_ms,
        }
    }

    #[must_use]
    pub const fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Records `key` as absent at `now_ms`. Returns `false` if it was already recorded
    /// within the TTL.
    ///
    /// An entry that expired but was not yet pruned is rescored to `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn add(&self, key: &str, now_ms: u64) -> anyhow::Result<bool> {
        let mut added = self.store.add_nx(&self.set_name, key, now_ms).await?;
        if !added && !self.contains(key, now_ms).await? {
            self.store.upsert(&self.set_name, key, now_ms).await?;
            added = true;
        }
        tracing::debug!("Negative cache add {key} (new={added})");
        Ok(added)
    }

    /// Returns `true` if `key` was recorded absent within the TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn contains(&self, key: &str, now_ms: u64) -> anyhow::Result<bool> {
        let hit = match self.store.score(&self.set_name, key).await? {
            Some(added_ms) => now_ms.saturating_sub(added_ms) < self.ttl_ms,
            None => false,
        };
        if hit {
            tracing::debug!("Negative cache hit {key}");
        }
        Ok(hit)
    }

    /// Removes entries whose TTL has elapsed at `now_ms`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn prune(&self, now_ms: u64) -> anyhow::Result<usize> {
        let Some(cutoff) = now_ms.checked_sub(self.ttl_ms) else {
            return Ok(0);
        };
        self.store
            .remove_range_by_score(&self.set_name, 0, cutoff)
            .await
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
