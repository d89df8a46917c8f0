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

use alloy::primitives::U256;
use clmm_common::clock::Clock;
use clmm_model::defi::{
    BlockHeader, PoolLog, PoolSnapshot,
    pool_analysis::{OutputResult, SwapSide, get_outputs, simulation::destination_balance},
};
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::pool::PoolStateStore;
use crate::{
    bootstrap::{BootstrapError, BootstrapFetcher, PoolDescriptor, PoolKey},
    cache::NegativeExistenceCache,
};

/// The set of tracked pools, constructed once by the hosting process and shared by `Arc`.
///
/// Writers for one pool are serialized by that pool's mutex. Readers never take it: every
/// write publishes the store's newest snapshot to a concurrent map they read from.
#[derive(Debug)]
pub struct PoolRegistry {
    fetcher: Arc<BootstrapFetcher>,
    negative_cache: Arc<NegativeExistenceCache>,
    clock: Arc<dyn Clock>,
    max_blocks_history: usize,
    stores: DashMap<PoolKey, Arc<Mutex<PoolStateStore>>>,
    published: DashMap<PoolKey, PoolSnapshot>,
}

impl PoolRegistry {
    /// Creates a new [`PoolRegistry`] instance.
    #[must_use]
    pub fn new(
        fetcher: Arc<BootstrapFetcher>,
        negative_cache: Arc<NegativeExistenceCache>,
        clock: Arc<dyn Clock>,
        max_blocks_history: usize,
    ) -> Self {
        Self {
            fetcher,
            negative_cache,
            clock,
            max_blocks_history,
            stores: DashMap::new(),
            published: DashMap::new(),
        }
    }

    /// Number of pools currently tracked.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.stores.len()
    }

    /// Returns the tracked valid snapshot for the pool, bootstrapping it at `header` if needed.
    ///
    /// Pools recorded absent in the negative cache are not fetched. A bootstrap that finds no
    /// pool records the absence and returns `Ok(None)`. A tracked pool whose latest snapshot
    /// was invalidated is resynced at `header` before it is returned. Negative cache failures
    /// are logged and never block a bootstrap.
    ///
    /// # Errors
    ///
    /// Returns a non-terminal [`BootstrapError`] if the bootstrap fails for any other reason.
    pub async fn get_or_init(
        &self,
        descriptor: &PoolDescriptor,
        header: &BlockHeader,
    ) -> Result<Option<PoolSnapshot>, BootstrapError> {
        let key = descriptor.key;
        if let Some(snapshot) = self.latest_snapshot(&key) {
            return Ok(Some(snapshot));
        }

        let cache_key = negative_cache_key(descriptor);
        let now_ms = self.clock.timestamp_ms();
        match self.negative_cache.contains(&cache_key, now_ms).await {
            Ok(true) => return Ok(None),
            Ok(false) => {}
            Err(e) => tracing::warn!("Negative cache lookup failed for {descriptor}: {e}"),
        }

        let store = self
            .stores
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Mutex::new(PoolStateStore::new(
                    descriptor.clone(),
                    self.fetcher.clone(),
                    self.max_blocks_history,
                )))
            })
            .clone();
        let mut guard = store.lock().await;

        // Another caller may have bootstrapped while we waited
        if let Some(latest) = guard.latest_valid() {
            return Ok(Some(latest.clone()));
        }

        let result = if guard.latest().is_some() {
            guard.process_block_logs(&[], header).await
        } else {
            guard.initialize(header).await
        };

        match result {
            Ok(snapshot) => {
                self.published.insert(key, snapshot.clone());
                Ok(snapshot.is_valid().then_some(snapshot))
            }
            Err(e) if e.is_terminal() => {
                drop(guard);
                self.stores.remove(&key);
                self.published.remove(&key);
                tracing::info!("Pool {descriptor} does not exist: {e}");
                if let Err(e) = self.negative_cache.add(&cache_key, now_ms).await {
                    tracing::warn!("Negative cache add failed for {descriptor}: {e}");
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the latest snapshot of the pool if it is valid.
    #[must_use]
    pub fn latest_snapshot(&self, key: &PoolKey) -> Option<PoolSnapshot> {
        self.published
            .get(key)
            .filter(|snapshot| snapshot.is_valid())
            .map(|snapshot| snapshot.clone())
    }

    /// Applies one block of logs to a tracked pool.
    ///
    /// Returns `Ok(None)` if the pool is not tracked. The store's newest snapshot is published
    /// even when a resync fails, so readers stop seeing a stale state as valid.
    ///
    /// # Errors
    ///
    /// Returns an error if a required resync fails.
    pub async fn process_block_logs(
        &self,
        key: &PoolKey,
        logs: &[PoolLog],
        header: &BlockHeader,
    ) -> Result<Option<PoolSnapshot>, BootstrapError> {
        let Some(store) = self.stores.get(key).map(|store| store.clone()) else {
            tracing::debug!("Ignoring logs for untracked pool {key}");
            return Ok(None);
        };
        let mut guard = store.lock().await;

        let result = guard.process_block_logs(logs, header).await;
        match guard.latest() {
            Some(latest) => {
                self.published.insert(*key, latest.clone());
            }
            None => {
                self.published.remove(key);
            }
        }
        result.map(Some)
    }

    /// Prices `amounts` against the latest valid snapshot of the pool.
    ///
    /// Returns `None` if the pool has no valid snapshot or its destination balance cannot
    /// cover the first quote of the ladder.
    #[must_use]
    pub fn quote(
        &self,
        key: &PoolKey,
        amounts: &[U256],
        zero_for_one: bool,
        side: SwapSide,
    ) -> Option<OutputResult> {
        let snapshot = self.latest_snapshot(key)?;
        let state = &snapshot.state;
        get_outputs(
            state,
            amounts,
            zero_for_one,
            side,
            destination_balance(state, zero_for_one),
        )
    }
}

fn negative_cache_key(descriptor: &PoolDescriptor) -> String {
    format!("{}:{}", descriptor.dex.name, descriptor.key)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
