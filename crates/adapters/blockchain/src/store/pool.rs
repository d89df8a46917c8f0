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

use std::{collections::BTreeMap, sync::Arc};

use clmm_model::defi::{
    BlockHeader, LogPosition, PoolLog, PoolSnapshot,
    pool_analysis::{apply_block_logs, compare_pool_state},
};

use crate::bootstrap::{BootstrapError, BootstrapFetcher, PoolDescriptor};

/// Snapshot history of a single pool, bounded to the most recent blocks.
///
/// Snapshots are immutable once published; applying a block produces a new snapshot rather
/// than mutating the previous one, so readers holding an older snapshot are unaffected.
#[derive(Debug)]
pub struct PoolStateStore {
    descriptor: PoolDescriptor,
    fetcher: Arc<BootstrapFetcher>,
    max_blocks_history: usize,
    history: BTreeMap<u64, PoolSnapshot>,
}

impl PoolStateStore {
    /// Creates a new empty [`PoolStateStore`] instance.
    #[must_use]
    pub fn new(
        descriptor: PoolDescriptor,
        fetcher: Arc<BootstrapFetcher>,
        max_blocks_history: usize,
    ) -> Self {
        Self {
            descriptor,
            fetcher,
            max_blocks_history: max_blocks_history.max(1),
            history: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &PoolDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Returns the newest snapshot, valid or not.
    #[must_use]
    pub fn latest(&self) -> Option<&PoolSnapshot> {
        self.history.last_key_value().map(|(_, snapshot)| snapshot)
    }

    /// Returns the newest snapshot if it is valid.
    ///
    /// An invalid newest snapshot hides older valid ones: they are stale.
    #[must_use]
    pub fn latest_valid(&self) -> Option<&PoolSnapshot> {
        self.latest().filter(|snapshot| snapshot.is_valid())
    }

    /// Returns the newest snapshot at or below `block`.
    #[must_use]
    pub fn state_at(&self, block: u64) -> Option<&PoolSnapshot> {
        self.history
            .range(..=block)
            .next_back()
            .map(|(_, snapshot)| snapshot)
    }

    /// Bootstraps the pool at `header` and publishes the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the bootstrap fetch fails.
    pub async fn initialize(&mut self, header: &BlockHeader) -> Result<PoolSnapshot, BootstrapError> {
        tracing::debug!("Initializing {} at {header}", self.descriptor);
        let snapshot = self.bootstrap(header).await?;
        Ok(self.publish(snapshot))
    }

    /// Applies one block of logs for this pool and publishes the resulting snapshot.
    ///
    /// A block that does not extend the stored chain rolls history back and resyncs at
    /// `header`. A block that leaves the state invalid is also resynced. Logs at or before the
    /// last applied position are skipped, so redelivering a block is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if a required resync fails. The invalid snapshot stays published.
    pub async fn process_block_logs(
        &mut self,
        logs: &[PoolLog],
        header: &BlockHeader,
    ) -> Result<PoolSnapshot, BootstrapError> {
        let Some(latest) = self.latest().cloned() else {
            return self.resync(header).await;
        };

        if self.is_reorg(header) {
            tracing::warn!(
                "Reorg detected for {} at {header}, rolling back",
                self.descriptor
            );
            self.rollback(header.number.saturating_sub(1));
            if let Some(parent) = self.latest()
                && !header.extends(&parent.header)
            {
                self.history.pop_last();
            }
            return self.resync(header).await;
        }

        if header.number < latest.block_number() {
            tracing::debug!(
                "Ignoring {header} for {}, already at block {}",
                self.descriptor,
                latest.block_number()
            );
            return Ok(latest);
        }

        if !latest.is_valid() {
            return self.resync(header).await;
        }

        let next = apply_block_logs(&latest.state, logs, header);
        let is_valid = next.is_valid;
        let snapshot = self.publish(PoolSnapshot::new(next, *header));

        if is_valid {
            Ok(snapshot)
        } else {
            tracing::info!(
                "{} invalidated at {header}, resyncing",
                self.descriptor
            );
            self.resync(header).await
        }
    }

    /// Drops every snapshot above `block`, returning how many were removed.
    pub fn rollback(&mut self, block: u64) -> usize {
        let Some(above) = block.checked_add(1) else {
            return 0;
        };
        let dropped = self.history.split_off(&above).len();
        if dropped > 0 {
            tracing::debug!(
                "Rolled back {dropped} snapshots of {} above block {block}",
                self.descriptor
            );
        }
        dropped
    }

    /// Replaces the state at `header` with a fresh bootstrap.
    ///
    /// # Errors
    ///
    /// Returns an error if the bootstrap fetch fails.
    pub async fn resync(&mut self, header: &BlockHeader) -> Result<PoolSnapshot, BootstrapError> {
        tracing::info!("Resyncing {} at {header}", self.descriptor);
        let snapshot = self.bootstrap(header).await?;

        if cfg!(debug_assertions)
            && let Some(previous) = self.history.get(&header.number)
            && previous.is_valid()
        {
            compare_pool_state(&previous.state, &snapshot.state);
        }

        let snapshot = self.publish(snapshot);
        tracing::info!(
            "Resynced {} at {header} with {} ticks",
            self.descriptor,
            snapshot.state.initialized_tick_count()
        );
        Ok(snapshot)
    }

    async fn bootstrap(&self, header: &BlockHeader) -> Result<PoolSnapshot, BootstrapError> {
        let raw = self.fetcher.fetch(&self.descriptor, header.number).await?;
        let mut state = raw.into_pool_state(self.descriptor.variant(), header);
        // The fetched state already reflects every log of this block
        state.last_applied = Some(LogPosition::new(header.number, u32::MAX, u32::MAX));
        Ok(PoolSnapshot::new(state, *header))
    }

    fn is_reorg(&self, header: &BlockHeader) -> bool {
        if let Some(existing) = self.history.get(&header.number) {
            return existing.header.hash != header.hash;
        }
        header
            .number
            .checked_sub(1)
            .and_then(|parent| self.history.get(&parent))
            .is_some_and(|parent| !header.extends(&parent.header))
    }

    fn publish(&mut self, snapshot: PoolSnapshot) -> PoolSnapshot {
        self.history.insert(snapshot.block_number(), snapshot.clone());
        while self.history.len() > self.max_blocks_history {
            self.history.pop_first();
        }
        snapshot
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
