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

use std::{sync::Arc, time::Duration};

use clmm_common::clock::Clock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{negative::NegativeExistenceCache, store::ScoredSetStore};

/// Spawns the periodic prune of `cache`, stopping when `cancel` fires.
///
/// Prune failures are logged and retried on the next tick.
pub fn spawn_negative_cache_sweeper<S>(
    cache: Arc<NegativeExistenceCache<S>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: ScoredSetStore + ?Sized + 'static,
{
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("Negative cache sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match cache.prune(clock.timestamp_ms()).await {
                        Ok(removed) => tracing::debug!("Negative cache sweep removed {removed}"),
                        Err(e) => tracing::warn!("Negative cache sweep failed: {e}"),
                    }
                }
            }
        }
    })
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
