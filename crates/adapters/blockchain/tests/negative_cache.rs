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

//! Absent pools are remembered in the negative cache until the sweeper expires them.

use std::{sync::Arc, time::Duration};

use alloy::primitives::{Address, B256, address};
use clmm_blockchain::{
    bootstrap::{BootstrapFetcher, PoolDescriptor, PoolKey},
    cache::{InMemoryScoredSet, NegativeExistenceCache, ScoredSetStore, spawn_negative_cache_sweeper},
    config::{BootstrapStrategyKind, DexConfig, NegativeCacheConfig},
    store::PoolRegistry,
    testing::FakeChain,
};
use clmm_common::clock::{Clock, MILLISECONDS_IN_DAY, TestClock};
use clmm_model::defi::{BlockHeader, PoolVariant};
use rstest::rstest;
use tokio_util::sync::CancellationToken;

const FACTORY: Address = address!("0x1f98431c8ad98523631ae4a59f267346ea31f984");
const HELPER: Address = address!("0x00000000000000000000000000000000000c1a55");
const MISSING_POOL: Address = address!("0x00000000000000000000000000000000deadbeef");
const TOKEN0: Address = address!("0x1000000000000000000000000000000000000000");
const TOKEN1: Address = address!("0x2000000000000000000000000000000000000000");

fn header() -> BlockHeader {
    BlockHeader::new(100, 1_700_000_000, B256::repeat_byte(1), B256::repeat_byte(2))
}

#[rstest]
#[case::single_step(BootstrapStrategyKind::SingleStep)]
#[case::manual(BootstrapStrategyKind::Manual)]
#[tokio::test]
async fn test_missing_pool_is_cached_then_swept(#[case] strategy: BootstrapStrategyKind) {
    let chain = Arc::new(FakeChain::new(HELPER));
    let clock = Arc::new(TestClock::new(1_700_000_000_000));
    let set = Arc::new(InMemoryScoredSet::new());
    let config = NegativeCacheConfig::default();
    let store: Arc<dyn ScoredSetStore> = set.clone();
    let negative_cache = Arc::new(NegativeExistenceCache::new(store, &config));
    let registry = PoolRegistry::new(
        Arc::new(BootstrapFetcher::new(chain.clone())),
        negative_cache.clone(),
        clock.clone(),
        30,
    );
    let dex = DexConfig::new("uniswap_v3", PoolVariant::UniswapV3, FACTORY, Some(HELPER), Some(strategy));
    let descriptor =
        PoolDescriptor::new(PoolKey::new(TOKEN0, TOKEN1, 3000), MISSING_POOL, Arc::new(dex));

    let result = registry.get_or_init(&descriptor, &header()).await.unwrap();
    assert!(result.is_none());
    assert_eq!(set.len(&config.set_name), 1);
    assert_eq!(registry.pool_count(), 0);

    let requests = chain.requests();
    assert!(registry.get_or_init(&descriptor, &header()).await.unwrap().is_none());
    assert_eq!(chain.requests(), requests);

    let cancel = CancellationToken::new();
    let sweeper = spawn_negative_cache_sweeper(
        negative_cache,
        clock.clone() as Arc<dyn Clock>,
        Duration::from_millis(5),
        cancel.clone(),
    );
    clock.advance(3 * MILLISECONDS_IN_DAY);

    for _ in 0..200 {
        if set.len(&config.set_name) == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();
    sweeper.await.unwrap();

    assert_eq!(set.len(&config.set_name), 0);
    assert!(registry.get_or_init(&descriptor, &header()).await.unwrap().is_none());
    assert!(chain.requests() > requests);
}
