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

//! Replaying a block's logs onto a bootstrapped pool must land on the same state a fresh
//! bootstrap at that block reads from chain.

use std::{collections::BTreeMap, sync::Arc};

use alloy::primitives::{Address, B256, I256, U256, address};
use clmm_blockchain::{
    bootstrap::{BootstrapFetcher, PoolDescriptor, PoolKey},
    config::{BootstrapStrategyKind, DexConfig},
    store::PoolStateStore,
    testing::{FakeChain, FakePool},
};
use clmm_model::defi::{
    BlockHeader, LogPosition, PoolEvent, PoolLog, PoolState, PoolVariant,
    pool_analysis::{
        SwapQuote, compare_pool_state, quote_swap,
        stubs::{STUB_POOL, pool_with_two_ranges, seed_tick},
    },
    tick_map::tick_math::get_sqrt_ratio_at_tick,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

const FACTORY: Address = address!("0x1f98431c8ad98523631ae4a59f267346ea31f984");
const HELPER: Address = address!("0x00000000000000000000000000000000000c1a55");
const TOKEN0: Address = address!("0x1000000000000000000000000000000000000000");
const TOKEN1: Address = address!("0x2000000000000000000000000000000000000000");
const OWNER: Address = address!("0xc36442b4a4522e871399cd717abdd847ab11fe88");

fn header(number: u64) -> BlockHeader {
    BlockHeader::new(
        number,
        1_700_000_000 + number * 12,
        B256::left_padding_from(&number.to_be_bytes()),
        B256::left_padding_from(&(number - 1).to_be_bytes()),
    )
}

fn store(chain: &Arc<FakeChain>, strategy: BootstrapStrategyKind) -> PoolStateStore {
    let dex = DexConfig::new(
        "uniswap_v3",
        PoolVariant::UniswapV3,
        FACTORY,
        Some(HELPER),
        Some(strategy),
    );
    let descriptor =
        PoolDescriptor::new(PoolKey::new(TOKEN0, TOKEN1, 3000), STUB_POOL, Arc::new(dex));
    PoolStateStore::new(descriptor, Arc::new(BootstrapFetcher::new(chain.clone())), 30)
}

fn block_logs(block: u64) -> Vec<PoolLog> {
    let position = |log_index| LogPosition::new(block, 1, log_index);
    vec![
        PoolLog::new(
            PoolEvent::Mint {
                owner: OWNER,
                tick_lower: -120,
                tick_upper: 120,
                amount: 1_000,
                amount0: U256::from(50),
                amount1: U256::from(50),
            },
            position(0),
        ),
        PoolLog::new(
            PoolEvent::Burn {
                owner: OWNER,
                tick_lower: -120,
                tick_upper: 120,
                amount: 400,
                amount0: U256::from(20),
                amount1: U256::from(20),
            },
            position(1),
        ),
        PoolLog::new(
            PoolEvent::Collect {
                owner: OWNER,
                recipient: OWNER,
                tick_lower: -120,
                tick_upper: 120,
                amount0: 20,
                amount1: 20,
            },
            position(2),
        ),
    ]
}

/// The pool as the chain holds it once the block's logs are mined.
fn state_after_block() -> PoolState {
    let mut state = pool_with_two_ranges();
    seed_tick(&mut state, -120, 600);
    seed_tick(&mut state, 120, -600);
    state.liquidity += 600;
    state.balance0 += U256::from(30);
    state.balance1 += U256::from(30);
    state
}

fn nonzero_words(state: &PoolState) -> BTreeMap<i16, U256> {
    state
        .tick_bitmap
        .words()
        .filter(|(_, word)| !word.is_zero())
        .collect()
}

#[rstest]
#[case::single_step(BootstrapStrategyKind::SingleStep)]
#[case::multi_step(BootstrapStrategyKind::MultiStep)]
#[case::manual(BootstrapStrategyKind::Manual)]
#[tokio::test]
async fn test_replay_matches_bootstrap(#[case] strategy: BootstrapStrategyKind) {
    let chain = Arc::new(FakeChain::new(HELPER));
    chain.add_pool(FakePool::new(
        pool_with_two_ranges(),
        FACTORY,
        TOKEN0,
        TOKEN1,
        3000,
    ));

    let mut replaying = store(&chain, strategy);
    replaying.initialize(&header(99)).await.unwrap();
    let replayed = replaying
        .process_block_logs(&block_logs(100), &header(100))
        .await
        .unwrap();

    chain.set_state(state_after_block());
    let mut fresh = store(&chain, strategy);
    let fetched = fresh.initialize(&header(100)).await.unwrap();

    assert!(replayed.is_valid());
    assert!(compare_pool_state(&replayed.state, &fetched.state));
    assert_eq!(replayed.state.ticks, fetched.state.ticks);
    assert_eq!(nonzero_words(&replayed.state), nonzero_words(&fetched.state));
    assert_eq!(replayed.state.liquidity, fetched.state.liquidity);
    assert_eq!(replayed.state.balance0, fetched.state.balance0);
    assert_eq!(replayed.state.balance1, fetched.state.balance1);
}

#[rstest]
#[tokio::test]
async fn test_mint_then_burn_restores_ticks() {
    let chain = Arc::new(FakeChain::new(HELPER));
    chain.add_pool(FakePool::new(
        pool_with_two_ranges(),
        FACTORY,
        TOKEN0,
        TOKEN1,
        3000,
    ));
    let mut store = store(&chain, BootstrapStrategyKind::SingleStep);
    let initial = store.initialize(&header(99)).await.unwrap();

    let mut logs = block_logs(100);
    logs.truncate(1);
    logs.push(PoolLog::new(
        PoolEvent::Burn {
            owner: OWNER,
            tick_lower: -120,
            tick_upper: 120,
            amount: 1_000,
            amount0: U256::ZERO,
            amount1: U256::ZERO,
        },
        LogPosition::new(100, 2, 0),
    ));
    let after = store.process_block_logs(&logs, &header(100)).await.unwrap();

    assert_eq!(after.state.liquidity, initial.state.liquidity);
    assert!(!after.state.tick_info(-120).initialized);
    assert!(!after.state.tick_info(120).initialized);
    assert_eq!(nonzero_words(&after.state), nonzero_words(&initial.state));
}

fn swap_log(quote: &SwapQuote, position: LogPosition) -> PoolLog {
    PoolLog::new(
        PoolEvent::Swap {
            amount0: quote.amount0,
            amount1: quote.amount1,
            sqrt_price_x96: quote.sqrt_price_after_x96,
            liquidity: quote.liquidity_after,
            tick: quote.tick_after,
        },
        position,
    )
}

/// Swaps down onto tick -60 and then up onto tick 60, each stopping exactly on the crossed
/// boundary, and builds the chain's view of the pool after both swaps by hand.
fn swaps_crossing_both_ways() -> (SwapQuote, SwapQuote, PoolState) {
    let initial = pool_with_two_ranges();
    let amount = I256::from_raw(U256::from(1_000_000));

    let down = quote_swap(
        &initial,
        amount,
        true,
        Some(get_sqrt_ratio_at_tick(-60).unwrap()),
    )
    .unwrap();
    assert_eq!(down.tick_after, -61);
    assert_eq!(down.liquidity_after, 500_000);
    let down_ticks: Vec<i32> = down.crossed_ticks.iter().map(|c| c.tick).collect();
    assert_eq!(down_ticks, vec![-60]);

    let mut after_down = initial.clone();
    after_down.global_state.sqrt_price_x96 = down.sqrt_price_after_x96;
    after_down.global_state.tick = down.tick_after;
    after_down.liquidity = down.liquidity_after;
    after_down.fee_growth_global_0_x128 = down.fee_growth_global_after;
    after_down
        .ticks
        .get_mut(&-60)
        .unwrap()
        .fee_growth_outside_0_x128 = down.fee_growth_global_after;

    let up = quote_swap(
        &after_down,
        amount,
        false,
        Some(get_sqrt_ratio_at_tick(60).unwrap()),
    )
    .unwrap();
    assert_eq!(up.tick_after, 60);
    assert_eq!(up.liquidity_after, 500_000);
    let up_ticks: Vec<i32> = up.crossed_ticks.iter().map(|c| c.tick).collect();
    assert_eq!(up_ticks, vec![-60, 60]);

    // Crossing -60 back up restores its outside growth; 60 records both globals
    let mut expected = initial;
    expected.global_state.sqrt_price_x96 = up.sqrt_price_after_x96;
    expected.global_state.tick = up.tick_after;
    expected.liquidity = up.liquidity_after;
    expected.fee_growth_global_0_x128 = down.fee_growth_global_after;
    expected.fee_growth_global_1_x128 = up.fee_growth_global_after;
    let upper = expected.ticks.get_mut(&60).unwrap();
    upper.fee_growth_outside_0_x128 = down.fee_growth_global_after;
    upper.fee_growth_outside_1_x128 = up.fee_growth_global_after;
    expected.balance0 =
        expected.balance0 + down.amount0.unsigned_abs() - up.amount0.unsigned_abs();
    expected.balance1 =
        expected.balance1 - down.amount1.unsigned_abs() + up.amount1.unsigned_abs();

    (down, up, expected)
}

#[rstest]
#[case::single_step(BootstrapStrategyKind::SingleStep)]
#[case::multi_step(BootstrapStrategyKind::MultiStep)]
#[case::manual(BootstrapStrategyKind::Manual)]
#[tokio::test]
async fn test_swaps_crossing_both_ways_match_bootstrap(#[case] strategy: BootstrapStrategyKind) {
    let chain = Arc::new(FakeChain::new(HELPER));
    chain.add_pool(FakePool::new(
        pool_with_two_ranges(),
        FACTORY,
        TOKEN0,
        TOKEN1,
        3000,
    ));
    let (down, up, expected) = swaps_crossing_both_ways();

    let mut replaying = store(&chain, strategy);
    replaying.initialize(&header(99)).await.unwrap();
    let logs = vec![
        swap_log(&down, LogPosition::new(100, 1, 0)),
        swap_log(&up, LogPosition::new(100, 2, 0)),
    ];
    let replayed = replaying
        .process_block_logs(&logs, &header(100))
        .await
        .unwrap();

    chain.set_state(expected);
    let mut fresh = store(&chain, strategy);
    let fetched = fresh.initialize(&header(100)).await.unwrap();

    assert!(replayed.is_valid());
    assert!(compare_pool_state(&replayed.state, &fetched.state));
    assert_eq!(replayed.state.ticks, fetched.state.ticks);
    assert_eq!(nonzero_words(&replayed.state), nonzero_words(&fetched.state));
    assert_eq!(replayed.state.global_state, fetched.state.global_state);
    assert_eq!(replayed.state.liquidity, fetched.state.liquidity);
    assert_eq!(
        replayed.state.fee_growth_global_0_x128,
        fetched.state.fee_growth_global_0_x128
    );
    assert_eq!(
        replayed.state.fee_growth_global_1_x128,
        fetched.state.fee_growth_global_1_x128
    );
    assert_eq!(replayed.state.balance0, fetched.state.balance0);
    assert_eq!(replayed.state.balance1, fetched.state.balance1);
}
