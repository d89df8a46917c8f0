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

//! End-to-end scenarios across event application and swap simulation.

use alloy_primitives::{Address, B256, I256, U256};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::{fixture, rstest};

use crate::defi::{
    data::{BlockHeader, LogPosition, PoolEvent, PoolLog},
    pool_analysis::{
        apply::{apply_block_logs, apply_event},
        quote::quote_swap,
        simulation::{SwapSide, query_outputs},
        state::PoolState,
        stubs::{algebra_directional_pool, pool_with_two_ranges, state_at_tick},
    },
    tick_map::{
        sqrt_price_math::{
            encode_sqrt_ratio_x96, expand_to_18_decimals, get_amounts_for_liquidity,
        },
        TickBitmap,
        tick_math::{get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio},
    },
};

const TICK_SPACING: i32 = 60;

#[fixture]
fn header() -> BlockHeader {
    BlockHeader::new(1_000, 1_700_000_000, B256::repeat_byte(0xaa), B256::repeat_byte(0xbb))
}

fn log_at(event: PoolEvent, log_index: u32) -> PoolLog {
    PoolLog::new(event, LogPosition::new(1_000, 0, log_index))
}

fn mint_event(state: &PoolState, tick_lower: i32, tick_upper: i32, liquidity: u128) -> PoolEvent {
    let (amount0, amount1) = get_amounts_for_liquidity(
        state.sqrt_price_x96(),
        tick_lower,
        tick_upper,
        liquidity,
        true,
    )
    .unwrap();
    PoolEvent::Mint {
        owner: Address::ZERO,
        tick_lower,
        tick_upper,
        amount: liquidity,
        amount0,
        amount1,
    }
}

fn burn_event(tick_lower: i32, tick_upper: i32, liquidity: u128) -> PoolEvent {
    PoolEvent::Burn {
        owner: Address::ZERO,
        tick_lower,
        tick_upper,
        amount: liquidity,
        amount0: U256::ZERO,
        amount1: U256::ZERO,
    }
}

fn swap_event_from_quote(state: &PoolState, amount: i128, zero_for_one: bool) -> PoolEvent {
    let quote = quote_swap(state, I256::try_from(amount).unwrap(), zero_for_one, None).unwrap();
    PoolEvent::Swap {
        amount0: quote.amount0,
        amount1: quote.amount1,
        sqrt_price_x96: quote.sqrt_price_after_x96,
        liquidity: quote.liquidity_after,
        tick: quote.tick_after,
    }
}

/// A pool at price 1:10 with one wide and two narrow positions, built only from events.
#[fixture]
fn minted_pool(header: BlockHeader) -> PoolState {
    let sqrt_price = encode_sqrt_ratio_x96(1, 10).unwrap();
    let tick = get_tick_at_sqrt_ratio(sqrt_price).unwrap();
    let mut state = state_at_tick(0, TICK_SPACING, 0);
    state.global_state.sqrt_price_x96 = sqrt_price;
    state.global_state.tick = tick;
    state.tick_bitmap = TickBitmap::new(
        PoolState::anchor_for_tick(tick, TICK_SPACING, true),
        state.tick_bitmap.window(),
    );

    let logs = vec![
        log_at(mint_event(&state, -30_000, -16_020, expand_to_18_decimals(1)), 0),
        log_at(mint_event(&state, -24_000, -22_020, expand_to_18_decimals(2)), 1),
        log_at(mint_event(&state, -23_040, -22_980, expand_to_18_decimals(3)), 2),
    ];
    apply_block_logs(&state, &logs, &header)
}

#[rstest]
fn test_two_range_pool_scenario(pool_with_two_ranges: PoolState) {
    let small = query_outputs(&pool_with_two_ranges, &[U256::from(1_000u32)], true, SwapSide::Sell);
    assert_eq!(small.tick_counts, vec![0]);
    assert!(small.outputs[0] > U256::ZERO);
    assert!(small.outputs[0] < U256::from(1_000u32));

    let large = query_outputs(&pool_with_two_ranges, &[U256::from(10_000u32)], false, SwapSide::Sell);
    assert_eq!(large.tick_counts, vec![1]);
}

#[rstest]
fn test_minted_pool_is_consistent(minted_pool: PoolState) {
    assert!(minted_pool.is_valid);
    assert!(minted_pool.check_consistency().is_ok());
    assert_eq!(minted_pool.initialized_tick_count(), 6);
    // Tick -23028 sits inside all three ranges
    assert_eq!(minted_pool.tick(), -23_028);
    assert_eq!(minted_pool.liquidity, expand_to_18_decimals(6));
}

#[rstest]
fn test_replayed_quote_matches_quote(minted_pool: PoolState, header: BlockHeader) {
    let amount = expand_to_18_decimals(1) as i128;
    let quote = quote_swap(&minted_pool, I256::try_from(amount).unwrap(), true, None).unwrap();
    let event = swap_event_from_quote(&minted_pool, amount, true);

    let next = apply_event(&minted_pool, &log_at(event, 10), &header);

    assert!(next.is_valid);
    assert_eq!(next.sqrt_price_x96(), quote.sqrt_price_after_x96);
    assert_eq!(next.tick(), quote.tick_after);
    assert_eq!(next.liquidity, quote.liquidity_after);
    assert_eq!(next.balance0, minted_pool.balance0 + quote.amount0.unsigned_abs());
    assert_eq!(next.balance1, minted_pool.balance1 - quote.amount1.unsigned_abs());
    for crossed in &quote.crossed_ticks {
        let before = minted_pool.tick_info(crossed.tick);
        let after = next.tick_info(crossed.tick);
        assert_eq!(after.liquidity_net, before.liquidity_net);
        assert_ne!(after.fee_growth_outside_0_x128, before.fee_growth_outside_0_x128);
    }
    assert!(next.check_consistency().is_ok());
}

#[rstest]
fn test_swap_there_and_back(minted_pool: PoolState, header: BlockHeader) {
    let amount = expand_to_18_decimals(1) as i128 / 10;
    let down = apply_event(
        &minted_pool,
        &log_at(swap_event_from_quote(&minted_pool, amount, true), 10),
        &header,
    );
    let back = apply_event(
        &down,
        &log_at(swap_event_from_quote(&down, amount / 2, false), 11),
        &header,
    );

    assert!(back.is_valid);
    assert!(back.fee_growth_global_0_x128 > U256::ZERO);
    assert!(back.fee_growth_global_1_x128 > U256::ZERO);
    assert!(back.check_consistency().is_ok());
}

#[rstest]
fn test_quotes_follow_state_after_events(minted_pool: PoolState, header: BlockHeader) {
    let ladder = [U256::from(10u64.pow(15)), U256::from(10u64.pow(17))];
    let before = query_outputs(&minted_pool, &ladder, true, SwapSide::Sell);

    let deeper = apply_event(
        &minted_pool,
        &log_at(mint_event(&minted_pool, -24_000, -22_020, expand_to_18_decimals(10)), 10),
        &header,
    );
    let after = query_outputs(&deeper, &ladder, true, SwapSide::Sell);

    // More liquidity in range means less slippage on the larger amount
    assert!(after.outputs[1] > before.outputs[1]);
}

#[rstest]
fn test_swap_outside_state_window_needs_resync(
    pool_with_two_ranges: PoolState,
    header: BlockHeader,
) {
    // Replaying up to word 20 scans past the state window of 8 words
    let tick = 20 * 256 * TICK_SPACING;
    let swap = PoolEvent::Swap {
        amount0: I256::try_from(-1_000_000).unwrap(),
        amount1: I256::try_from(10i128.pow(30)).unwrap(),
        sqrt_price_x96: get_sqrt_ratio_at_tick(tick).unwrap(),
        liquidity: 500_000,
        tick,
    };
    let next = apply_event(&pool_with_two_ranges, &log_at(swap, 0), &header);

    assert!(!next.is_valid);
}

#[rstest]
fn test_price_query_window_is_wider_than_state_window(pool_with_two_ranges: PoolState) {
    let window = pool_with_two_ranges.tick_bitmap.window();
    assert!(window.price_query_radius > window.state_radius);
}

#[rstest]
fn test_algebra_raw_tick_swap_replay(algebra_directional_pool: PoolState, header: BlockHeader) {
    let deep = apply_event(
        &algebra_directional_pool,
        &log_at(mint_event(&algebra_directional_pool, -601, 599, 1_000_000_000_000), 0),
        &header,
    );
    assert!(deep.is_valid);

    let event = swap_event_from_quote(&deep, 100_000, true);
    let next = apply_event(&deep, &log_at(event, 1), &header);

    assert!(next.is_valid);
    assert_eq!(next.liquidity, deep.liquidity);
    // 500 pips on the zero_for_one side with a 10% community share
    assert!(next.protocol_fees_token0 > U256::ZERO);
    assert_eq!(next.protocol_fees_token1, U256::ZERO);
    assert!(next.check_consistency().is_ok());
}

proptest! {
    #[test]
    fn prop_mint_then_burn_restores_pool(
        lower in -20i32..20,
        width in 1i32..20,
        liquidity in 1u128..1_000_000_000_000,
    ) {
        let state = pool_with_two_ranges();
        let header = header();
        let tick_lower = lower * TICK_SPACING;
        let tick_upper = (lower + width) * TICK_SPACING;

        let mint = log_at(mint_event(&state, tick_lower, tick_upper, liquidity), 0);
        let minted = apply_event(&state, &mint, &header);
        let burn = log_at(burn_event(tick_lower, tick_upper, liquidity), 1);
        let burned = apply_event(&minted, &burn, &header);

        prop_assert!(burned.is_valid);
        prop_assert_eq!(burned.liquidity, state.liquidity);
        prop_assert_eq!(&burned.ticks, &state.ticks);
        prop_assert_eq!(&burned.tick_bitmap, &state.tick_bitmap);
    }
}
