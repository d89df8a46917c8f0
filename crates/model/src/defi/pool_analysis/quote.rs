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

use std::cmp::Ordering;

use alloy_primitives::{I256, U160, U256};
use serde::{Deserialize, Serialize};

use super::{
    engine::{SwapCursor, SwapRun, boundary_price_limit},
    error::EventApplyError,
    state::PoolState,
};
use crate::defi::tick_map::BitmapQuery;

/// An initialized tick boundary crossed during a quoted swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossedTick {
    pub tick: i32,
    /// Whether the tick was crossed moving down.
    pub zero_for_one: bool,
    /// Active liquidity right after the crossing.
    pub liquidity_after: u128,
}

/// Detailed outcome of a hypothetical swap, for diagnostics.
///
/// Unlike the output ladder this keeps the full trace: prices and ticks on both sides, the
/// fee split, and each crossed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Amount of token0 that would be swapped (positive = in, negative = out).
    pub amount0: I256,
    /// Amount of token1 that would be swapped (positive = in, negative = out).
    pub amount1: I256,
    pub sqrt_price_before_x96: U160,
    pub sqrt_price_after_x96: U160,
    pub tick_before: i32,
    pub tick_after: i32,
    /// Fee growth global of the input token after the swap (Q128.128).
    pub fee_growth_global_after: U256,
    pub lp_fee: U256,
    pub protocol_fee: U256,
    /// Liquidity active once the swap completes.
    pub liquidity_after: u128,
    /// Crossed tick boundaries in order of crossing.
    pub crossed_ticks: Vec<CrossedTick>,
}

impl SwapQuote {
    /// Determines swap direction from tick movement, falling back to the amount sign for
    /// swaps that stay within one tick.
    #[must_use]
    pub fn zero_for_one(&self) -> bool {
        match self.tick_after.cmp(&self.tick_before) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.amount0.is_positive(),
        }
    }

    /// Returns the total fees paid (LP fees + protocol fees).
    #[must_use]
    pub fn total_fee(&self) -> U256 {
        self.lp_fee + self.protocol_fee
    }

    #[must_use]
    pub fn total_crossed_ticks(&self) -> u32 {
        self.crossed_ticks.len() as u32
    }
}

/// Quotes a single swap against `state` without mutating it.
///
/// `amount_specified` is positive for exact input and negative for exact output. Without a
/// price limit the swap may run to the direction's boundary price.
///
/// # Errors
///
/// Returns an error if the price limit is invalid, a bitmap scan leaves the price query
/// window, or a math kernel fails.
pub fn quote_swap(
    state: &PoolState,
    amount_specified: I256,
    zero_for_one: bool,
    sqrt_price_limit_x96: Option<U160>,
) -> Result<SwapQuote, EventApplyError> {
    let exact_input = !amount_specified.is_negative();
    let limit = sqrt_price_limit_x96.unwrap_or_else(|| boundary_price_limit(zero_for_one));
    let run = SwapRun::new(state, zero_for_one, exact_input, limit, BitmapQuery::Price)?;

    let mut cursor = SwapCursor::from_state(state, amount_specified, zero_for_one);
    let mut ticks = state.ticks.clone();
    let mut crossed_ticks = Vec::new();

    while !run.is_finished(&cursor) {
        let crossed_before = cursor.crossed_ticks;
        run.step(&mut cursor, &mut ticks)?;

        if cursor.crossed_ticks > crossed_before {
            crossed_ticks.push(CrossedTick {
                tick: if zero_for_one {
                    cursor.tick + 1
                } else {
                    cursor.tick
                },
                zero_for_one,
                liquidity_after: cursor.liquidity,
            });
        }
    }

    let specified_used = amount_specified.wrapping_sub(cursor.amount_specified_remaining);
    let (amount0, amount1) = if zero_for_one == exact_input {
        (specified_used, cursor.amount_calculated)
    } else {
        (cursor.amount_calculated, specified_used)
    };

    Ok(SwapQuote {
        amount0,
        amount1,
        sqrt_price_before_x96: state.global_state.sqrt_price_x96,
        sqrt_price_after_x96: cursor.sqrt_price_x96,
        tick_before: state.global_state.tick,
        tick_after: cursor.tick,
        fee_growth_global_after: cursor.fee_growth_global_x128,
        lp_fee: cursor.lp_fee,
        protocol_fee: cursor.protocol_fee,
        liquidity_after: cursor.liquidity,
        crossed_ticks,
    })
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::defi::{
        pool_analysis::{
            simulation::{SwapSide, query_outputs},
            state::ProtocolFee,
            stubs::pool_with_two_ranges,
        },
        tick_map::tick_math::get_sqrt_ratio_at_tick,
    };

    fn i256(value: i128) -> I256 {
        I256::try_from(value).unwrap()
    }

    #[rstest]
    fn test_exact_input_quote_matches_ladder(pool_with_two_ranges: PoolState) {
        let quote = quote_swap(&pool_with_two_ranges, i256(10_000), false, None).unwrap();
        let ladder =
            query_outputs(&pool_with_two_ranges, &[U256::from(10_000u32)], false, SwapSide::Sell);

        assert_eq!(quote.amount1, i256(10_000));
        assert_eq!(quote.amount0.unsigned_abs(), ladder.outputs[0]);
        assert!(quote.amount0.is_negative());
        assert!(!quote.zero_for_one());
        assert_eq!(quote.total_crossed_ticks(), ladder.tick_counts[0]);
        assert_eq!(
            quote.crossed_ticks,
            vec![CrossedTick {
                tick: 60,
                zero_for_one: false,
                liquidity_after: 500_000
            }]
        );
        assert_eq!(quote.liquidity_after, 500_000);
    }

    #[rstest]
    fn test_crossing_down_reports_crossed_tick(pool_with_two_ranges: PoolState) {
        let quote = quote_swap(&pool_with_two_ranges, i256(10_000), true, None).unwrap();

        assert!(quote.zero_for_one());
        assert_eq!(quote.crossed_ticks.len(), 1);
        assert_eq!(quote.crossed_ticks[0].tick, -60);
        assert!(quote.tick_after < -60);
    }

    #[rstest]
    fn test_exact_output_quote(pool_with_two_ranges: PoolState) {
        let quote = quote_swap(&pool_with_two_ranges, i256(-1_000), true, None).unwrap();

        assert_eq!(quote.amount1, i256(-1_000));
        assert!(quote.amount0 > i256(1_000));
        assert!(quote.total_fee() > U256::ZERO);
    }

    #[rstest]
    fn test_price_limit_stops_swap(pool_with_two_ranges: PoolState) {
        let limit = get_sqrt_ratio_at_tick(30).unwrap();
        let quote = quote_swap(&pool_with_two_ranges, i256(1_000_000), false, Some(limit)).unwrap();

        assert_eq!(quote.sqrt_price_after_x96, limit);
        assert_eq!(quote.tick_after, 30);
        assert!(quote.amount1 < i256(1_000_000));
        assert!(quote.crossed_ticks.is_empty());
    }

    #[rstest]
    fn test_protocol_fee_split(mut pool_with_two_ranges: PoolState) {
        pool_with_two_ranges.global_state.protocol_fee = ProtocolFee::Packed(4 + (4 << 4));
        let quote = quote_swap(&pool_with_two_ranges, i256(100_000), true, None).unwrap();

        assert!(quote.protocol_fee > U256::ZERO);
        assert!(quote.lp_fee > quote.protocol_fee);
    }
}
