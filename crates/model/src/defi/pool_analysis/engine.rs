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

//! The tick-crossing swap loop shared by event replay, quoting and output ladders.

use std::collections::BTreeMap;

use alloy_primitives::{I256, U160, U256};

use super::{error::EventApplyError, state::PoolState};
use crate::defi::{
    tick_map::{
        BitmapQuery, TickInfo,
        full_math::{FullMath, Q128},
        liquidity_math::add_delta,
        swap_math::compute_swap_step,
        tick_math::{
            MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
            get_tick_at_sqrt_ratio,
        },
    },
    variant::ProtocolFeeKind,
};

/// Returns the most extreme price limit a swap in the given direction may use.
#[must_use]
pub fn boundary_price_limit(zero_for_one: bool) -> U160 {
    if zero_for_one {
        MIN_SQRT_RATIO + U160::ONE
    } else {
        MAX_SQRT_RATIO - U160::ONE
    }
}

/// Loop variables of a swap in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCursor {
    /// Positive while exact input remains, negative while exact output remains.
    pub amount_specified_remaining: I256,
    /// Output so far for exact input (negative), input so far for exact output (positive).
    pub amount_calculated: I256,
    pub sqrt_price_x96: U160,
    pub tick: i32,
    pub liquidity: u128,
    /// Fee growth of the input token, advanced as fees accrue.
    pub fee_growth_global_x128: U256,
    pub protocol_fee: U256,
    /// Fees retained by liquidity providers.
    pub lp_fee: U256,
    /// Initialized ticks crossed so far.
    pub crossed_ticks: u32,
    pub steps: usize,
}

impl SwapCursor {
    /// Seeds a cursor from the pool's live price, tick and liquidity.
    #[must_use]
    pub fn from_state(state: &PoolState, amount_specified: I256, zero_for_one: bool) -> Self {
        Self {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: state.global_state.sqrt_price_x96,
            tick: state.global_state.tick,
            liquidity: state.liquidity,
            fee_growth_global_x128: if zero_for_one {
                state.fee_growth_global_0_x128
            } else {
                state.fee_growth_global_1_x128
            },
            protocol_fee: U256::ZERO,
            lp_fee: U256::ZERO,
            crossed_ticks: 0,
            steps: 0,
        }
    }
}

/// How a single step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The price reached the next tick boundary, so the step is fully resolved.
    ReachedTick,
    /// The price stopped inside the current tick range.
    WithinTick,
}

/// Read-only parameters of one swap against one pool state.
#[derive(Debug)]
pub struct SwapRun<'a> {
    state: &'a PoolState,
    zero_for_one: bool,
    exact_input: bool,
    sqrt_price_limit_x96: U160,
    query: BitmapQuery,
    fee_pips: u32,
    protocol_fee_share: u32,
    protocol_fee_kind: ProtocolFeeKind,
}

impl<'a> SwapRun<'a> {
    /// Prepares a swap against `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the price limit lies on the wrong side of the current price or
    /// outside the valid ratio range.
    pub fn new(
        state: &'a PoolState,
        zero_for_one: bool,
        exact_input: bool,
        sqrt_price_limit_x96: U160,
        query: BitmapQuery,
    ) -> Result<Self, EventApplyError> {
        let current = state.global_state.sqrt_price_x96;
        let limit_valid = if zero_for_one {
            sqrt_price_limit_x96 <= current && sqrt_price_limit_x96 > MIN_SQRT_RATIO
        } else {
            sqrt_price_limit_x96 >= current && sqrt_price_limit_x96 < MAX_SQRT_RATIO
        };
        if !limit_valid {
            return Err(EventApplyError::invariant(format!(
                "Price limit {sqrt_price_limit_x96} invalid for zero_for_one={zero_for_one} at {current}"
            )));
        }

        let kind = state.config().protocol_fee;
        Ok(Self {
            state,
            zero_for_one,
            exact_input,
            sqrt_price_limit_x96,
            query,
            fee_pips: state.fee_for_direction(zero_for_one),
            protocol_fee_share: state
                .global_state
                .protocol_fee
                .share_for_direction(zero_for_one, kind),
            protocol_fee_kind: kind,
        })
    }

    #[must_use]
    pub const fn zero_for_one(&self) -> bool {
        self.zero_for_one
    }

    #[must_use]
    pub const fn exact_input(&self) -> bool {
        self.exact_input
    }

    /// Returns `true` once nothing remains to swap or the price limit is reached.
    #[must_use]
    pub fn is_finished(&self, cursor: &SwapCursor) -> bool {
        cursor.amount_specified_remaining.is_zero()
            || cursor.sqrt_price_x96 == self.sqrt_price_limit_x96
    }

    /// Advances the swap by one constant-liquidity step.
    ///
    /// Crossed ticks are transitioned in `ticks`, which may be the pool's own map (event
    /// replay) or a private copy (quoting).
    ///
    /// # Errors
    ///
    /// Returns an error if the bitmap scan leaves the query window, or if any math kernel
    /// fails, including active liquidity underflow on a crossing.
    pub fn step(
        &self,
        cursor: &mut SwapCursor,
        ticks: &mut BTreeMap<i32, TickInfo>,
    ) -> Result<StepOutcome, EventApplyError> {
        let sqrt_price_start_x96 = cursor.sqrt_price_x96;

        let (tick_next, initialized) = self.state.tick_bitmap.next_initialized_tick_within_one_word(
            cursor.tick,
            self.zero_for_one,
            self.query,
            self.state.bitmap_spacing(),
        )?;
        let tick_next = tick_next.clamp(MIN_TICK, MAX_TICK);
        let sqrt_price_next_x96 = get_sqrt_ratio_at_tick(tick_next)?;

        let sqrt_price_target_x96 = if (self.zero_for_one
            && sqrt_price_next_x96 < self.sqrt_price_limit_x96)
            || (!self.zero_for_one && sqrt_price_next_x96 > self.sqrt_price_limit_x96)
        {
            self.sqrt_price_limit_x96
        } else {
            sqrt_price_next_x96
        };

        let step = compute_swap_step(
            cursor.sqrt_price_x96,
            sqrt_price_target_x96,
            cursor.liquidity,
            cursor.amount_specified_remaining,
            self.fee_pips,
        )?;
        cursor.sqrt_price_x96 = step.sqrt_ratio_next_x96;
        cursor.steps += 1;

        if self.exact_input {
            cursor.amount_specified_remaining = cursor
                .amount_specified_remaining
                .wrapping_sub(FullMath::truncate_to_i256(step.amount_in + step.fee_amount));
            cursor.amount_calculated = cursor
                .amount_calculated
                .wrapping_sub(FullMath::truncate_to_i256(step.amount_out));
        } else {
            cursor.amount_specified_remaining = cursor
                .amount_specified_remaining
                .wrapping_add(FullMath::truncate_to_i256(step.amount_out));
            cursor.amount_calculated = cursor
                .amount_calculated
                .wrapping_add(FullMath::truncate_to_i256(step.amount_in + step.fee_amount));
        }

        let protocol_delta = self
            .protocol_fee_kind
            .cut(step.fee_amount, self.protocol_fee_share);
        let lp_fee = step.fee_amount - protocol_delta;
        cursor.protocol_fee = cursor.protocol_fee.wrapping_add(protocol_delta);
        cursor.lp_fee = cursor.lp_fee.wrapping_add(lp_fee);

        if cursor.liquidity > 0 {
            let growth = FullMath::mul_div(lp_fee, Q128, U256::from(cursor.liquidity))?;
            cursor.fee_growth_global_x128 = cursor.fee_growth_global_x128.wrapping_add(growth);
        }

        if cursor.sqrt_price_x96 == sqrt_price_next_x96 {
            if initialized {
                self.cross(cursor, ticks, tick_next)?;
            }
            cursor.tick = if self.zero_for_one {
                tick_next - 1
            } else {
                tick_next
            };
            Ok(StepOutcome::ReachedTick)
        } else {
            if cursor.sqrt_price_x96 != sqrt_price_start_x96 {
                cursor.tick = get_tick_at_sqrt_ratio(cursor.sqrt_price_x96)?;
            }
            Ok(StepOutcome::WithinTick)
        }
    }

    fn cross(
        &self,
        cursor: &mut SwapCursor,
        ticks: &mut BTreeMap<i32, TickInfo>,
        tick: i32,
    ) -> Result<(), EventApplyError> {
        let (fee_growth_0, fee_growth_1) = if self.zero_for_one {
            (
                cursor.fee_growth_global_x128,
                self.state.fee_growth_global_1_x128,
            )
        } else {
            (
                self.state.fee_growth_global_0_x128,
                cursor.fee_growth_global_x128,
            )
        };

        // The tick record is only flipped once the liquidity update is known to succeed
        let mut liquidity_net = ticks.get(&tick).map_or(0, |info| info.liquidity_net);
        if self.zero_for_one {
            liquidity_net = liquidity_net.checked_neg().ok_or_else(|| {
                EventApplyError::invariant(format!("Cannot negate liquidity_net at tick {tick}"))
            })?;
        }
        let liquidity = add_delta(cursor.liquidity, liquidity_net)?;

        ticks.entry(tick).or_default().cross(fee_growth_0, fee_growth_1);
        cursor.liquidity = liquidity;
        cursor.crossed_ticks += 1;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::defi::pool_analysis::stubs::{pool_with_two_ranges, state_at_tick};

    #[rstest]
    fn test_rejects_limit_on_wrong_side(pool_with_two_ranges: PoolState) {
        let above = get_sqrt_ratio_at_tick(10).unwrap();
        let result = SwapRun::new(&pool_with_two_ranges, true, true, above, BitmapQuery::Price);
        assert!(matches!(result, Err(EventApplyError::Invariant(_))));
    }

    #[rstest]
    fn test_single_step_within_range(pool_with_two_ranges: PoolState) {
        let run = SwapRun::new(
            &pool_with_two_ranges,
            false,
            true,
            boundary_price_limit(false),
            BitmapQuery::Price,
        )
        .unwrap();
        let mut cursor =
            SwapCursor::from_state(&pool_with_two_ranges, I256::try_from(100).unwrap(), false);
        let mut ticks = pool_with_two_ranges.ticks.clone();

        let outcome = run.step(&mut cursor, &mut ticks).unwrap();

        assert_eq!(outcome, StepOutcome::WithinTick);
        assert!(run.is_finished(&cursor));
        assert!(cursor.amount_calculated.is_negative());
        assert_eq!(cursor.crossed_ticks, 0);
        assert_eq!(cursor.liquidity, pool_with_two_ranges.liquidity);
        assert_eq!(cursor.tick, 0);
    }

    #[rstest]
    fn test_step_crosses_initialized_tick(pool_with_two_ranges: PoolState) {
        let run = SwapRun::new(
            &pool_with_two_ranges,
            true,
            true,
            boundary_price_limit(true),
            BitmapQuery::Price,
        )
        .unwrap();
        let mut cursor = SwapCursor::from_state(&pool_with_two_ranges, I256::MAX, true);
        let mut ticks = pool_with_two_ranges.ticks.clone();

        // Sitting exactly on tick 0, the first step only moves the tick below it
        let outcome = run.step(&mut cursor, &mut ticks).unwrap();
        assert_eq!(outcome, StepOutcome::ReachedTick);
        assert_eq!(cursor.tick, -1);
        assert_eq!(cursor.amount_specified_remaining, I256::MAX);
        assert_eq!(cursor.crossed_ticks, 0);

        let outcome = run.step(&mut cursor, &mut ticks).unwrap();
        assert_eq!(outcome, StepOutcome::ReachedTick);
        assert_eq!(cursor.tick, -61);
        assert_eq!(cursor.crossed_ticks, 1);
        // Crossing -60 downwards removes its +500k net liquidity
        assert_eq!(cursor.liquidity, 500_000);
        assert!(cursor.lp_fee > U256::ZERO);
        assert_ne!(ticks[&-60], pool_with_two_ranges.ticks[&-60]);
    }

    #[rstest]
    fn test_failed_cross_leaves_tick_untouched(mut pool_with_two_ranges: PoolState) {
        // Net liquidity above the active liquidity makes the downward cross underflow
        let info = pool_with_two_ranges.ticks.get_mut(&-60).unwrap();
        info.liquidity_gross = 2_000_000;
        info.liquidity_net = 2_000_000;
        info.fee_growth_outside_0_x128 = U256::from(5);
        pool_with_two_ranges.fee_growth_global_1_x128 = U256::from(7);

        let run = SwapRun::new(
            &pool_with_two_ranges,
            true,
            true,
            boundary_price_limit(true),
            BitmapQuery::Price,
        )
        .unwrap();
        let mut cursor = SwapCursor::from_state(&pool_with_two_ranges, I256::MAX, true);
        let mut ticks = pool_with_two_ranges.ticks.clone();

        run.step(&mut cursor, &mut ticks).unwrap();
        let result = run.step(&mut cursor, &mut ticks);

        assert!(result.is_err());
        assert_eq!(ticks, pool_with_two_ranges.ticks);
        assert_eq!(cursor.crossed_ticks, 0);
        assert_eq!(cursor.liquidity, pool_with_two_ranges.liquidity);
    }

    #[rstest]
    fn test_step_errors_when_scan_leaves_window() {
        // Anchor far from the current tick so the first scan is outside the window
        let mut state = state_at_tick(0, 60, 1_000_000);
        state.tick_bitmap = crate::defi::tick_map::TickBitmap::new(100, state.tick_bitmap.window());

        let run = SwapRun::new(&state, true, true, boundary_price_limit(true), BitmapQuery::Price)
            .unwrap();
        let mut cursor = SwapCursor::from_state(&state, I256::MAX, true);
        let mut ticks = state.ticks.clone();

        let error = run.step(&mut cursor, &mut ticks).unwrap_err();
        assert!(error.is_out_of_range());
    }
}
