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

//! Read-only swap simulation against a pool snapshot.
//!
//! Quotes for an ascending ladder of amounts share work: each amount resumes from the last
//! step that fully reached a tick boundary while pricing the previous amount, which is
//! exact because such a step consumes the same amounts for any larger remainder.

use std::collections::BTreeMap;

use alloy_primitives::{I256, U160, U256};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{
    engine::{StepOutcome, SwapCursor, SwapRun, boundary_price_limit},
    error::EventApplyError,
    state::PoolState,
};
use crate::defi::tick_map::{BitmapQuery, TickInfo, full_math::Q96};

/// Maximum number of swap steps a single quoted amount may take.
pub const MAX_PRICING_COMPUTATION_STEPS_ALLOWED: usize = 128;

/// Which side of the swap the quoted amounts fix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SwapSide {
    /// Amounts are exact inputs; outputs are the amounts received.
    Sell,
    /// Amounts are exact outputs; outputs are the inputs required.
    Buy,
}

/// Quotes for a ladder of amounts, index-aligned with the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputResult {
    /// Output received (SELL) or input required (BUY); zero when the amount cannot be priced.
    pub outputs: Vec<U256>,
    /// Initialized ticks crossed while pricing each amount.
    pub tick_counts: Vec<u32>,
}

impl OutputResult {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outputs: Vec::with_capacity(capacity),
            tick_counts: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, output: U256, tick_count: u32) {
        self.outputs.push(output);
        self.tick_counts.push(tick_count);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// The last fully resolved point of the swap being priced.
#[derive(Debug, Clone)]
struct Checkpoint {
    cursor: SwapCursor,
    /// Absolute specified amount consumed up to `cursor`.
    consumed: U256,
}

/// Prices each amount in `amounts` against `state` without mutating it.
///
/// Failures are per amount: an out-of-window bitmap scan, a math error, an exhausted step
/// budget or a swap that cannot be filled before the price limit all quote zero for that
/// amount only.
#[must_use]
pub fn query_outputs(
    state: &PoolState,
    amounts: &[U256],
    zero_for_one: bool,
    side: SwapSide,
) -> OutputResult {
    let mut result = OutputResult::with_capacity(amounts.len());
    let exact_input = side == SwapSide::Sell;

    let run = match SwapRun::new(
        state,
        zero_for_one,
        exact_input,
        boundary_price_limit(zero_for_one),
        BitmapQuery::Price,
    ) {
        Ok(run) => run,
        Err(e) => {
            tracing::debug!("Cannot price pool {}: {e}", state.pool);
            for _ in amounts {
                result.push(U256::ZERO, 0);
            }
            return result;
        }
    };

    let initial = Checkpoint {
        cursor: SwapCursor::from_state(state, I256::ZERO, zero_for_one),
        consumed: U256::ZERO,
    };
    let mut checkpoint = initial.clone();
    let mut ticks = state.ticks.clone();

    for amount in amounts {
        if amount.is_zero() {
            result.push(U256::ZERO, 0);
            continue;
        }
        if *amount < checkpoint.consumed {
            // Not ascending, so restart from the live state
            checkpoint = initial.clone();
            ticks = state.ticks.clone();
        }

        match quote_amount(&run, &mut ticks, &mut checkpoint, *amount) {
            Ok(Some((output, tick_count))) => result.push(output, tick_count),
            Ok(None) => result.push(U256::ZERO, 0),
            Err(e) => {
                if e.is_out_of_range() {
                    tracing::debug!("Quote for {amount} on pool {} left the window: {e}", state.pool);
                } else {
                    tracing::warn!("Quote for {amount} on pool {} failed: {e}", state.pool);
                }
                result.push(U256::ZERO, 0);
            }
        }
    }

    result
}

/// Runs one amount from `checkpoint`, advancing the checkpoint past every step that fully
/// reaches a tick boundary.
///
/// Returns `None` when the step budget runs out or the price limit is hit first.
fn quote_amount(
    run: &SwapRun<'_>,
    ticks: &mut BTreeMap<i32, TickInfo>,
    checkpoint: &mut Checkpoint,
    amount: U256,
) -> Result<Option<(U256, u32)>, EventApplyError> {
    let remaining = amount - checkpoint.consumed;
    if remaining > I256::MAX.into_raw() {
        return Err(EventApplyError::invariant(format!(
            "Amount {amount} exceeds the signed 256-bit range"
        )));
    }
    let remaining = I256::from_raw(remaining);

    let mut cursor = checkpoint.cursor.clone();
    cursor.amount_specified_remaining = if run.exact_input() {
        remaining
    } else {
        remaining.wrapping_neg()
    };

    while !run.is_finished(&cursor) {
        if cursor.steps >= MAX_PRICING_COMPUTATION_STEPS_ALLOWED {
            tracing::debug!("Step budget exhausted quoting {amount}");
            return Ok(None);
        }

        if run.step(&mut cursor, ticks)? == StepOutcome::ReachedTick {
            checkpoint.consumed = amount - cursor.amount_specified_remaining.unsigned_abs();
            checkpoint.cursor = cursor.clone();
        }
    }

    if !cursor.amount_specified_remaining.is_zero() {
        tracing::debug!("Price limit reached before {amount} was filled");
        return Ok(None);
    }

    let output = cursor.amount_calculated.unsigned_abs();
    Ok(Some((output, cursor.crossed_ticks)))
}

/// Quotes `amounts` and clamps them against the destination token balance.
///
/// Returns `None` when the first ladder entry already breaks the balance, meaning the pool
/// cannot serve the ladder at all. A ladder led by a zero amount never fails this way.
/// Otherwise, SELL quotes whose output exceeds the balance and BUY requests for more than
/// the balance are zeroed.
#[must_use]
pub fn get_outputs(
    state: &PoolState,
    amounts: &[U256],
    zero_for_one: bool,
    side: SwapSide,
    dest_balance: U256,
) -> Option<OutputResult> {
    let mut result = query_outputs(state, amounts, zero_for_one, side);

    for (index, (amount, (output, tick_count))) in amounts
        .iter()
        .zip(result.outputs.iter_mut().zip(result.tick_counts.iter_mut()))
        .enumerate()
    {
        let received = match side {
            SwapSide::Sell => *output,
            SwapSide::Buy => *amount,
        };
        if received <= dest_balance {
            continue;
        }

        if index == 0 {
            tracing::debug!(
                "Pool {} balance {dest_balance} cannot cover the first quote",
                state.pool
            );
            return None;
        }
        *output = U256::ZERO;
        *tick_count = 0;
    }

    Some(result)
}

/// Returns the tracked balance of the token a swap in this direction pays out.
#[must_use]
pub const fn destination_balance(state: &PoolState, zero_for_one: bool) -> U256 {
    if zero_for_one {
        state.balance1
    } else {
        state.balance0
    }
}

fn sqrt_price_to_f64(sqrt_price_x96: U160) -> f64 {
    let value = U256::from(sqrt_price_x96);
    let whole = value / Q96;
    let fraction = value % Q96;
    // Both parts fit comfortably in u128
    whole.to::<u128>() as f64 + fraction.to::<u128>() as f64 / 2f64.powi(96)
}

/// Returns the raw price of token0 in token1 units, as a diagnostic float.
#[must_use]
pub fn price_at(state: &PoolState) -> f64 {
    let sqrt = sqrt_price_to_f64(state.global_state.sqrt_price_x96);
    sqrt * sqrt
}

/// Returns the price of one whole token0 in whole token1, adjusted for decimals.
#[must_use]
pub fn mid_price(state: &PoolState, decimals0: u8, decimals1: u8) -> f64 {
    price_at(state) * 10f64.powi(i32::from(decimals0) - i32::from(decimals1))
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
