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

//! Pure state transitions, one per decoded pool event.
//!
//! Handlers never abort a batch: a failure marks the resulting state invalid and logs it by
//! class, so the store can schedule a resync while other pools keep processing.

use std::collections::BTreeMap;

use alloy_primitives::{I256, U160, U256};

use super::{
    engine::{SwapCursor, SwapRun},
    error::EventApplyError,
    state::{PoolFee, PoolState, ProtocolFee},
};
use crate::defi::{
    data::{BlockHeader, PoolEvent, PoolLog},
    tick_map::{
        BitmapQuery, TickInfo,
        full_math::{FullMath, Q128},
        liquidity_math::add_delta,
        tick_math::{MAX_TICK, MIN_TICK},
    },
    variant::{FeeLayout, ProtocolFeeKind},
};

/// Applies one decoded log to `state`, returning the next state.
///
/// The input is never mutated. A handler failure yields a copy with `is_valid == false`;
/// an already invalid state is carried forward untouched apart from its timestamp.
#[must_use]
pub fn apply_event(state: &PoolState, log: &PoolLog, header: &BlockHeader) -> PoolState {
    let mut next = state.clone();
    next.block_timestamp = header.timestamp;
    next.last_applied = Some(log.position);

    if !next.is_valid {
        tracing::debug!("Skipping {log} for invalid pool {}", state.pool);
        return next;
    }

    if let Err(e) = dispatch(&mut next, &log.event) {
        if e.is_out_of_range() {
            tracing::warn!("Pool {} needs resync after {log}: {e}", state.pool);
        } else {
            tracing::error!("Pool {} invalidated by {log}: {e}", state.pool);
        }
        next.invalidate();
    }

    next
}

/// Applies a block's logs in order, skipping any at or before the last applied position.
#[must_use]
pub fn apply_block_logs(state: &PoolState, logs: &[PoolLog], header: &BlockHeader) -> PoolState {
    let mut current = state.clone();
    current.block_timestamp = header.timestamp;

    for log in logs {
        if let Some(last) = current.last_applied
            && log.position <= last
        {
            tracing::debug!("Skipping already applied {log} (last {last})");
            continue;
        }
        current = apply_event(&current, log, header);
    }

    current
}

fn dispatch(state: &mut PoolState, event: &PoolEvent) -> Result<(), EventApplyError> {
    match event {
        PoolEvent::Swap {
            amount0,
            amount1,
            sqrt_price_x96,
            liquidity,
            tick,
        } => apply_swap(state, *amount0, *amount1, *sqrt_price_x96, *liquidity, *tick),
        PoolEvent::Mint {
            tick_lower,
            tick_upper,
            amount,
            amount0,
            amount1,
            ..
        } => {
            let delta = liquidity_delta(*amount, false)?;
            apply_modify_position(state, *tick_lower, *tick_upper, delta)?;
            state.balance0 = state.balance0.saturating_add(*amount0);
            state.balance1 = state.balance1.saturating_add(*amount1);
            Ok(())
        }
        PoolEvent::Burn {
            tick_lower,
            tick_upper,
            amount,
            ..
        } => {
            let delta = liquidity_delta(*amount, true)?;
            apply_modify_position(state, *tick_lower, *tick_upper, delta)
        }
        PoolEvent::Collect {
            amount0, amount1, ..
        } => {
            apply_collect(state, *amount0, *amount1);
            Ok(())
        }
        PoolEvent::Flash { paid0, paid1, .. } => apply_flash(state, *paid0, *paid1),
        PoolEvent::SetFeeProtocol {
            fee_protocol0_new,
            fee_protocol1_new,
        } => apply_set_fee_protocol(state, *fee_protocol0_new, *fee_protocol1_new),
        PoolEvent::CollectProtocol { amount0, amount1 } => {
            apply_collect_protocol(state, *amount0, *amount1);
            Ok(())
        }
        PoolEvent::Fee { fee } => {
            apply_fee(state, *fee);
            Ok(())
        }
        PoolEvent::DirectionalFee {
            zero_for_one,
            one_for_zero,
        } => apply_directional_fee(state, *zero_for_one, *one_for_zero),
        PoolEvent::CommunityFee { token0, token1 } => {
            apply_community_fee(state, *token0, *token1)
        }
        PoolEvent::TickSpacing { tick_spacing } => apply_tick_spacing(state, *tick_spacing),
    }
}

fn liquidity_delta(amount: u128, negate: bool) -> Result<i128, EventApplyError> {
    let delta = i128::try_from(amount).map_err(|_| {
        EventApplyError::invariant(format!("Liquidity amount {amount} exceeds i128"))
    })?;
    Ok(if negate { -delta } else { delta })
}

/// Replays a swap toward the event's final price to recover fee accounting and crossings,
/// then adopts the event's price, tick and liquidity.
///
/// # Errors
///
/// Returns an error if neither amount is positive, the price moved against the swap
/// direction, or the replay fails.
pub fn apply_swap(
    state: &mut PoolState,
    amount0: I256,
    amount1: I256,
    sqrt_price_x96: U160,
    liquidity: u128,
    tick: i32,
) -> Result<(), EventApplyError> {
    if !amount0.is_positive() && !amount1.is_positive() {
        return Err(EventApplyError::invariant(format!(
            "Swap with no input side: amount0={amount0}, amount1={amount1}"
        )));
    }
    let zero_for_one = amount0.is_positive();

    // Tick records are moved out so the run can borrow the rest of the state
    let mut ticks = std::mem::take(&mut state.ticks);
    let replay = replay_swap(state, &mut ticks, zero_for_one, sqrt_price_x96);
    state.ticks = ticks;
    let cursor = replay?;

    if cursor.tick != tick {
        tracing::debug!(
            "Swap replay tick {} differs from event tick {tick} on pool {}",
            cursor.tick,
            state.pool
        );
    }
    if cursor.liquidity != liquidity {
        tracing::error!(
            "Swap replay liquidity {} differs from event liquidity {liquidity} on pool {}",
            cursor.liquidity,
            state.pool
        );
    }

    if zero_for_one {
        state.fee_growth_global_0_x128 = cursor.fee_growth_global_x128;
        state.protocol_fees_token0 = state.protocol_fees_token0.wrapping_add(cursor.protocol_fee);
    } else {
        state.fee_growth_global_1_x128 = cursor.fee_growth_global_x128;
        state.protocol_fees_token1 = state.protocol_fees_token1.wrapping_add(cursor.protocol_fee);
    }

    state.global_state.sqrt_price_x96 = sqrt_price_x96;
    state.global_state.tick = tick;
    state.liquidity = liquidity;

    let (input, output) = if zero_for_one {
        (amount0, amount1)
    } else {
        (amount1, amount0)
    };
    let (input_balance, output_balance) = if zero_for_one {
        (&mut state.balance0, &mut state.balance1)
    } else {
        (&mut state.balance1, &mut state.balance0)
    };

    *input_balance = input_balance.saturating_add(input.unsigned_abs());
    if output.is_positive() {
        tracing::error!(
            "Swap output amount {output} has the wrong sign on pool {}, balance left unchanged",
            state.pool
        );
    } else {
        *output_balance = debit(*output_balance, output.unsigned_abs(), "swap output");
    }

    Ok(())
}

fn replay_swap(
    state: &PoolState,
    ticks: &mut BTreeMap<i32, TickInfo>,
    zero_for_one: bool,
    sqrt_price_x96: U160,
) -> Result<SwapCursor, EventApplyError> {
    let run = SwapRun::new(state, zero_for_one, true, sqrt_price_x96, BitmapQuery::State)?;
    let mut cursor = SwapCursor::from_state(state, I256::MAX, zero_for_one);

    // The event price bounds the replay, which also stops it on the event tick
    while !run.is_finished(&cursor) {
        run.step(&mut cursor, ticks)?;
    }

    Ok(cursor)
}

/// Replays the pool's position update for a liquidity change over `[tick_lower, tick_upper)`.
///
/// # Errors
///
/// Returns an error if the ticks are invalid, a tick update fails (including the max
/// liquidity per tick check), a bitmap toggle leaves the window, or active liquidity
/// would underflow.
pub fn apply_modify_position(
    state: &mut PoolState,
    tick_lower: i32,
    tick_upper: i32,
    liquidity_delta: i128,
) -> Result<(), EventApplyError> {
    validate_ticks(state, tick_lower, tick_upper)?;

    let tick_current = state.global_state.tick;
    let fee_growth_0 = state.fee_growth_global_0_x128;
    let fee_growth_1 = state.fee_growth_global_1_x128;
    let max_liquidity = state.max_liquidity_per_tick;
    let spacing = state.bitmap_spacing();

    let mut lower = state.tick_info(tick_lower);
    let mut upper = state.tick_info(tick_upper);
    let flipped_lower = lower.update(
        tick_lower,
        tick_current,
        liquidity_delta,
        fee_growth_0,
        fee_growth_1,
        false,
        max_liquidity,
    )?;
    let flipped_upper = upper.update(
        tick_upper,
        tick_current,
        liquidity_delta,
        fee_growth_0,
        fee_growth_1,
        true,
        max_liquidity,
    )?;

    if flipped_lower {
        state.tick_bitmap.toggle_tick(tick_lower, spacing)?;
    }
    if flipped_upper {
        state.tick_bitmap.toggle_tick(tick_upper, spacing)?;
    }

    if tick_lower <= tick_current && tick_current < tick_upper {
        state.liquidity = add_delta(state.liquidity, liquidity_delta)?;
    }

    // Removing liquidity clears ticks that are no longer referenced
    if liquidity_delta < 0 {
        if flipped_lower {
            lower.clear();
        }
        if flipped_upper {
            upper.clear();
        }
    }

    state.insert_tick(tick_lower, lower);
    state.insert_tick(tick_upper, upper);
    Ok(())
}

fn validate_ticks(state: &PoolState, tick_lower: i32, tick_upper: i32) -> Result<(), EventApplyError> {
    if tick_lower >= tick_upper {
        return Err(EventApplyError::invariant(format!(
            "Invalid tick range: tick_lower ({tick_lower}) >= tick_upper ({tick_upper})"
        )));
    }
    if tick_lower < MIN_TICK || tick_upper > MAX_TICK {
        return Err(EventApplyError::invariant(format!(
            "Invalid tick bounds for {tick_lower} and {tick_upper}"
        )));
    }
    if state.ticks_compressed
        && (tick_lower % state.tick_spacing != 0 || tick_upper % state.tick_spacing != 0)
    {
        return Err(EventApplyError::invariant(format!(
            "Ticks {tick_lower} and {tick_upper} must be multiples of the tick spacing {}",
            state.tick_spacing
        )));
    }
    Ok(())
}

/// Removes collected position fees and principal from the tracked balances.
pub fn apply_collect(state: &mut PoolState, amount0: u128, amount1: u128) {
    state.balance0 = debit(state.balance0, U256::from(amount0), "collect token0");
    state.balance1 = debit(state.balance1, U256::from(amount1), "collect token1");
}

/// Credits flash loan fees to the balances, the protocol and the fee growth accumulators.
///
/// # Errors
///
/// Returns an error if the fee growth computation overflows.
pub fn apply_flash(state: &mut PoolState, paid0: U256, paid1: U256) -> Result<(), EventApplyError> {
    state.balance0 = state.balance0.saturating_add(paid0);
    state.balance1 = state.balance1.saturating_add(paid1);

    if state.liquidity == 0 {
        return Ok(());
    }

    let kind = state.config().protocol_fee;
    let protocol_fee = state.global_state.protocol_fee;
    let liquidity = U256::from(state.liquidity);

    if !paid0.is_zero() {
        let fees0 = protocol_fee.apply(paid0, true, kind);
        state.protocol_fees_token0 = state.protocol_fees_token0.wrapping_add(fees0);
        let growth = FullMath::mul_div(paid0 - fees0, Q128, liquidity)?;
        state.fee_growth_global_0_x128 = state.fee_growth_global_0_x128.wrapping_add(growth);
    }
    if !paid1.is_zero() {
        let fees1 = protocol_fee.apply(paid1, false, kind);
        state.protocol_fees_token1 = state.protocol_fees_token1.wrapping_add(fees1);
        let growth = FullMath::mul_div(paid1 - fees1, Q128, liquidity)?;
        state.fee_growth_global_1_x128 = state.fee_growth_global_1_x128.wrapping_add(growth);
    }

    Ok(())
}

/// Stores new protocol fee shares in the variant's encoding.
///
/// # Errors
///
/// Returns an error if a per-token share does not fit the community fee field.
pub fn apply_set_fee_protocol(
    state: &mut PoolState,
    fee_protocol0: u32,
    fee_protocol1: u32,
) -> Result<(), EventApplyError> {
    let kind = state.config().protocol_fee;
    state.global_state.protocol_fee = match kind {
        ProtocolFeeKind::Packed4Bit | ProtocolFeeKind::Packed16BitBasisPoints => {
            ProtocolFee::Packed(kind.pack(fee_protocol0, fee_protocol1))
        }
        ProtocolFeeKind::PerMille => community_fee(fee_protocol0, fee_protocol1)?,
    };
    Ok(())
}

fn community_fee(token0: u32, token1: u32) -> Result<ProtocolFee, EventApplyError> {
    let narrow = |share: u32| {
        u16::try_from(share)
            .map_err(|_| EventApplyError::invariant(format!("Community fee {share} exceeds u16")))
    };
    Ok(ProtocolFee::Community {
        token0: narrow(token0)?,
        token1: narrow(token1)?,
    })
}

/// Removes collected protocol fees from the balances and the accrued totals.
pub fn apply_collect_protocol(state: &mut PoolState, amount0: u128, amount1: u128) {
    let amount0 = U256::from(amount0);
    let amount1 = U256::from(amount1);
    state.balance0 = debit(state.balance0, amount0, "collect protocol token0");
    state.balance1 = debit(state.balance1, amount1, "collect protocol token1");
    state.protocol_fees_token0 = state.protocol_fees_token0.saturating_sub(amount0);
    state.protocol_fees_token1 = state.protocol_fees_token1.saturating_sub(amount1);
}

/// Sets the swap fee; a directional layout applies it to both directions.
pub fn apply_fee(state: &mut PoolState, fee: u32) {
    state.global_state.fee = match state.config().fee_layout {
        FeeLayout::Single => PoolFee::Single(fee),
        FeeLayout::Directional => PoolFee::Directional {
            zero_for_one: fee,
            one_for_zero: fee,
        },
    };
}

/// Sets per-direction swap fees.
///
/// # Errors
///
/// Returns an error for variants with a single fee.
pub fn apply_directional_fee(
    state: &mut PoolState,
    zero_for_one: u32,
    one_for_zero: u32,
) -> Result<(), EventApplyError> {
    if state.config().fee_layout != FeeLayout::Directional {
        return Err(EventApplyError::invariant(format!(
            "DirectionalFee event on single-fee variant {}",
            state.variant
        )));
    }
    state.global_state.fee = PoolFee::Directional {
        zero_for_one,
        one_for_zero,
    };
    Ok(())
}

/// Sets the per-token community fee shares.
///
/// # Errors
///
/// Returns an error for variants without a community fee.
pub fn apply_community_fee(
    state: &mut PoolState,
    token0: u16,
    token1: u16,
) -> Result<(), EventApplyError> {
    if state.config().protocol_fee != ProtocolFeeKind::PerMille {
        return Err(EventApplyError::invariant(format!(
            "CommunityFee event on variant {} without community fees",
            state.variant
        )));
    }
    state.global_state.protocol_fee = ProtocolFee::Community { token0, token1 };
    Ok(())
}

/// Changes the tick spacing of a pool with dynamic spacing.
///
/// # Errors
///
/// Returns an error if the variant has fixed spacing or the spacing is not positive.
pub fn apply_tick_spacing(state: &mut PoolState, tick_spacing: i32) -> Result<(), EventApplyError> {
    if !state.config().dynamic_tick_spacing {
        return Err(EventApplyError::invariant(format!(
            "TickSpacing event on fixed-spacing variant {}",
            state.variant
        )));
    }
    if tick_spacing <= 0 {
        return Err(EventApplyError::invariant(format!(
            "Invalid tick spacing {tick_spacing}"
        )));
    }
    state.tick_spacing = tick_spacing;
    Ok(())
}

// Balances are an incremental approximation, so an underflow is logged and floored
fn debit(balance: U256, amount: U256, context: &str) -> U256 {
    balance.checked_sub(amount).unwrap_or_else(|| {
        tracing::warn!("Tracked balance {balance} below {context} amount {amount}, flooring at zero");
        U256::ZERO
    })
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
