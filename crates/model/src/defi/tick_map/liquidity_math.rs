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

use super::{
    error::MathError,
    tick_math::{max_usable_tick, min_usable_tick},
};

/// Adds a signed liquidity delta to liquidity, failing closed on overflow or underflow.
///
/// # Errors
///
/// Returns [`MathError::LiquiditySub`] if the result would go below zero and
/// [`MathError::LiquidityAdd`] if it would exceed `u128::MAX`.
pub fn add_delta(x: u128, y: i128) -> Result<u128, MathError> {
    if y < 0 {
        x.checked_sub(y.unsigned_abs())
            .ok_or(MathError::LiquiditySub { x, y })
    } else {
        x.checked_add(y as u128)
            .ok_or(MathError::LiquidityAdd { x, y })
    }
}

/// Derives max liquidity per tick from a given tick spacing.
#[must_use]
pub fn tick_spacing_to_max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let min_tick = min_usable_tick(tick_spacing);
    let max_tick = max_usable_tick(tick_spacing);

    // i64 keeps the subtraction from overflowing for large spacings
    let num_ticks = ((i64::from(max_tick) - i64::from(min_tick)) / i64::from(tick_spacing)) + 1;

    u128::MAX / num_ticks as u128
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
