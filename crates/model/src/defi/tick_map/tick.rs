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

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::{error::MathError, liquidity_math::add_delta};

/// Per-tick liquidity and fee accounting, mirroring the pool contract's `Tick.Info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickInfo {
    /// Total position liquidity referencing this tick.
    pub liquidity_gross: u128,
    /// Net liquidity added when the tick is crossed left to right.
    pub liquidity_net: i128,
    /// Fee growth per unit of liquidity for token0 on the other side of this tick.
    pub fee_growth_outside_0_x128: U256,
    /// Fee growth per unit of liquidity for token1 on the other side of this tick.
    pub fee_growth_outside_1_x128: U256,
    /// True iff the tick's bit is set in the bitmap.
    pub initialized: bool,
}

impl TickInfo {
    /// Creates a new [`TickInfo`] as fetched from the chain.
    #[must_use]
    pub const fn new(
        liquidity_gross: u128,
        liquidity_net: i128,
        fee_growth_outside_0_x128: U256,
        fee_growth_outside_1_x128: U256,
        initialized: bool,
    ) -> Self {
        Self {
            liquidity_gross,
            liquidity_net,
            fee_growth_outside_0_x128,
            fee_growth_outside_1_x128,
            initialized,
        }
    }

    /// Applies a position's liquidity delta to this tick and returns whether it flipped
    /// between initialized and uninitialized.
    ///
    /// When the tick is first initialized at or below the current tick, all growth to date is
    /// assumed to have happened below it.
    ///
    /// # Errors
    ///
    /// Returns an error if the gross liquidity over- or underflows, exceeds `max_liquidity`,
    /// or the net liquidity leaves the `i128` range.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<bool, MathError> {
        let liquidity_gross_before = self.liquidity_gross;
        let liquidity_gross_after = add_delta(liquidity_gross_before, liquidity_delta)?;

        if liquidity_gross_after > max_liquidity {
            return Err(MathError::LiquidityExceedsMax {
                gross: liquidity_gross_after,
                max: max_liquidity,
            });
        }

        let flipped = (liquidity_gross_after == 0) != (liquidity_gross_before == 0);

        if liquidity_gross_before == 0 {
            if tick <= tick_current {
                self.fee_growth_outside_0_x128 = fee_growth_global_0_x128;
                self.fee_growth_outside_1_x128 = fee_growth_global_1_x128;
            }
            self.initialized = true;
        }

        self.liquidity_gross = liquidity_gross_after;
        self.liquidity_net = if upper {
            self.liquidity_net.checked_sub(liquidity_delta)
        } else {
            self.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or(MathError::Overflow("liquidity_net"))?;

        Ok(flipped)
    }

    /// Transitions the tick as the price crosses it and returns the net liquidity to apply
    /// when moving left to right.
    pub fn cross(&mut self, fee_growth_global_0_x128: U256, fee_growth_global_1_x128: U256) -> i128 {
        self.fee_growth_outside_0_x128 =
            fee_growth_global_0_x128.wrapping_sub(self.fee_growth_outside_0_x128);
        self.fee_growth_outside_1_x128 =
            fee_growth_global_1_x128.wrapping_sub(self.fee_growth_outside_1_x128);
        self.liquidity_net
    }

    /// Resets the tick to its uninitialized state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Checks if the tick is initialized and has liquidity.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.initialized && self.liquidity_gross > 0
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
