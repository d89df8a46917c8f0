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

//! Pool state stubs to facilitate testing.

use alloy_primitives::{Address, U256, address};
use rstest::fixture;

use super::state::{GlobalState, PoolFee, PoolState, ProtocolFee};
use crate::defi::{
    tick_map::{
        TickInfo, liquidity_math::tick_spacing_to_max_liquidity_per_tick,
        tick_math::get_sqrt_ratio_at_tick,
    },
    variant::PoolVariant,
};

pub const STUB_POOL: Address = address!("0x8ad599c3a0ff1de082011efddc58f1908eb6e6d8");

/// Returns an empty UniswapV3 pool sitting exactly on `tick` with a 0.3% fee.
///
/// # Panics
///
/// Panics if `tick` is outside the valid tick range.
#[must_use]
pub fn state_at_tick(tick: i32, tick_spacing: i32, liquidity: u128) -> PoolState {
    let global_state = GlobalState::new(
        get_sqrt_ratio_at_tick(tick).expect("valid tick"),
        tick,
        PoolFee::Single(3000),
        ProtocolFee::Packed(0),
    );
    PoolState::new(
        STUB_POOL,
        PoolVariant::UniswapV3,
        tick_spacing,
        global_state,
        liquidity,
        tick_spacing_to_max_liquidity_per_tick(tick_spacing),
    )
}

/// Loads a tick record with `liquidity_net` and sets its bitmap bit.
///
/// # Panics
///
/// Panics if the tick is misaligned or outside the bitmap window.
pub fn seed_tick(state: &mut PoolState, tick: i32, liquidity_net: i128) {
    let spacing = state.bitmap_spacing();
    state
        .tick_bitmap
        .toggle_tick(tick, spacing)
        .expect("tick inside the window");
    state.insert_tick(
        tick,
        TickInfo::new(
            liquidity_net.unsigned_abs(),
            liquidity_net,
            U256::ZERO,
            U256::ZERO,
            true,
        ),
    );
}

/// Liquidity 1,000,000 at tick 0 with spacing 60, bounded by ticks -60 (+500k) and
/// +60 (-500k).
#[fixture]
pub fn pool_with_two_ranges() -> PoolState {
    let mut state = state_at_tick(0, 60, 1_000_000);
    seed_tick(&mut state, -60, 500_000);
    seed_tick(&mut state, 60, -500_000);
    state.balance0 = U256::from(10_000_000u64);
    state.balance1 = U256::from(10_000_000u64);
    state
}

/// A deep single-range pool spanning ±6000 ticks with token balances to match.
#[fixture]
pub fn deep_pool() -> PoolState {
    let mut state = state_at_tick(0, 60, 0);
    seed_tick(&mut state, -6000, 1_000_000_000_000_000_000);
    seed_tick(&mut state, 6000, -1_000_000_000_000_000_000);
    state.liquidity = 1_000_000_000_000_000_000;
    state.balance0 = U256::from(10u128.pow(24));
    state.balance1 = U256::from(10u128.pow(24));
    state
}

/// An Algebra pool with raw-tick bitmap, directional fees and a community fee.
#[fixture]
pub fn algebra_directional_pool() -> PoolState {
    let global_state = GlobalState::new(
        get_sqrt_ratio_at_tick(0).expect("valid tick"),
        0,
        PoolFee::Directional {
            zero_for_one: 500,
            one_for_zero: 3000,
        },
        ProtocolFee::Community {
            token0: 100,
            token1: 100,
        },
    );
    let mut state = PoolState::new(
        STUB_POOL,
        PoolVariant::AlgebraDirectionalFee,
        60,
        global_state,
        1_000_000,
        tick_spacing_to_max_liquidity_per_tick(60),
    );
    seed_tick(&mut state, -60, 1_000_000);
    seed_tick(&mut state, 60, -1_000_000);
    state.balance0 = U256::from(10_000_000u64);
    state.balance1 = U256::from(10_000_000u64);
    state
}
