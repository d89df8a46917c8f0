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

use alloy_primitives::U160;
use thiserror::Error;

/// Failures of the fixed-point math kernels.
///
/// Every variant corresponds to a `require`/revert in the pool contracts, so a caller
/// hitting one of these knows the equivalent on-chain call would have reverted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),
    #[error("Tick {0} is outside [MIN_TICK, MAX_TICK]")]
    InvalidTick(i32),
    #[error("Sqrt price {0} is outside [MIN_SQRT_RATIO, MAX_SQRT_RATIO)")]
    InvalidSqrtPrice(U160),
    #[error("Bit scan of a zero word")]
    ZeroValue,
    #[error("Sqrt price must be greater than zero")]
    ZeroPrice,
    #[error("Liquidity must be greater than zero")]
    ZeroLiquidity,
    #[error("Insufficient virtual reserves for requested output")]
    InsufficientReserves,
    #[error("Liquidity underflow: {x} + ({y})")]
    LiquiditySub { x: u128, y: i128 },
    #[error("Liquidity overflow: {x} + {y}")]
    LiquidityAdd { x: u128, y: i128 },
    #[error("Tick liquidity gross {gross} exceeds max liquidity per tick {max}")]
    LiquidityExceedsMax { gross: u128, max: u128 },
}
