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

use alloy_primitives::{U160, U256, ruint::UintTryFrom};

use super::{
    error::MathError,
    full_math::{FullMath, Q96},
    tick_math::get_sqrt_ratio_at_tick,
};

fn to_sqrt_price(value: U256, context: &'static str) -> Result<U160, MathError> {
    U160::uint_try_from(value).ok().ok_or(MathError::Overflow(context))
}

/// Encodes the sqrt ratio of two token amounts as a Q64.96 fixed point number.
///
/// Calculates sqrt(amount0 / amount1) * 2^96 so `encode_sqrt_ratio_x96(1, 1)` is exactly 2^96.
/// The result saturates at `U160::MAX`.
///
/// # Errors
///
/// Returns [`MathError::DivisionByZero`] if `amount1` is zero.
pub fn encode_sqrt_ratio_x96(amount0: u128, amount1: u128) -> Result<U160, MathError> {
    let amount0 = U256::from(amount0);
    let amount1 = U256::from(amount1);

    if amount1.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if amount0.is_zero() {
        return Ok(U160::ZERO);
    }

    // sqrt(amount0 / amount1) * 2^96 == sqrt(amount0 * 2^192 / amount1)
    let q192 = U256::ONE << 192;
    let root = if amount0 > U256::MAX / q192 {
        // Too wide for the scaled path, so take both roots first
        FullMath::mul_div(FullMath::sqrt(amount0), Q96, FullMath::sqrt(amount1))?
    } else {
        FullMath::sqrt(FullMath::mul_div(amount0, q192, amount1)?)
    };

    Ok(U160::saturating_from(root))
}

/// Calculates the next sqrt price from a token0 delta, always rounding up.
fn get_next_sqrt_price_from_amount0_rounding_up(
    sqrt_price_x96: U160,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U160, MathError> {
    if amount.is_zero() {
        return Ok(sqrt_price_x96);
    }
    let numerator: U256 = U256::from(liquidity) << 96;
    let sqrt_price = U256::from(sqrt_price_x96);
    let product = amount.wrapping_mul(sqrt_price);

    if add {
        if product / amount == sqrt_price {
            let denominator = numerator.wrapping_add(product);
            if denominator >= numerator {
                // always fits 160 bits
                let result = FullMath::mul_div_rounding_up(numerator, sqrt_price, denominator)?;
                return to_sqrt_price(result, "get_next_sqrt_price_from_amount0_rounding_up");
            }
        }

        // divRoundingUp(numerator, numerator / sqrtP + amount)
        let denominator = (numerator / sqrt_price)
            .checked_add(amount)
            .ok_or(MathError::Overflow("get_next_sqrt_price_from_amount0_rounding_up"))?;
        let result = FullMath::div_rounding_up(numerator, denominator)?;
        to_sqrt_price(result, "get_next_sqrt_price_from_amount0_rounding_up")
    } else {
        // Product overflow or an output at or above the virtual reserves
        if product / amount != sqrt_price || numerator <= product {
            return Err(MathError::InsufficientReserves);
        }

        let denominator = numerator - product;
        let result = FullMath::mul_div_rounding_up(numerator, sqrt_price, denominator)?;
        to_sqrt_price(result, "get_next_sqrt_price_from_amount0_rounding_up")
    }
}

/// Calculates the next sqrt price from a token1 delta, always rounding down.
fn get_next_sqrt_price_from_amount1_rounding_down(
    sqrt_price_x96: U160,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U160, MathError> {
    let sqrt_price = U256::from(sqrt_price_x96);
    let liquidity = U256::from(liquidity);
    let fits_160 = amount <= U256::from(U160::MAX);

    // Rounding down requires rounding the quotient down when adding and up when subtracting
    if add {
        let quotient = if fits_160 {
            (amount << 96) / liquidity
        } else {
            FullMath::mul_div(amount, Q96, liquidity)?
        };

        let next = sqrt_price
            .checked_add(quotient)
            .ok_or(MathError::Overflow("get_next_sqrt_price_from_amount1_rounding_down"))?;
        to_sqrt_price(next, "get_next_sqrt_price_from_amount1_rounding_down")
    } else {
        let quotient = if fits_160 {
            FullMath::div_rounding_up(amount << 96, liquidity)?
        } else {
            FullMath::mul_div_rounding_up(amount, Q96, liquidity)?
        };

        if sqrt_price <= quotient {
            return Err(MathError::InsufficientReserves);
        }

        to_sqrt_price(
            sqrt_price - quotient,
            "get_next_sqrt_price_from_amount1_rounding_down",
        )
    }
}

/// Calculates the next sqrt price given an input amount of token0 (`zero_for_one`) or token1.
///
/// # Errors
///
/// Returns an error if the price or liquidity is zero, or the new price does not fit 160 bits.
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x96: U160,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U160, MathError> {
    if sqrt_price_x96.is_zero() {
        return Err(MathError::ZeroPrice);
    }
    if liquidity == 0 {
        return Err(MathError::ZeroLiquidity);
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_in, true)
    }
}

/// Calculates the next sqrt price given an output amount of token1 (`zero_for_one`) or token0.
///
/// # Errors
///
/// Returns an error if the price or liquidity is zero, or the output exhausts the virtual reserves.
pub fn get_next_sqrt_price_from_output(
    sqrt_price_x96: U160,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U160, MathError> {
    if sqrt_price_x96.is_zero() {
        return Err(MathError::ZeroPrice);
    }
    if liquidity == 0 {
        return Err(MathError::ZeroLiquidity);
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_out, false)
    }
}

/// Calculates the token0 amount between two sqrt prices for the given liquidity.
///
/// # Errors
///
/// Returns an error if the lower price is zero or an intermediate overflows.
pub fn get_amount0_delta(
    sqrt_ratio_ax96: U160,
    sqrt_ratio_bx96: U160,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    let (sqrt_ratio_a, sqrt_ratio_b) = if sqrt_ratio_ax96 > sqrt_ratio_bx96 {
        (U256::from(sqrt_ratio_bx96), U256::from(sqrt_ratio_ax96))
    } else {
        (U256::from(sqrt_ratio_ax96), U256::from(sqrt_ratio_bx96))
    };

    if sqrt_ratio_a.is_zero() {
        return Err(MathError::ZeroPrice);
    }

    let numerator1 = U256::from(liquidity) << 96;
    let numerator2 = sqrt_ratio_b - sqrt_ratio_a;

    if round_up {
        let result = FullMath::mul_div_rounding_up(numerator1, numerator2, sqrt_ratio_b)?;
        FullMath::div_rounding_up(result, sqrt_ratio_a)
    } else {
        Ok(FullMath::mul_div(numerator1, numerator2, sqrt_ratio_b)? / sqrt_ratio_a)
    }
}

/// Calculates the token1 amount between two sqrt prices for the given liquidity.
///
/// # Errors
///
/// Returns an error if the result overflows 256 bits.
pub fn get_amount1_delta(
    sqrt_ratio_ax96: U160,
    sqrt_ratio_bx96: U160,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    let (sqrt_ratio_a, sqrt_ratio_b) = if sqrt_ratio_ax96 > sqrt_ratio_bx96 {
        (sqrt_ratio_bx96, sqrt_ratio_ax96)
    } else {
        (sqrt_ratio_ax96, sqrt_ratio_bx96)
    };

    let liquidity = U256::from(liquidity);
    let diff = U256::from(sqrt_ratio_b - sqrt_ratio_a);

    if round_up {
        FullMath::mul_div_rounding_up(liquidity, diff, Q96)
    } else {
        FullMath::mul_div(liquidity, diff, Q96)
    }
}

/// Calculates the token amounts held by `liquidity` over `[tick_lower, tick_upper)` at the given price.
///
/// # Errors
///
/// Returns an error if either tick is out of range or an amount overflows.
pub fn get_amounts_for_liquidity(
    sqrt_ratio_x96: U160,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
    round_up: bool,
) -> Result<(U256, U256), MathError> {
    let sqrt_ratio_lower = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_ratio_upper = get_sqrt_ratio_at_tick(tick_upper)?;

    let (sqrt_ratio_a, sqrt_ratio_b) = if sqrt_ratio_lower > sqrt_ratio_upper {
        (sqrt_ratio_upper, sqrt_ratio_lower)
    } else {
        (sqrt_ratio_lower, sqrt_ratio_upper)
    };

    let amounts = if sqrt_ratio_x96 <= sqrt_ratio_a {
        // Below the range, all token0
        (
            get_amount0_delta(sqrt_ratio_a, sqrt_ratio_b, liquidity, round_up)?,
            U256::ZERO,
        )
    } else if sqrt_ratio_x96 < sqrt_ratio_b {
        (
            get_amount0_delta(sqrt_ratio_x96, sqrt_ratio_b, liquidity, round_up)?,
            get_amount1_delta(sqrt_ratio_a, sqrt_ratio_x96, liquidity, round_up)?,
        )
    } else {
        // Above the range, all token1
        (
            U256::ZERO,
            get_amount1_delta(sqrt_ratio_a, sqrt_ratio_b, liquidity, round_up)?,
        )
    };

    Ok(amounts)
}

/// Expands an amount to 18 decimal places (multiplies by 10^18).
#[must_use]
pub fn expand_to_18_decimals(amount: u64) -> u128 {
    u128::from(amount) * 10u128.pow(18)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
