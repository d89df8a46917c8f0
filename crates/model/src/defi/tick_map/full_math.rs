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

use alloy_primitives::{I256, U160, U256, U512, ruint::UintTryFrom};

use super::error::MathError;

/// 2^96, the Q64.96 fixed point unit.
pub const Q96: U256 = U256::from_limbs([0, 1 << 32, 0, 0]);

/// 2^96 as a sqrt price.
pub const Q96_U160: U160 = U160::from_limbs([0, 1 << 32, 0]);

/// 2^128, the Q128.128 unit used by fee growth accumulators.
pub const Q128: U256 = U256::from_limbs([0, 0, 1, 0]);

/// Multiplication and division with a full 512-bit intermediate product.
#[derive(Debug)]
pub struct FullMath;

impl FullMath {
    /// Calculates `floor(a * b / denominator)` without intermediate overflow.
    ///
    /// # Errors
    ///
    /// Returns an error if `denominator` is zero or the result does not fit in 256 bits.
    pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
        if denominator.is_zero() {
            return Err(MathError::DivisionByZero);
        }

        let product = U512::from(a) * U512::from(b);
        let quotient = product / U512::from(denominator);

        U256::uint_try_from(quotient).ok().ok_or(MathError::Overflow("mul_div"))
    }

    /// Calculates `ceil(a * b / denominator)` without intermediate overflow.
    ///
    /// # Errors
    ///
    /// Returns an error if `denominator` is zero or the rounded result does not fit in 256 bits.
    pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
        let result = Self::mul_div(a, b, denominator)?;

        if a.mul_mod(b, denominator).is_zero() {
            Ok(result)
        } else {
            result
                .checked_add(U256::ONE)
                .ok_or(MathError::Overflow("mul_div_rounding_up"))
        }
    }

    /// Calculates `ceil(a / b)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `b` is zero.
    pub fn div_rounding_up(a: U256, b: U256) -> Result<U256, MathError> {
        if b.is_zero() {
            return Err(MathError::DivisionByZero);
        }

        let (quotient, remainder) = a.div_rem(b);
        if remainder.is_zero() {
            Ok(quotient)
        } else {
            // quotient < MAX whenever b > 1, and b == 1 never leaves a remainder
            Ok(quotient + U256::ONE)
        }
    }

    /// Reinterprets the bits of `value` as a signed integer, like `int256(uint256)`.
    #[must_use]
    pub const fn truncate_to_i256(value: U256) -> I256 {
        I256::from_raw(value)
    }

    /// Integer square root (floor) by Newton iteration.
    #[must_use]
    pub fn sqrt(x: U256) -> U256 {
        if x.is_zero() {
            return U256::ZERO;
        }

        let mut z = x;
        let mut y = (x >> 1) + U256::ONE;
        while y < z {
            z = y;
            y = (x / y + y) >> 1;
        }
        z
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
