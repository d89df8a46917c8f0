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

use alloy_primitives::{I256, U160, U256};

use super::{
    error::MathError,
    full_math::FullMath,
    sqrt_price_math::{
        get_amount0_delta, get_amount1_delta, get_next_sqrt_price_from_input,
        get_next_sqrt_price_from_output,
    },
};

/// Fee denominator: fees are expressed in hundredths of a basis point.
pub const FEE_DENOMINATOR: u32 = 1_000_000;

/// Outcome of a single constant-liquidity swap step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStepResult {
    /// Price after the step, never beyond the target.
    pub sqrt_ratio_next_x96: U160,
    /// Input consumed by the step, excluding the fee.
    pub amount_in: U256,
    /// Output produced by the step.
    pub amount_out: U256,
    /// Fee charged on the input, including any protocol share.
    pub fee_amount: U256,
}

/// Computes the result of swapping some amount in, or out, within a single tick range.
///
/// The swap is exact input when `amount_remaining >= 0` and exact output otherwise. The
/// direction is implied by the target price: a target at or below the current price swaps
/// token0 for token1.
///
/// # Errors
///
/// Returns an error wherever `SwapMath.computeSwapStep` would revert.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U160,
    sqrt_ratio_target_x96: U160,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<SwapStepResult, MathError> {
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;
    let exact_in = !amount_remaining.is_negative();
    let fee = U256::from(fee_pips);
    let denominator = U256::from(FEE_DENOMINATOR);

    // uint256(amountRemaining) and uint256(-amountRemaining)
    let remaining_in = amount_remaining.into_raw();
    let remaining_out = amount_remaining.wrapping_neg().into_raw();

    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    let sqrt_ratio_next_x96 = if exact_in {
        let remaining_less_fee = FullMath::mul_div(remaining_in, denominator - fee, denominator)?;
        amount_in = if zero_for_one {
            get_amount0_delta(sqrt_ratio_target_x96, sqrt_ratio_current_x96, liquidity, true)?
        } else {
            get_amount1_delta(sqrt_ratio_current_x96, sqrt_ratio_target_x96, liquidity, true)?
        };
        if remaining_less_fee >= amount_in {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_input(
                sqrt_ratio_current_x96,
                liquidity,
                remaining_less_fee,
                zero_for_one,
            )?
        }
    } else {
        amount_out = if zero_for_one {
            get_amount1_delta(sqrt_ratio_target_x96, sqrt_ratio_current_x96, liquidity, false)?
        } else {
            get_amount0_delta(sqrt_ratio_current_x96, sqrt_ratio_target_x96, liquidity, false)?
        };
        if remaining_out >= amount_out {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_output(
                sqrt_ratio_current_x96,
                liquidity,
                remaining_out,
                zero_for_one,
            )?
        }
    };

    let max = sqrt_ratio_target_x96 == sqrt_ratio_next_x96;

    // Recompute whichever side was not pinned to the target
    if zero_for_one {
        if !(max && exact_in) {
            amount_in =
                get_amount0_delta(sqrt_ratio_next_x96, sqrt_ratio_current_x96, liquidity, true)?;
        }
        if !(max && !exact_in) {
            amount_out =
                get_amount1_delta(sqrt_ratio_next_x96, sqrt_ratio_current_x96, liquidity, false)?;
        }
    } else {
        if !(max && exact_in) {
            amount_in =
                get_amount1_delta(sqrt_ratio_current_x96, sqrt_ratio_next_x96, liquidity, true)?;
        }
        if !(max && !exact_in) {
            amount_out =
                get_amount0_delta(sqrt_ratio_current_x96, sqrt_ratio_next_x96, liquidity, false)?;
        }
    }

    // Cap the output amount to not exceed the remaining output amount
    if !exact_in && amount_out > remaining_out {
        amount_out = remaining_out;
    }

    let fee_amount = if exact_in && sqrt_ratio_next_x96 != sqrt_ratio_target_x96 {
        // The remainder of the input is taken as fee
        remaining_in.wrapping_sub(amount_in)
    } else {
        FullMath::mul_div_rounding_up(amount_in, fee, denominator - fee)?
    };

    Ok(SwapStepResult {
        sqrt_ratio_next_x96,
        amount_in,
        amount_out,
        fee_amount,
    })
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    // Vectors from https://github.com/Uniswap/v3-core/blob/main/test/SwapMath.spec.ts
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;
    use crate::defi::tick_map::sqrt_price_math::{encode_sqrt_ratio_x96, expand_to_18_decimals};

    fn i256(value: i128) -> I256 {
        I256::try_from(value).unwrap()
    }

    fn u256(value: &str) -> U256 {
        U256::from_str(value).unwrap()
    }

    #[rstest]
    fn test_exact_in_capped_at_price_target_one_for_zero() {
        let price = encode_sqrt_ratio_x96(1, 1).unwrap();
        let target = encode_sqrt_ratio_x96(101, 100).unwrap();
        let amount = i256(expand_to_18_decimals(1) as i128);

        let step =
            compute_swap_step(price, target, expand_to_18_decimals(2), amount, 600).unwrap();

        assert_eq!(step.amount_in, u256("9975124224178055"));
        assert_eq!(step.fee_amount, u256("5988667735148"));
        assert_eq!(step.amount_out, u256("9925619580021728"));
        assert!(step.amount_in + step.fee_amount < amount.into_raw());
        assert_eq!(step.sqrt_ratio_next_x96, target);
    }

    #[rstest]
    fn test_exact_out_capped_at_price_target_one_for_zero() {
        let price = encode_sqrt_ratio_x96(1, 1).unwrap();
        let target = encode_sqrt_ratio_x96(101, 100).unwrap();
        let amount = i256(-(expand_to_18_decimals(1) as i128));

        let step =
            compute_swap_step(price, target, expand_to_18_decimals(2), amount, 600).unwrap();

        assert_eq!(step.amount_in, u256("9975124224178055"));
        assert_eq!(step.fee_amount, u256("5988667735148"));
        assert_eq!(step.amount_out, u256("9925619580021728"));
        assert_eq!(step.sqrt_ratio_next_x96, target);
    }

    #[rstest]
    fn test_exact_in_fully_spent_one_for_zero() {
        let price = encode_sqrt_ratio_x96(1, 1).unwrap();
        let target = encode_sqrt_ratio_x96(1000, 100).unwrap();
        let amount = i256(expand_to_18_decimals(1) as i128);

        let step =
            compute_swap_step(price, target, expand_to_18_decimals(2), amount, 600).unwrap();

        assert_eq!(step.amount_in, u256("999400000000000000"));
        assert_eq!(step.fee_amount, u256("600000000000000"));
        assert_eq!(step.amount_out, u256("666399946655997866"));
        assert_eq!(step.amount_in + step.fee_amount, amount.into_raw());
        assert!(step.sqrt_ratio_next_x96 < target);
    }

    #[rstest]
    fn test_amount_out_is_capped_at_desired_amount_out() {
        let step = compute_swap_step(
            U160::from_str("417332158212080721273783715441582").unwrap(),
            U160::from_str("1452870262520218020823638996").unwrap(),
            159_344_665_391_607_089_467_575_320_103,
            i256(-1),
            1,
        )
        .unwrap();

        assert_eq!(step.amount_in, U256::ONE);
        assert_eq!(step.fee_amount, U256::ONE);
        assert_eq!(step.amount_out, U256::ONE);
        assert_eq!(
            step.sqrt_ratio_next_x96,
            U160::from_str("417332158212080721273783715441581").unwrap()
        );
    }

    #[rstest]
    fn test_entire_input_amount_taken_as_fee() {
        let step = compute_swap_step(
            U160::from(2413),
            U160::from_str("79887613182836312").unwrap(),
            1_985_041_575_832_132_834_610_021_537_970,
            i256(10),
            1872,
        )
        .unwrap();

        assert_eq!(step.amount_in, U256::ZERO);
        assert_eq!(step.fee_amount, U256::from(10));
        assert_eq!(step.amount_out, U256::ZERO);
        assert_eq!(step.sqrt_ratio_next_x96, U160::from(2413));
    }

    #[rstest]
    fn test_zero_liquidity_moves_straight_to_target() {
        let price = encode_sqrt_ratio_x96(1, 1).unwrap();
        let target = encode_sqrt_ratio_x96(1, 2).unwrap();

        let step = compute_swap_step(price, target, 0, i256(1_000), 3000).unwrap();

        assert_eq!(step.sqrt_ratio_next_x96, target);
        assert_eq!(step.amount_in, U256::ZERO);
        assert_eq!(step.amount_out, U256::ZERO);
        assert_eq!(step.fee_amount, U256::ZERO);
    }
}
