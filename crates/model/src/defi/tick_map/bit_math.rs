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

//! Bit scans over 256-bit words, written as the halving folds used by `BitMath.sol`.
//!
//! The folds never rely on a native leading/trailing-zero instruction so the result is
//! defined by the same sequence of comparisons the contract executes.

use alloy_primitives::U256;

use super::error::MathError;

const FOLD_SHIFTS: [usize; 8] = [128, 64, 32, 16, 8, 4, 2, 1];

/// Returns the index of the most significant set bit of `x`.
///
/// # Errors
///
/// Returns [`MathError::ZeroValue`] if `x` is zero.
pub fn most_significant_bit(mut x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }

    let mut r: u32 = 0;
    for shift in FOLD_SHIFTS {
        // x >= 2^shift
        if x >= (U256::ONE << shift) {
            x >>= shift;
            r += shift as u32;
        }
    }

    Ok(r as u8)
}

/// Returns the index of the least significant set bit of `x`.
///
/// # Errors
///
/// Returns [`MathError::ZeroValue`] if `x` is zero.
pub fn least_significant_bit(mut x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }

    let mut r: u32 = 255;
    for shift in &FOLD_SHIFTS[..7] {
        let mask = (U256::ONE << *shift) - U256::ONE;
        if !(x & mask).is_zero() {
            r -= *shift as u32;
        } else {
            x >>= *shift;
        }
    }
    if !(x & U256::ONE).is_zero() {
        r -= 1;
    }

    Ok(r as u8)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_zero_is_rejected() {
        assert_eq!(most_significant_bit(U256::ZERO), Err(MathError::ZeroValue));
        assert_eq!(least_significant_bit(U256::ZERO), Err(MathError::ZeroValue));
    }

    #[rstest]
    #[case(U256::from(1u8), 0, 0)]
    #[case(U256::from(2u8), 1, 1)]
    #[case(U256::from(3u8), 1, 0)]
    #[case(U256::from(0x80u8), 7, 7)]
    #[case(U256::from(0x8001u32), 15, 0)]
    #[case(U256::ONE << 255, 255, 255)]
    #[case(U256::MAX, 255, 0)]
    fn test_known_values(#[case] x: U256, #[case] msb: u8, #[case] lsb: u8) {
        assert_eq!(most_significant_bit(x).unwrap(), msb);
        assert_eq!(least_significant_bit(x).unwrap(), lsb);
    }

    #[rstest]
    fn test_every_power_of_two() {
        for i in 0..256usize {
            let x = U256::ONE << i;
            assert_eq!(most_significant_bit(x).unwrap() as usize, i);
            assert_eq!(least_significant_bit(x).unwrap() as usize, i);
        }
    }

    proptest! {
        #[test]
        fn prop_folds_agree_with_native_scans(limbs in any::<[u64; 4]>()) {
            let x = U256::from_limbs(limbs);
            prop_assume!(!x.is_zero());
            prop_assert_eq!(most_significant_bit(x).unwrap() as usize, 255 - x.leading_zeros());
            prop_assert_eq!(least_significant_bit(x).unwrap() as usize, x.trailing_zeros());
        }
    }
}
