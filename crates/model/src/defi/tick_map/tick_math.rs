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

use alloy_primitives::{I256, U160, U256, ruint::UintTryFrom};

use super::{bit_math::most_significant_bit, error::MathError};

/// The minimum tick that may be passed to [`get_sqrt_ratio_at_tick`], from log base 1.0001 of 2^-128.
pub const MIN_TICK: i32 = -887_272;
/// The maximum tick that may be passed to [`get_sqrt_ratio_at_tick`], from log base 1.0001 of 2^128.
pub const MAX_TICK: i32 = -MIN_TICK;

/// `get_sqrt_ratio_at_tick(MIN_TICK)`.
pub const MIN_SQRT_RATIO: U160 = U160::from_limbs([4_295_128_739, 0, 0]);
/// `get_sqrt_ratio_at_tick(MAX_TICK)`.
pub const MAX_SQRT_RATIO: U160 =
    U160::from_limbs([6_743_328_256_752_651_558, 17_280_870_778_742_802_505, 4_294_805_859]);

// sqrt(1.0001) ratios for each bit of |tick|, as Q128.128 (high limb, low limb)
const TICK_RATIO_STEPS: [(u32, u64, u64); 19] = [
    (0x2, 18_444_899_583_751_176_498, 6_459_403_834_229_662_010),
    (0x4, 18_443_055_278_223_354_162, 17_226_890_335_427_755_468),
    (0x8, 18_439_367_220_385_604_838, 2_032_852_871_939_366_096),
    (0x10, 18_431_993_317_065_449_817, 14_545_316_742_740_207_172),
    (0x20, 18_417_254_355_718_160_513, 5_129_152_022_828_963_008),
    (0x40, 18_387_811_781_193_591_352, 4_894_419_605_888_772_193),
    (0x80, 18_329_067_761_203_520_168, 1_280_255_884_321_894_483),
    (0x100, 18_212_142_134_806_087_854, 15_924_666_964_335_305_636),
    (0x200, 17_980_523_815_641_551_639, 8_010_504_389_359_918_676),
    (0x400, 17_526_086_738_831_147_013, 10_668_036_004_952_895_731),
    (0x800, 16_651_378_430_235_024_244, 4_878_133_418_470_705_625),
    (0x1000, 15_030_750_278_693_429_944, 9_537_173_718_739_605_541),
    (0x2000, 12_247_334_978_882_834_399, 9_972_618_978_014_552_549),
    (0x4000, 8_131_365_268_884_726_200, 10_428_997_489_610_666_743),
    (0x8000, 3_584_323_654_723_342_297, 9_305_304_367_709_015_974),
    (0x10000, 696_457_651_847_595_233, 14_301_143_598_189_091_785),
    (0x20000, 26_294_789_957_452_057, 7_393_154_844_743_099_908),
    (0x40000, 37_481_735_321_082, 2_209_338_891_292_245_656),
    (0x80000, 76_158_723, 10_518_117_631_919_034_274),
];

// 0xfffcb933bd6fad37aa2d162d1a594001
const ODD_TICK_RATIO: U256 =
    U256::from_limbs([12_262_481_743_371_124_737, 18_445_821_805_675_392_311, 0, 0]);

// log_sqrt(1.0001)(2) as Q64.64 scaling factor
const LOG_SQRT_10001: U256 = U256::from_limbs([11_745_905_768_312_294_533, 13_863, 0, 0]);
const TICK_LOW_OFFSET: U256 =
    U256::from_limbs([6_552_757_943_157_144_234, 184_476_617_836_266_586, 0, 0]);
const TICK_HIGH_OFFSET: U256 =
    U256::from_limbs([4_998_474_450_511_881_007, 15_793_544_031_827_761_793, 0, 0]);

/// Calculates `sqrt(1.0001^tick) * 2^96` as a Q64.96 number.
///
/// # Errors
///
/// Returns [`MathError::InvalidTick`] if `|tick| > MAX_TICK`.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U160, MathError> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK as u32 {
        return Err(MathError::InvalidTick(tick));
    }

    let mut ratio = if abs_tick & 0x1 != 0 {
        ODD_TICK_RATIO
    } else {
        U256::from_limbs([0, 0, 1, 0])
    };

    for (bit, high, low) in TICK_RATIO_STEPS {
        if abs_tick & bit != 0 {
            ratio = ratio.wrapping_mul(U256::from_limbs([low, high, 0, 0])) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Divide by 1<<32 rounding up, so the result is a Q64.96 that round trips through
    // get_tick_at_sqrt_ratio
    let round_up = !(ratio & U256::from(u32::MAX)).is_zero();
    let sqrt_price = (ratio >> 32) + U256::from(round_up as u8);

    U160::uint_try_from(sqrt_price).ok().ok_or(MathError::Overflow("get_sqrt_ratio_at_tick"))
}

/// Calculates the greatest tick value such that `get_sqrt_ratio_at_tick(tick) <= sqrt_price_x96`.
///
/// # Errors
///
/// Returns [`MathError::InvalidSqrtPrice`] if the price is outside `[MIN_SQRT_RATIO, MAX_SQRT_RATIO)`.
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U160) -> Result<i32, MathError> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(MathError::InvalidSqrtPrice(sqrt_price_x96));
    }

    let ratio = U256::from(sqrt_price_x96) << 32;
    let msb = most_significant_bit(ratio)? as usize;

    let mut r = if msb >= 128 {
        ratio >> (msb - 127)
    } else {
        ratio << (127 - msb)
    };

    let mut log_2: I256 = I256::from_raw(U256::from(msb))
        .wrapping_sub(I256::from_raw(U256::from(128u8)))
        << 64;

    for shift in (50..=63).rev() {
        r = r.wrapping_mul(r) >> 127;
        let f: U256 = r >> 128;
        log_2 |= I256::from_raw(f << shift);
        r >>= f.to::<usize>();
    }

    let log_sqrt10001 = log_2.wrapping_mul(I256::from_raw(LOG_SQRT_10001));

    // Both bounds lie within [MIN_TICK, MAX_TICK] once the price range check has passed
    let tick_low = log_sqrt10001
        .wrapping_sub(I256::from_raw(TICK_LOW_OFFSET))
        .asr(128)
        .low_i32();
    let tick_high = log_sqrt10001
        .wrapping_add(I256::from_raw(TICK_HIGH_OFFSET))
        .asr(128)
        .low_i32();

    if tick_low == tick_high {
        Ok(tick_low)
    } else if get_sqrt_ratio_at_tick(tick_high)? <= sqrt_price_x96 {
        Ok(tick_high)
    } else {
        Ok(tick_low)
    }
}

/// Expands a compressed tick back to raw tick units, clamped to `[MIN_TICK, MAX_TICK]`.
#[must_use]
pub fn bound_tick(compressed: i32, tick_spacing: i32) -> i32 {
    (i64::from(compressed) * i64::from(tick_spacing)).clamp(i64::from(MIN_TICK), i64::from(MAX_TICK))
        as i32
}

/// Smallest usable tick that is a multiple of `tick_spacing`.
#[must_use]
pub fn min_usable_tick(tick_spacing: i32) -> i32 {
    (MIN_TICK / tick_spacing) * tick_spacing
}

/// Largest usable tick that is a multiple of `tick_spacing`.
#[must_use]
pub fn max_usable_tick(tick_spacing: i32) -> i32 {
    (MAX_TICK / tick_spacing) * tick_spacing
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
