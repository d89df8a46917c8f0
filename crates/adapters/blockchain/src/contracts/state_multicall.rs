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

//! Bindings for the pool state multicall helper.
//!
//! The helper reads a pool's global state, bitmap words and populated ticks in one call and
//! returns them in a shape shared by every supported variant. It reverts when the factory has
//! no pool for the requested key.

use alloy::{primitives::U160, sol};
use clmm_model::defi::{
    PoolVariant,
    pool_analysis::{GlobalState, PoolFee, ProtocolFee},
    tick_map::TickInfo,
    variant::{FeeLayout, ProtocolFeeKind},
};

sol! {
    contract PoolStateMulticall {
        struct GlobalStateData {
            uint160 sqrtPriceX96;
            int24 tick;
            uint24 fee;
            uint24 feeOneForZero;
            uint32 protocolFee;
        }

        struct TickData {
            int24 index;
            uint128 liquidityGross;
            int128 liquidityNet;
            uint256 feeGrowthOutside0X128;
            uint256 feeGrowthOutside1X128;
            bool initialized;
        }

        struct BitmapWord {
            int16 index;
            uint256 value;
        }

        struct StateResult {
            address pool;
            uint256 blockTimestamp;
            GlobalStateData globalState;
            uint128 liquidity;
            int24 tickSpacing;
            uint128 maxLiquidityPerTick;
            uint256 feeGrowthGlobal0X128;
            uint256 feeGrowthGlobal1X128;
            BitmapWord[] tickBitmap;
            TickData[] ticks;
        }

        function getFullStateWithRelativeBitmaps(
            address factory,
            address token0,
            address token1,
            uint24 fee,
            int16 leftBitmapAmount,
            int16 rightBitmapAmount
        ) external view returns (StateResult memory state);

        function getFullStateWithoutTicks(
            address factory,
            address token0,
            address token1,
            uint24 fee
        ) external view returns (StateResult memory state);

        function getTickBitmapAndTicksForWord(address pool, int16 wordPosition)
            external
            view
            returns (uint256 bitmap, TickData[] memory ticks);
    }
}

/// Builds the variant's global state from its raw parts.
///
/// `protocol_fee` is packed as the pool stores it; community fees put token0 in the low 16 bits.
#[must_use]
pub fn global_state_from_parts(
    variant: PoolVariant,
    sqrt_price_x96: U160,
    tick: i32,
    fee: u32,
    fee_one_for_zero: u32,
    protocol_fee: u32,
) -> GlobalState {
    let config = variant.config();
    let fee = match config.fee_layout {
        FeeLayout::Single => PoolFee::Single(fee),
        FeeLayout::Directional => PoolFee::Directional {
            zero_for_one: fee,
            one_for_zero: fee_one_for_zero,
        },
    };
    let protocol_fee = match config.protocol_fee {
        ProtocolFeeKind::PerMille => ProtocolFee::Community {
            token0: (protocol_fee & 0xffff) as u16,
            token1: (protocol_fee >> 16) as u16,
        },
        ProtocolFeeKind::Packed4Bit | ProtocolFeeKind::Packed16BitBasisPoints => {
            ProtocolFee::Packed(protocol_fee)
        }
    };
    GlobalState::new(sqrt_price_x96, tick, fee, protocol_fee)
}

impl PoolStateMulticall::GlobalStateData {
    #[must_use]
    pub fn into_global_state(self, variant: PoolVariant) -> GlobalState {
        global_state_from_parts(
            variant,
            self.sqrtPriceX96,
            self.tick.as_i32(),
            self.fee.to::<u32>(),
            self.feeOneForZero.to::<u32>(),
            self.protocolFee,
        )
    }
}

impl PoolStateMulticall::TickData {
    #[must_use]
    pub fn to_tick(&self) -> (i32, TickInfo) {
        (
            self.index.as_i32(),
            TickInfo::new(
                self.liquidityGross,
                self.liquidityNet,
                self.feeGrowthOutside0X128,
                self.feeGrowthOutside1X128,
                self.initialized,
            ),
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_single_fee_packed_protocol_fee() {
        let state = global_state_from_parts(PoolVariant::UniswapV3, U160::from(1), 5, 3000, 0, 0x44);
        assert_eq!(state.fee, PoolFee::Single(3000));
        assert_eq!(state.protocol_fee, ProtocolFee::Packed(0x44));
    }

    #[rstest]
    fn test_directional_fee_with_community_shares() {
        let packed = 100 | (150 << 16);
        let state = global_state_from_parts(
            PoolVariant::AlgebraDirectionalFee,
            U160::from(1),
            -5,
            500,
            3000,
            packed,
        );

        assert_eq!(
            state.fee,
            PoolFee::Directional {
                zero_for_one: 500,
                one_for_zero: 3000
            }
        );
        assert_eq!(
            state.protocol_fee,
            ProtocolFee::Community {
                token0: 100,
                token1: 150
            }
        );
    }
}
