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

use alloy::sol;
use clmm_model::defi::tick_map::TickInfo;

sol! {
    contract UniswapV3Pool {
        /// Packed struct containing core pool state
        struct Slot0Data {
            uint160 sqrtPriceX96;
            int24 tick;
            uint16 observationIndex;
            uint16 observationCardinality;
            uint16 observationCardinalityNext;
            uint8 feeProtocol;
            bool unlocked;
        }

        /// Tick information
        struct TickInfo {
            uint128 liquidityGross;
            int128 liquidityNet;
            uint256 feeGrowthOutside0X128;
            uint256 feeGrowthOutside1X128;
            int56 tickCumulativeOutside;
            uint160 secondsPerLiquidityOutsideX128;
            uint32 secondsOutside;
            bool initialized;
        }

        function slot0() external view returns (Slot0Data memory);
        function liquidity() external view returns (uint128);
        function tickSpacing() external view returns (int24);
        function maxLiquidityPerTick() external view returns (uint128);
        function fee() external view returns (uint24);
        function feeGrowthGlobal0X128() external view returns (uint256);
        function feeGrowthGlobal1X128() external view returns (uint256);
        function tickBitmap(int16 wordPosition) external view returns (uint256);
        function ticks(int24 tick) external view returns (TickInfo memory);
    }

    /// PancakeSwap V3 widens `feeProtocol` to two packed 16 bit shares.
    contract PancakeV3Pool {
        struct Slot0Data {
            uint160 sqrtPriceX96;
            int24 tick;
            uint16 observationIndex;
            uint16 observationCardinality;
            uint16 observationCardinalityNext;
            uint32 feeProtocol;
            bool unlocked;
        }

        function slot0() external view returns (Slot0Data memory);
    }

    contract UniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }
}

impl From<UniswapV3Pool::TickInfo> for TickInfo {
    fn from(tick: UniswapV3Pool::TickInfo) -> Self {
        Self::new(
            tick.liquidityGross,
            tick.liquidityNet,
            tick.feeGrowthOutside0X128,
            tick.feeGrowthOutside1X128,
            tick.initialized,
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
