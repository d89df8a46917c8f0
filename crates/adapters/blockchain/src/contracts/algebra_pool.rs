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

//! Bindings for the Algebra pool family.
//!
//! The variants share most getters but disagree on `globalState` and on the tick record.

use alloy::sol;
use clmm_model::defi::tick_map::TickInfo;

sol! {
    contract AlgebraPool {
        function liquidity() external view returns (uint128);
        function tickSpacing() external view returns (int24);
        function maxLiquidityPerTick() external view returns (uint128);
        function totalFeeGrowth0Token() external view returns (uint256);
        function totalFeeGrowth1Token() external view returns (uint256);
        function tickTable(int16 wordPosition) external view returns (uint256);
        function ticks(int24 tick) external view returns (
            uint128 liquidityTotal,
            int128 liquidityDelta,
            uint256 outerFeeGrowth0Token,
            uint256 outerFeeGrowth1Token,
            int56 outerTickCumulative,
            uint160 outerSecondsPerLiquidity,
            uint32 outerSecondsSpent,
            bool initialized
        );
    }

    contract AlgebraV1Pool {
        function globalState() external view returns (
            uint160 price,
            int24 tick,
            uint16 fee,
            uint16 timepointIndex,
            uint8 communityFeeToken0,
            uint8 communityFeeToken1,
            bool unlocked
        );
    }

    contract AlgebraDirectionalFeePool {
        function globalState() external view returns (
            uint160 price,
            int24 tick,
            uint16 feeZto,
            uint16 feeOtz,
            uint16 timepointIndex,
            uint8 communityFeeToken0,
            uint8 communityFeeToken1,
            bool unlocked
        );
    }

    contract AlgebraIntegralPool {
        function globalState() external view returns (
            uint160 price,
            int24 tick,
            uint16 lastFee,
            uint8 pluginConfig,
            uint16 communityFee,
            bool unlocked
        );
        function ticks(int24 tick) external view returns (
            uint256 liquidityTotal,
            int128 liquidityDelta,
            int24 prevTick,
            int24 nextTick,
            uint256 outerFeeGrowth0Token,
            uint256 outerFeeGrowth1Token
        );
    }

    contract AlgebraFactory {
        function poolByPair(address tokenA, address tokenB) external view returns (address pool);
    }
}

impl From<AlgebraPool::ticksReturn> for TickInfo {
    fn from(tick: AlgebraPool::ticksReturn) -> Self {
        Self::new(
            tick.liquidityTotal,
            tick.liquidityDelta,
            tick.outerFeeGrowth0Token,
            tick.outerFeeGrowth1Token,
            tick.initialized,
        )
    }
}

/// Integral ticks have no initialized flag; a tick is live while it carries liquidity.
///
/// Returns `None` if the total liquidity does not fit in 128 bits.
#[must_use]
pub fn integral_tick_info(tick: &AlgebraIntegralPool::ticksReturn) -> Option<TickInfo> {
    let liquidity_gross = u128::try_from(tick.liquidityTotal).ok()?;
    Some(TickInfo::new(
        liquidity_gross,
        tick.liquidityDelta,
        tick.outerFeeGrowth0Token,
        tick.outerFeeGrowth1Token,
        liquidity_gross != 0,
    ))
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use alloy::primitives::{U256, aliases::I24};
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_integral_tick_initialized_from_liquidity() {
        let mut raw = AlgebraIntegralPool::ticksReturn {
            liquidityTotal: U256::from(5),
            liquidityDelta: -5,
            prevTick: I24::try_from(-60).unwrap(),
            nextTick: I24::try_from(60).unwrap(),
            outerFeeGrowth0Token: U256::ZERO,
            outerFeeGrowth1Token: U256::ZERO,
        };

        let tick = integral_tick_info(&raw).unwrap();
        assert!(tick.initialized);
        assert_eq!(tick.liquidity_net, -5);

        raw.liquidityTotal = U256::ZERO;
        assert!(!integral_tick_info(&raw).unwrap().initialized);

        raw.liquidityTotal = U256::MAX;
        assert!(integral_tick_info(&raw).is_none());
    }
}
