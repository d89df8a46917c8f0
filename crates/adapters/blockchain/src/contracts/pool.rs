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

//! Variant-aware calls against a pool contract and its factory.

use alloy::{
    primitives::{Address, U256, aliases::{I24, U24}},
    sol_types::SolCall,
};
use clmm_model::defi::{
    PoolVariant, pool_analysis::GlobalState, tick_map::TickInfo,
};

use super::{
    algebra_pool::{
        AlgebraDirectionalFeePool, AlgebraFactory, AlgebraIntegralPool, AlgebraPool,
        AlgebraV1Pool, integral_tick_info,
    },
    base::{CallResult, ContractCall, PoolContractError, decode_call_result, encode_call},
    state_multicall::global_state_from_parts,
    uniswap_v3_pool::{PancakeV3Pool, UniswapV3Factory, UniswapV3Pool},
};

/// Encodes and decodes the reads of one pool, dispatching on its variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCalls {
    pub pool: Address,
    pub variant: PoolVariant,
}

impl PoolCalls {
    #[must_use]
    pub const fn new(pool: Address, variant: PoolVariant) -> Self {
        Self { pool, variant }
    }

    fn encode<C: SolCall>(&self, call: &C) -> ContractCall {
        encode_call(self.pool, call, false)
    }

    fn decode<C: SolCall>(&self, field: &str, result: &CallResult) -> Result<C::Return, PoolContractError> {
        decode_call_result::<C>(self.pool, field, result)
    }

    #[must_use]
    pub fn global_state(&self) -> ContractCall {
        match self.variant {
            PoolVariant::UniswapV3 => self.encode(&UniswapV3Pool::slot0Call {}),
            PoolVariant::PancakeSwapV3 => self.encode(&PancakeV3Pool::slot0Call {}),
            PoolVariant::AlgebraV1 => self.encode(&AlgebraV1Pool::globalStateCall {}),
            PoolVariant::AlgebraIntegral => self.encode(&AlgebraIntegralPool::globalStateCall {}),
            PoolVariant::AlgebraDirectionalFee => {
                self.encode(&AlgebraDirectionalFeePool::globalStateCall {})
            }
        }
    }

    /// Decodes `slot0` or `globalState`. Uniswap style pools keep the fee out of `slot0`, so
    /// `fee` supplies it.
    ///
    /// # Errors
    ///
    /// Returns an error if the call reverted or the data does not decode.
    pub fn decode_global_state(
        &self,
        result: &CallResult,
        fee: u32,
    ) -> Result<GlobalState, PoolContractError> {
        let variant = self.variant;
        let state = match variant {
            PoolVariant::UniswapV3 => {
                let slot0 = self.decode::<UniswapV3Pool::slot0Call>("slot0", result)?;
                global_state_from_parts(
                    variant,
                    slot0.sqrtPriceX96,
                    slot0.tick.as_i32(),
                    fee,
                    fee,
                    u32::from(slot0.feeProtocol),
                )
            }
            PoolVariant::PancakeSwapV3 => {
                let slot0 = self.decode::<PancakeV3Pool::slot0Call>("slot0", result)?;
                global_state_from_parts(
                    variant,
                    slot0.sqrtPriceX96,
                    slot0.tick.as_i32(),
                    fee,
                    fee,
                    slot0.feeProtocol,
                )
            }
            PoolVariant::AlgebraV1 => {
                let gs = self.decode::<AlgebraV1Pool::globalStateCall>("globalState", result)?;
                global_state_from_parts(
                    variant,
                    gs.price,
                    gs.tick.as_i32(),
                    u32::from(gs.fee),
                    u32::from(gs.fee),
                    u32::from(gs.communityFeeToken0) | (u32::from(gs.communityFeeToken1) << 16),
                )
            }
            PoolVariant::AlgebraIntegral => {
                let gs =
                    self.decode::<AlgebraIntegralPool::globalStateCall>("globalState", result)?;
                let community = u32::from(gs.communityFee);
                global_state_from_parts(
                    variant,
                    gs.price,
                    gs.tick.as_i32(),
                    u32::from(gs.lastFee),
                    u32::from(gs.lastFee),
                    community | (community << 16),
                )
            }
            PoolVariant::AlgebraDirectionalFee => {
                let gs = self
                    .decode::<AlgebraDirectionalFeePool::globalStateCall>("globalState", result)?;
                global_state_from_parts(
                    variant,
                    gs.price,
                    gs.tick.as_i32(),
                    u32::from(gs.feeZto),
                    u32::from(gs.feeOtz),
                    u32::from(gs.communityFeeToken0) | (u32::from(gs.communityFeeToken1) << 16),
                )
            }
        };
        Ok(state)
    }

    #[must_use]
    pub fn liquidity(&self) -> ContractCall {
        if self.variant.is_algebra() {
            self.encode(&AlgebraPool::liquidityCall {})
        } else {
            self.encode(&UniswapV3Pool::liquidityCall {})
        }
    }

    /// # Errors
    ///
    /// Returns an error if the call reverted or the data does not decode.
    pub fn decode_liquidity(&self, result: &CallResult) -> Result<u128, PoolContractError> {
        // Both ABIs return a bare uint128
        self.decode::<UniswapV3Pool::liquidityCall>("liquidity", result)
    }

    #[must_use]
    pub fn tick_spacing(&self) -> ContractCall {
        if self.variant.is_algebra() {
            self.encode(&AlgebraPool::tickSpacingCall {})
        } else {
            self.encode(&UniswapV3Pool::tickSpacingCall {})
        }
    }

    /// # Errors
    ///
    /// Returns an error if the call reverted or the data does not decode.
    pub fn decode_tick_spacing(&self, result: &CallResult) -> Result<i32, PoolContractError> {
        let spacing = self.decode::<UniswapV3Pool::tickSpacingCall>("tickSpacing", result)?;
        Ok(spacing.as_i32())
    }

    /// Not every Algebra deployment exposes this getter, so the call may fail.
    #[must_use]
    pub fn max_liquidity_per_tick(&self) -> ContractCall {
        let call = if self.variant.is_algebra() {
            self.encode(&AlgebraPool::maxLiquidityPerTickCall {})
        } else {
            self.encode(&UniswapV3Pool::maxLiquidityPerTickCall {})
        };
        ContractCall {
            allow_failure: true,
            ..call
        }
    }

    /// Returns zero when the getter is missing, leaving the cap to be derived from spacing.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not decode.
    pub fn decode_max_liquidity_per_tick(
        &self,
        result: &CallResult,
    ) -> Result<u128, PoolContractError> {
        if !result.success {
            return Ok(0);
        }
        self.decode::<UniswapV3Pool::maxLiquidityPerTickCall>("maxLiquidityPerTick", result)
    }

    #[must_use]
    pub fn fee_growth_global(&self, token1: bool) -> ContractCall {
        match (self.variant.is_algebra(), token1) {
            (true, false) => self.encode(&AlgebraPool::totalFeeGrowth0TokenCall {}),
            (true, true) => self.encode(&AlgebraPool::totalFeeGrowth1TokenCall {}),
            (false, false) => self.encode(&UniswapV3Pool::feeGrowthGlobal0X128Call {}),
            (false, true) => self.encode(&UniswapV3Pool::feeGrowthGlobal1X128Call {}),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the call reverted or the data does not decode.
    pub fn decode_fee_growth_global(&self, result: &CallResult) -> Result<U256, PoolContractError> {
        self.decode::<UniswapV3Pool::feeGrowthGlobal0X128Call>("feeGrowthGlobal", result)
    }

    #[must_use]
    pub fn bitmap_word(&self, word: i16) -> ContractCall {
        if self.variant.is_algebra() {
            self.encode(&AlgebraPool::tickTableCall { wordPosition: word })
        } else {
            self.encode(&UniswapV3Pool::tickBitmapCall { wordPosition: word })
        }
    }

    /// # Errors
    ///
    /// Returns an error if the call reverted or the data does not decode.
    pub fn decode_bitmap_word(&self, result: &CallResult) -> Result<U256, PoolContractError> {
        self.decode::<UniswapV3Pool::tickBitmapCall>("tickBitmap", result)
    }

    /// # Errors
    ///
    /// Returns an error if `tick` does not fit in an `int24`.
    pub fn tick(&self, tick: i32) -> Result<ContractCall, PoolContractError> {
        let tick_i24 = I24::try_from(tick).map_err(|_| PoolContractError::CallFailed {
            field: "tick".to_string(),
            target: self.pool,
            reason: format!("Tick {tick} out of range for int24"),
        })?;
        Ok(match self.variant {
            PoolVariant::UniswapV3 | PoolVariant::PancakeSwapV3 => {
                self.encode(&UniswapV3Pool::ticksCall { tick: tick_i24 })
            }
            PoolVariant::AlgebraV1 | PoolVariant::AlgebraDirectionalFee => {
                self.encode(&AlgebraPool::ticksCall { tick: tick_i24 })
            }
            PoolVariant::AlgebraIntegral => {
                self.encode(&AlgebraIntegralPool::ticksCall { tick: tick_i24 })
            }
        })
    }

    /// # Errors
    ///
    /// Returns an error if the call reverted or the data does not decode.
    pub fn decode_tick(&self, tick: i32, result: &CallResult) -> Result<TickInfo, PoolContractError> {
        let field = format!("ticks({tick})");
        match self.variant {
            PoolVariant::UniswapV3 | PoolVariant::PancakeSwapV3 => self
                .decode::<UniswapV3Pool::ticksCall>(&field, result)
                .map(TickInfo::from),
            PoolVariant::AlgebraV1 | PoolVariant::AlgebraDirectionalFee => self
                .decode::<AlgebraPool::ticksCall>(&field, result)
                .map(TickInfo::from),
            PoolVariant::AlgebraIntegral => {
                let raw = self.decode::<AlgebraIntegralPool::ticksCall>(&field, result)?;
                integral_tick_info(&raw).ok_or_else(|| PoolContractError::DecodingError {
                    field,
                    target: self.pool,
                    reason: "liquidityTotal exceeds uint128".to_string(),
                    raw_data: hex::encode(&result.return_data),
                })
            }
        }
    }
}

/// Encodes the factory lookup of a pool by its key.
#[must_use]
pub fn factory_pool_lookup(
    variant: PoolVariant,
    factory: Address,
    token0: Address,
    token1: Address,
    fee: u32,
) -> ContractCall {
    if variant.is_algebra() {
        encode_call(
            factory,
            &AlgebraFactory::poolByPairCall {
                tokenA: token0,
                tokenB: token1,
            },
            false,
        )
    } else {
        encode_call(
            factory,
            &UniswapV3Factory::getPoolCall {
                tokenA: token0,
                tokenB: token1,
                fee: U24::from(fee),
            },
            false,
        )
    }
}

/// Decodes a factory lookup, where the zero address means no pool.
///
/// # Errors
///
/// Returns an error if the call reverted or the data does not decode.
pub fn decode_factory_pool_lookup(
    factory: Address,
    result: &CallResult,
) -> Result<Address, PoolContractError> {
    decode_call_result::<UniswapV3Factory::getPoolCall>(factory, "getPool", result)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use alloy::primitives::{U160, address};
    use clmm_model::defi::pool_analysis::{PoolFee, ProtocolFee};
    use rstest::rstest;

    use super::*;

    const POOL: Address = address!("0x8ad599c3a0ff1de082011efddc58f1908eb6e6d8");

    #[rstest]
    #[case(PoolVariant::UniswapV3, UniswapV3Pool::tickBitmapCall::SELECTOR)]
    #[case(PoolVariant::AlgebraV1, AlgebraPool::tickTableCall::SELECTOR)]
    #[case(PoolVariant::AlgebraIntegral, AlgebraPool::tickTableCall::SELECTOR)]
    fn test_bitmap_selector_follows_variant(#[case] variant: PoolVariant, #[case] selector: [u8; 4]) {
        let call = PoolCalls::new(POOL, variant).bitmap_word(-3);
        assert_eq!(call.call_data[..4], selector);
        assert_eq!(call.target, POOL);
    }

    #[rstest]
    fn test_decode_algebra_v1_global_state() {
        let calls = PoolCalls::new(POOL, PoolVariant::AlgebraV1);
        let ret = AlgebraV1Pool::globalStateReturn {
            price: U160::from(1u128 << 96),
            tick: I24::try_from(-12).unwrap(),
            fee: 500,
            timepointIndex: 0,
            communityFeeToken0: 100,
            communityFeeToken1: 200,
            unlocked: true,
        };
        let data = AlgebraV1Pool::globalStateCall::abi_encode_returns(&ret);

        let state = calls
            .decode_global_state(&CallResult::ok(data.into()), 0)
            .unwrap();

        assert_eq!(state.tick, -12);
        assert_eq!(state.fee, PoolFee::Single(500));
        assert_eq!(
            state.protocol_fee,
            ProtocolFee::Community {
                token0: 100,
                token1: 200
            }
        );
    }

    #[rstest]
    fn test_missing_max_liquidity_getter_reads_zero() {
        let calls = PoolCalls::new(POOL, PoolVariant::AlgebraIntegral);
        assert!(calls.max_liquidity_per_tick().allow_failure);
        assert_eq!(
            calls
                .decode_max_liquidity_per_tick(&CallResult::failed())
                .unwrap(),
            0
        );
    }

    #[rstest]
    fn test_tick_out_of_int24_range() {
        let calls = PoolCalls::new(POOL, PoolVariant::UniswapV3);
        assert!(calls.tick(1 << 23).is_err());
        assert!(calls.tick(-(1 << 23)).is_ok());
    }

    #[rstest]
    fn test_factory_lookup_zero_address() {
        let factory = address!("0x1f98431c8ad98523631ae4a59f267346ea31f984");
        let data = UniswapV3Factory::getPoolCall::abi_encode_returns(&Address::ZERO);
        let pool = decode_factory_pool_lookup(factory, &CallResult::ok(data.into())).unwrap();
        assert_eq!(pool, Address::ZERO);
    }
}
