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

//! An in-process chain double answering ABI-encoded calls from pool states.
//!
//! [`FakeChain`] implements [`MulticallTransport`] so bootstrap and registry code can be
//! exercised without a node. Calls are routed by selector and answered from the registered
//! pools; anything it does not recognize reverts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use alloy::{
    primitives::{
        Address, U256,
        aliases::{I24, U24},
    },
    sol_types::SolCall,
};
use async_trait::async_trait;
use clmm_model::defi::{
    PoolState, PoolVariant,
    pool_analysis::{GlobalState, PoolFee, ProtocolFee},
    tick_map::{TickBitmap, TickInfo},
};
use dashmap::DashMap;

use crate::{
    contracts::{
        CallResult, ContractCall,
        algebra_pool::{
            AlgebraDirectionalFeePool, AlgebraFactory, AlgebraIntegralPool, AlgebraPool,
            AlgebraV1Pool,
        },
        erc20::ERC20,
        state_multicall::PoolStateMulticall,
        uniswap_v3_pool::{PancakeV3Pool, UniswapV3Factory, UniswapV3Pool},
    },
    rpc::{BlockchainRpcClientError, MulticallTransport},
};

/// A pool registered on the [`FakeChain`].
#[derive(Debug, Clone)]
pub struct FakePool {
    pub state: PoolState,
    pub factory: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    /// Whether `maxLiquidityPerTick()` answers; some Algebra deployments lack it.
    pub exposes_max_liquidity: bool,
}

impl FakePool {
    #[must_use]
    pub fn new(state: PoolState, factory: Address, token0: Address, token1: Address, fee: u32) -> Self {
        Self {
            state,
            factory,
            token0,
            token1,
            fee,
            exposes_max_liquidity: true,
        }
    }

    // Algebra factories key pools by pair only
    fn matches(&self, factory: Address, token_a: Address, token_b: Address, fee: Option<u32>) -> bool {
        let pair = (self.token0 == token_a && self.token1 == token_b)
            || (self.token0 == token_b && self.token1 == token_a);
        let fee_matches = self.state.variant.is_algebra() || fee.is_none_or(|fee| fee == self.fee);
        self.factory == factory && pair && fee_matches
    }
}

/// A chain double serving pool state through the multicall interface.
#[derive(Debug)]
pub struct FakeChain {
    state_multicall: Address,
    pools: DashMap<Address, FakePool>,
    /// Requests with more calls than this fail at the transport, zero for no limit.
    max_batch_size: AtomicUsize,
    /// Requests with more calls than this revert every call, as when the aggregate runs out
    /// of gas. Zero for no limit.
    gas_limited_batch_size: AtomicUsize,
    fail_state_calls: AtomicBool,
    requests: AtomicUsize,
}

impl FakeChain {
    #[must_use]
    pub fn new(state_multicall: Address) -> Self {
        Self {
            state_multicall,
            pools: DashMap::new(),
            max_batch_size: AtomicUsize::new(0),
            gas_limited_batch_size: AtomicUsize::new(0),
            fail_state_calls: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn state_multicall(&self) -> Address {
        self.state_multicall
    }

    pub fn add_pool(&self, pool: FakePool) {
        self.pools.insert(pool.state.pool, pool);
    }

    /// Replaces the state behind a registered pool, as if blocks had been mined.
    pub fn set_state(&self, state: PoolState) {
        if let Some(mut pool) = self.pools.get_mut(&state.pool) {
            pool.state = state;
        }
    }

    pub fn remove_pool(&self, pool: &Address) {
        self.pools.remove(pool);
    }

    pub fn set_max_batch_size(&self, max: usize) {
        self.max_batch_size.store(max, Ordering::Relaxed);
    }

    pub fn set_gas_limited_batch_size(&self, max: usize) {
        self.gas_limited_batch_size.store(max, Ordering::Relaxed);
    }

    /// Makes every state multicall call revert.
    pub fn set_fail_state_calls(&self, fail: bool) {
        self.fail_state_calls.store(fail, Ordering::Relaxed);
    }

    /// Number of transport requests served so far.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn find_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: Option<u32>,
    ) -> Option<FakePool> {
        self.pools
            .iter()
            .find(|entry| entry.matches(factory, token_a, token_b, fee))
            .map(|entry| entry.clone())
    }

    fn answer(&self, call: &ContractCall) -> Option<Vec<u8>> {
        let data = call.call_data.as_slice();
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;

        match selector {
            s if s == ERC20::balanceOfCall::SELECTOR => {
                let args = ERC20::balanceOfCall::abi_decode(data).ok()?;
                self.balance_of(call.target, args.account)
            }
            s if s == UniswapV3Factory::getPoolCall::SELECTOR => {
                let args = UniswapV3Factory::getPoolCall::abi_decode(data).ok()?;
                let pool = self
                    .find_pool(call.target, args.tokenA, args.tokenB, Some(args.fee.to::<u32>()))
                    .map_or(Address::ZERO, |pool| pool.state.pool);
                Some(UniswapV3Factory::getPoolCall::abi_encode_returns(&pool))
            }
            s if s == AlgebraFactory::poolByPairCall::SELECTOR => {
                let args = AlgebraFactory::poolByPairCall::abi_decode(data).ok()?;
                let pool = self
                    .find_pool(call.target, args.tokenA, args.tokenB, None)
                    .map_or(Address::ZERO, |pool| pool.state.pool);
                Some(AlgebraFactory::poolByPairCall::abi_encode_returns(&pool))
            }
            _ if call.target == self.state_multicall => self.answer_state_multicall(selector, data),
            _ => {
                let pool = self.pools.get(&call.target)?;
                answer_pool_call(&pool, selector, data)
            }
        }
    }

    fn balance_of(&self, token: Address, account: Address) -> Option<Vec<u8>> {
        let balance = match self.pools.get(&account) {
            Some(pool) if pool.token0 == token => pool.state.balance0,
            Some(pool) if pool.token1 == token => pool.state.balance1,
            _ => U256::ZERO,
        };
        Some(ERC20::balanceOfCall::abi_encode_returns(&balance))
    }

    fn answer_state_multicall(&self, selector: [u8; 4], data: &[u8]) -> Option<Vec<u8>> {
        if self.fail_state_calls.load(Ordering::Relaxed) {
            return None;
        }

        match selector {
            s if s == PoolStateMulticall::getFullStateWithRelativeBitmapsCall::SELECTOR => {
                let args =
                    PoolStateMulticall::getFullStateWithRelativeBitmapsCall::abi_decode(data).ok()?;
                let pool = self.find_pool(args.factory, args.token0, args.token1, Some(args.fee.to::<u32>()))?;
                let mut result = state_result(&pool.state)?;
                let anchor = anchor(&pool.state);
                let words = anchor.saturating_sub(args.leftBitmapAmount)
                    ..=anchor.saturating_add(args.rightBitmapAmount);
                for word in words {
                    let value = pool.state.tick_bitmap.word(word);
                    if value.is_zero() {
                        continue;
                    }
                    result.tickBitmap.push(PoolStateMulticall::BitmapWord { index: word, value });
                    result.ticks.extend(ticks_in_word(&pool.state, word)?);
                }
                Some(PoolStateMulticall::getFullStateWithRelativeBitmapsCall::abi_encode_returns(
                    &result,
                ))
            }
            s if s == PoolStateMulticall::getFullStateWithoutTicksCall::SELECTOR => {
                let args = PoolStateMulticall::getFullStateWithoutTicksCall::abi_decode(data).ok()?;
                let pool = self.find_pool(args.factory, args.token0, args.token1, Some(args.fee.to::<u32>()))?;
                Some(PoolStateMulticall::getFullStateWithoutTicksCall::abi_encode_returns(
                    &state_result(&pool.state)?,
                ))
            }
            s if s == PoolStateMulticall::getTickBitmapAndTicksForWordCall::SELECTOR => {
                let args =
                    PoolStateMulticall::getTickBitmapAndTicksForWordCall::abi_decode(data).ok()?;
                let pool = self.pools.get(&args.pool)?;
                let ret = PoolStateMulticall::getTickBitmapAndTicksForWordReturn {
                    bitmap: pool.state.tick_bitmap.word(args.wordPosition),
                    ticks: ticks_in_word(&pool.state, args.wordPosition)?,
                };
                Some(PoolStateMulticall::getTickBitmapAndTicksForWordCall::abi_encode_returns(&ret))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl MulticallTransport for FakeChain {
    async fn try_aggregate(
        &self,
        calls: &[ContractCall],
        _block: Option<u64>,
    ) -> Result<Vec<CallResult>, BlockchainRpcClientError> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let max = self.max_batch_size.load(Ordering::Relaxed);
        if max > 0 && calls.len() > max {
            return Err(BlockchainRpcClientError::ClientError(format!(
                "Request of {} calls exceeds limit of {max}",
                calls.len()
            )));
        }

        let gas_limit = self.gas_limited_batch_size.load(Ordering::Relaxed);
        if gas_limit > 0 && calls.len() > gas_limit {
            return Ok(vec![CallResult::failed(); calls.len()]);
        }

        Ok(calls
            .iter()
            .map(|call| match self.answer(call) {
                Some(data) => CallResult::ok(data.into()),
                None => CallResult::failed(),
            })
            .collect())
    }

    fn batch_size(&self) -> usize {
        match self.max_batch_size.load(Ordering::Relaxed) {
            0 => usize::MAX,
            max => max,
        }
    }
}

fn anchor(state: &PoolState) -> i16 {
    PoolState::anchor_for_tick(state.tick(), state.tick_spacing, state.ticks_compressed)
}

fn to_i24(value: i32) -> Option<I24> {
    I24::try_from(value).ok()
}

fn global_state_data(state: &GlobalState) -> Option<PoolStateMulticall::GlobalStateData> {
    let protocol_fee = match state.protocol_fee {
        ProtocolFee::Packed(packed) => packed,
        ProtocolFee::Community { token0, token1 } => u32::from(token0) | (u32::from(token1) << 16),
    };
    Some(PoolStateMulticall::GlobalStateData {
        sqrtPriceX96: state.sqrt_price_x96,
        tick: to_i24(state.tick)?,
        fee: U24::from(state.fee.for_direction(true)),
        feeOneForZero: U24::from(state.fee.for_direction(false)),
        protocolFee: protocol_fee,
    })
}

fn state_result(state: &PoolState) -> Option<PoolStateMulticall::StateResult> {
    Some(PoolStateMulticall::StateResult {
        pool: state.pool,
        blockTimestamp: U256::from(state.block_timestamp),
        globalState: global_state_data(&state.global_state)?,
        liquidity: state.liquidity,
        tickSpacing: to_i24(state.tick_spacing)?,
        maxLiquidityPerTick: state.max_liquidity_per_tick,
        feeGrowthGlobal0X128: state.fee_growth_global_0_x128,
        feeGrowthGlobal1X128: state.fee_growth_global_1_x128,
        tickBitmap: Vec::new(),
        ticks: Vec::new(),
    })
}

fn tick_data(tick: i32, info: &TickInfo) -> Option<PoolStateMulticall::TickData> {
    Some(PoolStateMulticall::TickData {
        index: to_i24(tick)?,
        liquidityGross: info.liquidity_gross,
        liquidityNet: info.liquidity_net,
        feeGrowthOutside0X128: info.fee_growth_outside_0_x128,
        feeGrowthOutside1X128: info.fee_growth_outside_1_x128,
        initialized: info.initialized,
    })
}

fn ticks_in_word(state: &PoolState, word: i16) -> Option<Vec<PoolStateMulticall::TickData>> {
    let mut bitmap = TickBitmap::default();
    bitmap.set_word(word, state.tick_bitmap.word(word));
    bitmap
        .initialized_ticks(state.bitmap_spacing())
        .into_iter()
        .map(|tick| tick_data(tick, &state.tick_info(tick)))
        .collect()
}

fn answer_pool_call(pool: &FakePool, selector: [u8; 4], data: &[u8]) -> Option<Vec<u8>> {
    let state = &pool.state;
    let variant = state.variant;
    let algebra = variant.is_algebra();

    let encoded = match selector {
        s if s == UniswapV3Pool::slot0Call::SELECTOR && !algebra => slot0(state)?,
        s if s == AlgebraV1Pool::globalStateCall::SELECTOR && algebra => algebra_global_state(state)?,
        s if s == UniswapV3Pool::feeCall::SELECTOR => {
            UniswapV3Pool::feeCall::abi_encode_returns(&U24::from(pool.fee))
        }
        s if s == UniswapV3Pool::liquidityCall::SELECTOR => {
            UniswapV3Pool::liquidityCall::abi_encode_returns(&state.liquidity)
        }
        s if s == UniswapV3Pool::tickSpacingCall::SELECTOR => {
            UniswapV3Pool::tickSpacingCall::abi_encode_returns(&to_i24(state.tick_spacing)?)
        }
        s if s == UniswapV3Pool::maxLiquidityPerTickCall::SELECTOR => {
            if !pool.exposes_max_liquidity {
                return None;
            }
            UniswapV3Pool::maxLiquidityPerTickCall::abi_encode_returns(&state.max_liquidity_per_tick)
        }
        s if s == UniswapV3Pool::feeGrowthGlobal0X128Call::SELECTOR
            || s == AlgebraPool::totalFeeGrowth0TokenCall::SELECTOR =>
        {
            UniswapV3Pool::feeGrowthGlobal0X128Call::abi_encode_returns(&state.fee_growth_global_0_x128)
        }
        s if s == UniswapV3Pool::feeGrowthGlobal1X128Call::SELECTOR
            || s == AlgebraPool::totalFeeGrowth1TokenCall::SELECTOR =>
        {
            UniswapV3Pool::feeGrowthGlobal1X128Call::abi_encode_returns(&state.fee_growth_global_1_x128)
        }
        s if s == UniswapV3Pool::tickBitmapCall::SELECTOR && !algebra => {
            let args = UniswapV3Pool::tickBitmapCall::abi_decode(data).ok()?;
            UniswapV3Pool::tickBitmapCall::abi_encode_returns(&state.tick_bitmap.word(args.wordPosition))
        }
        s if s == AlgebraPool::tickTableCall::SELECTOR && algebra => {
            let args = AlgebraPool::tickTableCall::abi_decode(data).ok()?;
            AlgebraPool::tickTableCall::abi_encode_returns(&state.tick_bitmap.word(args.wordPosition))
        }
        s if s == UniswapV3Pool::ticksCall::SELECTOR => {
            let args = UniswapV3Pool::ticksCall::abi_decode(data).ok()?;
            let tick = args.tick.as_i32();
            encode_tick(variant, &state.tick_info(tick))
        }
        _ => return None,
    };
    Some(encoded)
}

fn slot0(state: &PoolState) -> Option<Vec<u8>> {
    let global = &state.global_state;
    let tick = to_i24(global.tick)?;
    let ProtocolFee::Packed(fee_protocol) = global.protocol_fee else {
        return None;
    };

    Some(match state.variant {
        PoolVariant::PancakeSwapV3 => {
            PancakeV3Pool::slot0Call::abi_encode_returns(&PancakeV3Pool::Slot0Data {
                sqrtPriceX96: global.sqrt_price_x96,
                tick,
                observationIndex: 0,
                observationCardinality: 1,
                observationCardinalityNext: 1,
                feeProtocol: fee_protocol,
                unlocked: true,
            })
        }
        _ => UniswapV3Pool::slot0Call::abi_encode_returns(&UniswapV3Pool::Slot0Data {
            sqrtPriceX96: global.sqrt_price_x96,
            tick,
            observationIndex: 0,
            observationCardinality: 1,
            observationCardinalityNext: 1,
            feeProtocol: u8::try_from(fee_protocol).ok()?,
            unlocked: true,
        }),
    })
}

fn algebra_global_state(state: &PoolState) -> Option<Vec<u8>> {
    let global = &state.global_state;
    let tick = to_i24(global.tick)?;
    let (community0, community1) = match global.protocol_fee {
        ProtocolFee::Community { token0, token1 } => (token0, token1),
        ProtocolFee::Packed(_) => return None,
    };
    let fee16 = |fee: u32| u16::try_from(fee).ok();

    Some(match (state.variant, global.fee) {
        (
            PoolVariant::AlgebraDirectionalFee,
            PoolFee::Directional {
                zero_for_one,
                one_for_zero,
            },
        ) => AlgebraDirectionalFeePool::globalStateCall::abi_encode_returns(
            &AlgebraDirectionalFeePool::globalStateReturn {
                price: global.sqrt_price_x96,
                tick,
                feeZto: fee16(zero_for_one)?,
                feeOtz: fee16(one_for_zero)?,
                timepointIndex: 0,
                communityFeeToken0: u8::try_from(community0).ok()?,
                communityFeeToken1: u8::try_from(community1).ok()?,
                unlocked: true,
            },
        ),
        (PoolVariant::AlgebraIntegral, PoolFee::Single(fee)) => {
            AlgebraIntegralPool::globalStateCall::abi_encode_returns(
                &AlgebraIntegralPool::globalStateReturn {
                    price: global.sqrt_price_x96,
                    tick,
                    lastFee: fee16(fee)?,
                    pluginConfig: 0,
                    communityFee: community0,
                    unlocked: true,
                },
            )
        }
        (PoolVariant::AlgebraV1, PoolFee::Single(fee)) => AlgebraV1Pool::globalStateCall::abi_encode_returns(
            &AlgebraV1Pool::globalStateReturn {
                price: global.sqrt_price_x96,
                tick,
                fee: fee16(fee)?,
                timepointIndex: 0,
                communityFeeToken0: u8::try_from(community0).ok()?,
                communityFeeToken1: u8::try_from(community1).ok()?,
                unlocked: true,
            },
        ),
        _ => return None,
    })
}

fn encode_tick(variant: PoolVariant, info: &TickInfo) -> Vec<u8> {
    match variant {
        PoolVariant::UniswapV3 | PoolVariant::PancakeSwapV3 => {
            UniswapV3Pool::ticksCall::abi_encode_returns(&UniswapV3Pool::TickInfo {
                liquidityGross: info.liquidity_gross,
                liquidityNet: info.liquidity_net,
                feeGrowthOutside0X128: info.fee_growth_outside_0_x128,
                feeGrowthOutside1X128: info.fee_growth_outside_1_x128,
                tickCumulativeOutside: Default::default(),
                secondsPerLiquidityOutsideX128: Default::default(),
                secondsOutside: 0,
                initialized: info.initialized,
            })
        }
        PoolVariant::AlgebraV1 | PoolVariant::AlgebraDirectionalFee => {
            AlgebraPool::ticksCall::abi_encode_returns(&AlgebraPool::ticksReturn {
                liquidityTotal: info.liquidity_gross,
                liquidityDelta: info.liquidity_net,
                outerFeeGrowth0Token: info.fee_growth_outside_0_x128,
                outerFeeGrowth1Token: info.fee_growth_outside_1_x128,
                outerTickCumulative: Default::default(),
                outerSecondsPerLiquidity: Default::default(),
                outerSecondsSpent: 0,
                initialized: info.initialized,
            })
        }
        PoolVariant::AlgebraIntegral => {
            AlgebraIntegralPool::ticksCall::abi_encode_returns(&AlgebraIntegralPool::ticksReturn {
                liquidityTotal: U256::from(info.liquidity_gross),
                liquidityDelta: info.liquidity_net,
                prevTick: Default::default(),
                nextTick: Default::default(),
                outerFeeGrowth0Token: info.fee_growth_outside_0_x128,
                outerFeeGrowth1Token: info.fee_growth_outside_1_x128,
            })
        }
    }
}
