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

use std::sync::Arc;

use alloy::primitives::{Address, U256, aliases::U24};
use clmm_model::defi::{PoolState, PoolVariant, tick_map::{TickBitmap, TickInfo}};
use dashmap::DashMap;
use futures::future::try_join_all;

use super::{BootstrapError, PoolDescriptor, RawPoolState};
use crate::{
    config::{BootstrapStrategyKind, DexConfig},
    contracts::{
        BaseContract, CallResult, ContractCall, PoolCalls, PoolContractError,
        base::{decode_call_result, encode_call},
        erc20::Erc20Contract,
        pool::{decode_factory_pool_lookup, factory_pool_lookup},
        state_multicall::PoolStateMulticall,
    },
    rpc::MulticallTransport,
};

/// Halvings of the tick batch size attempted before a manual fetch gives up.
pub const MAX_BATCH_RETRIES: u32 = 3;

/// Tick records requested per batch before any back-off.
pub const DEFAULT_TICK_BATCH_SIZE: usize = 500;

/// Fetches complete pool states with the strategy configured per DEX.
///
/// Manual fetches remember the tick batch size that last succeeded for each pool and start
/// from it next time. The remembered size is never expired.
#[derive(Debug)]
pub struct BootstrapFetcher {
    base: BaseContract,
    default_tick_batch_size: usize,
    tick_batch_sizes: DashMap<Address, usize>,
}

impl BootstrapFetcher {
    /// Creates a new [`BootstrapFetcher`] instance.
    #[must_use]
    pub fn new(transport: Arc<dyn MulticallTransport>) -> Self {
        Self {
            base: BaseContract::new(transport),
            default_tick_batch_size: DEFAULT_TICK_BATCH_SIZE,
            tick_batch_sizes: DashMap::new(),
        }
    }

    #[must_use]
    pub fn with_tick_batch_size(mut self, batch_size: usize) -> Self {
        self.default_tick_batch_size = batch_size.max(1);
        self
    }

    /// Returns the tick batch size remembered for `pool`, if any.
    #[must_use]
    pub fn cached_tick_batch_size(&self, pool: &Address) -> Option<usize> {
        self.tick_batch_sizes.get(pool).map(|size| *size)
    }

    /// Fetches the full state of the pool at `block`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::PoolNotFound`] if the pool does not exist, and a non-terminal
    /// error for any other failure.
    pub async fn fetch(
        &self,
        descriptor: &PoolDescriptor,
        block: u64,
    ) -> Result<RawPoolState, BootstrapError> {
        tracing::debug!(
            "Bootstrapping {descriptor} at block {block} ({})",
            descriptor.dex.bootstrap
        );

        match descriptor.dex.bootstrap {
            BootstrapStrategyKind::SingleStep => self.fetch_single_step(descriptor, block).await,
            BootstrapStrategyKind::MultiStep => self.fetch_multi_step(descriptor, block).await,
            BootstrapStrategyKind::Manual => self.fetch_manual(descriptor, block).await,
        }
    }

    fn state_multicall_address(dex: &DexConfig) -> Result<Address, BootstrapError> {
        dex.state_multicall
            .ok_or_else(|| BootstrapError::Misconfigured {
                dex: dex.name.clone(),
                reason: format!("{} bootstrap requires `state_multicall`", dex.bootstrap),
            })
    }

    fn balance_calls(descriptor: &PoolDescriptor) -> [ContractCall; 2] {
        let key = &descriptor.key;
        [
            Erc20Contract::balance_of(key.token0, descriptor.pool_address).call,
            Erc20Contract::balance_of(key.token1, descriptor.pool_address).call,
        ]
    }

    fn decode_balances(
        descriptor: &PoolDescriptor,
        results: &[CallResult],
    ) -> Result<(U256, U256), BootstrapError> {
        let key = &descriptor.key;
        let balance0 =
            Erc20Contract::balance_of(key.token0, descriptor.pool_address).decode(&results[0])?;
        let balance1 =
            Erc20Contract::balance_of(key.token1, descriptor.pool_address).decode(&results[1])?;
        Ok((balance0, balance1))
    }

    /// Decodes a state multicall result, where a zero pool means the factory has no pool for
    /// the key.
    ///
    /// The helper also reverts for reasons unrelated to the pool, so a revert only counts as
    /// absence once the factory confirms it.
    async fn decode_state_result<C>(
        &self,
        descriptor: &PoolDescriptor,
        helper: Address,
        result: &CallResult,
        field: &str,
        block: u64,
    ) -> Result<PoolStateMulticall::StateResult, BootstrapError>
    where
        C: alloy::sol_types::SolCall<Return = PoolStateMulticall::StateResult>,
    {
        if !result.success {
            if self.factory_pool(descriptor, block).await? == Address::ZERO {
                return Err(BootstrapError::PoolNotFound {
                    pool: descriptor.pool_address,
                });
            }
            tracing::warn!("{field} reverted for existing pool {descriptor}");
            return Err(BootstrapError::Transient(PoolContractError::CallFailed {
                field: field.to_string(),
                target: helper,
                reason: format!("reverted for existing pool {}", descriptor.pool_address),
            }));
        }
        let state = decode_call_result::<C>(helper, field, result)?;
        if state.pool == Address::ZERO {
            return Err(BootstrapError::PoolNotFound {
                pool: descriptor.pool_address,
            });
        }
        Ok(state)
    }

    /// Looks the pool up in its factory, returning `Address::ZERO` if there is none.
    async fn factory_pool(
        &self,
        descriptor: &PoolDescriptor,
        block: u64,
    ) -> Result<Address, BootstrapError> {
        let key = &descriptor.key;
        let factory = descriptor.dex.factory;
        let lookup =
            factory_pool_lookup(descriptor.variant(), factory, key.token0, key.token1, key.fee);
        let results = self.base.execute_batch(&[lookup], Some(block)).await?;
        Ok(decode_factory_pool_lookup(factory, &results[0])?)
    }

    fn fetch_radius(variant: PoolVariant) -> i16 {
        variant.config().window.fetch_radius
    }

    async fn fetch_single_step(
        &self,
        descriptor: &PoolDescriptor,
        block: u64,
    ) -> Result<RawPoolState, BootstrapError> {
        let helper = Self::state_multicall_address(&descriptor.dex)?;
        let variant = descriptor.variant();
        let radius = Self::fetch_radius(variant);
        let key = &descriptor.key;

        let state_call = PoolStateMulticall::getFullStateWithRelativeBitmapsCall {
            factory: descriptor.dex.factory,
            token0: key.token0,
            token1: key.token1,
            fee: U24::from(key.fee),
            leftBitmapAmount: radius,
            rightBitmapAmount: radius,
        };
        let [balance0_call, balance1_call] = Self::balance_calls(descriptor);
        let calls = [balance0_call, balance1_call, encode_call(helper, &state_call, true)];

        let results = self.base.execute_batch(&calls, Some(block)).await?;
        let state = self
            .decode_state_result::<PoolStateMulticall::getFullStateWithRelativeBitmapsCall>(
                descriptor,
                helper,
                &results[2],
                "getFullStateWithRelativeBitmaps",
                block,
            )
            .await?;
        let (balance0, balance1) = Self::decode_balances(descriptor, &results)?;

        let mut raw = RawPoolState::from_state_result(variant, &state, balance0, balance1);
        raw.bitmap_words = state
            .tickBitmap
            .iter()
            .map(|word| (word.index, word.value))
            .collect();
        raw.ticks = state
            .ticks
            .iter()
            .map(PoolStateMulticall::TickData::to_tick)
            .collect();
        Ok(raw)
    }

    async fn fetch_multi_step(
        &self,
        descriptor: &PoolDescriptor,
        block: u64,
    ) -> Result<RawPoolState, BootstrapError> {
        let helper = Self::state_multicall_address(&descriptor.dex)?;
        let variant = descriptor.variant();
        let key = &descriptor.key;

        let state_call = PoolStateMulticall::getFullStateWithoutTicksCall {
            factory: descriptor.dex.factory,
            token0: key.token0,
            token1: key.token1,
            fee: U24::from(key.fee),
        };
        let [balance0_call, balance1_call] = Self::balance_calls(descriptor);
        let calls = [balance0_call, balance1_call, encode_call(helper, &state_call, true)];

        let results = self.base.execute_batch(&calls, Some(block)).await?;
        let state = self
            .decode_state_result::<PoolStateMulticall::getFullStateWithoutTicksCall>(
                descriptor,
                helper,
                &results[2],
                "getFullStateWithoutTicks",
                block,
            )
            .await?;
        let (balance0, balance1) = Self::decode_balances(descriptor, &results)?;
        let mut raw = RawPoolState::from_state_result(variant, &state, balance0, balance1);

        let pool = raw.pool;
        let words = Self::word_range(variant, raw.global_state.tick, raw.tick_spacing);
        let fetches = words.map(|word| {
            let call = PoolStateMulticall::getTickBitmapAndTicksForWordCall {
                pool,
                wordPosition: word,
            };
            let word_call = encode_call(helper, &call, false);
            async move {
                let results = self.base.execute_batch(&[word_call], Some(block)).await?;
                let decoded = decode_call_result::<
                    PoolStateMulticall::getTickBitmapAndTicksForWordCall,
                >(helper, "getTickBitmapAndTicksForWord", &results[0])?;
                Ok::<_, PoolContractError>((word, decoded))
            }
        });

        for (word, decoded) in try_join_all(fetches).await? {
            if !decoded.bitmap.is_zero() {
                raw.extend_word(word, decoded.bitmap, &decoded.ticks);
            }
        }

        tracing::debug!(
            "Fetched {} words and {} ticks for {descriptor}",
            raw.bitmap_words.len(),
            raw.ticks.len()
        );
        Ok(raw)
    }

    async fn fetch_manual(
        &self,
        descriptor: &PoolDescriptor,
        block: u64,
    ) -> Result<RawPoolState, BootstrapError> {
        let variant = descriptor.variant();
        let key = &descriptor.key;

        let pool = self.factory_pool(descriptor, block).await?;
        if pool == Address::ZERO {
            return Err(BootstrapError::PoolNotFound {
                pool: descriptor.pool_address,
            });
        }
        if pool != descriptor.pool_address {
            tracing::warn!(
                "Factory returned {pool} for {descriptor}, using the factory address"
            );
        }

        let calls = PoolCalls::new(pool, variant);
        let [balance0_call, balance1_call] = Self::balance_calls(descriptor);
        let scalar_calls = [
            balance0_call,
            balance1_call,
            calls.global_state(),
            calls.liquidity(),
            calls.tick_spacing(),
            calls.max_liquidity_per_tick(),
            calls.fee_growth_global(false),
            calls.fee_growth_global(true),
        ];
        let results = self.base.execute_batch(&scalar_calls, Some(block)).await?;
        let (balance0, balance1) = Self::decode_balances(descriptor, &results)?;

        let global_state = calls.decode_global_state(&results[2], key.fee)?;
        let tick_spacing = calls.decode_tick_spacing(&results[4])?;
        let mut raw = RawPoolState {
            pool,
            global_state,
            liquidity: calls.decode_liquidity(&results[3])?,
            tick_spacing,
            max_liquidity_per_tick: calls.decode_max_liquidity_per_tick(&results[5])?,
            fee_growth_global_0_x128: calls.decode_fee_growth_global(&results[6])?,
            fee_growth_global_1_x128: calls.decode_fee_growth_global(&results[7])?,
            balance0,
            balance1,
            bitmap_words: Vec::new(),
            ticks: Vec::new(),
        };

        let words = Self::word_range(variant, global_state.tick, tick_spacing);
        let fetches = words.map(|word| async move {
            let results = self
                .base
                .execute_batch(&[calls.bitmap_word(word)], Some(block))
                .await?;
            Ok::<_, PoolContractError>((word, calls.decode_bitmap_word(&results[0])?))
        });
        raw.bitmap_words = try_join_all(fetches)
            .await?
            .into_iter()
            .filter(|(_, value)| !value.is_zero())
            .collect();

        // Expand set bits into the ticks to fetch
        let mut bitmap = TickBitmap::default();
        for (word, value) in &raw.bitmap_words {
            bitmap.set_word(*word, *value);
        }
        let spacing = variant.config().ticks_compressed.then_some(tick_spacing);
        let ticks = bitmap.initialized_ticks(spacing);

        raw.ticks = self.fetch_ticks_with_backoff(calls, &ticks, block).await?;

        tracing::debug!(
            "Fetched {} words and {} ticks for {descriptor}",
            raw.bitmap_words.len(),
            raw.ticks.len()
        );
        Ok(raw)
    }

    fn word_range(
        variant: PoolVariant,
        tick: i32,
        tick_spacing: i32,
    ) -> std::ops::RangeInclusive<i16> {
        let config = variant.config();
        let anchor = PoolState::anchor_for_tick(tick, tick_spacing, config.ticks_compressed);
        let radius = config.window.fetch_radius;
        anchor.saturating_sub(radius)..=anchor.saturating_add(radius)
    }

    /// Fetches tick records, halving the batch size after each failed batch.
    ///
    /// A batch fails either at the transport or with reverted calls inside the aggregate, as
    /// happens when it runs out of gas.
    async fn fetch_ticks_with_backoff(
        &self,
        calls: PoolCalls,
        ticks: &[i32],
        block: u64,
    ) -> Result<Vec<(i32, TickInfo)>, BootstrapError> {
        let mut batch_size = self
            .cached_tick_batch_size(&calls.pool)
            .unwrap_or(self.default_tick_batch_size);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.fetch_ticks(calls, ticks, batch_size, block).await {
                Ok(fetched) => {
                    self.tick_batch_sizes.insert(calls.pool, batch_size);
                    return Ok(fetched);
                }
                Err(e @ (PoolContractError::RpcError(_) | PoolContractError::CallFailed { .. })) => {
                    if attempts > MAX_BATCH_RETRIES || batch_size == 1 {
                        return Err(BootstrapError::BackoffExhausted {
                            pool: calls.pool,
                            attempts,
                            source: e,
                        });
                    }
                    let next = (batch_size / 2).max(1);
                    tracing::warn!(
                        "Tick batch of {batch_size} failed for {}: {e}, retrying with {next}",
                        calls.pool
                    );
                    batch_size = next;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn fetch_ticks(
        &self,
        calls: PoolCalls,
        ticks: &[i32],
        batch_size: usize,
        block: u64,
    ) -> Result<Vec<(i32, TickInfo)>, PoolContractError> {
        let batches = ticks.chunks(batch_size).map(|batch| async move {
            let tick_calls = batch
                .iter()
                .map(|tick| calls.tick(*tick))
                .collect::<Result<Vec<_>, _>>()?;
            let results = self.base.execute_batch(&tick_calls, Some(block)).await?;
            batch
                .iter()
                .zip(&results)
                .map(|(tick, result)| Ok((*tick, calls.decode_tick(*tick, result)?)))
                .collect::<Result<Vec<_>, PoolContractError>>()
        });

        Ok(try_join_all(batches).await?.into_iter().flatten().collect())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use alloy::primitives::{B256, address};
    use clmm_model::defi::{
        BlockHeader,
        pool_analysis::{
            compare_pool_state,
            stubs::{STUB_POOL, algebra_directional_pool, pool_with_two_ranges, seed_tick},
        },
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        bootstrap::PoolKey,
        testing::{FakeChain, FakePool},
    };

    const FACTORY: Address = address!("0x1f98431c8ad98523631ae4a59f267346ea31f984");
    const HELPER: Address = address!("0x00000000000000000000000000000000000c1a55");
    const TOKEN0: Address = address!("0x1000000000000000000000000000000000000000");
    const TOKEN1: Address = address!("0x2000000000000000000000000000000000000000");
    const BLOCK: u64 = 100;

    fn header() -> BlockHeader {
        BlockHeader::new(BLOCK, 1_700_000_000, B256::repeat_byte(1), B256::repeat_byte(0))
    }

    fn setup(state: &PoolState, fee: u32) -> Arc<FakeChain> {
        let chain = Arc::new(FakeChain::new(HELPER));
        chain.add_pool(FakePool::new(state.clone(), FACTORY, TOKEN0, TOKEN1, fee));
        chain
    }

    fn descriptor(
        variant: PoolVariant,
        strategy: BootstrapStrategyKind,
        fee: u32,
    ) -> PoolDescriptor {
        let dex = DexConfig::new("test_dex", variant, FACTORY, Some(HELPER), Some(strategy));
        PoolDescriptor::new(PoolKey::new(TOKEN0, TOKEN1, fee), STUB_POOL, Arc::new(dex))
    }

    fn many_ticks_pool() -> PoolState {
        let mut state = pool_with_two_ranges();
        for i in 2..=10 {
            seed_tick(&mut state, -60 * i, 1_000);
            seed_tick(&mut state, 60 * i, -1_000);
        }
        state
    }

    #[rstest]
    #[case::single_step(BootstrapStrategyKind::SingleStep)]
    #[case::multi_step(BootstrapStrategyKind::MultiStep)]
    #[case::manual(BootstrapStrategyKind::Manual)]
    #[tokio::test]
    async fn test_fetch_reproduces_pool_state(#[case] strategy: BootstrapStrategyKind) {
        let expected = pool_with_two_ranges();
        let chain = setup(&expected, 3000);
        let fetcher = BootstrapFetcher::new(chain);
        let descriptor = descriptor(PoolVariant::UniswapV3, strategy, 3000);

        let raw = fetcher.fetch(&descriptor, BLOCK).await.unwrap();
        let fetched = raw.into_pool_state(PoolVariant::UniswapV3, &header());

        assert!(compare_pool_state(&expected, &fetched));
        assert_eq!(fetched.ticks, expected.ticks);
        assert_eq!(fetched.balance0, expected.balance0);
        assert_eq!(fetched.block_timestamp, 1_700_000_000);
        assert!(fetched.is_valid);
    }

    #[rstest]
    #[case::single_step(BootstrapStrategyKind::SingleStep)]
    #[case::manual(BootstrapStrategyKind::Manual)]
    #[tokio::test]
    async fn test_fetch_algebra_directional_pool(#[case] strategy: BootstrapStrategyKind) {
        let expected = algebra_directional_pool();
        let chain = setup(&expected, 0);
        let fetcher = BootstrapFetcher::new(chain);
        let descriptor = descriptor(PoolVariant::AlgebraDirectionalFee, strategy, 0);

        let fetched = fetcher
            .fetch(&descriptor, BLOCK)
            .await
            .unwrap()
            .into_pool_state(PoolVariant::AlgebraDirectionalFee, &header());

        assert_eq!(fetched.global_state, expected.global_state);
        assert_eq!(fetched.ticks, expected.ticks);
        assert!(compare_pool_state(&expected, &fetched));
    }

    #[rstest]
    #[case::single_step(BootstrapStrategyKind::SingleStep)]
    #[case::multi_step(BootstrapStrategyKind::MultiStep)]
    #[case::manual(BootstrapStrategyKind::Manual)]
    #[tokio::test]
    async fn test_missing_pool_is_terminal(#[case] strategy: BootstrapStrategyKind) {
        let chain = Arc::new(FakeChain::new(HELPER));
        let fetcher = BootstrapFetcher::new(chain);
        let descriptor = descriptor(PoolVariant::UniswapV3, strategy, 3000);

        let err = fetcher.fetch(&descriptor, BLOCK).await.unwrap_err();

        assert!(matches!(err, BootstrapError::PoolNotFound { pool } if pool == STUB_POOL));
        assert!(err.is_terminal());
    }

    #[rstest]
    #[tokio::test]
    async fn test_wrong_fee_tier_is_not_found() {
        let chain = setup(&pool_with_two_ranges(), 3000);
        let fetcher = BootstrapFetcher::new(chain);
        let descriptor = descriptor(PoolVariant::UniswapV3, BootstrapStrategyKind::SingleStep, 500);

        let err = fetcher.fetch(&descriptor, BLOCK).await.unwrap_err();

        assert!(err.is_terminal());
    }

    #[rstest]
    #[tokio::test]
    async fn test_helper_without_address_is_misconfigured() {
        let chain = setup(&pool_with_two_ranges(), 3000);
        let fetcher = BootstrapFetcher::new(chain);
        let dex = DexConfig::new("no_helper", PoolVariant::UniswapV3, FACTORY, None, None);
        let descriptor = PoolDescriptor::new(
            PoolKey::new(TOKEN0, TOKEN1, 3000),
            STUB_POOL,
            Arc::new(dex),
        );

        let err = fetcher.fetch(&descriptor, BLOCK).await.unwrap_err();

        assert!(matches!(err, BootstrapError::Misconfigured { .. }));
        assert!(!err.is_terminal());
    }

    #[rstest]
    #[tokio::test]
    async fn test_manual_halves_tick_batches_and_remembers_size() {
        let expected = many_ticks_pool();
        let chain = setup(&expected, 3000);
        // Fits the scalar batch but not the first tick batches
        chain.set_max_batch_size(8);
        let fetcher = BootstrapFetcher::new(chain.clone()).with_tick_batch_size(40);
        let descriptor = descriptor(PoolVariant::UniswapV3, BootstrapStrategyKind::Manual, 3000);

        let raw = fetcher.fetch(&descriptor, BLOCK).await.unwrap();

        assert_eq!(raw.ticks.len(), 20);
        assert_eq!(fetcher.cached_tick_batch_size(&STUB_POOL), Some(5));

        // The remembered size is used straight away next time
        let requests_before = chain.requests();
        fetcher.fetch(&descriptor, BLOCK).await.unwrap();
        let lookup_scalar_and_words = 2 + 25;
        assert_eq!(
            chain.requests() - requests_before,
            lookup_scalar_and_words + 4
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_manual_backoff_exhaustion() {
        let chain = setup(&many_ticks_pool(), 3000);
        chain.set_max_batch_size(8);
        let fetcher = BootstrapFetcher::new(chain).with_tick_batch_size(400);
        let descriptor = descriptor(PoolVariant::UniswapV3, BootstrapStrategyKind::Manual, 3000);

        let err = fetcher.fetch(&descriptor, BLOCK).await.unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::BackoffExhausted { attempts, .. } if attempts == MAX_BATCH_RETRIES + 1
        ));
        assert!(!err.is_terminal());
        assert_eq!(fetcher.cached_tick_batch_size(&STUB_POOL), None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_manual_without_max_liquidity_getter() {
        let expected = pool_with_two_ranges();
        let chain = Arc::new(FakeChain::new(HELPER));
        let mut pool = FakePool::new(expected.clone(), FACTORY, TOKEN0, TOKEN1, 3000);
        pool.exposes_max_liquidity = false;
        chain.add_pool(pool);
        let fetcher = BootstrapFetcher::new(chain);
        let descriptor = descriptor(PoolVariant::UniswapV3, BootstrapStrategyKind::Manual, 3000);

        let raw = fetcher.fetch(&descriptor, BLOCK).await.unwrap();
        assert_eq!(raw.max_liquidity_per_tick, 0);

        let state = raw.into_pool_state(PoolVariant::UniswapV3, &header());
        assert_eq!(state.max_liquidity_per_tick, expected.max_liquidity_per_tick);
    }

    #[rstest]
    #[case::single_step(BootstrapStrategyKind::SingleStep)]
    #[case::multi_step(BootstrapStrategyKind::MultiStep)]
    #[tokio::test]
    async fn test_reverting_helper_for_existing_pool_is_transient(
        #[case] strategy: BootstrapStrategyKind,
    ) {
        let chain = setup(&pool_with_two_ranges(), 3000);
        chain.set_fail_state_calls(true);
        let fetcher = BootstrapFetcher::new(chain);
        let descriptor = descriptor(PoolVariant::UniswapV3, strategy, 3000);

        let err = fetcher.fetch(&descriptor, BLOCK).await.unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::Transient(PoolContractError::CallFailed { target, .. }) if target == HELPER
        ));
        assert!(!err.is_terminal());
    }

    #[rstest]
    #[tokio::test]
    async fn test_reverting_helper_for_absent_pool_is_terminal() {
        let chain = setup(&pool_with_two_ranges(), 3000);
        chain.set_fail_state_calls(true);
        chain.remove_pool(&STUB_POOL);
        let fetcher = BootstrapFetcher::new(chain);
        let descriptor =
            descriptor(PoolVariant::UniswapV3, BootstrapStrategyKind::SingleStep, 3000);

        let err = fetcher.fetch(&descriptor, BLOCK).await.unwrap_err();

        assert!(matches!(err, BootstrapError::PoolNotFound { pool } if pool == STUB_POOL));
    }

    #[rstest]
    #[tokio::test]
    async fn test_manual_halves_batches_with_reverted_calls() {
        let expected = many_ticks_pool();
        let chain = setup(&expected, 3000);
        // Scalar batch of 8 fits, tick batches above 8 run out of gas
        chain.set_gas_limited_batch_size(8);
        let fetcher = BootstrapFetcher::new(chain).with_tick_batch_size(20);
        let descriptor = descriptor(PoolVariant::UniswapV3, BootstrapStrategyKind::Manual, 3000);

        let raw = fetcher.fetch(&descriptor, BLOCK).await.unwrap();

        assert_eq!(raw.ticks.len(), 20);
        assert_eq!(fetcher.cached_tick_batch_size(&STUB_POOL), Some(5));
        let state = raw.into_pool_state(PoolVariant::UniswapV3, &header());
        assert_eq!(state.ticks, expected.ticks);
    }
}
