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

//! Assembly of a pool's full state from batched chain reads.

pub mod fetcher;

use std::{fmt::Display, sync::Arc};

use alloy::primitives::{Address, U256};
use clmm_model::defi::{
    BlockHeader, PoolState, PoolVariant,
    pool_analysis::GlobalState,
    tick_map::{TickInfo, liquidity_math::tick_spacing_to_max_liquidity_per_tick},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::DexConfig,
    contracts::{PoolContractError, state_multicall::PoolStateMulticall},
};

// Re-exports
pub use fetcher::{BootstrapFetcher, DEFAULT_TICK_BATCH_SIZE, MAX_BATCH_RETRIES};

/// Identifies a pool within a DEX by its sorted token pair and fee tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolKey {
    pub token0: Address,
    pub token1: Address,
    /// Fee tier in hundredths of a basis point; zero for DEXes keyed by pair only.
    pub fee: u32,
}

impl PoolKey {
    /// Creates a new [`PoolKey`], ordering the tokens as the factory does.
    #[must_use]
    pub fn new(token_a: Address, token_b: Address, fee: u32) -> Self {
        let (token0, token1) = if token_a <= token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        Self {
            token0,
            token1,
            fee,
        }
    }
}

impl Display for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}_{:#x}_{}", self.token0, self.token1, self.fee)
    }
}

/// Everything needed to bootstrap and track one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDescriptor {
    pub key: PoolKey,
    pub pool_address: Address,
    pub dex: Arc<DexConfig>,
}

impl PoolDescriptor {
    #[must_use]
    pub const fn new(key: PoolKey, pool_address: Address, dex: Arc<DexConfig>) -> Self {
        Self {
            key,
            pool_address,
            dex,
        }
    }

    #[must_use]
    pub fn variant(&self) -> PoolVariant {
        self.dex.variant
    }
}

impl Display for PoolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}({})", self.dex.name, self.key, self.pool_address)
    }
}

/// Failure of a bootstrap fetch.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The pool does not exist. Terminal: the caller should cache the absence.
    #[error("Pool {pool} not found")]
    PoolNotFound { pool: Address },
    #[error("Transient bootstrap failure: {0}")]
    Transient(#[from] PoolContractError),
    #[error("Tick fetch for {pool} failed after {attempts} attempts: {source}")]
    BackoffExhausted {
        pool: Address,
        attempts: u32,
        #[source]
        source: PoolContractError,
    },
    #[error("DEX '{dex}' is misconfigured: {reason}")]
    Misconfigured { dex: String, reason: String },
}

impl BootstrapError {
    /// Returns `true` if retrying cannot succeed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PoolNotFound { .. })
    }
}

/// Decoded pool state as read from the chain, before it is indexed into a [`PoolState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPoolState {
    pub pool: Address,
    pub global_state: GlobalState,
    pub liquidity: u128,
    pub tick_spacing: i32,
    /// Zero when the pool does not expose the cap.
    pub max_liquidity_per_tick: u128,
    pub fee_growth_global_0_x128: U256,
    pub fee_growth_global_1_x128: U256,
    pub balance0: U256,
    pub balance1: U256,
    pub bitmap_words: Vec<(i16, U256)>,
    pub ticks: Vec<(i32, TickInfo)>,
}

impl RawPoolState {
    /// Builds the scalar part from a state multicall result; bitmap and ticks are added by the
    /// caller.
    #[must_use]
    pub fn from_state_result(
        variant: PoolVariant,
        result: &PoolStateMulticall::StateResult,
        balance0: U256,
        balance1: U256,
    ) -> Self {
        Self {
            pool: result.pool,
            global_state: result.globalState.clone().into_global_state(variant),
            liquidity: result.liquidity,
            tick_spacing: result.tickSpacing.as_i32(),
            max_liquidity_per_tick: result.maxLiquidityPerTick,
            fee_growth_global_0_x128: result.feeGrowthGlobal0X128,
            fee_growth_global_1_x128: result.feeGrowthGlobal1X128,
            balance0,
            balance1,
            bitmap_words: Vec::new(),
            ticks: Vec::new(),
        }
    }

    /// Appends a fetched bitmap word and its ticks.
    pub fn extend_word(&mut self, word: i16, value: U256, ticks: &[PoolStateMulticall::TickData]) {
        self.bitmap_words.push((word, value));
        self.ticks.extend(ticks.iter().map(PoolStateMulticall::TickData::to_tick));
    }

    /// Indexes the fetched data into a valid [`PoolState`] at `header`.
    ///
    /// The bitmap window is anchored on the word holding the current tick.
    #[must_use]
    pub fn into_pool_state(self, variant: PoolVariant, header: &BlockHeader) -> PoolState {
        let max_liquidity_per_tick = if self.max_liquidity_per_tick == 0 {
            tick_spacing_to_max_liquidity_per_tick(self.tick_spacing)
        } else {
            self.max_liquidity_per_tick
        };

        let mut state = PoolState::new(
            self.pool,
            variant,
            self.tick_spacing,
            self.global_state,
            self.liquidity,
            max_liquidity_per_tick,
        );
        state.block_timestamp = header.timestamp;
        state.balance0 = self.balance0;
        state.balance1 = self.balance1;
        state.fee_growth_global_0_x128 = self.fee_growth_global_0_x128;
        state.fee_growth_global_1_x128 = self.fee_growth_global_1_x128;

        for (word, value) in self.bitmap_words {
            state.tick_bitmap.set_word(word, value);
        }
        for (tick, info) in self.ticks {
            state.insert_tick(tick, info);
        }

        state
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use alloy::primitives::{B256, address};
    use clmm_model::defi::{
        pool_analysis::{PoolFee, ProtocolFee},
        tick_map::{full_math::Q96_U160, tick_math::get_sqrt_ratio_at_tick},
    };
    use rstest::rstest;

    use super::*;

    const WETH: Address = address!("0x82af49447d8a07e3bd95bd0d56f35241523fbab1");
    const USDC: Address = address!("0xaf88d065e77c8cc2239327c5edb3a432268e5831");

    #[rstest]
    fn test_pool_key_orders_tokens() {
        let key = PoolKey::new(WETH, USDC, 500);
        assert_eq!(key, PoolKey::new(USDC, WETH, 500));
        assert_eq!(key.token0, WETH);
        assert_eq!(
            key.to_string(),
            "0x82af49447d8a07e3bd95bd0d56f35241523fbab1_0xaf88d065e77c8cc2239327c5edb3a432268e5831_500"
        );
    }

    #[rstest]
    fn test_only_not_found_is_terminal() {
        assert!(BootstrapError::PoolNotFound { pool: WETH }.is_terminal());
        let transient = BootstrapError::Transient(PoolContractError::CallFailed {
            field: "slot0".to_string(),
            target: WETH,
            reason: "call reverted".to_string(),
        });
        assert!(!transient.is_terminal());
    }

    #[rstest]
    fn test_into_pool_state_indexes_words_and_ticks() {
        let tick = 65;
        let raw = RawPoolState {
            pool: WETH,
            global_state: GlobalState::new(
                get_sqrt_ratio_at_tick(tick).unwrap(),
                tick,
                PoolFee::Single(3000),
                ProtocolFee::Packed(0),
            ),
            liquidity: 1_000,
            tick_spacing: 60,
            max_liquidity_per_tick: 0,
            fee_growth_global_0_x128: U256::from(1),
            fee_growth_global_1_x128: U256::from(2),
            balance0: U256::from(10),
            balance1: U256::from(20),
            // Compressed ticks -1 and 1
            bitmap_words: vec![(-1, U256::ONE << 255), (0, U256::from(2))],
            ticks: vec![
                (-60, TickInfo::new(1_000, 1_000, U256::ZERO, U256::ZERO, true)),
                (60, TickInfo::new(1_000, -1_000, U256::ZERO, U256::ZERO, true)),
            ],
        };
        let header = BlockHeader::new(100, 1_700_000_000, B256::ZERO, B256::ZERO);

        let state = raw.into_pool_state(PoolVariant::UniswapV3, &header);

        assert!(state.is_valid);
        assert_eq!(state.block_timestamp, 1_700_000_000);
        assert_eq!(state.tick_bitmap.start_tick_bitmap(), 0);
        assert_eq!(
            state.max_liquidity_per_tick,
            tick_spacing_to_max_liquidity_per_tick(60)
        );
        assert_eq!(state.initialized_tick_count(), 2);
        assert!(state.check_consistency().is_ok());
        assert_ne!(state.sqrt_price_x96(), Q96_U160);
    }
}
