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

use std::{sync::Arc, time::Duration};

use alloy::primitives::{Address, U256, address};
use clmm_blockchain::{
    bootstrap::{BootstrapFetcher, PoolDescriptor, PoolKey},
    cache::{InMemoryScoredSet, NegativeExistenceCache, ScoredSetStore, spawn_negative_cache_sweeper},
    config::{BootstrapStrategyKind, DexConfig, PoolTrackerConfig},
    contracts::{BaseContract, erc20::Erc20Contract},
    rpc::{BlockchainHttpRpcClient, MulticallTransport, RpcMulticall},
    store::PoolRegistry,
};
use clmm_common::{
    clock::{Clock, LiveClock},
    env::get_env_var,
    logging::init_tracing,
};
use clmm_model::defi::{
    PoolVariant,
    pool_analysis::{SwapSide, simulation::mid_price},
};
use tokio_util::sync::CancellationToken;

// Run with `cargo run -p clmm-blockchain --bin pool_sync [config.toml]`
// Without a config file `RPC_HTTP_URL` must point at an Arbitrum One node
// To see additional tracing logs `export RUST_LOG=debug`

const UNISWAP_V3_FACTORY: Address = address!("0x1f98431c8ad98523631ae4a59f267346ea31f984");
const WETH: Address = address!("0x82af49447d8a07e3bd95bd0d56f35241523fbab1");
const USDC: Address = address!("0xaf88d065e77c8cc2239327c5edb3a432268e5831");
const WETH_USDC_500: Address = address!("0xc6962004f452be9203591991d15f6b388e09e8d0");

fn load_config() -> anyhow::Result<PoolTrackerConfig> {
    if let Some(path) = std::env::args().nth(1) {
        return PoolTrackerConfig::from_toml_file(path);
    }

    let dex = DexConfig::new(
        "uniswap_v3",
        PoolVariant::UniswapV3,
        UNISWAP_V3_FACTORY,
        None,
        Some(BootstrapStrategyKind::Manual),
    );
    Ok(PoolTrackerConfig::new(
        get_env_var("RPC_HTTP_URL")?,
        None,
        None,
        None,
        vec![dex],
    ))
}

async fn negative_cache_store(config: &PoolTrackerConfig) -> anyhow::Result<Arc<dyn ScoredSetStore>> {
    #[cfg(feature = "redis")]
    if let Some(redis) = &config.redis {
        let store = clmm_blockchain::cache::RedisScoredSet::connect(redis).await?;
        return Ok(Arc::new(store));
    }

    if config.redis.is_some() {
        tracing::warn!("Redis configured but the `redis` feature is disabled, using memory");
    }
    Ok(Arc::new(InMemoryScoredSet::new()))
}

fn ladder(decimals: u8, multiples: &[u64], divisor: u64) -> Vec<U256> {
    let unit = U256::from(10u64).pow(U256::from(decimals));
    multiples
        .iter()
        .map(|multiple| unit * U256::from(*multiple) / U256::from(divisor))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing()?;

    let client = Arc::new(BlockchainHttpRpcClient::new(
        config.http_rpc_url.clone(),
        config.rpc_request_timeout_secs,
    )?);
    let transport: Arc<dyn MulticallTransport> = Arc::new(RpcMulticall::new(
        client.clone(),
        config.multicall_address,
        config.multicall_calls_per_rpc_request as usize,
    ));

    let clock: Arc<dyn Clock> = Arc::new(LiveClock::new());
    let negative_cache = Arc::new(NegativeExistenceCache::new(
        negative_cache_store(&config).await?,
        &config.negative_cache,
    ));
    let registry = PoolRegistry::new(
        Arc::new(BootstrapFetcher::new(transport.clone())),
        negative_cache.clone(),
        clock.clone(),
        config.max_blocks_history,
    );

    let cancel = CancellationToken::new();
    let sweeper = spawn_negative_cache_sweeper(
        negative_cache,
        clock,
        Duration::from_millis(config.negative_cache.sweep_interval_ms),
        cancel.clone(),
    );

    let dex = config
        .dexes
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No DEX configured"))?;
    let descriptor = PoolDescriptor::new(
        PoolKey::new(WETH, USDC, 500),
        WETH_USDC_500,
        Arc::new(dex),
    );

    let header = client.get_block_header(None).await?;
    println!("Bootstrapping {descriptor} at {header}");

    let Some(snapshot) = registry.get_or_init(&descriptor, &header).await? else {
        println!("Pool {descriptor} does not exist");
        cancel.cancel();
        sweeper.await?;
        return Ok(());
    };
    let state = &snapshot.state;
    println!("{state}");

    let erc20 = Erc20Contract::new(BaseContract::new(transport));
    let key = descriptor.key;
    let decimals0 = erc20.fetch_decimals(key.token0, Some(header.number)).await?;
    let decimals1 = erc20.fetch_decimals(key.token1, Some(header.number)).await?;
    let (balance0, balance1) = erc20
        .fetch_pair_balances(key.token0, key.token1, descriptor.pool_address, Some(header.number))
        .await?;
    println!("Balances: tracked=({}, {}), chain=({balance0}, {balance1})", state.balance0, state.balance1);
    println!("Mid price: {:.4}", mid_price(state, decimals0, decimals1));

    // Sell fractions of one token0, buy whole units of token1
    let sell_amounts = ladder(decimals0, &[1, 10, 100, 1_000, 10_000], 1_000);
    let buy_amounts = ladder(decimals1, &[1, 10, 100, 1_000, 10_000], 1);

    for (side, amounts) in [(SwapSide::Sell, sell_amounts), (SwapSide::Buy, buy_amounts)] {
        let Some(result) = registry.quote(&key, &amounts, true, side) else {
            println!("{side}: pool cannot serve the ladder");
            continue;
        };
        for ((amount, output), ticks) in amounts
            .iter()
            .zip(&result.outputs)
            .zip(&result.tick_counts)
        {
            match side {
                SwapSide::Sell => println!("SELL {amount} token0 -> {output} token1 ({ticks} ticks)"),
                SwapSide::Buy => println!("BUY {amount} token1 <- {output} token0 ({ticks} ticks)"),
            }
        }
    }

    cancel.cancel();
    sweeper.await?;
    Ok(())
}
