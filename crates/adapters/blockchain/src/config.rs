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

//! Configuration for pool tracking, loadable from TOML.

use std::path::Path;

use alloy::primitives::{Address, B256};
use clmm_common::clock::{MILLISECONDS_IN_DAY, MILLISECONDS_IN_MINUTE};
use clmm_model::defi::PoolVariant;
use serde::{Deserialize, Serialize};

use crate::contracts::base::MULTICALL3_ADDRESS;

/// How the initial state of a pool is assembled from chain reads.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BootstrapStrategyKind {
    /// One batched call through the state multicall contract.
    #[default]
    SingleStep,
    /// State without ticks first, then one call per bitmap word.
    MultiStep,
    /// Plain pool getters only, for networks without a usable state multicall.
    Manual,
}

/// A DEX deployment whose pools share a variant and factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexConfig {
    pub name: String,
    pub variant: PoolVariant,
    pub factory: Address,
    /// Helper contract serving full pool state in one call.
    #[serde(default)]
    pub state_multicall: Option<Address>,
    #[serde(default)]
    pub bootstrap: BootstrapStrategyKind,
    #[serde(default)]
    pub pool_init_code_hash: Option<B256>,
    /// Deployer used in the CREATE2 derivation when it differs from the factory.
    #[serde(default)]
    pub pool_deployer: Option<Address>,
}

impl DexConfig {
    /// Creates a new [`DexConfig`] instance.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        variant: PoolVariant,
        factory: Address,
        state_multicall: Option<Address>,
        bootstrap: Option<BootstrapStrategyKind>,
    ) -> Self {
        Self {
            name: name.into(),
            variant,
            factory,
            state_multicall,
            bootstrap: bootstrap.unwrap_or_default(),
            pool_init_code_hash: None,
            pool_deployer: None,
        }
    }
}

/// Settings for the cache of pools known not to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeCacheConfig {
    /// How long an absent pool stays cached, in milliseconds.
    pub ttl_ms: u64,
    /// Period of the background sweep, in milliseconds.
    pub sweep_interval_ms: u64,
    /// Name of the scored set holding the entries.
    pub set_name: String,
}

impl Default for NegativeCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 3 * MILLISECONDS_IN_DAY,
            sweep_interval_ms: 30 * MILLISECONDS_IN_MINUTE,
            set_name: "clmm:pools:absent".to_string(),
        }
    }
}

/// Connection settings for a Redis backed negative cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// The host address. If `None`, localhost is used.
    pub host: Option<String>,
    /// The port. If `None`, 6379 is used.
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// If the connection should use TLS.
    pub ssl: bool,
    /// Prefix prepended to every key.
    pub key_prefix: String,
}

impl RedisConfig {
    /// Returns the connection URL and a variant safe to log.
    ///
    /// # Errors
    ///
    /// Returns an error if a username is supplied without a password.
    pub fn url(&self) -> anyhow::Result<(String, String)> {
        let host = self.host.as_deref().unwrap_or("127.0.0.1");
        let port = self.port.unwrap_or(6379);
        let username = self.username.as_deref().unwrap_or_default();
        let password = self.password.as_deref().unwrap_or_default();

        let redact = |pw: &str| {
            if pw.len() > 4 {
                format!("{}...{}", &pw[..2], &pw[pw.len() - 2..])
            } else {
                pw.to_owned()
            }
        };

        let (auth, auth_redacted) = match (username.is_empty(), password.is_empty()) {
            (false, false) => (
                format!("{username}:{password}@"),
                format!("{username}:{}@", redact(password)),
            ),
            (true, false) => (format!(":{password}@"), format!(":{}@", redact(password))),
            (false, true) => anyhow::bail!(
                "Redis config error: username supplied without password. \
                Either supply a password or omit the username."
            ),
            (true, true) => (String::new(), String::new()),
        };

        let scheme = if self.ssl { "rediss" } else { "redis" };
        Ok((
            format!("{scheme}://{auth}{host}:{port}"),
            format!("{scheme}://{auth_redacted}{host}:{port}"),
        ))
    }
}

/// Configuration for tracking a set of pools against one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolTrackerConfig {
    /// The HTTP URL for the blockchain RPC endpoint.
    pub http_rpc_url: String,
    /// Timeout of a single RPC request, in seconds.
    pub rpc_request_timeout_secs: Option<u64>,
    /// The maximum number of calls per multicall request.
    pub multicall_calls_per_rpc_request: u32,
    pub multicall_address: Address,
    /// How many block-versioned snapshots each pool keeps.
    pub max_blocks_history: usize,
    pub negative_cache: NegativeCacheConfig,
    pub dexes: Vec<DexConfig>,
    /// When set, the negative cache is kept in Redis rather than in memory.
    pub redis: Option<RedisConfig>,
}

impl Default for PoolTrackerConfig {
    fn default() -> Self {
        Self {
            http_rpc_url: String::new(),
            rpc_request_timeout_secs: Some(10),
            multicall_calls_per_rpc_request: 200,
            multicall_address: MULTICALL3_ADDRESS,
            max_blocks_history: 30,
            negative_cache: NegativeCacheConfig::default(),
            dexes: Vec::new(),
            redis: None,
        }
    }
}

impl PoolTrackerConfig {
    /// Creates a new [`PoolTrackerConfig`] instance.
    #[must_use]
    pub fn new(
        http_rpc_url: String,
        multicall_calls_per_rpc_request: Option<u32>,
        max_blocks_history: Option<usize>,
        negative_cache: Option<NegativeCacheConfig>,
        dexes: Vec<DexConfig>,
    ) -> Self {
        let default = Self::default();
        Self {
            http_rpc_url,
            multicall_calls_per_rpc_request: multicall_calls_per_rpc_request
                .unwrap_or(default.multicall_calls_per_rpc_request),
            max_blocks_history: max_blocks_history.unwrap_or(default.max_blocks_history),
            negative_cache: negative_cache.unwrap_or_default(),
            dexes,
            ..default
        }
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Returns the DEX configuration with the given name.
    #[must_use]
    pub fn dex(&self, name: &str) -> Option<&DexConfig> {
        self.dexes.iter().find(|dex| dex.name == name)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.multicall_calls_per_rpc_request == 0 {
            anyhow::bail!("`multicall_calls_per_rpc_request` must be positive");
        }
        if self.max_blocks_history == 0 {
            anyhow::bail!("`max_blocks_history` must be positive");
        }
        for dex in &self.dexes {
            let needs_helper = dex.bootstrap != BootstrapStrategyKind::Manual;
            if needs_helper && dex.state_multicall.is_none() {
                anyhow::bail!(
                    "DEX '{}' uses {} bootstrap but has no `state_multicall` address",
                    dex.name,
                    dex.bootstrap
                );
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
