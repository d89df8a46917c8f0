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

//! Redis sorted-set backend for the negative-existence cache.

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::store::ScoredSetStore;
use crate::config::RedisConfig;

/// A [`ScoredSetStore`] over Redis `ZADD`, `ZSCORE` and `ZREMRANGEBYSCORE`.
#[derive(Clone)]
pub struct RedisScoredSet {
    con: ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisScoredSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(RedisScoredSet))
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisScoredSet {
    /// Connects to Redis using `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection cannot be established.
    pub async fn connect(config: &RedisConfig) -> anyhow::Result<Self> {
        let (url, redacted_url) = config.url()?;
        tracing::debug!("Connecting to {redacted_url}");

        let client = redis::Client::open(url)?;
        let con = client.get_connection_manager().await?;
        tracing::info!("Connected to redis for negative cache");

        Ok(Self {
            con,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, set: &str) -> String {
        format!("{}{set}", self.key_prefix)
    }
}

#[async_trait]
impl ScoredSetStore for RedisScoredSet {
    async fn add_nx(&self, set: &str, member: &str, score: u64) -> anyhow::Result<bool> {
        let mut con = self.con.clone();
        let added: i64 = redis::cmd("ZADD")
            .arg(self.key(set))
            .arg("NX")
            .arg(score)
            .arg(member)
            .query_async(&mut con)
            .await?;
        Ok(added > 0)
    }

    async fn upsert(&self, set: &str, member: &str, score: u64) -> anyhow::Result<()> {
        let mut con = self.con.clone();
        let _: i64 = redis::cmd("ZADD")
            .arg(self.key(set))
            .arg(score)
            .arg(member)
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn score(&self, set: &str, member: &str) -> anyhow::Result<Option<u64>> {
        let mut con = self.con.clone();
        let score: Option<f64> = redis::cmd("ZSCORE")
            .arg(self.key(set))
            .arg(member)
            .query_async(&mut con)
            .await?;
        // Millisecond timestamps are exact in an f64
        Ok(score.map(|score| score as u64))
    }

    async fn remove_range_by_score(&self, set: &str, min: u64, max: u64) -> anyhow::Result<usize> {
        let mut con = self.con.clone();
        let removed: usize = redis::cmd("ZREMRANGEBYSCORE")
            .arg(self.key(set))
            .arg(min)
            .arg(max)
            .query_async(&mut con)
            .await?;
        Ok(removed)
    }
}
