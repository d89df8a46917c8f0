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

use std::fmt::Debug;

use async_trait::async_trait;

/// A score-ordered set keyed by name, with the semantics of Redis sorted sets.
///
/// Scores are millisecond timestamps.
#[async_trait]
pub trait ScoredSetStore: Debug + Send + Sync {
    /// Adds `member` with `score` unless it is already present. Returns `true` if added.
    async fn add_nx(&self, set: &str, member: &str, score: u64) -> anyhow::Result<bool>;

    /// Sets the score of `member`, adding it if absent.
    async fn upsert(&self, set: &str, member: &str, score: u64) -> anyhow::Result<()>;

    /// Returns the score of `member`, if present.
    async fn score(&self, set: &str, member: &str) -> anyhow::Result<Option<u64>>;

    /// Removes every member whose score lies in `[min, max]`, returning how many were removed.
    async fn remove_range_by_score(&self, set: &str, min: u64, max: u64) -> anyhow::Result<usize>;
}
