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

//! Negative-existence caching of pools confirmed absent.
//!
//! The cache itself exposes pure add, lookup and prune operations over a [`ScoredSetStore`].
//! Expired entries are removed by [`spawn_negative_cache_sweeper`], a task owned by the
//! hosting process.

pub mod memory;
pub mod negative;
#[cfg(feature = "redis")]
pub mod redis_set;
pub mod store;
pub mod sweeper;

// Re-exports
pub use memory::InMemoryScoredSet;
pub use negative::NegativeExistenceCache;
#[cfg(feature = "redis")]
pub use redis_set::RedisScoredSet;
pub use store::ScoredSetStore;
pub use sweeper::spawn_negative_cache_sweeper;
