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

use ahash::AHashMap;
use async_trait::async_trait;
use dashmap::DashMap;

use super::store::ScoredSetStore;

/// A process-local [`ScoredSetStore`].
#[derive(Debug, Default)]
pub struct InMemoryScoredSet {
    sets: DashMap<String, AHashMap<String, u64>>,
}

impl InMemoryScoredSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of members in `set`.
    #[must_use]
    pub fn len(&self, set: &str) -> usize {
        self.sets.get(set).map_or(0, |members| members.len())
    }
}

#[async_trait]
impl ScoredSetStore for InMemoryScoredSet {
    async fn add_nx(&self, set: &str, member: &str, score: u64) -> anyhow::Result<bool> {
        let mut members = self.sets.entry(set.to_string()).or_default();
        if members.contains_key(member) {
            return Ok(false);
        }
        members.insert(member.to_string(), score);
        Ok(true)
    }

    async fn upsert(&self, set: &str, member: &str, score: u64) -> anyhow::Result<()> {
        self.sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn score(&self, set: &str, member: &str) -> anyhow::Result<Option<u64>> {
        Ok(self
            .sets
            .get(set)
            .and_then(|members| members.get(member).copied()))
    }

    async fn remove_range_by_score(&self, set: &str, min: u64, max: u64) -> anyhow::Result<usize> {
        let Some(mut members) = self.sets.get_mut(set) else {
            return Ok(0);
        };
        let before = members.len();
        members.retain(|_, score| !(min..=max).contains(score));
        Ok(before - members.len())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_nx_keeps_first_score() {
        let store = InMemoryScoredSet::new();

        assert!(store.add_nx("absent", "a", 10).await.unwrap());
        assert!(!store.add_nx("absent", "a", 20).await.unwrap());

        assert_eq!(store.score("absent", "a").await.unwrap(), Some(10));
        assert_eq!(store.score("absent", "b").await.unwrap(), None);
        assert_eq!(store.score("other", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_score() {
        let store = InMemoryScoredSet::new();
        store.add_nx("absent", "a", 10).await.unwrap();

        store.upsert("absent", "a", 30).await.unwrap();
        store.upsert("absent", "b", 40).await.unwrap();

        assert_eq!(store.score("absent", "a").await.unwrap(), Some(30));
        assert_eq!(store.score("absent", "b").await.unwrap(), Some(40));
        assert_eq!(store.len("absent"), 2);
    }

    #[tokio::test]
    async fn test_remove_range_is_inclusive() {
        let store = InMemoryScoredSet::new();
        for (member, score) in [("a", 1), ("b", 5), ("c", 9)] {
            store.add_nx("absent", member, score).await.unwrap();
        }

        assert_eq!(store.remove_range_by_score("absent", 0, 5).await.unwrap(), 2);
        assert_eq!(store.len("absent"), 1);
        assert_eq!(store.remove_range_by_score("missing", 0, 5).await.unwrap(), 0);
    }
}
