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

use std::fmt::Display;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// The header fields a pool state needs to version itself and detect reorgs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub number: u64,
    /// Block timestamp in seconds.
    pub timestamp: u64,
    pub hash: B256,
    pub parent_hash: B256,
}

impl BlockHeader {
    #[must_use]
    pub const fn new(number: u64, timestamp: u64, hash: B256, parent_hash: B256) -> Self {
        Self {
            number,
            timestamp,
            hash,
            parent_hash,
        }
    }

    /// Returns `true` if `self` directly extends `parent`.
    #[must_use]
    pub fn extends(&self, parent: &Self) -> bool {
        self.number == parent.number + 1 && self.parent_hash == parent.hash
    }
}

impl Display for BlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block(number={}, hash={})", self.number, self.hash)
    }
}
