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

use alloy_primitives::{Address, B256, Bytes, U64};
use clmm_model::defi::{BlockHeader, LogPosition};
use serde::{Deserialize, de::DeserializeOwned};

/// A JSON-RPC error object returned by a node.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// A response structure received from an HTTP JSON-RPC blockchain node request.
#[derive(Debug, Deserialize)]
pub struct RpcNodeHttpResponse<T>
where
    T: DeserializeOwned,
{
    /// JSON-RPC version identifier.
    pub jsonrpc: String,
    /// Request identifier returned by the server.
    pub id: u64,
    /// Deserialized result, absent when the node returned an error.
    #[serde(bound(deserialize = ""))]
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

/// The subset of `eth_getBlockByNumber` used to version pool snapshots.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub number: U64,
    pub timestamp: U64,
    pub hash: B256,
    pub parent_hash: B256,
}

impl From<RpcBlock> for BlockHeader {
    fn from(block: RpcBlock) -> Self {
        Self::new(
            block.number.to::<u64>(),
            block.timestamp.to::<u64>(),
            block.hash,
            block.parent_hash,
        )
    }
}

/// A raw log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: U64,
    pub transaction_index: U64,
    pub log_index: U64,
    #[serde(default)]
    pub removed: bool,
}

impl RawLog {
    /// Returns the ordering position of this log within the chain.
    #[must_use]
    pub fn position(&self) -> LogPosition {
        LogPosition::new(
            self.block_number.to::<u64>(),
            self.transaction_index.saturating_to::<u32>(),
            self.log_index.saturating_to::<u32>(),
        )
    }

    #[must_use]
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_block_header_from_rpc_block() {
        let block: RpcBlock = serde_json::from_str(
            r#"{"number":"0x13a7cad4","timestamp":"0x680a58bf",
            "hash":"0xb1e9f3e327e0686c9a299d9d6dbb6f2a77b60e1b948ddab9055bacbe02b7aee0",
            "parentHash":"0x37356a864e9fd6eca0d4ebdd704739717f70e0e1f733b52317d377107c9b51ca",
            "miner":"0xa4b000000000000000000073657175656e636572"}"#,
        )
        .unwrap();

        let header = BlockHeader::from(block);

        assert_eq!(header.number, 329_763_540);
        assert_eq!(header.timestamp, 1_745_508_543);
        assert_eq!(
            header.parent_hash.to_string(),
            "0x37356a864e9fd6eca0d4ebdd704739717f70e0e1f733b52317d377107c9b51ca"
        );
    }

    #[rstest]
    fn test_raw_log_position() {
        let log: RawLog = serde_json::from_str(
            r#"{"address":"0x8ad599c3a0ff1de082011efddc58f1908eb6e6d8",
            "topics":["0x0c396cd989a39f4459b5fa1aed6a9a8dcdbc45908acfd67e028cd568da98982c"],
            "data":"0x","blockNumber":"0x10","transactionIndex":"0x2","logIndex":"0x7",
            "transactionHash":"0x00000000000000000000000000000000000000000000000000000000000000aa"}"#,
        )
        .unwrap();

        assert_eq!(log.position(), LogPosition::new(16, 2, 7));
        assert!(!log.removed);
        assert!(log.topic0().is_some());
    }
}
