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

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use alloy_primitives::Address;
use bytes::Bytes;
use clmm_common::logging::{RECV, SEND};
use clmm_model::defi::BlockHeader;
use serde::de::DeserializeOwned;

use crate::rpc::{
    error::BlockchainRpcClientError,
    types::{RawLog, RpcBlock, RpcNodeHttpResponse},
};

/// Client for making HTTP-based RPC requests to blockchain nodes.
///
/// This client is designed to interact with Ethereum-compatible blockchain networks, providing
/// methods to execute RPC calls and handle responses in a type-safe manner.
#[derive(Debug)]
pub struct BlockchainHttpRpcClient {
    /// The HTTP URL for the blockchain node's RPC endpoint.
    http_rpc_url: String,
    /// The HTTP client for making RPC http-based requests.
    http_client: reqwest::Client,
    next_request_id: AtomicU64,
}

impl BlockchainHttpRpcClient {
    /// Creates a new HTTP RPC client for the given endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        http_rpc_url: String,
        request_timeout_secs: Option<u64>,
    ) -> Result<Self, BlockchainRpcClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder
            .build()
            .map_err(|e| BlockchainRpcClientError::ClientError(e.to_string()))?;

        Ok(Self {
            http_rpc_url,
            http_client,
            next_request_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn http_rpc_url(&self) -> &str {
        &self.http_rpc_url
    }

    /// Generic method that sends a JSON-RPC request and returns the raw response in bytes.
    async fn send_rpc_request(
        &self,
        rpc_request: serde_json::Value,
    ) -> Result<Bytes, BlockchainRpcClientError> {
        tracing::trace!("{SEND} {rpc_request}");

        let response = self
            .http_client
            .post(&self.http_rpc_url)
            .json(&rpc_request)
            .send()
            .await
            .map_err(|e| BlockchainRpcClientError::ClientError(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| BlockchainRpcClientError::ClientError(e.to_string()))?;
        tracing::trace!("{RECV} {status} ({} bytes)", body.len());

        if !status.is_success() {
            return Err(BlockchainRpcClientError::ClientError(format!(
                "HTTP {status}: {}",
                preview(&body)
            )));
        }
        Ok(body)
    }

    /// Executes an Ethereum JSON-RPC call and deserializes the response into the specified type T.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP RPC request fails or the response cannot be parsed.
    pub async fn execute_eth_call<T: DeserializeOwned>(
        &self,
        rpc_request: serde_json::Value,
    ) -> Result<T, BlockchainRpcClientError> {
        let bytes = self.send_rpc_request(rpc_request).await?;
        parse_rpc_response(&bytes)
    }

    /// Creates a properly formatted `eth_call` JSON-RPC request object targeting a specific
    /// contract address with encoded function data.
    #[must_use]
    pub fn construct_eth_call(
        &self,
        to: &str,
        call_data: &[u8],
        block: Option<u64>,
    ) -> serde_json::Value {
        let encoded_data = format!("0x{}", hex::encode(call_data));
        let call = serde_json::json!({
            "to": to,
            "data": encoded_data
        });

        self.construct_rpc_request("eth_call", serde_json::json!([call, block_param(block)]))
    }

    /// Creates a JSON-RPC request envelope with a fresh request id.
    #[must_use]
    pub fn construct_rpc_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Value {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        })
    }

    /// Fetches the header of `block`, or of the latest block when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the node does not know the block.
    pub async fn get_block_header(
        &self,
        block: Option<u64>,
    ) -> Result<BlockHeader, BlockchainRpcClientError> {
        let request = self.construct_rpc_request(
            "eth_getBlockByNumber",
            serde_json::json!([block_param(block), false]),
        );
        let rpc_block: Option<RpcBlock> = self.execute_eth_call(request).await?;
        rpc_block.map(BlockHeader::from).ok_or_else(|| {
            BlockchainRpcClientError::InvalidParameters(format!("Unknown block {block:?}"))
        })
    }

    /// Fetches all logs emitted by `address` in `[from_block, to_block]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn get_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, BlockchainRpcClientError> {
        let filter = serde_json::json!({
            "address": address.to_string(),
            "fromBlock": format!("0x{from_block:x}"),
            "toBlock": format!("0x{to_block:x}"),
        });
        let request = self.construct_rpc_request("eth_getLogs", serde_json::json!([filter]));
        self.execute_eth_call(request).await
    }
}

fn block_param(block: Option<u64>) -> serde_json::Value {
    match block {
        Some(block_number) => serde_json::json!(format!("0x{block_number:x}")),
        None => serde_json::json!("latest"),
    }
}

/// Parses a JSON-RPC response body into its result.
///
/// # Errors
///
/// Returns an error if the body is not a JSON-RPC response, carries an error object, or has
/// neither result nor error.
pub fn parse_rpc_response<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BlockchainRpcClientError> {
    let parsed = serde_json::from_slice::<RpcNodeHttpResponse<T>>(bytes).map_err(|e| {
        BlockchainRpcClientError::MessageParsingError(format!(
            "Failed to parse eth call response: {e}\nRaw response: {}",
            preview(bytes)
        ))
    })?;

    if let Some(error) = parsed.error {
        Err(BlockchainRpcClientError::NodeError {
            code: error.code,
            message: error.message,
        })
    } else if let Some(result) = parsed.result {
        Ok(result)
    } else {
        Err(BlockchainRpcClientError::MessageParsingError(
            "Response missing both result and error fields".to_string(),
        ))
    }
}

fn preview(bytes: &[u8]) -> String {
    let raw_response = String::from_utf8_lossy(bytes);
    if raw_response.len() > 500 {
        let cut = (0..=500)
            .rev()
            .find(|i| raw_response.is_char_boundary(*i))
            .unwrap_or(0);
        format!(
            "{}... (truncated, {} bytes total)",
            &raw_response[..cut],
            raw_response.len()
        )
    } else {
        raw_response.to_string()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
