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

//! Batched read-only calls pinned to a block.

use std::{fmt::Debug, sync::Arc};

use alloy::{primitives::Address, sol_types::SolCall};
use async_trait::async_trait;
use clmm_common::logging::RES;
use futures::future::try_join_all;

use crate::{
    contracts::base::{CallResult, ContractCall, Multicall3, decode_hex_response},
    rpc::{error::BlockchainRpcClientError, http::BlockchainHttpRpcClient},
};

/// A block-scoped batched call primitive.
///
/// Implementations return exactly one [`CallResult`] per call, in call order. A failing call
/// is reported in its result; only transport level failures are errors.
#[async_trait]
pub trait MulticallTransport: Debug + Send + Sync {
    /// Executes `calls` at `block`, or at the latest block when `None`.
    async fn try_aggregate(
        &self,
        calls: &[ContractCall],
        block: Option<u64>,
    ) -> Result<Vec<CallResult>, BlockchainRpcClientError>;

    /// The number of calls sent per underlying request.
    fn batch_size(&self) -> usize;
}

/// [`MulticallTransport`] over Multicall3 `tryAggregate` via JSON-RPC `eth_call`.
#[derive(Debug)]
pub struct RpcMulticall {
    client: Arc<BlockchainHttpRpcClient>,
    multicall_address: Address,
    batch_size: usize,
}

impl RpcMulticall {
    #[must_use]
    pub fn new(
        client: Arc<BlockchainHttpRpcClient>,
        multicall_address: Address,
        batch_size: usize,
    ) -> Self {
        Self {
            client,
            multicall_address,
            batch_size: batch_size.max(1),
        }
    }

    async fn aggregate_chunk(
        &self,
        calls: &[ContractCall],
        block: Option<u64>,
    ) -> Result<Vec<CallResult>, BlockchainRpcClientError> {
        let multicall_calls: Vec<Multicall3::Call> = calls
            .iter()
            .map(|call| Multicall3::Call {
                target: call.target,
                callData: call.call_data.clone().into(),
            })
            .collect();

        let multicall_data = Multicall3::tryAggregateCall {
            requireSuccess: false,
            calls: multicall_calls,
        }
        .abi_encode();
        let rpc_request = self.client.construct_eth_call(
            &self.multicall_address.to_string(),
            multicall_data.as_slice(),
            block,
        );

        let encoded_response = self
            .client
            .execute_eth_call::<String>(rpc_request)
            .await
            .map_err(|e| BlockchainRpcClientError::ClientError(format!("Multicall failed: {e}")))?;

        let bytes = decode_hex_response(&encoded_response)?;
        let results = Multicall3::tryAggregateCall::abi_decode_returns(&bytes).map_err(|e| {
            BlockchainRpcClientError::AbiDecodingError(format!(
                "Failed to decode multicall results: {e}"
            ))
        })?;

        if results.len() != calls.len() {
            return Err(BlockchainRpcClientError::AbiDecodingError(format!(
                "Multicall returned {} results for {} calls",
                results.len(),
                calls.len()
            )));
        }
        tracing::trace!("{RES} multicall of {} calls at {block:?}", calls.len());

        Ok(results
            .into_iter()
            .zip(calls)
            .map(|(result, call)| {
                if result.success {
                    return CallResult::ok(result.returnData);
                }
                if !call.allow_failure {
                    tracing::debug!("Required call to {} reverted", call.target);
                }
                CallResult::failed()
            })
            .collect())
    }
}

#[async_trait]
impl MulticallTransport for RpcMulticall {
    async fn try_aggregate(
        &self,
        calls: &[ContractCall],
        block: Option<u64>,
    ) -> Result<Vec<CallResult>, BlockchainRpcClientError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = calls
            .chunks(self.batch_size)
            .map(|chunk| self.aggregate_chunk(chunk, block));
        let results = try_join_all(chunks).await?;

        Ok(results.into_iter().flatten().collect())
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}
