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

use std::{fmt::Debug, marker::PhantomData, sync::Arc};

use alloy::{
    primitives::{Address, Bytes, address},
    sol,
    sol_types::SolCall,
};
use thiserror::Error;

use crate::rpc::{error::BlockchainRpcClientError, multicall::MulticallTransport};

sol! {
    contract Multicall3 {
        struct Call {
            address target;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function tryAggregate(bool requireSuccess, Call[] calldata calls) external payable returns (Result[] memory returnData);
    }
}

/// Standard Multicall3 address (same on all EVM chains).
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

/// Represents a single contract call for batching in multicall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// The target contract address.
    pub target: Address,
    /// Whether this call can fail without failing the batch it belongs to.
    pub allow_failure: bool,
    /// The encoded call data.
    pub call_data: Vec<u8>,
}

/// The outcome of one call inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub success: bool,
    pub return_data: Bytes,
}

impl CallResult {
    #[must_use]
    pub const fn ok(return_data: Bytes) -> Self {
        Self {
            success: true,
            return_data,
        }
    }

    #[must_use]
    pub const fn failed() -> Self {
        Self {
            success: false,
            return_data: Bytes::new(),
        }
    }
}

/// Represents errors that can occur when calling or decoding pool related contracts.
#[derive(Debug, Error)]
pub enum PoolContractError {
    #[error("RPC error: {0}")]
    RpcError(#[from] BlockchainRpcClientError),
    #[error("Failed to decode {field} for {target}: {reason} (raw data: {raw_data})")]
    DecodingError {
        field: String,
        target: Address,
        reason: String,
        raw_data: String,
    },
    #[error("Call failed for {field} at {target}: {reason}")]
    CallFailed {
        field: String,
        target: Address,
        reason: String,
    },
}

/// A call bundled with the decoder for its return data.
pub struct TypedCall<C: SolCall> {
    pub call: ContractCall,
    pub field: String,
    decoder: PhantomData<fn() -> C>,
}

impl<C: SolCall> Debug for TypedCall<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(TypedCall))
            .field("call", &self.call)
            .field("field", &self.field)
            .field("signature", &C::SIGNATURE)
            .finish()
    }
}

impl<C: SolCall> TypedCall<C> {
    /// Encodes `call` against `target`; the batch tolerates its failure when `allow_failure`.
    #[must_use]
    pub fn new(target: Address, call: &C, field: impl Into<String>, allow_failure: bool) -> Self {
        Self {
            call: encode_call(target, call, allow_failure),
            field: field.into(),
            decoder: PhantomData,
        }
    }

    /// Decodes the result of this call.
    ///
    /// # Errors
    ///
    /// Returns [`PoolContractError::CallFailed`] if the call reverted and
    /// [`PoolContractError::DecodingError`] if the return data does not match the ABI.
    pub fn decode(&self, result: &CallResult) -> Result<C::Return, PoolContractError> {
        decode_call_result::<C>(self.call.target, &self.field, result)
    }
}

/// Decodes the return data of a `C` call made against `target`.
///
/// # Errors
///
/// Returns [`PoolContractError::CallFailed`] if the call reverted and
/// [`PoolContractError::DecodingError`] if the return data does not match the ABI.
pub fn decode_call_result<C: SolCall>(
    target: Address,
    field: &str,
    result: &CallResult,
) -> Result<C::Return, PoolContractError> {
    if !result.success {
        return Err(PoolContractError::CallFailed {
            field: field.to_string(),
            target,
            reason: "call reverted".to_string(),
        });
    }
    C::abi_decode_returns(&result.return_data).map_err(|e| PoolContractError::DecodingError {
        field: field.to_string(),
        target,
        reason: e.to_string(),
        raw_data: hex::encode(&result.return_data),
    })
}

/// Encodes `call` against `target` as a batch entry.
#[must_use]
pub fn encode_call<C: SolCall>(target: Address, call: &C, allow_failure: bool) -> ContractCall {
    ContractCall {
        target,
        allow_failure,
        call_data: call.abi_encode(),
    }
}

/// Base contract functionality for interacting with blockchain contracts.
///
/// All reads go through a [`MulticallTransport`], so a single call is a batch of one.
#[derive(Debug, Clone)]
pub struct BaseContract {
    transport: Arc<dyn MulticallTransport>,
}

impl BaseContract {
    #[must_use]
    pub fn new(transport: Arc<dyn MulticallTransport>) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn MulticallTransport> {
        &self.transport
    }

    /// Executes a single typed call and decodes its return value.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails, the call reverts or decoding fails.
    pub async fn execute_typed<C: SolCall>(
        &self,
        typed: &TypedCall<C>,
        block: Option<u64>,
    ) -> Result<C::Return, PoolContractError> {
        let results = self.execute_batch(std::slice::from_ref(&typed.call), block).await?;
        let result = results.first().ok_or_else(|| PoolContractError::CallFailed {
            field: typed.field.clone(),
            target: typed.call.target,
            reason: "empty multicall response".to_string(),
        })?;
        typed.decode(result)
    }

    /// Executes a batch of calls, returning one result per call in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or answers with the wrong number of results.
    pub async fn execute_batch(
        &self,
        calls: &[ContractCall],
        block: Option<u64>,
    ) -> Result<Vec<CallResult>, PoolContractError> {
        let results = self.transport.try_aggregate(calls, block).await?;
        if results.len() != calls.len() {
            return Err(BlockchainRpcClientError::AbiDecodingError(format!(
                "Expected {} multicall results, got {}",
                calls.len(),
                results.len()
            ))
            .into());
        }
        Ok(results)
    }
}

/// Decodes a hexadecimal string response from a blockchain RPC call.
///
/// # Errors
///
/// Returns an `BlockchainRpcClientError::AbiDecodingError` if the hex decoding fails.
pub fn decode_hex_response(encoded_response: &str) -> Result<Vec<u8>, BlockchainRpcClientError> {
    // Remove the "0x" prefix if present
    let encoded_str = encoded_response
        .strip_prefix("0x")
        .unwrap_or(encoded_response);
    hex::decode(encoded_str).map_err(|e| {
        BlockchainRpcClientError::AbiDecodingError(format!("Error decoding hex response: {e}"))
    })
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;
    use rstest::rstest;

    use super::*;
    use crate::contracts::erc20::ERC20;

    #[rstest]
    fn test_decode_hex_response() {
        assert_eq!(decode_hex_response("0x0a0b").unwrap(), vec![10, 11]);
        assert_eq!(decode_hex_response("0a0b").unwrap(), vec![10, 11]);
        assert!(decode_hex_response("0xzz").is_err());
    }

    #[rstest]
    fn test_typed_call_decodes_success() {
        let token = address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        let typed = TypedCall::new(
            token,
            &ERC20::balanceOfCall {
                account: Address::ZERO,
            },
            "balanceOf",
            true,
        );
        let encoded = ERC20::balanceOfCall::abi_encode_returns(&U256::from(42));

        let value = typed.decode(&CallResult::ok(encoded.into())).unwrap();

        assert_eq!(value, U256::from(42));
        assert!(typed.call.allow_failure);
        assert_eq!(typed.call.call_data[..4], ERC20::balanceOfCall::SELECTOR);
    }

    #[rstest]
    fn test_typed_call_reports_revert_and_bad_data() {
        let typed = TypedCall::new(
            Address::ZERO,
            &ERC20::balanceOfCall {
                account: Address::ZERO,
            },
            "balanceOf",
            false,
        );

        assert!(matches!(
            typed.decode(&CallResult::failed()),
            Err(PoolContractError::CallFailed { .. })
        ));
        assert!(matches!(
            typed.decode(&CallResult::ok(Bytes::from(vec![1, 2, 3]))),
            Err(PoolContractError::DecodingError { .. })
        ));
    }
}
