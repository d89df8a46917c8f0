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

//! JSON-RPC access to EVM nodes.
//!
//! Every chain read made by the bootstrap fetcher goes through a [`MulticallTransport`]. The
//! production transport batches calls into Multicall3 `tryAggregate` requests sent with
//! [`BlockchainHttpRpcClient`].

pub mod error;
pub mod http;
pub mod multicall;
pub mod types;

pub use error::BlockchainRpcClientError;
pub use http::BlockchainHttpRpcClient;
pub use multicall::{MulticallTransport, RpcMulticall};
pub use types::RawLog;
