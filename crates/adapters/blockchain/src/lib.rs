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

//! Chain access and live state tracking for concentrated-liquidity pools.
//!
//! The `clmm-blockchain` crate is the I/O side of the pool mirror:
//!
//! - A JSON-RPC client and a Multicall3 batching transport.
//! - Contract bindings for Uniswap V3 style and Algebra pools, and the state multicall helper.
//! - Decoding of raw pool logs into domain events.
//! - Bootstrap of full pool state with single step, multi step and manual strategies.
//! - A per-pool snapshot store with reorg handling, and a registry shared by the process.
//! - A negative-existence cache for pools confirmed absent, with a scheduled sweep.
//!
//! # Feature flags
//!
//! - `redis`: Enables the Redis backed store for the negative-existence cache.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod contracts;
pub mod parsing;
pub mod rpc;
pub mod store;
pub mod testing;
