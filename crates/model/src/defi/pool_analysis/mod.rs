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

//! Pool state, event application and swap simulation for concentrated-liquidity pools.

pub mod apply;
pub mod compare;
pub mod engine;
pub mod error;
pub mod quote;
pub mod simulation;
pub mod state;

#[cfg(any(test, feature = "stubs"))]
pub mod stubs;

#[cfg(test)]
mod tests;

// Re-exports
pub use apply::{apply_block_logs, apply_event};
pub use compare::compare_pool_state;
pub use error::EventApplyError;
pub use quote::{CrossedTick, SwapQuote, quote_swap};
pub use simulation::{
    MAX_PRICING_COMPUTATION_STEPS_ALLOWED, OutputResult, SwapSide, get_outputs, query_outputs,
};
pub use state::{GlobalState, PoolFee, PoolSnapshot, PoolState, ProtocolFee};
