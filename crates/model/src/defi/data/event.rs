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

use alloy_primitives::{Address, I256, U160, U256};
use serde::{Deserialize, Serialize};

/// A decoded pool contract event.
///
/// Variant names match the contract event names, which is what dispatch and logging use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PoolEvent {
    Swap {
        amount0: I256,
        amount1: I256,
        sqrt_price_x96: U160,
        liquidity: u128,
        tick: i32,
    },
    Mint {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        amount0: U256,
        amount1: U256,
    },
    Burn {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        amount0: U256,
        amount1: U256,
    },
    Collect {
        owner: Address,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount0: u128,
        amount1: u128,
    },
    Flash {
        amount0: U256,
        amount1: U256,
        paid0: U256,
        paid1: U256,
    },
    SetFeeProtocol {
        fee_protocol0_new: u32,
        fee_protocol1_new: u32,
    },
    CollectProtocol {
        amount0: u128,
        amount1: u128,
    },
    Fee {
        fee: u32,
    },
    DirectionalFee {
        zero_for_one: u32,
        one_for_zero: u32,
    },
    CommunityFee {
        token0: u16,
        token1: u16,
    },
    TickSpacing {
        tick_spacing: i32,
    },
}

/// Position of a log in the chain, used to order and de-duplicate deliveries.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LogPosition {
    pub block_number: u64,
    pub transaction_index: u32,
    pub log_index: u32,
}

impl LogPosition {
    #[must_use]
    pub const fn new(block_number: u64, transaction_index: u32, log_index: u32) -> Self {
        Self {
            block_number,
            transaction_index,
            log_index,
        }
    }
}

impl Display for LogPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.block_number, self.transaction_index, self.log_index
        )
    }
}

/// A decoded event together with its position in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLog {
    pub event: PoolEvent,
    pub position: LogPosition,
}

impl PoolLog {
    #[must_use]
    pub const fn new(event: PoolEvent, position: LogPosition) -> Self {
        Self { event, position }
    }
}

impl Display for PoolLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.event, self.position)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
