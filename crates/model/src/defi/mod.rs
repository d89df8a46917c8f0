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

//! Concentrated-liquidity pool domain: math kernels, the tick index, decoded events, pool
//! state and the swap simulation that prices against it.

pub mod data;
pub mod pool_analysis;
pub mod tick_map;
pub mod variant;

// Re-exports
pub use data::{BlockHeader, LogPosition, PoolEvent, PoolLog};
pub use pool_analysis::{PoolSnapshot, PoolState};
pub use variant::{FeeLayout, PoolVariant, ProtocolFeeKind, VariantConfig};
