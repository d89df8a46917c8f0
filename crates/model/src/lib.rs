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

//! Pure domain model for mirroring concentrated-liquidity AMM pools off-chain.
//!
//! The `clmm-model` crate holds everything that does not perform I/O:
//!
//! - Fixed-point math kernels replicating the pool contracts bit for bit.
//! - A windowed tick bitmap that fails explicitly outside its fetched range.
//! - Decoded pool events and the pure state transitions applying them.
//! - Swap simulation over immutable pool snapshots.
//!
//! # Feature flags
//!
//! - `stubs`: Enables pool state stubs and fixtures for testing.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod defi;
