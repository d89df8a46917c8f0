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

//! Block-versioned pool state tracking.
//!
//! A [`PoolStateStore`] owns one pool's snapshot history and is the only writer of it. The
//! [`PoolRegistry`] maps pool keys to stores, serializes writers per pool and publishes the
//! latest snapshot for lock-free readers.

pub mod pool;
pub mod registry;

// Re-exports
pub use pool::PoolStateStore;
pub use registry::PoolRegistry;
