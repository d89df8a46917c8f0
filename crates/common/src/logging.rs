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

//! Tracing setup for binaries and tests.

use std::env;

use tracing_subscriber::EnvFilter;

pub const RECV: &str = "<--";
pub const SEND: &str = "-->";
pub const RES: &str = "[RES]";

/// Initialize tracing.
///
/// Filtering is configured through the `RUST_LOG` environment variable, for example
/// `RUST_LOG=clmm_blockchain=debug,clmm_model=warn`. When `RUST_LOG` is not set nothing is
/// installed and the call is a no-op.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or the filter is invalid.
pub fn init_tracing() -> anyhow::Result<()> {
    // Skip tracing initialization if `RUST_LOG` is not set
    if let Ok(v) = env::var("RUST_LOG") {
        let env_filter = EnvFilter::try_new(&v)
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG filter '{v}': {e}"))?;

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))?;

        tracing::info!("Initialized tracing logs with RUST_LOG={v}");
    }
    Ok(())
}
