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

use thiserror::Error;

use crate::defi::tick_map::{MathError, TickBitmapError};

/// Failure while applying an event to, or simulating a swap against, a pool state.
///
/// Either class leaves the state invalid. They differ in what they say about the mirror:
/// an out-of-range bitmap access is an expected consequence of the price drifting away
/// from the fetched window, anything else means the local copy disagrees with the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventApplyError {
    #[error("Bitmap access outside the fetched window: {0}")]
    OutOfRangeBitmap(TickBitmapError),
    #[error("Invariant violation: {0}")]
    Invariant(String),
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl EventApplyError {
    /// Returns `true` if the error is the expected out-of-window condition.
    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRangeBitmap(_))
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}

impl From<TickBitmapError> for EventApplyError {
    fn from(error: TickBitmapError) -> Self {
        match error {
            TickBitmapError::OutOfRange { .. } => Self::OutOfRangeBitmap(error),
            TickBitmapError::TickMisaligned { .. } => Self::Invariant(error.to_string()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
