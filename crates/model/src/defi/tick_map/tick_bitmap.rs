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

use std::{collections::BTreeMap, ops::RangeInclusive};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    bit_math::{least_significant_bit, most_significant_bit},
    tick_math::bound_tick,
};

/// Calculate word position and bit position for the target (compressed) tick.
#[must_use]
pub const fn tick_position(tick: i32) -> (i16, u8) {
    let word_pos = (tick >> 8) as i16;
    let bit_pos = (tick & 0xFF) as u8;
    (word_pos, bit_pos)
}

/// Divides `tick` by the spacing rounding toward negative infinity, or returns it unchanged
/// when the bitmap indexes raw ticks.
#[must_use]
pub const fn compress_tick(tick: i32, tick_spacing: Option<i32>) -> i32 {
    match tick_spacing {
        Some(spacing) => {
            let compressed = tick / spacing;
            if tick < 0 && tick % spacing != 0 {
                compressed - 1
            } else {
                compressed
            }
        }
        None => tick,
    }
}

/// Distance in words from the anchor that each kind of access may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickWindow {
    /// Words fetched on each side of the anchor at bootstrap.
    pub fetch_radius: i16,
    /// Words reachable by state transitions (toggles and event replays).
    pub state_radius: i16,
    /// Words reachable by pricing queries.
    pub price_query_radius: i16,
}

impl TickWindow {
    pub const DEFAULT_FETCH_RADIUS: i16 = 12;
    pub const DEFAULT_STATE_RADIUS: i16 = 8;
    pub const DEFAULT_PRICE_QUERY_RADIUS: i16 = 12;

    #[must_use]
    pub const fn new(fetch_radius: i16, state_radius: i16, price_query_radius: i16) -> Self {
        Self {
            fetch_radius,
            state_radius,
            price_query_radius,
        }
    }
}

impl Default for TickWindow {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_FETCH_RADIUS,
            Self::DEFAULT_STATE_RADIUS,
            Self::DEFAULT_PRICE_QUERY_RADIUS,
        )
    }
}

/// Which window applies to a bitmap access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapQuery {
    /// Event application and tick toggles.
    State,
    /// Swap simulation, which inspects a wider neighbourhood.
    Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickBitmapError {
    #[error("Bitmap word {word} is outside the safe window of {radius} words around anchor {anchor}")]
    OutOfRange { word: i16, anchor: i16, radius: i16 },
    #[error("Tick {tick} is not a multiple of tick spacing {tick_spacing}")]
    TickMisaligned { tick: i32, tick_spacing: i32 },
}

/// Sparse tick bitmap bounded to a window of words around an anchor.
///
/// Only non-zero words are stored, and every lookup outside the window fails instead of
/// treating an unfetched word as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickBitmap {
    /// Mapping of word positions to bitmap words (256 bits each).
    words: BTreeMap<i16, U256>,
    /// Word position the window is centred on.
    start_tick_bitmap: i16,
    window: TickWindow,
}

impl TickBitmap {
    /// Creates an empty bitmap anchored at `start_tick_bitmap`.
    #[must_use]
    pub fn new(start_tick_bitmap: i16, window: TickWindow) -> Self {
        Self {
            words: BTreeMap::new(),
            start_tick_bitmap,
            window,
        }
    }

    #[must_use]
    pub const fn start_tick_bitmap(&self) -> i16 {
        self.start_tick_bitmap
    }

    #[must_use]
    pub const fn window(&self) -> TickWindow {
        self.window
    }

    /// Word positions fetched at bootstrap around the anchor.
    #[must_use]
    pub fn fetch_range(&self) -> RangeInclusive<i16> {
        let radius = self.window.fetch_radius;
        self.start_tick_bitmap.saturating_sub(radius)..=self.start_tick_bitmap.saturating_add(radius)
    }

    /// Ensures `word` lies within the window permitted for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`TickBitmapError::OutOfRange`] if the word is too far from the anchor.
    pub fn check_word(&self, word: i16, query: BitmapQuery) -> Result<(), TickBitmapError> {
        let radius = match query {
            BitmapQuery::State => self.window.state_radius,
            BitmapQuery::Price => self.window.price_query_radius,
        };

        if (i32::from(word) - i32::from(self.start_tick_bitmap)).abs() > i32::from(radius) {
            return Err(TickBitmapError::OutOfRange {
                word,
                anchor: self.start_tick_bitmap,
                radius,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn word(&self, word_pos: i16) -> U256 {
        self.words.get(&word_pos).copied().unwrap_or(U256::ZERO)
    }

    /// Replaces a whole word, as when loading fetched state.
    pub fn set_word(&mut self, word_pos: i16, value: U256) {
        if value.is_zero() {
            self.words.remove(&word_pos);
        } else {
            self.words.insert(word_pos, value);
        }
    }

    /// Iterates the stored (non-zero) words in ascending position.
    pub fn words(&self) -> impl Iterator<Item = (i16, U256)> + '_ {
        self.words.iter().map(|(pos, word)| (*pos, *word))
    }

    /// Flips the initialized state of `tick`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick is not aligned to the spacing, or its word lies outside
    /// the state window.
    pub fn toggle_tick(
        &mut self,
        tick: i32,
        tick_spacing: Option<i32>,
    ) -> Result<(), TickBitmapError> {
        if let Some(spacing) = tick_spacing
            && tick % spacing != 0
        {
            return Err(TickBitmapError::TickMisaligned {
                tick,
                tick_spacing: spacing,
            });
        }

        let (word_pos, bit_pos) = tick_position(compress_tick(tick, tick_spacing));
        self.check_word(word_pos, BitmapQuery::State)?;

        let word = self.word(word_pos) ^ (U256::ONE << bit_pos);
        self.set_word(word_pos, word);
        Ok(())
    }

    /// Check if a tick is initialized (bit is set) in the bitmap.
    #[must_use]
    pub fn is_initialized(&self, tick: i32, tick_spacing: Option<i32>) -> bool {
        let (word_pos, bit_pos) = tick_position(compress_tick(tick, tick_spacing));
        self.word(word_pos).bit(bit_pos as usize)
    }

    /// Returns the next initialized tick contained in the same word (or adjacent word) as the
    /// tick that is either to the left (less than or equal to) or right (greater than) of the
    /// given tick, and whether it is initialized.
    ///
    /// When nothing is set the word boundary is returned with `false`. Results are in raw tick
    /// units and are not clamped to the tick bounds.
    ///
    /// # Errors
    ///
    /// Returns [`TickBitmapError::OutOfRange`] if the word to scan lies outside the window for
    /// `query`.
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        lte: bool,
        query: BitmapQuery,
        tick_spacing: Option<i32>,
    ) -> Result<(i32, bool), TickBitmapError> {
        let compressed = compress_tick(tick, tick_spacing);
        let spacing = tick_spacing.unwrap_or(1);

        if lte {
            let (word_pos, bit_pos) = tick_position(compressed);
            self.check_word(word_pos, query)?;

            // all the 1s at or to the right of the current bit_pos
            let mask = (U256::ONE << bit_pos) - U256::ONE + (U256::ONE << bit_pos);
            let masked = self.word(word_pos) & mask;

            // if there are no initialized ticks to the right of or at the current tick, return rightmost in the word
            Ok(match most_significant_bit(masked) {
                Ok(msb) => (
                    (compressed - i32::from(bit_pos) + i32::from(msb)) * spacing,
                    true,
                ),
                Err(_) => ((compressed - i32::from(bit_pos)) * spacing, false),
            })
        } else {
            // start from the word of the next tick, since the current tick state doesn't matter
            let (word_pos, bit_pos) = tick_position(compressed + 1);
            self.check_word(word_pos, query)?;

            // all the 1s at or to the left of the bit_pos
            let mask = !((U256::ONE << bit_pos) - U256::ONE);
            let masked = self.word(word_pos) & mask;

            // if there are no initialized ticks to the left of the current tick, return leftmost in the word
            Ok(match least_significant_bit(masked) {
                Ok(lsb) => (
                    (compressed + 1 + i32::from(lsb) - i32::from(bit_pos)) * spacing,
                    true,
                ),
                Err(_) => (
                    (compressed + 1 + i32::from(u8::MAX) - i32::from(bit_pos)) * spacing,
                    false,
                ),
            })
        }
    }

    /// Expands every set bit into its raw tick, clamped to the tick bounds.
    #[must_use]
    pub fn initialized_ticks(&self, tick_spacing: Option<i32>) -> Vec<i32> {
        let spacing = tick_spacing.unwrap_or(1);
        self.words
            .iter()
            .flat_map(|(word_pos, word)| {
                (0..256usize)
                    .filter(move |bit| word.bit(*bit))
                    .map(move |bit| bound_tick(i32::from(*word_pos) * 256 + bit as i32, spacing))
            })
            .collect()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
