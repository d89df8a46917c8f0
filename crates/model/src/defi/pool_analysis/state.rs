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

use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use alloy_primitives::{Address, U160, U256};
use serde::{Deserialize, Serialize};

use crate::defi::{
    data::{BlockHeader, LogPosition},
    tick_map::{
        TickBitmap, TickInfo,
        tick_bitmap::{compress_tick, tick_position},
    },
    variant::{FeeLayout, PoolVariant, ProtocolFeeKind, VariantConfig},
};

/// The swap fee in hundredths of a basis point, single or per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolFee {
    Single(u32),
    Directional { zero_for_one: u32, one_for_zero: u32 },
}

impl PoolFee {
    /// Returns the fee charged on a swap in the given direction.
    #[must_use]
    pub const fn for_direction(&self, zero_for_one: bool) -> u32 {
        match self {
            Self::Single(fee) => *fee,
            Self::Directional {
                zero_for_one: fee_zero_for_one,
                one_for_zero,
            } => {
                if zero_for_one {
                    *fee_zero_for_one
                } else {
                    *one_for_zero
                }
            }
        }
    }
}

/// The protocol (community) share of swap fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolFee {
    /// Both directions packed in one integer, as in `slot0.feeProtocol`.
    Packed(u32),
    /// Separate shares per input token, as in Algebra's `communityFeeToken0/1`.
    Community { token0: u16, token1: u16 },
}

impl ProtocolFee {
    /// Returns the share applying to fees paid in the input token of the given direction.
    #[must_use]
    pub const fn share_for_direction(&self, zero_for_one: bool, kind: ProtocolFeeKind) -> u32 {
        match self {
            Self::Packed(packed) => kind.unpack(*packed, zero_for_one),
            Self::Community { token0, token1 } => {
                if zero_for_one {
                    *token0 as u32
                } else {
                    *token1 as u32
                }
            }
        }
    }

    /// Returns the protocol cut of a swap step's fee.
    #[must_use]
    pub fn apply(&self, fee_amount: U256, zero_for_one: bool, kind: ProtocolFeeKind) -> U256 {
        kind.cut(fee_amount, self.share_for_direction(zero_for_one, kind))
    }
}

/// Price, tick and fee configuration of a pool (`slot0` or `globalState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalState {
    /// Current sqrt price as a Q64.96 number.
    pub sqrt_price_x96: U160,
    pub tick: i32,
    pub fee: PoolFee,
    pub protocol_fee: ProtocolFee,
}

impl GlobalState {
    #[must_use]
    pub const fn new(sqrt_price_x96: U160, tick: i32, fee: PoolFee, protocol_fee: ProtocolFee) -> Self {
        Self {
            sqrt_price_x96,
            tick,
            fee,
            protocol_fee,
        }
    }
}

/// Complete mirrored state of one pool at one block.
///
/// A state is created by a bootstrap, advanced one decoded event at a time, and discarded
/// for a fresh bootstrap once `is_valid` turns false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub pool: Address,
    pub variant: PoolVariant,
    /// Timestamp of the last block applied, in seconds.
    pub block_timestamp: u64,
    pub tick_spacing: i32,
    pub global_state: GlobalState,
    /// Active liquidity at the current tick.
    pub liquidity: u128,
    pub max_liquidity_per_tick: u128,
    pub tick_bitmap: TickBitmap,
    /// Tick records keyed by raw tick.
    pub ticks: BTreeMap<i32, TickInfo>,
    /// Token balances tracked from event deltas, not read from the chain.
    pub balance0: U256,
    pub balance1: U256,
    pub fee_growth_global_0_x128: U256,
    pub fee_growth_global_1_x128: U256,
    pub protocol_fees_token0: U256,
    pub protocol_fees_token1: U256,
    /// Sticky until the state is replaced by a resync.
    pub is_valid: bool,
    /// Whether the bitmap is indexed by `tick / tick_spacing`.
    pub ticks_compressed: bool,
    /// Position of the last log applied, used to skip duplicate deliveries.
    #[serde(default)]
    pub last_applied: Option<LogPosition>,
}

impl PoolState {
    /// Creates a valid state with empty tick data, anchoring the bitmap window on the
    /// current tick.
    #[must_use]
    pub fn new(
        pool: Address,
        variant: PoolVariant,
        tick_spacing: i32,
        global_state: GlobalState,
        liquidity: u128,
        max_liquidity_per_tick: u128,
    ) -> Self {
        let config = variant.config();
        let anchor = Self::anchor_for_tick(global_state.tick, tick_spacing, config.ticks_compressed);

        Self {
            pool,
            variant,
            block_timestamp: 0,
            tick_spacing,
            global_state,
            liquidity,
            max_liquidity_per_tick,
            tick_bitmap: TickBitmap::new(anchor, config.window),
            ticks: BTreeMap::new(),
            balance0: U256::ZERO,
            balance1: U256::ZERO,
            fee_growth_global_0_x128: U256::ZERO,
            fee_growth_global_1_x128: U256::ZERO,
            protocol_fees_token0: U256::ZERO,
            protocol_fees_token1: U256::ZERO,
            is_valid: true,
            ticks_compressed: config.ticks_compressed,
            last_applied: None,
        }
    }

    /// Returns the bitmap word containing `tick`, the anchor of a freshly fetched window.
    #[must_use]
    pub const fn anchor_for_tick(tick: i32, tick_spacing: i32, ticks_compressed: bool) -> i16 {
        let spacing = if ticks_compressed {
            Some(tick_spacing)
        } else {
            None
        };
        tick_position(compress_tick(tick, spacing)).0
    }

    #[must_use]
    pub fn config(&self) -> VariantConfig {
        self.variant.config()
    }

    /// The spacing to pass to bitmap operations: `Some` when the bitmap is compressed.
    #[must_use]
    pub const fn bitmap_spacing(&self) -> Option<i32> {
        if self.ticks_compressed {
            Some(self.tick_spacing)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn sqrt_price_x96(&self) -> U160 {
        self.global_state.sqrt_price_x96
    }

    #[must_use]
    pub const fn tick(&self) -> i32 {
        self.global_state.tick
    }

    /// Returns the swap fee for a direction, honouring the variant's fee layout.
    #[must_use]
    pub fn fee_for_direction(&self, zero_for_one: bool) -> u32 {
        match self.config().fee_layout {
            FeeLayout::Single => self.global_state.fee.for_direction(true),
            FeeLayout::Directional => self.global_state.fee.for_direction(zero_for_one),
        }
    }

    /// Returns the stored record for `tick`, or an uninitialized one.
    #[must_use]
    pub fn tick_info(&self, tick: i32) -> TickInfo {
        self.ticks.get(&tick).copied().unwrap_or_default()
    }

    /// Loads a fetched tick record, setting its bitmap bit when initialized.
    ///
    /// Bootstrap loads whole words separately, so this only touches the tick map.
    pub fn insert_tick(&mut self, tick: i32, info: TickInfo) {
        if info.initialized || info.liquidity_gross > 0 {
            self.ticks.insert(tick, info);
        } else {
            self.ticks.remove(&tick);
        }
    }

    #[must_use]
    pub fn initialized_tick_count(&self) -> usize {
        self.ticks.values().filter(|info| info.initialized).count()
    }

    /// Marks the state as no longer trustworthy.
    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }

    /// Checks that the bitmap and the tick map agree: a bit is set iff its tick is initialized.
    ///
    /// # Errors
    ///
    /// Returns a description of the first disagreement.
    pub fn check_consistency(&self) -> Result<(), String> {
        let spacing = self.bitmap_spacing();
        let bitmap_ticks = self.tick_bitmap.initialized_ticks(spacing);

        for tick in &bitmap_ticks {
            if !self.tick_info(*tick).initialized {
                return Err(format!("Bitmap bit set for uninitialized tick {tick}"));
            }
        }
        for (tick, info) in &self.ticks {
            if info.initialized && !self.tick_bitmap.is_initialized(*tick, spacing) {
                return Err(format!("Tick {tick} is initialized but its bitmap bit is clear"));
            }
        }
        Ok(())
    }
}

impl Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PoolState(pool={}, variant={}, tick={}, liquidity={}, valid={})",
            self.pool, self.variant, self.global_state.tick, self.liquidity, self.is_valid
        )
    }
}

/// An immutable, block-versioned pool state as published to readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub state: Arc<PoolState>,
    pub header: BlockHeader,
}

impl PoolSnapshot {
    #[must_use]
    pub fn new(state: PoolState, header: BlockHeader) -> Self {
        Self {
            state: Arc::new(state),
            header,
        }
    }

    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.header.number
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state.is_valid
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::defi::tick_map::{full_math::Q96_U160, tick_math::get_sqrt_ratio_at_tick};

    #[rstest]
    fn test_fee_for_direction_follows_layout() {
        let fee = PoolFee::Directional {
            zero_for_one: 100,
            one_for_zero: 300,
        };
        let global = GlobalState::new(Q96_U160, 0, fee, ProtocolFee::Community { token0: 0, token1: 0 });

        let directional =
            PoolState::new(Address::ZERO, PoolVariant::AlgebraDirectionalFee, 60, global, 0, 0);
        assert_eq!(directional.fee_for_direction(true), 100);
        assert_eq!(directional.fee_for_direction(false), 300);

        let single = PoolState::new(
            Address::ZERO,
            PoolVariant::UniswapV3,
            60,
            GlobalState::new(Q96_U160, 0, PoolFee::Single(3000), ProtocolFee::Packed(0)),
            0,
            0,
        );
        assert_eq!(single.fee_for_direction(true), 3000);
        assert_eq!(single.fee_for_direction(false), 3000);
    }

    #[rstest]
    #[case(ProtocolFee::Packed(4 + (5 << 4)), ProtocolFeeKind::Packed4Bit, 4, 5)]
    #[case(ProtocolFee::Packed(3_200 + (3_300 << 16)), ProtocolFeeKind::Packed16BitBasisPoints, 3_200, 3_300)]
    #[case(ProtocolFee::Community { token0: 100, token1: 250 }, ProtocolFeeKind::PerMille, 100, 250)]
    fn test_protocol_fee_share(
        #[case] fee: ProtocolFee,
        #[case] kind: ProtocolFeeKind,
        #[case] share0: u32,
        #[case] share1: u32,
    ) {
        assert_eq!(fee.share_for_direction(true, kind), share0);
        assert_eq!(fee.share_for_direction(false, kind), share1);
    }

    #[rstest]
    #[case(0, 60, true, 0)]
    #[case(-1, 60, true, -1)]
    #[case(15_360, 60, true, 1)]
    #[case(-15_361, 60, true, -2)]
    #[case(15_360, 60, false, 60)]
    fn test_anchor_for_tick(
        #[case] tick: i32,
        #[case] spacing: i32,
        #[case] compressed: bool,
        #[case] expected: i16,
    ) {
        assert_eq!(PoolState::anchor_for_tick(tick, spacing, compressed), expected);
    }

    #[rstest]
    fn test_new_state_anchors_window_on_current_tick() {
        let tick = 20_000;
        let global = GlobalState::new(
            get_sqrt_ratio_at_tick(tick).unwrap(),
            tick,
            PoolFee::Single(500),
            ProtocolFee::Packed(0),
        );
        let state = PoolState::new(Address::ZERO, PoolVariant::UniswapV3, 10, global, 1, 1);

        assert_eq!(state.tick_bitmap.start_tick_bitmap(), 7);
        assert!(state.is_valid);
        assert!(state.ticks_compressed);
        assert_eq!(state.bitmap_spacing(), Some(10));
    }

    #[rstest]
    fn test_consistency_detects_orphan_bits() {
        let global = GlobalState::new(Q96_U160, 0, PoolFee::Single(500), ProtocolFee::Packed(0));
        let mut state = PoolState::new(Address::ZERO, PoolVariant::UniswapV3, 10, global, 0, 0);
        assert!(state.check_consistency().is_ok());

        state.tick_bitmap.toggle_tick(10, Some(10)).unwrap();
        assert!(state.check_consistency().is_err());

        state.insert_tick(10, TickInfo::new(5, 5, U256::ZERO, U256::ZERO, true));
        assert!(state.check_consistency().is_ok());
    }

    #[rstest]
    fn test_serde_round_trip_preserves_ticks_and_bitmap() {
        let global = GlobalState::new(
            get_sqrt_ratio_at_tick(-120).unwrap(),
            -120,
            PoolFee::Single(3000),
            ProtocolFee::Packed(0x44),
        );
        let mut state = PoolState::new(Address::ZERO, PoolVariant::UniswapV3, 60, global, 7, 0);
        state.tick_bitmap.toggle_tick(-180, Some(60)).unwrap();
        state.insert_tick(-180, TickInfo::new(7, 7, U256::ZERO, U256::ZERO, true));
        state.balance0 = U256::from(12_345u64);

        let json = serde_json::to_string(&state).unwrap();
        let decoded: PoolState = serde_json::from_str(&json).unwrap();

        pretty_assertions::assert_eq!(decoded, state);
    }
}
