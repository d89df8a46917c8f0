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

//! Protocol variants sharing the concentrated-liquidity engine.
//!
//! Variants differ only in data (fee layout, protocol fee encoding, tick storage and spacing
//! rules, bitmap window), so the engine is parameterized by a [`VariantConfig`] rather than
//! specialized per protocol.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::defi::tick_map::TickWindow;

/// Concentrated-liquidity protocol families with distinct global state shapes.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PoolVariant {
    UniswapV3,
    PancakeSwapV3,
    AlgebraV1,
    AlgebraIntegral,
    AlgebraDirectionalFee,
}

/// Whether the pool charges one fee or a fee per swap direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeLayout {
    Single,
    Directional,
}

/// How the protocol (community) share of swap fees is encoded and applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolFeeKind {
    /// Two 4-bit denominators packed in one byte; the cut is `fee / share`.
    Packed4Bit,
    /// Two 16-bit basis point shares packed in 32 bits; the cut is `fee * share / 10_000`.
    Packed16BitBasisPoints,
    /// Per-token community fee in thousandths; the cut is `fee * share / 1_000`.
    PerMille,
}

impl ProtocolFeeKind {
    /// Extracts the share for one swap direction from a packed value.
    #[must_use]
    pub const fn unpack(self, packed: u32, zero_for_one: bool) -> u32 {
        match self {
            Self::Packed4Bit => {
                if zero_for_one {
                    packed % 16
                } else {
                    packed >> 4
                }
            }
            Self::Packed16BitBasisPoints | Self::PerMille => {
                if zero_for_one {
                    packed % 65_536
                } else {
                    packed >> 16
                }
            }
        }
    }

    /// Packs per-token shares as the pool stores them after `setFeeProtocol`.
    #[must_use]
    pub const fn pack(self, share0: u32, share1: u32) -> u32 {
        match self {
            Self::Packed4Bit => share0 + (share1 << 4),
            Self::Packed16BitBasisPoints | Self::PerMille => share0 + (share1 << 16),
        }
    }

    /// Returns the protocol cut of `fee_amount` for the given share.
    ///
    /// The multiplication wraps like the contracts' unchecked arithmetic.
    #[must_use]
    pub fn cut(self, fee_amount: U256, share: u32) -> U256 {
        if share == 0 {
            return U256::ZERO;
        }
        match self {
            Self::Packed4Bit => fee_amount / U256::from(share),
            Self::Packed16BitBasisPoints => {
                fee_amount.wrapping_mul(U256::from(share)) / U256::from(10_000u32)
            }
            Self::PerMille => fee_amount.wrapping_mul(U256::from(share)) / U256::from(1_000u32),
        }
    }
}

/// Per-variant behaviour carried as data on every pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantConfig {
    pub fee_layout: FeeLayout,
    pub protocol_fee: ProtocolFeeKind,
    /// Whether the bitmap is indexed by `tick / tick_spacing` rather than raw ticks.
    pub ticks_compressed: bool,
    /// Whether `TickSpacing` events may change the spacing after deployment.
    pub dynamic_tick_spacing: bool,
    pub window: TickWindow,
}

impl PoolVariant {
    /// Returns the engine configuration for this variant.
    #[must_use]
    pub fn config(self) -> VariantConfig {
        // Raw-tick bitmaps cover `tick_spacing` times fewer ticks per word
        let raw_window = TickWindow::new(24, 16, 24);

        match self {
            Self::UniswapV3 => VariantConfig {
                fee_layout: FeeLayout::Single,
                protocol_fee: ProtocolFeeKind::Packed4Bit,
                ticks_compressed: true,
                dynamic_tick_spacing: false,
                window: TickWindow::default(),
            },
            Self::PancakeSwapV3 => VariantConfig {
                fee_layout: FeeLayout::Single,
                protocol_fee: ProtocolFeeKind::Packed16BitBasisPoints,
                ticks_compressed: true,
                dynamic_tick_spacing: false,
                window: TickWindow::default(),
            },
            Self::AlgebraV1 => VariantConfig {
                fee_layout: FeeLayout::Single,
                protocol_fee: ProtocolFeeKind::PerMille,
                ticks_compressed: true,
                dynamic_tick_spacing: false,
                window: TickWindow::default(),
            },
            Self::AlgebraIntegral => VariantConfig {
                fee_layout: FeeLayout::Single,
                protocol_fee: ProtocolFeeKind::PerMille,
                ticks_compressed: false,
                dynamic_tick_spacing: true,
                window: raw_window,
            },
            Self::AlgebraDirectionalFee => VariantConfig {
                fee_layout: FeeLayout::Directional,
                protocol_fee: ProtocolFeeKind::PerMille,
                ticks_compressed: false,
                dynamic_tick_spacing: true,
                window: raw_window,
            },
        }
    }

    /// Returns `true` for the Algebra family, whose contracts share the `globalState` shape.
    #[must_use]
    pub const fn is_algebra(self) -> bool {
        matches!(
            self,
            Self::AlgebraV1 | Self::AlgebraIntegral | Self::AlgebraDirectionalFee
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    fn test_variant_names_round_trip() {
        for variant in PoolVariant::iter() {
            let name = variant.to_string();
            assert_eq!(PoolVariant::from_str(&name).unwrap(), variant);
        }
        assert_eq!(PoolVariant::PancakeSwapV3.to_string(), "pancake_swap_v3");
    }

    #[rstest]
    fn test_only_raw_tick_variants_have_dynamic_spacing() {
        for variant in PoolVariant::iter() {
            let config = variant.config();
            assert_eq!(config.dynamic_tick_spacing, !config.ticks_compressed);
        }
    }

    #[rstest]
    #[case(ProtocolFeeKind::Packed4Bit, 4, 5, true, 4)]
    #[case(ProtocolFeeKind::Packed4Bit, 4, 5, false, 5)]
    #[case(ProtocolFeeKind::Packed16BitBasisPoints, 3_200, 3_300, true, 3_200)]
    #[case(ProtocolFeeKind::Packed16BitBasisPoints, 3_200, 3_300, false, 3_300)]
    fn test_pack_then_unpack(
        #[case] kind: ProtocolFeeKind,
        #[case] share0: u32,
        #[case] share1: u32,
        #[case] zero_for_one: bool,
        #[case] expected: u32,
    ) {
        assert_eq!(kind.unpack(kind.pack(share0, share1), zero_for_one), expected);
    }

    #[rstest]
    #[case(ProtocolFeeKind::Packed4Bit, 1_000, 4, 250)]
    #[case(ProtocolFeeKind::Packed4Bit, 1_000, 0, 0)]
    #[case(ProtocolFeeKind::Packed16BitBasisPoints, 1_000, 3_200, 320)]
    #[case(ProtocolFeeKind::PerMille, 1_000, 150, 150)]
    fn test_protocol_cut(
        #[case] kind: ProtocolFeeKind,
        #[case] fee: u64,
        #[case] share: u32,
        #[case] expected: u64,
    ) {
        assert_eq!(kind.cut(U256::from(fee), share), U256::from(expected));
    }
}
