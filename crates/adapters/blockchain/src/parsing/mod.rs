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

//! Decoding of raw pool logs into [`PoolEvent`]s.
//!
//! Uniswap V3 and the Algebra family share the signatures of their position and flash
//! events, so one set of bindings serves both. Fee configuration events differ per variant.

use alloy::{
    primitives::B256,
    sol,
    sol_types::SolEvent,
};
use clmm_model::defi::{PoolEvent, PoolLog, PoolVariant};

use crate::rpc::types::RawLog;

sol! {
    interface PoolEvents {
        event Swap(
            address indexed sender,
            address indexed recipient,
            int256 amount0,
            int256 amount1,
            uint160 sqrtPriceX96,
            uint128 liquidity,
            int24 tick
        );
        event Mint(
            address sender,
            address indexed owner,
            int24 indexed tickLower,
            int24 indexed tickUpper,
            uint128 amount,
            uint256 amount0,
            uint256 amount1
        );
        event Burn(
            address indexed owner,
            int24 indexed tickLower,
            int24 indexed tickUpper,
            uint128 amount,
            uint256 amount0,
            uint256 amount1
        );
        event Collect(
            address indexed owner,
            address recipient,
            int24 indexed tickLower,
            int24 indexed tickUpper,
            uint128 amount0,
            uint128 amount1
        );
        event Flash(
            address indexed sender,
            address indexed recipient,
            uint256 amount0,
            uint256 amount1,
            uint256 paid0,
            uint256 paid1
        );
    }
}

sol! {
    interface UniswapV3Events {
        event SetFeeProtocol(
            uint8 feeProtocol0Old,
            uint8 feeProtocol1Old,
            uint8 feeProtocol0New,
            uint8 feeProtocol1New
        );
        event CollectProtocol(
            address indexed sender,
            address indexed recipient,
            uint128 amount0,
            uint128 amount1
        );
    }
}

sol! {
    interface PancakeV3Events {
        event Swap(
            address indexed sender,
            address indexed recipient,
            int256 amount0,
            int256 amount1,
            uint160 sqrtPriceX96,
            uint128 liquidity,
            int24 tick,
            uint128 protocolFeesToken0,
            uint128 protocolFeesToken1
        );
        event SetFeeProtocol(
            uint32 feeProtocol0Old,
            uint32 feeProtocol1Old,
            uint32 feeProtocol0New,
            uint32 feeProtocol1New
        );
    }
}

sol! {
    interface AlgebraEvents {
        event Fee(uint16 fee);
        event CommunityFee(uint8 communityFee0New, uint8 communityFee1New);
        event TickSpacing(int24 newTickSpacing);
    }
}

sol! {
    interface AlgebraIntegralEvents {
        event CommunityFee(uint16 communityFeeNew);
    }
}

sol! {
    interface AlgebraDirectionalEvents {
        event Fee(uint16 feeZto, uint16 feeOtz);
    }
}

fn decode<E: SolEvent>(log: &RawLog) -> anyhow::Result<E> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data).map_err(|e| {
        anyhow::anyhow!(
            "Failed to decode {} log at {} from {}: {e}",
            E::SIGNATURE,
            log.position(),
            log.address
        )
    })
}

fn decode_common(topic0: B256, log: &RawLog) -> anyhow::Result<Option<PoolEvent>> {
    let event = match topic0 {
        hash if hash == PoolEvents::Swap::SIGNATURE_HASH => {
            let e = decode::<PoolEvents::Swap>(log)?;
            PoolEvent::Swap {
                amount0: e.amount0,
                amount1: e.amount1,
                sqrt_price_x96: e.sqrtPriceX96,
                liquidity: e.liquidity,
                tick: e.tick.as_i32(),
            }
        }
        hash if hash == PoolEvents::Mint::SIGNATURE_HASH => {
            let e = decode::<PoolEvents::Mint>(log)?;
            PoolEvent::Mint {
                owner: e.owner,
                tick_lower: e.tickLower.as_i32(),
                tick_upper: e.tickUpper.as_i32(),
                amount: e.amount,
                amount0: e.amount0,
                amount1: e.amount1,
            }
        }
        hash if hash == PoolEvents::Burn::SIGNATURE_HASH => {
            let e = decode::<PoolEvents::Burn>(log)?;
            PoolEvent::Burn {
                owner: e.owner,
                tick_lower: e.tickLower.as_i32(),
                tick_upper: e.tickUpper.as_i32(),
                amount: e.amount,
                amount0: e.amount0,
                amount1: e.amount1,
            }
        }
        hash if hash == PoolEvents::Collect::SIGNATURE_HASH => {
            let e = decode::<PoolEvents::Collect>(log)?;
            PoolEvent::Collect {
                owner: e.owner,
                recipient: e.recipient,
                tick_lower: e.tickLower.as_i32(),
                tick_upper: e.tickUpper.as_i32(),
                amount0: e.amount0,
                amount1: e.amount1,
            }
        }
        hash if hash == PoolEvents::Flash::SIGNATURE_HASH => {
            let e = decode::<PoolEvents::Flash>(log)?;
            PoolEvent::Flash {
                amount0: e.amount0,
                amount1: e.amount1,
                paid0: e.paid0,
                paid1: e.paid1,
            }
        }
        hash if hash == UniswapV3Events::CollectProtocol::SIGNATURE_HASH => {
            let e = decode::<UniswapV3Events::CollectProtocol>(log)?;
            PoolEvent::CollectProtocol {
                amount0: e.amount0,
                amount1: e.amount1,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

fn decode_uniswap(topic0: B256, log: &RawLog) -> anyhow::Result<Option<PoolEvent>> {
    if topic0 == UniswapV3Events::SetFeeProtocol::SIGNATURE_HASH {
        let e = decode::<UniswapV3Events::SetFeeProtocol>(log)?;
        return Ok(Some(PoolEvent::SetFeeProtocol {
            fee_protocol0_new: u32::from(e.feeProtocol0New),
            fee_protocol1_new: u32::from(e.feeProtocol1New),
        }));
    }
    decode_common(topic0, log)
}

fn decode_pancake(topic0: B256, log: &RawLog) -> anyhow::Result<Option<PoolEvent>> {
    match topic0 {
        hash if hash == PancakeV3Events::Swap::SIGNATURE_HASH => {
            let e = decode::<PancakeV3Events::Swap>(log)?;
            Ok(Some(PoolEvent::Swap {
                amount0: e.amount0,
                amount1: e.amount1,
                sqrt_price_x96: e.sqrtPriceX96,
                liquidity: e.liquidity,
                tick: e.tick.as_i32(),
            }))
        }
        hash if hash == PancakeV3Events::SetFeeProtocol::SIGNATURE_HASH => {
            let e = decode::<PancakeV3Events::SetFeeProtocol>(log)?;
            Ok(Some(PoolEvent::SetFeeProtocol {
                fee_protocol0_new: e.feeProtocol0New,
                fee_protocol1_new: e.feeProtocol1New,
            }))
        }
        _ => decode_common(topic0, log),
    }
}

fn decode_algebra(
    variant: PoolVariant,
    topic0: B256,
    log: &RawLog,
) -> anyhow::Result<Option<PoolEvent>> {
    let event = match topic0 {
        hash if hash == AlgebraEvents::TickSpacing::SIGNATURE_HASH => {
            let e = decode::<AlgebraEvents::TickSpacing>(log)?;
            PoolEvent::TickSpacing {
                tick_spacing: e.newTickSpacing.as_i32(),
            }
        }
        hash if hash == AlgebraEvents::Fee::SIGNATURE_HASH => {
            let e = decode::<AlgebraEvents::Fee>(log)?;
            PoolEvent::Fee {
                fee: u32::from(e.fee),
            }
        }
        hash if hash == AlgebraDirectionalEvents::Fee::SIGNATURE_HASH
            && variant == PoolVariant::AlgebraDirectionalFee =>
        {
            let e = decode::<AlgebraDirectionalEvents::Fee>(log)?;
            PoolEvent::DirectionalFee {
                zero_for_one: u32::from(e.feeZto),
                one_for_zero: u32::from(e.feeOtz),
            }
        }
        hash if hash == AlgebraEvents::CommunityFee::SIGNATURE_HASH => {
            let e = decode::<AlgebraEvents::CommunityFee>(log)?;
            PoolEvent::CommunityFee {
                token0: u16::from(e.communityFee0New),
                token1: u16::from(e.communityFee1New),
            }
        }
        hash if hash == AlgebraIntegralEvents::CommunityFee::SIGNATURE_HASH => {
            // One share for both tokens
            let e = decode::<AlgebraIntegralEvents::CommunityFee>(log)?;
            PoolEvent::CommunityFee {
                token0: e.communityFeeNew,
                token1: e.communityFeeNew,
            }
        }
        _ => return decode_common(topic0, log),
    };
    Ok(Some(event))
}

/// Decodes a raw pool log for the given variant.
///
/// Returns `Ok(None)` for removed logs and for events that do not affect pool state.
///
/// # Errors
///
/// Returns an error if a recognized event fails to decode.
pub fn decode_pool_log(variant: PoolVariant, log: &RawLog) -> anyhow::Result<Option<PoolLog>> {
    if log.removed {
        tracing::debug!("Skipping removed log at {}", log.position());
        return Ok(None);
    }
    let Some(topic0) = log.topic0() else {
        return Ok(None);
    };

    let event = match variant {
        PoolVariant::UniswapV3 => decode_uniswap(topic0, log)?,
        PoolVariant::PancakeSwapV3 => decode_pancake(topic0, log)?,
        PoolVariant::AlgebraV1 | PoolVariant::AlgebraIntegral | PoolVariant::AlgebraDirectionalFee => {
            decode_algebra(variant, topic0, log)?
        }
    };

    Ok(event.map(|event| PoolLog::new(event, log.position())))
}

/// Decodes every log of a block for one pool, keeping chain order.
///
/// # Errors
///
/// Returns the first decoding error.
pub fn decode_pool_logs(variant: PoolVariant, logs: &[RawLog]) -> anyhow::Result<Vec<PoolLog>> {
    let mut decoded = Vec::with_capacity(logs.len());
    for log in logs {
        if let Some(pool_log) = decode_pool_log(variant, log)? {
            decoded.push(pool_log);
        }
    }
    decoded.sort_by_key(|pool_log| pool_log.position);
    Ok(decoded)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use alloy::primitives::{
        Address, I256, U64, U160, U256, address,
        aliases::I24,
    };
    use clmm_model::defi::LogPosition;
    use rstest::rstest;

    use super::*;

    const POOL: Address = address!("0x8ad599c3a0ff1de082011efddc58f1908eb6e6d8");
    const OWNER: Address = address!("0xc36442b4a4522e871399cd717abdd847ab11fe88");

    fn raw_log<E: SolEvent>(event: &E, log_index: u64) -> RawLog {
        let data = event.encode_log_data();
        RawLog {
            address: POOL,
            topics: data.topics().to_vec(),
            data: data.data,
            block_number: U64::from(100),
            transaction_index: U64::from(3),
            log_index: U64::from(log_index),
            removed: false,
        }
    }

    fn int24(value: i32) -> I24 {
        I24::try_from(value).unwrap()
    }

    #[rstest]
    fn test_decode_uniswap_mint() {
        let mint = PoolEvents::Mint {
            sender: OWNER,
            owner: OWNER,
            tickLower: int24(-600),
            tickUpper: int24(600),
            amount: 1_000,
            amount0: U256::from(7),
            amount1: U256::from(9),
        };

        let decoded = decode_pool_log(PoolVariant::UniswapV3, &raw_log(&mint, 4))
            .unwrap()
            .unwrap();

        assert_eq!(decoded.position, LogPosition::new(100, 3, 4));
        assert_eq!(
            decoded.event,
            PoolEvent::Mint {
                owner: OWNER,
                tick_lower: -600,
                tick_upper: 600,
                amount: 1_000,
                amount0: U256::from(7),
                amount1: U256::from(9),
            }
        );
    }

    #[rstest]
    fn test_decode_pancake_swap_with_protocol_fees() {
        let swap = PancakeV3Events::Swap {
            sender: OWNER,
            recipient: OWNER,
            amount0: I256::try_from(-50).unwrap(),
            amount1: I256::try_from(100).unwrap(),
            sqrtPriceX96: U160::from(1u128 << 96),
            liquidity: 5_000,
            tick: int24(-3),
            protocolFeesToken0: 1,
            protocolFeesToken1: 2,
        };

        let decoded = decode_pool_log(PoolVariant::PancakeSwapV3, &raw_log(&swap, 0))
            .unwrap()
            .unwrap();

        assert!(matches!(decoded.event, PoolEvent::Swap { tick: -3, liquidity: 5_000, .. }));
    }

    #[rstest]
    fn test_pancake_swap_is_unknown_to_uniswap() {
        let swap = PancakeV3Events::Swap {
            sender: OWNER,
            recipient: OWNER,
            amount0: I256::ZERO,
            amount1: I256::ZERO,
            sqrtPriceX96: U160::from(1u128 << 96),
            liquidity: 0,
            tick: int24(0),
            protocolFeesToken0: 0,
            protocolFeesToken1: 0,
        };
        assert!(
            decode_pool_log(PoolVariant::UniswapV3, &raw_log(&swap, 0))
                .unwrap()
                .is_none()
        );
    }

    #[rstest]
    #[case(PoolVariant::AlgebraV1, PoolEvent::Fee { fee: 0 })]
    #[case(PoolVariant::AlgebraDirectionalFee, PoolEvent::DirectionalFee { zero_for_one: 100, one_for_zero: 300 })]
    fn test_decode_algebra_fee_shapes(#[case] variant: PoolVariant, #[case] expected: PoolEvent) {
        let log = match variant {
            PoolVariant::AlgebraDirectionalFee => raw_log(
                &AlgebraDirectionalEvents::Fee {
                    feeZto: 100,
                    feeOtz: 300,
                },
                1,
            ),
            _ => raw_log(&AlgebraEvents::Fee { fee: 0 }, 1),
        };

        let decoded = decode_pool_log(variant, &log).unwrap().unwrap();
        assert_eq!(decoded.event, expected);
    }

    #[rstest]
    fn test_decode_integral_community_fee_applies_to_both_tokens() {
        let log = raw_log(&AlgebraIntegralEvents::CommunityFee { communityFeeNew: 150 }, 2);

        let decoded = decode_pool_log(PoolVariant::AlgebraIntegral, &log)
            .unwrap()
            .unwrap();

        assert_eq!(
            decoded.event,
            PoolEvent::CommunityFee {
                token0: 150,
                token1: 150
            }
        );
    }

    #[rstest]
    fn test_removed_and_unknown_logs_are_skipped() {
        let mut log = raw_log(&AlgebraEvents::TickSpacing { newTickSpacing: int24(10) }, 0);
        log.removed = true;
        assert!(decode_pool_log(PoolVariant::AlgebraIntegral, &log).unwrap().is_none());

        let unknown = RawLog {
            topics: vec![B256::repeat_byte(0xab)],
            ..raw_log(&AlgebraEvents::Fee { fee: 1 }, 0)
        };
        assert!(decode_pool_log(PoolVariant::AlgebraV1, &unknown).unwrap().is_none());
    }

    #[rstest]
    fn test_truncated_data_is_an_error() {
        let mut log = raw_log(
            &PoolEvents::Flash {
                sender: OWNER,
                recipient: OWNER,
                amount0: U256::from(1),
                amount1: U256::from(2),
                paid0: U256::from(3),
                paid1: U256::from(4),
            },
            0,
        );
        log.data = log.data.slice(..64).into();
        assert!(decode_pool_log(PoolVariant::UniswapV3, &log).is_err());
    }

    #[rstest]
    fn test_decode_pool_logs_sorts_by_position() {
        let logs = vec![
            raw_log(&AlgebraEvents::Fee { fee: 2 }, 9),
            raw_log(&AlgebraEvents::Fee { fee: 1 }, 1),
        ];

        let decoded = decode_pool_logs(PoolVariant::AlgebraV1, &logs).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].event, PoolEvent::Fee { fee: 1 });
    }
}
