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

//! Pool state comparison utilities.

use std::fmt::Display;

use super::state::PoolState;

fn compare_field<T: PartialEq + Display>(name: &str, local: T, fetched: T) -> bool {
    if local == fetched {
        tracing::info!("✓ {name} matches: {local}");
        true
    } else {
        tracing::error!("{name} mismatch: local={local}, fetched={fetched}");
        false
    }
}

/// Compares a locally maintained pool state with a freshly fetched one.
///
/// Global scalars, balances, every tick record and every bitmap word are checked. Mismatches
/// are logged as errors, matches as info.
///
/// Returns `true` if all compared values match.
#[must_use]
pub fn compare_pool_state(local: &PoolState, fetched: &PoolState) -> bool {
    let mut all_match = true;

    all_match &= compare_field("tick", local.global_state.tick, fetched.global_state.tick);
    all_match &= compare_field(
        "sqrt_price_x96",
        local.global_state.sqrt_price_x96,
        fetched.global_state.sqrt_price_x96,
    );
    all_match &= compare_field("liquidity", local.liquidity, fetched.liquidity);
    all_match &= compare_field("tick_spacing", local.tick_spacing, fetched.tick_spacing);
    all_match &= compare_field("balance0", local.balance0, fetched.balance0);
    all_match &= compare_field("balance1", local.balance1, fetched.balance1);
    all_match &= compare_field(
        "fee_growth_global_0_x128",
        local.fee_growth_global_0_x128,
        fetched.fee_growth_global_0_x128,
    );
    all_match &= compare_field(
        "fee_growth_global_1_x128",
        local.fee_growth_global_1_x128,
        fetched.fee_growth_global_1_x128,
    );

    if local.global_state.fee != fetched.global_state.fee {
        tracing::error!(
            "Fee mismatch: local={:?}, fetched={:?}",
            local.global_state.fee,
            fetched.global_state.fee
        );
        all_match = false;
    }
    if local.global_state.protocol_fee != fetched.global_state.protocol_fee {
        tracing::error!(
            "Protocol fee mismatch: local={:?}, fetched={:?}",
            local.global_state.protocol_fee,
            fetched.global_state.protocol_fee
        );
        all_match = false;
    }

    let mut tick_mismatches = 0;
    for (tick, fetched_tick) in &fetched.ticks {
        let local_tick = local.tick_info(*tick);
        if local_tick.liquidity_net != fetched_tick.liquidity_net
            || local_tick.liquidity_gross != fetched_tick.liquidity_gross
            || local_tick.initialized != fetched_tick.initialized
        {
            tracing::error!(
                "Tick {tick} mismatch: local=(gross={}, net={}), fetched=(gross={}, net={})",
                local_tick.liquidity_gross,
                local_tick.liquidity_net,
                fetched_tick.liquidity_gross,
                fetched_tick.liquidity_net
            );
            tick_mismatches += 1;
        }
    }
    for tick in local.ticks.keys() {
        if !fetched.ticks.contains_key(tick) && local.tick_info(*tick).initialized {
            tracing::error!("Tick {tick} initialized locally but absent from the fetched state");
            tick_mismatches += 1;
        }
    }
    if tick_mismatches == 0 {
        tracing::info!("✓ {} ticks are matching", fetched.ticks.len());
    } else {
        all_match = false;
    }

    // Only words inside both fetched windows are comparable
    let range = fetched.tick_bitmap.fetch_range();
    let mut word_mismatches = 0;
    for word_pos in range {
        let local_word = local.tick_bitmap.word(word_pos);
        let fetched_word = fetched.tick_bitmap.word(word_pos);
        if local_word != fetched_word {
            tracing::error!("Bitmap word {word_pos} mismatch: local={local_word:#x}, fetched={fetched_word:#x}");
            word_mismatches += 1;
        }
    }
    if word_mismatches > 0 {
        all_match = false;
    }

    all_match
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
