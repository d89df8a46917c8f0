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

use std::hint::black_box;

use alloy_primitives::U256;
use clmm_model::defi::pool_analysis::{
    SwapSide, query_outputs, quote_swap,
    stubs::{deep_pool, pool_with_two_ranges},
};
use criterion::{Criterion, criterion_group, criterion_main};

fn ladder(steps: u64, unit: u64) -> Vec<U256> {
    (1..=steps).map(|i| U256::from(i * unit)).collect()
}

fn bench_query_outputs_ladder(c: &mut Criterion) {
    let state = deep_pool();
    let amounts = ladder(32, 1_000_000_000_000_000);

    c.bench_function("query_outputs_sell_ladder_32", |b| {
        b.iter(|| black_box(query_outputs(&state, &amounts, true, SwapSide::Sell)));
    });
    c.bench_function("query_outputs_buy_ladder_32", |b| {
        b.iter(|| black_box(query_outputs(&state, &amounts, false, SwapSide::Buy)));
    });
}

fn bench_query_outputs_crossing(c: &mut Criterion) {
    let state = pool_with_two_ranges();
    let amounts = ladder(16, 500);

    c.bench_function("query_outputs_crossing_ladder_16", |b| {
        b.iter(|| black_box(query_outputs(&state, &amounts, true, SwapSide::Sell)));
    });
}

fn bench_quote_swap(c: &mut Criterion) {
    let state = deep_pool();
    let amount = alloy_primitives::I256::try_from(10u128.pow(18)).unwrap_or_default();

    c.bench_function("quote_swap_exact_in", |b| {
        b.iter(|| black_box(quote_swap(&state, amount, true, None)));
    });
}

criterion_group!(
    benches,
    bench_query_outputs_ladder,
    bench_query_outputs_crossing,
    bench_quote_swap
);
criterion_main!(benches);
