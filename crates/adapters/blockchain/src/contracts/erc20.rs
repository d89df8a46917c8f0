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

use alloy::{
    primitives::{Address, U256},
    sol,
};

use super::base::{BaseContract, PoolContractError, TypedCall};

sol! {
    contract ERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

/// Interface for reading ERC20 token balances.
#[derive(Debug, Clone)]
pub struct Erc20Contract {
    base: BaseContract,
}

impl Erc20Contract {
    #[must_use]
    pub const fn new(base: BaseContract) -> Self {
        Self { base }
    }

    /// Returns the `balanceOf(account)` call on `token`.
    #[must_use]
    pub fn balance_of(token: Address, account: Address) -> TypedCall<ERC20::balanceOfCall> {
        TypedCall::new(
            token,
            &ERC20::balanceOfCall { account },
            format!("balanceOf({account})"),
            false,
        )
    }

    /// Fetches the balances `account` holds of `token0` and `token1` in one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch fails or either balance cannot be decoded.
    pub async fn fetch_pair_balances(
        &self,
        token0: Address,
        token1: Address,
        account: Address,
        block: Option<u64>,
    ) -> Result<(U256, U256), PoolContractError> {
        let balance0 = Self::balance_of(token0, account);
        let balance1 = Self::balance_of(token1, account);
        let results = self
            .base
            .execute_batch(&[balance0.call.clone(), balance1.call.clone()], block)
            .await?;

        Ok((balance0.decode(&results[0])?, balance1.decode(&results[1])?))
    }

    /// Fetches the decimals of `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or cannot be decoded.
    pub async fn fetch_decimals(
        &self,
        token: Address,
        block: Option<u64>,
    ) -> Result<u8, PoolContractError> {
        let typed = TypedCall::new(token, &ERC20::decimalsCall {}, "decimals", false);
        self.base.execute_typed(&typed, block).await
    }
}
