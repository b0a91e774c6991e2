//! Position projection of vault state.

use alloy::primitives::{keccak256, Address, B256, U256};

/// Read-only view of a vault position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub account: Address,
    pub collateral_token: Address,
    pub index_token: Address,
    pub is_long: bool,
    /// Position size in USD (30 decimals).
    pub size: U256,
    /// Collateral in USD (30 decimals).
    pub collateral: U256,
    pub average_price: U256,
    pub entry_funding_rate: U256,
    /// Unix seconds of the last size increase.
    pub last_increased_time: u64,
}

impl Position {
    /// True when the vault reports a non-zero size.
    pub fn is_open(&self) -> bool {
        !self.size.is_zero()
    }

    pub fn key(&self, native_token_address: Address) -> String {
        position_key(
            self.account,
            self.collateral_token,
            self.index_token,
            self.is_long,
            native_token_address,
        )
    }
}

/// Client-side position key `account:collateral:index:isLong`.
///
/// The zero address is replaced with the wrapped native token so native and
/// wrapped positions share a key.
pub fn position_key(
    account: Address,
    collateral_token: Address,
    index_token: Address,
    is_long: bool,
    native_token_address: Address,
) -> String {
    let collateral = if collateral_token == Address::ZERO {
        native_token_address
    } else {
        collateral_token
    };
    let index = if index_token == Address::ZERO {
        native_token_address
    } else {
        index_token
    };
    format!("{account}:{collateral}:{index}:{is_long}")
}

/// Vault storage key: `keccak256(abi.encodePacked(account, collateral, index, isLong))`.
pub fn position_contract_key(
    account: Address,
    collateral_token: Address,
    index_token: Address,
    is_long: bool,
) -> B256 {
    let mut packed = Vec::with_capacity(61);
    packed.extend_from_slice(account.as_slice());
    packed.extend_from_slice(collateral_token.as_slice());
    packed.extend_from_slice(index_token.as_slice());
    packed.push(u8::from(is_long));
    keccak256(packed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
    const WETH: Address = address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1");

    #[test]
    fn test_position_key_replaces_zero_address() {
        let native = position_key(ACCOUNT, Address::ZERO, Address::ZERO, true, WETH);
        let wrapped = position_key(ACCOUNT, WETH, WETH, true, WETH);
        assert_eq!(native, wrapped);
        assert!(native.ends_with(":true"));
    }

    #[test]
    fn test_position_contract_key_distinguishes_side() {
        let long = position_contract_key(ACCOUNT, WETH, WETH, true);
        let short = position_contract_key(ACCOUNT, WETH, WETH, false);
        assert_ne!(long, short);
    }
}
