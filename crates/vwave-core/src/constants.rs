//! Protocol constants.
//!
//! Values mirror the deployed Vault and OrderBook contracts. USD amounts use
//! 30 decimals, USDG/VLP/VWAVE use 18.

use alloy::primitives::U256;

pub const AURORA: u64 = 1_313_161_554;
pub const AURORA_TESTNET: u64 = 1_313_161_555;
pub const DEFAULT_CHAIN_ID: u64 = AURORA;

pub const USD_DECIMALS: u8 = 30;
pub const USDG_DECIMALS: u8 = 18;
pub const VLP_DECIMALS: u8 = 18;
pub const VWAVE_DECIMALS: u8 = 18;

pub const BASIS_POINTS_DIVISOR: u64 = 10_000;
pub const MAX_LEVERAGE: u64 = 100 * BASIS_POINTS_DIVISOR;
pub const MAX_PRICE_DEVIATION_BASIS_POINTS: u64 = 250;
pub const FUNDING_RATE_PRECISION: u64 = 1_000_000;
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

pub const TAX_BASIS_POINTS: u32 = 50;
pub const STABLE_TAX_BASIS_POINTS: u32 = 5;
pub const MINT_BURN_FEE_BASIS_POINTS: u32 = 25;
pub const SWAP_FEE_BASIS_POINTS: u32 = 30;
pub const STABLE_SWAP_FEE_BASIS_POINTS: u32 = 1;
pub const MARGIN_FEE_BASIS_POINTS: u32 = 10;

pub const DEFAULT_SLIPPAGE_AMOUNT: u32 = 30;
pub const DEFAULT_HIGHER_SLIPPAGE_AMOUNT: u32 = 100;
pub const MIN_PROFIT_BIPS: u64 = 0;
pub const MIN_PROFIT_TIME: u64 = 0;
pub const MAX_REFERRAL_CODE_LENGTH: usize = 20;

/// Smallest native balance left after a transfer before a gas warning.
pub const DUST_NATIVE: u64 = 2_000_000_000_000_000;

/// Vault token info props returned per token by `getVaultTokenInfoV4`.
pub const VAULT_PROPS_LENGTH: usize = 15;
/// Funding rate props returned per token by `getFundingRates`.
pub const FUNDING_RATE_PROPS_LENGTH: usize = 2;

/// 10^30, the USD price precision.
pub fn precision() -> U256 {
    crate::amount::expand_decimals(1, USD_DECIMALS)
}

/// 5 USD flat liquidation fee.
pub fn liquidation_fee() -> U256 {
    crate::amount::expand_decimals(5, USD_DECIMALS)
}

/// Default cap on USDG debt per token when the vault reports zero.
pub fn default_max_usdg_amount() -> U256 {
    crate::amount::expand_decimals(200_000_000, USDG_DECIMALS)
}

/// Minimum remaining position size after a decrease order ($5).
pub fn min_position_usd() -> U256 {
    crate::amount::expand_decimals(5, USD_DECIMALS)
}
