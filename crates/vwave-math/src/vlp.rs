//! VLP mint and redeem previews.
//!
//! Minting charges the mint/burn fee on the deposited token, redeeming
//! charges it on the withdrawn token; both use the dynamic tax.

use crate::fees::{after_fee, fee_basis_points, FeeSchedule, PoolTotals};
use crate::swap::SwapQuote;
use alloy::primitives::U256;
use vwave_core::amount::adjust_for_decimals;
use vwave_core::constants::{precision, BASIS_POINTS_DIVISOR, USDG_DECIMALS, VLP_DECIMALS};
use vwave_core::TokenInfo;

/// Shared inputs for every VLP preview.
#[derive(Debug, Clone, Copy)]
pub struct VlpParams<'a> {
    /// VLP price in USD (30 decimals).
    pub vlp_price: U256,
    pub pool: &'a PoolTotals,
    pub fees: &'a FeeSchedule,
}

fn usable(params: &VlpParams<'_>) -> bool {
    !params.vlp_price.is_zero()
}

fn mint_burn_fee(token: &TokenInfo, usdg_amount: U256, increment: bool, params: &VlpParams<'_>) -> u32 {
    fee_basis_points(
        token,
        usdg_amount,
        params.fees.mint_burn_fee_bps,
        params.fees.tax_bps,
        increment,
        Some(params.pool),
    )
}

fn divisor() -> U256 {
    U256::from(BASIS_POINTS_DIVISOR)
}

/// VLP received for depositing `from_amount` of `token`.
pub fn buy_vlp_to_amount(from_amount: U256, token: &TokenInfo, params: &VlpParams<'_>) -> SwapQuote {
    let Some(min_price) = token.min_price() else {
        return SwapQuote::default();
    };
    if !usable(params) {
        return SwapQuote::default();
    }

    let vlp_amount = adjust_for_decimals(from_amount * min_price / params.vlp_price, token.decimals(), VLP_DECIMALS);
    let usdg_amount = adjust_for_decimals(from_amount * min_price / precision(), token.decimals(), USDG_DECIMALS);
    let fee_basis_points = mint_burn_fee(token, usdg_amount, true, params);

    SwapQuote {
        amount: after_fee(vlp_amount, fee_basis_points),
        fee_basis_points,
    }
}

/// VLP that must be redeemed to receive `to_amount` of `token`.
pub fn sell_vlp_from_amount(to_amount: U256, token: &TokenInfo, params: &VlpParams<'_>) -> SwapQuote {
    let Some(max_price) = token.max_price() else {
        return SwapQuote::default();
    };
    if !usable(params) {
        return SwapQuote::default();
    }

    let vlp_amount = adjust_for_decimals(to_amount * max_price / params.vlp_price, token.decimals(), VLP_DECIMALS);
    let usdg_amount = adjust_for_decimals(to_amount * max_price / precision(), token.decimals(), USDG_DECIMALS);
    let fee_basis_points = mint_burn_fee(token, usdg_amount, false, params);
    let fee = U256::from(fee_basis_points);
    if fee >= divisor() {
        return SwapQuote::default();
    }

    SwapQuote {
        amount: vlp_amount * divisor() / (divisor() - fee),
        fee_basis_points,
    }
}

/// Amount of `token` to deposit to receive `to_amount` VLP.
pub fn buy_vlp_from_amount(to_amount: U256, token: &TokenInfo, params: &VlpParams<'_>) -> SwapQuote {
    let Some(min_price) = token.min_price().filter(|p| !p.is_zero()) else {
        return SwapQuote::default();
    };
    if !usable(params) {
        return SwapQuote::default();
    }

    let from_amount = adjust_for_decimals(to_amount * params.vlp_price / min_price, VLP_DECIMALS, token.decimals());
    let usdg_amount = to_amount * params.vlp_price / precision();
    let fee_basis_points = mint_burn_fee(token, usdg_amount, true, params);
    let fee = U256::from(fee_basis_points);
    if fee >= divisor() {
        return SwapQuote::default();
    }

    SwapQuote {
        amount: from_amount * divisor() / (divisor() - fee),
        fee_basis_points,
    }
}

/// Amount of `token` received for redeeming `vlp_amount`.
pub fn sell_vlp_to_amount(vlp_amount: U256, token: &TokenInfo, params: &VlpParams<'_>) -> SwapQuote {
    let Some(max_price) = token.max_price().filter(|p| !p.is_zero()) else {
        return SwapQuote::default();
    };
    if !usable(params) {
        return SwapQuote::default();
    }

    let to_amount = adjust_for_decimals(vlp_amount * params.vlp_price / max_price, VLP_DECIMALS, token.decimals());
    let usdg_amount = vlp_amount * params.vlp_price / precision();
    let fee_basis_points = mint_burn_fee(token, usdg_amount, false, params);

    SwapQuote {
        amount: after_fee(to_amount, fee_basis_points),
        fee_basis_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vwave_core::amount::expand_decimals;
    use vwave_core::{Address, PriceBand, TokenSpec, VaultTokenState};

    fn usdc() -> TokenInfo {
        let mut info = TokenInfo::new(TokenSpec::erc20(Address::ZERO, "USDC", 6).stable());
        info.vault = Some(VaultTokenState {
            usdg_amount: expand_decimals(500_000, 18),
            weight: U256::from(50_000),
            ..Default::default()
        });
        info.price = Some(PriceBand::flat(expand_decimals(1, 30)));
        info
    }

    fn pool() -> PoolTotals {
        PoolTotals::new(expand_decimals(1_000_000, 18), U256::from(100_000))
    }

    #[test]
    fn test_buy_vlp_to_amount() {
        let fees = FeeSchedule::default();
        let pool = pool();
        // VLP at $1.25
        let params = VlpParams {
            vlp_price: expand_decimals(125, 28),
            pool: &pool,
            fees: &fees,
        };
        let quote = buy_vlp_to_amount(expand_decimals(1_000, 6), &usdc(), &params);
        assert_eq!(quote.fee_basis_points, 25);
        // 1000 / 1.25 = 800 VLP, minus 0.25%
        assert_eq!(quote.amount, expand_decimals(798, 18));
    }

    #[test]
    fn test_sell_vlp_to_amount() {
        let fees = FeeSchedule::default();
        let pool = pool();
        let params = VlpParams {
            vlp_price: expand_decimals(1, 30),
            pool: &pool,
            fees: &fees,
        };
        let quote = sell_vlp_to_amount(expand_decimals(100, 18), &usdc(), &params);
        assert!(quote.fee_basis_points >= 25);
        assert!(quote.amount < expand_decimals(100, 6));
    }

    #[test]
    fn test_full_mint_burn_fee_quotes_zero() {
        let fees = FeeSchedule {
            mint_burn_fee_bps: 10_000,
            ..Default::default()
        };
        let pool = pool();
        let params = VlpParams {
            vlp_price: expand_decimals(1, 30),
            pool: &pool,
            fees: &fees,
        };
        let bought = buy_vlp_to_amount(expand_decimals(1_000, 6), &usdc(), &params);
        assert!(bought.fee_basis_points >= 10_000);
        assert_eq!(bought.amount, U256::ZERO);
        let sold = sell_vlp_to_amount(expand_decimals(100, 18), &usdc(), &params);
        assert_eq!(sold.amount, U256::ZERO);
    }

    #[test]
    fn test_missing_price_returns_default() {
        let fees = FeeSchedule::default();
        let pool = pool();
        let params = VlpParams {
            vlp_price: expand_decimals(1, 30),
            pool: &pool,
            fees: &fees,
        };
        let mut token = usdc();
        token.price = None;
        assert_eq!(buy_vlp_from_amount(U256::from(1), &token, &params), SwapQuote::default());
        assert_eq!(sell_vlp_from_amount(U256::from(1), &token, &params), SwapQuote::default());
    }
}
