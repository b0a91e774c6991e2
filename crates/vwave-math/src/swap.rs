//! Swap previews.
//!
//! Given an input amount (or a desired output amount) these compute the
//! other side of a swap after the vault's dynamic fee. With a trigger
//! `ratio` the price comes from the ratio instead of the token prices.

use crate::fees::{after_fee, fee_basis_points, FeeSchedule, PoolTotals};
use alloy::primitives::{Address, U256};
use vwave_core::amount::{adjust_for_decimals, shift_decimals};
use vwave_core::constants::{precision, BASIS_POINTS_DIVISOR, USDG_DECIMALS};
use vwave_core::{InfoTokens, TokenInfo};

/// Amount with the fee that was applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapQuote {
    pub amount: U256,
    pub fee_basis_points: u32,
}

impl SwapQuote {
    fn passthrough(amount: U256) -> Self {
        Self {
            amount,
            fee_basis_points: 0,
        }
    }
}

/// Inputs shared by both swap directions.
#[derive(Debug, Clone, Copy)]
pub struct SwapParams<'a> {
    pub from_token: Address,
    pub to_token: Address,
    pub info_tokens: &'a InfoTokens,
    pub pool: Option<&'a PoolTotals>,
    pub fees: &'a FeeSchedule,
    /// Trigger ratio for limit swaps (30 decimals); zero is ignored.
    pub ratio: Option<U256>,
    /// Overrides the destination token's max price.
    pub to_token_price_usd: Option<U256>,
    /// Use the vault's contract prices instead of index-adjusted prices.
    pub for_swap: bool,
}

enum Route<'a> {
    Identity,
    Priced {
        from: &'a TokenInfo,
        to: &'a TokenInfo,
        from_min_price: U256,
        to_max_price: U256,
    },
    Unavailable,
}

fn route<'a>(params: &SwapParams<'a>) -> Route<'a> {
    if params.from_token == params.to_token {
        return Route::Identity;
    }
    let (Some(from), Some(to)) = (
        params.info_tokens.get(&params.from_token),
        params.info_tokens.get(&params.to_token),
    ) else {
        return Route::Unavailable;
    };

    if (from.spec.is_native && to.spec.is_wrapped) || (from.spec.is_wrapped && to.spec.is_native) {
        return Route::Identity;
    }

    let (from_min_price, to_max_price) = if params.for_swap {
        (from.contract_price.map(|p| p.min), to.contract_price.map(|p| p.max))
    } else {
        (from.min_price(), to.max_price())
    };

    match (from_min_price, to_max_price) {
        (Some(from_min_price), Some(to_max_price))
            if !from_min_price.is_zero() && !to_max_price.is_zero() =>
        {
            Route::Priced {
                from,
                to,
                from_min_price,
                to_max_price,
            }
        }
        _ => Route::Unavailable,
    }
}

fn active_ratio(ratio: Option<U256>) -> Option<U256> {
    ratio.filter(|r| !r.is_zero())
}

/// Larger of the source-increment and destination-decrement fees.
fn swap_fee(
    from: &TokenInfo,
    to: &TokenInfo,
    usdg_amount: U256,
    params: &SwapParams<'_>,
) -> u32 {
    let both_stable = from.spec.is_stable && to.spec.is_stable;
    let fee_bps = params.fees.swap_fee_bps(both_stable);
    let tax_bps = params.fees.swap_tax_bps(both_stable);
    let fee_in = fee_basis_points(from, usdg_amount, fee_bps, tax_bps, true, params.pool);
    let fee_out = fee_basis_points(to, usdg_amount, fee_bps, tax_bps, false, params.pool);
    fee_in.max(fee_out)
}

/// Output amount for swapping `from_amount`.
pub fn next_to_amount(from_amount: U256, params: &SwapParams<'_>) -> SwapQuote {
    let (from, to, from_min_price, to_max_price) = match route(params) {
        Route::Identity => return SwapQuote::passthrough(from_amount),
        Route::Unavailable => return SwapQuote::default(),
        Route::Priced {
            from,
            to,
            from_min_price,
            to_max_price,
        } => (from, to, from_min_price, to_max_price),
    };

    let to_amount = match active_ratio(params.ratio) {
        Some(ratio) => from_amount * precision() / ratio,
        None => {
            let to_price = params.to_token_price_usd.filter(|p| !p.is_zero()).unwrap_or(to_max_price);
            from_amount * from_min_price / to_price
        }
    };

    let usdg_amount = adjust_for_decimals(
        from_amount * from_min_price / precision(),
        from.decimals(),
        USDG_DECIMALS,
    );
    let fee_basis_points = swap_fee(from, to, usdg_amount, params);
    let to_amount = after_fee(to_amount, fee_basis_points);

    SwapQuote {
        amount: shift_decimals(to_amount, i32::from(to.decimals()) - i32::from(from.decimals())),
        fee_basis_points,
    }
}

/// Input amount needed to receive `to_amount`.
pub fn next_from_amount(to_amount: U256, params: &SwapParams<'_>) -> SwapQuote {
    let (from, to, from_min_price, to_max_price) = match route(params) {
        Route::Identity => return SwapQuote::passthrough(to_amount),
        Route::Unavailable => return SwapQuote::default(),
        Route::Priced {
            from,
            to,
            from_min_price,
            to_max_price,
        } => (from, to, from_min_price, to_max_price),
    };

    let from_amount = match active_ratio(params.ratio) {
        Some(ratio) => to_amount * ratio / precision(),
        None => to_amount * to_max_price / from_min_price,
    };

    // The vault quotes this leg in the destination token's decimals.
    let usdg_amount = adjust_for_decimals(
        from_amount * from_min_price / precision(),
        to.decimals(),
        USDG_DECIMALS,
    );
    let fee_basis_points = swap_fee(from, to, usdg_amount, params);
    let divisor = U256::from(BASIS_POINTS_DIVISOR);
    let fee = U256::from(fee_basis_points);
    if fee >= divisor {
        return SwapQuote::default();
    }
    let before_fee = from_amount * divisor / (divisor - fee);

    SwapQuote {
        amount: shift_decimals(before_fee, i32::from(from.decimals()) - i32::from(to.decimals())),
        fee_basis_points,
    }
}
