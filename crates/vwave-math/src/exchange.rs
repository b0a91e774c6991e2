//! Exchange rates, USD valuation and balance checks for the trade form.

use alloy::primitives::{Address, U256};
use vwave_core::amount::{adjust_for_decimals, pow10};
use vwave_core::constants::{precision, DUST_NATIVE, USD_DECIMALS};
use vwave_core::format::{format_amount, PLACEHOLDER};
use vwave_core::{ChainConfig, InfoTokens, TokenInfo};

/// How an order will be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderOption {
    #[default]
    Market,
    Limit,
    Stop,
}

/// Price of `b` in units of `a` (or the inverse), 30 decimals.
pub fn exchange_rate(a: &TokenInfo, b: &TokenInfo, inverted: bool) -> Option<U256> {
    let a_min = a.min_price().filter(|p| !p.is_zero())?;
    let b_max = b.max_price().filter(|p| !p.is_zero())?;
    if inverted {
        Some(a_min * precision() / b_max)
    } else {
        Some(b_max * precision() / a_min)
    }
}

/// Whether a stored trigger ratio is expressed as `to / from`.
pub fn is_trigger_ratio_inverted(from: Option<&TokenInfo>, to: Option<&TokenInfo>) -> bool {
    let (Some(from), Some(to)) = (from, to) else {
        return false;
    };
    if to.spec.is_stable {
        return true;
    }
    match (to.max_price(), from.max_price()) {
        (Some(to_max), Some(from_max)) => to_max < from_max,
        _ => false,
    }
}

/// Whether a pair reads better with its tokens swapped.
pub fn should_invert_trigger_ratio(a: &TokenInfo, b: &TokenInfo) -> bool {
    if b.spec.is_stable {
        return true;
    }
    matches!((b.max_price(), a.max_price()), (Some(b_max), Some(a_max)) if b_max < a_max)
}

/// Human readable rate such as `2,000.00 USDC / WETH`.
pub fn exchange_rate_display(rate: Option<U256>, a: Option<&TokenInfo>, b: Option<&TokenInfo>, omit_symbols: bool) -> String {
    let (Some(mut rate), Some(mut a), Some(mut b)) = (rate, a, b) else {
        return PLACEHOLDER.to_string();
    };
    if rate.is_zero() {
        return PLACEHOLDER.to_string();
    }
    if should_invert_trigger_ratio(a, b) {
        std::mem::swap(&mut a, &mut b);
        rate = precision() * precision() / rate;
    }
    let display_decimals = if a.spec.is_stable { 2 } else { 4 };
    let value = format_amount(Some(rate), USD_DECIMALS, Some(display_decimals), true);
    if omit_symbols {
        return value;
    }
    format!("{value} {} / {}", a.spec.symbol, b.spec.symbol)
}

/// The stable token with the most available liquidity, in USD terms.
///
/// Falls back to the first configured stable when nothing is known.
pub fn most_abundant_stable_token<'a>(chain: &'a ChainConfig, info_tokens: &InfoTokens) -> Option<&'a vwave_core::TokenSpec> {
    let mut stables = chain.whitelisted_tokens().iter().filter(|t| t.is_stable);
    let mut best = stables.next()?;
    let mut best_amount = available_usd_scale(info_tokens.get(&best.address));

    for spec in stables {
        let amount = available_usd_scale(info_tokens.get(&spec.address));
        if amount > best_amount {
            best = spec;
            best_amount = amount;
        }
    }
    Some(best)
}

fn available_usd_scale(info: Option<&TokenInfo>) -> U256 {
    info.and_then(|i| {
        i.available_amount()
            .map(|a| adjust_for_decimals(a, i.decimals(), USD_DECIMALS))
    })
    .unwrap_or(U256::ZERO)
}

/// Price used to value an amount: the trigger price for limit and stop
/// orders, otherwise the max or min token price.
pub fn trigger_price(info: &TokenInfo, max: bool, option: OrderOption, trigger_price_usd: Option<U256>) -> Option<U256> {
    if option != OrderOption::Market {
        if let Some(price) = trigger_price_usd.filter(|p| !p.is_zero()) {
            return Some(price);
        }
    }
    if max {
        info.max_price()
    } else {
        info.min_price()
    }
}

/// USD value (30 decimals) of `amount` of `token`.
pub fn usd_value(
    amount: Option<U256>,
    token: &Address,
    max: bool,
    info_tokens: &InfoTokens,
    option: OrderOption,
    trigger_price_usd: Option<U256>,
) -> Option<U256> {
    let amount = amount?;
    let info = info_tokens.get(token)?;
    let price = trigger_price(info, max, option, trigger_price_usd)?;
    Some(amount * price / pow10(info.decimals()))
}

/// True when spending `amount` of the native token would leave too little
/// for gas.
pub fn should_raise_gas_error(token: &TokenInfo, amount: Option<U256>) -> bool {
    let Some(amount) = amount else {
        return false;
    };
    if token.address() != Address::ZERO {
        return false;
    }
    let Some(balance) = token.balance else {
        return false;
    };
    if amount >= balance {
        return true;
    }
    balance - amount < U256::from(DUST_NATIVE)
}
