//! Leverage, liquidation price and PnL for leveraged positions.
//!
//! All inputs are contract fixed point: sizes, collateral and prices in USD
//! with 30 decimals, funding rates scaled by `FUNDING_RATE_PRECISION`.
//! Results are `None` whenever a decrement would zero or overshoot the
//! value it is applied to.

use crate::fees::FeeSchedule;
use alloy::primitives::U256;
use std::collections::HashMap;
use thiserror::Error;
use vwave_core::constants::{
    liquidation_fee, min_position_usd, BASIS_POINTS_DIVISOR, FUNDING_RATE_PRECISION, MAX_LEVERAGE, MIN_PROFIT_BIPS, MIN_PROFIT_TIME, USD_DECIMALS,
};
use vwave_core::format::format_amount;
use vwave_core::{Address, Order, OrderDetails, Position};

fn bps() -> U256 {
    U256::from(BASIS_POINTS_DIVISOR)
}

/// `size * (cumulative - entry) / FUNDING_RATE_PRECISION`, zero when either
/// rate is unknown.
pub fn funding_fee(size: U256, entry_funding_rate: Option<U256>, cumulative_funding_rate: Option<U256>) -> U256 {
    match (entry_funding_rate, cumulative_funding_rate) {
        (Some(entry), Some(cumulative)) => {
            size * cumulative.saturating_sub(entry) / U256::from(FUNDING_RATE_PRECISION)
        }
        _ => U256::ZERO,
    }
}

/// Inputs to [`leverage`].
#[derive(Debug, Clone, Default)]
pub struct LeverageInput {
    pub size: Option<U256>,
    pub size_delta: Option<U256>,
    pub increase_size: bool,
    pub collateral: Option<U256>,
    pub collateral_delta: Option<U256>,
    pub increase_collateral: bool,
    pub entry_funding_rate: Option<U256>,
    pub cumulative_funding_rate: Option<U256>,
    pub has_profit: bool,
    pub delta: Option<U256>,
    pub include_delta: bool,
    /// Margin fee rate taken from the collateral when `size_delta` is set.
    pub fees: FeeSchedule,
}

/// Leverage in basis points (`10000` = 1x) after applying the deltas.
pub fn leverage(input: &LeverageInput) -> Option<U256> {
    if input.size.is_none() && input.size_delta.is_none() {
        return None;
    }
    if input.collateral.is_none() && input.collateral_delta.is_none() {
        return None;
    }

    let size = input.size.unwrap_or_default();
    let next_size = match input.size_delta {
        Some(delta) if input.increase_size => size + delta,
        Some(delta) => {
            if delta >= size {
                return None;
            }
            size - delta
        }
        None => size,
    };

    let collateral = input.collateral.unwrap_or_default();
    let mut remaining_collateral = match input.collateral_delta {
        Some(delta) if input.increase_collateral => collateral + delta,
        Some(delta) => {
            if delta >= collateral {
                return None;
            }
            collateral - delta
        }
        None => collateral,
    };

    if input.include_delta {
        if let Some(delta) = input.delta {
            if input.has_profit {
                remaining_collateral += delta;
            } else {
                if delta > remaining_collateral {
                    return None;
                }
                remaining_collateral -= delta;
            }
        }
    }

    if remaining_collateral.is_zero() {
        return None;
    }

    if input.size_delta.is_some() {
        remaining_collateral -= input.fees.margin_fee(remaining_collateral);
    }

    let funding = funding_fee(size, input.entry_funding_rate, input.cumulative_funding_rate);
    if funding >= remaining_collateral {
        return None;
    }
    remaining_collateral -= funding;

    Some(next_size * bps() / remaining_collateral)
}

/// Inputs to [`liquidation_price`].
#[derive(Debug, Clone, Default)]
pub struct LiquidationInput {
    pub is_long: bool,
    pub size: Option<U256>,
    pub collateral: Option<U256>,
    pub average_price: Option<U256>,
    pub entry_funding_rate: Option<U256>,
    pub cumulative_funding_rate: Option<U256>,
    pub size_delta: Option<U256>,
    pub increase_size: bool,
    pub collateral_delta: Option<U256>,
    pub increase_collateral: bool,
    pub delta: Option<U256>,
    pub has_profit: bool,
    pub include_delta: bool,
    pub fees: FeeSchedule,
}

/// Collateral after realising a loss; can fall below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Margin {
    Surplus(U256),
    Deficit(U256),
}

impl Margin {
    fn add(self, amount: U256) -> Self {
        match self {
            Margin::Surplus(v) => Margin::Surplus(v + amount),
            Margin::Deficit(d) if amount >= d => Margin::Surplus(amount - d),
            Margin::Deficit(d) => Margin::Deficit(d - amount),
        }
    }

    fn sub(self, amount: U256) -> Self {
        match self {
            Margin::Surplus(v) if v >= amount => Margin::Surplus(v - amount),
            Margin::Surplus(v) => Margin::Deficit(amount - v),
            Margin::Deficit(d) => Margin::Deficit(d + amount),
        }
    }
}

/// Price at which the position is liquidated, or `None` when it cannot be
/// computed from the inputs.
pub fn liquidation_price(input: &LiquidationInput) -> Option<U256> {
    let size = input.size?;
    let collateral = input.collateral?;
    let average_price = input.average_price?;

    let next_size = match input.size_delta {
        Some(delta) if input.increase_size => size + delta,
        Some(delta) => {
            if delta >= size {
                return None;
            }
            size - delta
        }
        None => size,
    };

    let mut remaining = Margin::Surplus(collateral);
    if input.include_delta && !input.has_profit && !size.is_zero() {
        let adjusted_delta =
            input.size_delta.unwrap_or_default() * input.delta.unwrap_or_default() / size;
        remaining = remaining.sub(adjusted_delta);
    }

    if let Some(delta) = input.collateral_delta {
        if input.increase_collateral {
            remaining = remaining.add(delta);
        } else {
            match remaining {
                Margin::Surplus(v) if delta < v => remaining = Margin::Surplus(v - delta),
                _ => return None,
            }
        }
    }

    let position_fee = input.fees.margin_fee(size)
        + liquidation_fee()
        + funding_fee(size, input.entry_funding_rate, input.cumulative_funding_rate);

    let for_fees = price_from_margin(position_fee, next_size, remaining, average_price, input.is_long);
    let for_max_leverage = price_from_margin(
        next_size * bps() / U256::from(MAX_LEVERAGE),
        next_size,
        remaining,
        average_price,
        input.is_long,
    );

    match (for_fees, for_max_leverage) {
        (None, other) | (other, None) => other,
        (Some(fees), Some(max_leverage)) => {
            if input.is_long {
                Some(fees.max(max_leverage))
            } else {
                Some(fees.min(max_leverage))
            }
        }
    }
}

fn price_from_margin(
    amount: U256,
    size: U256,
    margin: Margin,
    average_price: U256,
    is_long: bool,
) -> Option<U256> {
    match margin {
        Margin::Surplus(collateral) => liquidation_price_from_delta(amount, size, collateral, average_price, is_long),
        // A deficit is an extra loss the price must cover
        Margin::Deficit(deficit) => {
            liquidation_price_from_delta(amount + deficit, size, U256::ZERO, average_price, is_long)
        }
    }
}

/// Price at which `collateral - liquidation_amount` of loss is reached.
///
/// Prices that would be negative are reported as zero.
pub fn liquidation_price_from_delta(
    liquidation_amount: U256,
    size: U256,
    collateral: U256,
    average_price: U256,
    is_long: bool,
) -> Option<U256> {
    if size.is_zero() {
        return None;
    }

    if liquidation_amount > collateral {
        let price_delta = (liquidation_amount - collateral) * average_price / size;
        return Some(if is_long {
            average_price + price_delta
        } else {
            average_price.saturating_sub(price_delta)
        });
    }

    let price_delta = (collateral - liquidation_amount) * average_price / size;
    Some(if is_long {
        average_price.saturating_sub(price_delta)
    } else {
        average_price + price_delta
    })
}

/// Unrealised PnL of a position at a given price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionDelta {
    /// PnL after the min-profit rule, USD 30 decimals.
    pub delta: U256,
    /// PnL ignoring the min-profit rule.
    pub pending_delta: U256,
    pub has_profit: bool,
    /// `delta` relative to collateral, basis points.
    pub delta_percentage: U256,
    pub pending_delta_percentage: U256,
}

/// PnL of closing `size_delta` (default: the whole position) at `price`.
///
/// `now` is a unix timestamp in seconds.
pub fn position_delta(price: U256, position: &Position, size_delta: Option<U256>, now: u64) -> PositionDelta {
    let size_delta = size_delta.unwrap_or(position.size);
    let average_price = position.average_price;
    if average_price.is_zero() {
        return PositionDelta::default();
    }

    let price_delta = if average_price > price {
        average_price - price
    } else {
        price - average_price
    };
    let mut delta = size_delta * price_delta / average_price;
    let pending_delta = delta;

    let min_profit_expired = position.last_increased_time.saturating_add(MIN_PROFIT_TIME) < now;
    let has_profit = if position.is_long {
        price > average_price
    } else {
        price < average_price
    };
    if !min_profit_expired && has_profit && delta * bps() <= position.size * U256::from(MIN_PROFIT_BIPS) {
        delta = U256::ZERO;
    }

    let (delta_percentage, pending_delta_percentage) = if position.collateral.is_zero() {
        (U256::ZERO, U256::ZERO)
    } else {
        (
            delta * bps() / position.collateral,
            pending_delta * bps() / position.collateral,
        )
    };

    PositionDelta {
        delta,
        pending_delta,
        has_profit,
        delta_percentage,
        pending_delta_percentage,
    }
}

/// Formatted PnL, e.g. `("+$12.50", "+3.25%")`.
///
/// The sign prefix is omitted when the delta is zero.
pub fn delta_display(delta: U256, delta_percentage: U256, has_profit: bool) -> (String, String) {
    let sign = if delta.is_zero() {
        ""
    } else if has_profit {
        "+"
    } else {
        "-"
    };
    let amount = format!("{sign}${}", format_amount(Some(delta), USD_DECIMALS, Some(2), true));
    let percentage = format!("{sign}{}%", format_amount(Some(delta_percentage), 2, Some(2), false));
    (amount, percentage)
}

/// Price a position must reach before it is in profit.
pub fn profit_price(close_price: Option<U256>, position: &Position) -> Option<U256> {
    close_price?;
    if position.average_price.is_zero() {
        return None;
    }
    let min_profit = U256::from(MIN_PROFIT_BIPS);
    let factor = if position.is_long {
        bps() + min_profit
    } else {
        bps() - min_profit
    };
    Some(position.average_price * factor / bps())
}

/// Reasons a decrease order cannot currently execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderValidationError {
    #[error("No open position, order cannot be executed unless a position is opened")]
    NoOpenPosition,
    #[error("Order size is bigger than position, will only be executable if position increases")]
    SizeExceedsPosition,
    #[error("Order cannot be executed as it would reduce the position's leverage below 1")]
    LeverageBelowOne,
    #[error("Order cannot be executed as the remaining position would be smaller than $5.00")]
    RemainingTooSmall,
}

/// Open position an order would act on, if any.
pub fn position_for_order<'a>(
    order: &Order,
    positions: &'a HashMap<String, Position>,
    native_token_address: Address,
) -> Option<&'a Position> {
    let OrderDetails::Decrease(decrease) = &order.details else {
        return None;
    };
    let key = vwave_core::position_key(
        order.account,
        decrease.collateral_token,
        decrease.index_token,
        decrease.is_long,
        native_token_address,
    );
    positions.get(&key).filter(|p| p.is_open())
}

/// Validate a decrease order against its position. Other order kinds are
/// always valid.
pub fn order_error(order: &Order, position: Option<&Position>) -> Option<OrderValidationError> {
    let OrderDetails::Decrease(decrease) = &order.details else {
        return None;
    };
    let Some(position) = position.filter(|p| p.is_open()) else {
        return Some(OrderValidationError::NoOpenPosition);
    };

    if position.size < decrease.size_delta {
        return Some(OrderValidationError::SizeExceedsPosition);
    }

    if position.size > decrease.size_delta {
        let remaining_size = position.size - decrease.size_delta;
        if let Some(remaining_collateral) = position.collateral.checked_sub(decrease.collateral_delta) {
            if remaining_size < remaining_collateral {
                return Some(OrderValidationError::LeverageBelowOne);
            }
        }
        if remaining_size < min_position_usd() {
            return Some(OrderValidationError::RemainingTooSmall);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::margin_fee;
    use vwave_core::amount::expand_decimals;
    use vwave_core::DecreaseOrder;

    fn usd(n: u64) -> U256 {
        expand_decimals(n, 30)
    }

    fn position(is_long: bool) -> Position {
        Position {
            account: Address::repeat_byte(0x11),
            collateral_token: Address::repeat_byte(0x22),
            index_token: Address::repeat_byte(0x22),
            is_long,
            size: usd(10_000),
            collateral: usd(1_000),
            average_price: usd(2_000),
            entry_funding_rate: U256::ZERO,
            last_increased_time: 0,
        }
    }

    #[test]
    fn test_leverage_basic() {
        let input = LeverageInput {
            size: Some(usd(10_000)),
            collateral: Some(usd(1_000)),
            ..Default::default()
        };
        // 10x
        assert_eq!(leverage(&input), Some(U256::from(100_000)));
    }

    #[test]
    fn test_leverage_requires_size_and_collateral() {
        assert_eq!(leverage(&LeverageInput::default()), None);
        let input = LeverageInput {
            size: Some(usd(1)),
            ..Default::default()
        };
        assert_eq!(leverage(&input), None);
    }

    #[test]
    fn test_leverage_decrease_overshoot_is_none() {
        let input = LeverageInput {
            size: Some(usd(10_000)),
            size_delta: Some(usd(10_000)),
            collateral: Some(usd(1_000)),
            ..Default::default()
        };
        assert_eq!(leverage(&input), None);

        let input = LeverageInput {
            size: Some(usd(10_000)),
            collateral: Some(usd(1_000)),
            collateral_delta: Some(usd(1_000)),
            ..Default::default()
        };
        assert_eq!(leverage(&input), None);
    }

    #[test]
    fn test_leverage_with_size_delta_applies_margin_fee() {
        let input = LeverageInput {
            size: Some(U256::ZERO),
            size_delta: Some(usd(10_000)),
            increase_size: true,
            collateral_delta: Some(usd(1_000)),
            increase_collateral: true,
            ..Default::default()
        };
        // collateral 1000 * 0.999 = 999 -> 10000 * 10000 / 999
        let expected = usd(10_000) * U256::from(10_000) / (usd(999));
        assert_eq!(leverage(&input), Some(expected));
    }

    #[test]
    fn test_leverage_uses_configured_margin_fee() {
        let input = LeverageInput {
            size: Some(U256::ZERO),
            size_delta: Some(usd(10_000)),
            increase_size: true,
            collateral_delta: Some(usd(1_000)),
            increase_collateral: true,
            fees: FeeSchedule {
                margin_fee_bps: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        // collateral 1000 * 0.99 = 990
        let expected = usd(10_000) * U256::from(10_000) / usd(990);
        assert_eq!(leverage(&input), Some(expected));
    }

    #[test]
    fn test_leverage_loss_exceeding_collateral_is_none() {
        let input = LeverageInput {
            size: Some(usd(10_000)),
            collateral: Some(usd(1_000)),
            delta: Some(usd(1_001)),
            include_delta: true,
            has_profit: false,
            ..Default::default()
        };
        assert_eq!(leverage(&input), None);
    }

    #[test]
    fn test_liquidation_price_long() {
        let input = LiquidationInput {
            is_long: true,
            size: Some(usd(10_000)),
            collateral: Some(usd(1_000)),
            average_price: Some(usd(2_000)),
            ..Default::default()
        };
        // fees: 10 + 5 = 15 USD -> price delta = 985 * 2000 / 10000 = 197 -> 1803
        // max leverage: 100 USD -> 900 * 2000 / 10000 = 180 -> 1820
        assert_eq!(liquidation_price(&input), Some(usd(1_820)));
    }

    #[test]
    fn test_liquidation_price_uses_configured_margin_fee() {
        let input = LiquidationInput {
            is_long: true,
            size: Some(usd(10_000)),
            collateral: Some(usd(1_000)),
            average_price: Some(usd(2_000)),
            fees: FeeSchedule {
                margin_fee_bps: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        // fees: 100 + 5 = 105 USD -> 895 * 2000 / 10000 = 179 -> 1821, above the 1820 leverage bound
        assert_eq!(liquidation_price(&input), Some(usd(1_821)));
    }

    #[test]
    fn test_liquidation_price_short() {
        let input = LiquidationInput {
            is_long: false,
            size: Some(usd(10_000)),
            collateral: Some(usd(1_000)),
            average_price: Some(usd(2_000)),
            ..Default::default()
        };
        // fees -> 2197, max leverage -> 2180; short takes the lower
        assert_eq!(liquidation_price(&input), Some(usd(2_180)));
    }

    #[test]
    fn test_liquidation_price_bounds_fee_only_price() {
        for collateral in [50u64, 100, 500, 1_000, 5_000] {
            for is_long in [true, false] {
                let input = LiquidationInput {
                    is_long,
                    size: Some(usd(10_000)),
                    collateral: Some(usd(collateral)),
                    average_price: Some(usd(2_000)),
                    ..Default::default()
                };
                let price = liquidation_price(&input).unwrap();
                let fee_only = liquidation_price_from_delta(
                    margin_fee(usd(10_000)) + liquidation_fee(),
                    usd(10_000),
                    usd(collateral),
                    usd(2_000),
                    is_long,
                )
                .unwrap();
                if is_long {
                    assert!(price >= fee_only);
                } else {
                    assert!(price <= fee_only);
                }
            }
        }
    }

    #[test]
    fn test_liquidation_price_missing_inputs() {
        let input = LiquidationInput {
            size: Some(usd(1)),
            collateral: Some(usd(1)),
            ..Default::default()
        };
        assert_eq!(liquidation_price(&input), None);
    }

    #[test]
    fn test_liquidation_price_with_realised_loss() {
        let input = LiquidationInput {
            is_long: true,
            size: Some(usd(10_000)),
            collateral: Some(usd(1_000)),
            average_price: Some(usd(2_000)),
            size_delta: Some(usd(5_000)),
            delta: Some(usd(500)),
            has_profit: false,
            include_delta: true,
            ..Default::default()
        };
        let with_loss = liquidation_price(&input).unwrap();
        let without = liquidation_price(&LiquidationInput {
            include_delta: false,
            ..input
        })
        .unwrap();
        assert!(with_loss > without);
    }

    #[test]
    fn test_liquidation_price_from_delta() {
        assert_eq!(liquidation_price_from_delta(usd(1), U256::ZERO, usd(1), usd(1), true), None);
        // Loss beyond collateral moves a long's price above entry
        let price = liquidation_price_from_delta(usd(200), usd(1_000), usd(100), usd(10), true).unwrap();
        assert_eq!(price, usd(11));
        // Would go negative for a short; saturates
        let price = liquidation_price_from_delta(usd(10_000), usd(100), U256::ZERO, usd(10), false).unwrap();
        assert_eq!(price, U256::ZERO);
    }

    #[test]
    fn test_position_delta_profit_and_loss() {
        let long = position(true);
        let delta = position_delta(usd(2_200), &long, None, 1_700_000_000);
        assert!(delta.has_profit);
        // 10000 * 200 / 2000 = 1000 USD, 100% of collateral
        assert_eq!(delta.delta, usd(1_000));
        assert_eq!(delta.delta_percentage, U256::from(10_000));

        let short = position(false);
        let delta = position_delta(usd(2_200), &short, Some(usd(5_000)), 1_700_000_000);
        assert!(!delta.has_profit);
        assert_eq!(delta.delta, usd(500));
        assert_eq!(delta.pending_delta, usd(500));
    }

    #[test]
    fn test_delta_display() {
        let (amount, pct) = delta_display(usd(1_234), U256::from(325), true);
        assert_eq!(amount, "+$1,234.00");
        assert_eq!(pct, "+3.25%");

        let (amount, pct) = delta_display(U256::ZERO, U256::ZERO, false);
        assert_eq!(amount, "$0.00");
        assert_eq!(pct, "0.00%");
    }

    #[test]
    fn test_profit_price() {
        let long = position(true);
        assert_eq!(profit_price(Some(usd(1)), &long), Some(usd(2_000)));
        assert_eq!(profit_price(None, &long), None);
    }

    fn decrease_order(size_delta: U256, collateral_delta: U256) -> Order {
        Order {
            account: Address::repeat_byte(0x11),
            index: 0,
            details: OrderDetails::Decrease(DecreaseOrder {
                collateral_token: Address::repeat_byte(0x22),
                index_token: Address::repeat_byte(0x22),
                collateral_delta,
                size_delta,
                is_long: true,
                trigger_price: usd(2_500),
                trigger_above_threshold: true,
            }),
        }
    }

    #[test]
    fn test_order_error() {
        let pos = position(true);
        let order = decrease_order(usd(20_000), U256::ZERO);
        assert_eq!(order_error(&order, None), Some(OrderValidationError::NoOpenPosition));
        assert_eq!(order_error(&order, Some(&pos)), Some(OrderValidationError::SizeExceedsPosition));

        // 500 size left against 1000 collateral
        let order = decrease_order(usd(9_500), U256::ZERO);
        assert_eq!(order_error(&order, Some(&pos)), Some(OrderValidationError::LeverageBelowOne));

        let order = decrease_order(usd(9_997), usd(1_000));
        assert_eq!(order_error(&order, Some(&pos)), Some(OrderValidationError::RemainingTooSmall));

        let order = decrease_order(usd(5_000), U256::ZERO);
        assert_eq!(order_error(&order, Some(&pos)), None);
        assert_eq!(
            OrderValidationError::RemainingTooSmall.to_string(),
            "Order cannot be executed as the remaining position would be smaller than $5.00"
        );
    }

    #[test]
    fn test_position_for_order() {
        let pos = position(true);
        let native = Address::repeat_byte(0xee);
        let mut positions = HashMap::new();
        positions.insert(pos.key(native), pos.clone());
        let order = decrease_order(usd(1), U256::ZERO);
        assert_eq!(position_for_order(&order, &positions, native), Some(&pos));
    }
}
