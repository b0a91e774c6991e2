//! Trading math for the VWAVE client.
//!
//! Every function reproduces the vault contract's integer arithmetic on
//! `U256`, so previews match what the chain will charge:
//! - `fees`: dynamic swap, mint and margin fees
//! - `swap` / `vlp`: amount previews in both directions
//! - `position`: leverage, liquidation price, PnL and decrease-order checks
//! - `exchange`: exchange rates and USD valuation
//! - `staking`: unstake and vester deposit previews

pub mod exchange;
pub mod fees;
pub mod position;
pub mod staking;
pub mod swap;
pub mod vlp;

pub use exchange::{
    exchange_rate, exchange_rate_display, is_trigger_ratio_inverted, most_abundant_stable_token,
    should_invert_trigger_ratio, should_raise_gas_error, usd_value, OrderOption,
};
pub use fees::{after_fee, fee_basis_points, margin_fee, target_usdg_amount, FeeSchedule, FeeScheduleError, PoolTotals};
pub use position::{
    delta_display, leverage, liquidation_price, liquidation_price_from_delta, order_error, position_delta,
    position_for_order, profit_price, LeverageInput, LiquidationInput, OrderValidationError, PositionDelta,
};
pub use staking::{AmountError, UnstakePreview, VesterDepositPreview, VesterPosition};
pub use swap::{next_from_amount, next_to_amount, SwapParams, SwapQuote};
pub use vlp::{buy_vlp_from_amount, buy_vlp_to_amount, sell_vlp_from_amount, sell_vlp_to_amount, VlpParams};
