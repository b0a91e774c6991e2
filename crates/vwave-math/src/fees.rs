//! Dynamic pool fees.
//!
//! The vault charges a base fee plus a tax that grows as a swap pushes a
//! token's USDG debt away from its target weight, and rebates the tax when
//! the swap moves it closer. The formulas below reproduce the contract's
//! integer arithmetic exactly; every division floors.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vwave_core::amount::{abs_diff, to_u64_saturating};
use vwave_core::constants::{
    BASIS_POINTS_DIVISOR, MARGIN_FEE_BASIS_POINTS, MINT_BURN_FEE_BASIS_POINTS,
    STABLE_SWAP_FEE_BASIS_POINTS, STABLE_TAX_BASIS_POINTS, SWAP_FEE_BASIS_POINTS,
    TAX_BASIS_POINTS,
};
use vwave_core::TokenInfo;

/// Fee parameters of the vault, in basis points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default = "default_mint_burn_fee_bps")]
    pub mint_burn_fee_bps: u32,
    #[serde(default = "default_tax_bps")]
    pub tax_bps: u32,
    #[serde(default = "default_stable_tax_bps")]
    pub stable_tax_bps: u32,
    #[serde(default = "default_swap_fee_bps")]
    pub swap_fee_bps: u32,
    #[serde(default = "default_stable_swap_fee_bps")]
    pub stable_swap_fee_bps: u32,
    #[serde(default = "default_margin_fee_bps")]
    pub margin_fee_bps: u32,
}

fn default_mint_burn_fee_bps() -> u32 {
    MINT_BURN_FEE_BASIS_POINTS
}

fn default_tax_bps() -> u32 {
    TAX_BASIS_POINTS
}

fn default_stable_tax_bps() -> u32 {
    STABLE_TAX_BASIS_POINTS
}

fn default_swap_fee_bps() -> u32 {
    SWAP_FEE_BASIS_POINTS
}

fn default_stable_swap_fee_bps() -> u32 {
    STABLE_SWAP_FEE_BASIS_POINTS
}

fn default_margin_fee_bps() -> u32 {
    MARGIN_FEE_BASIS_POINTS
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            mint_burn_fee_bps: default_mint_burn_fee_bps(),
            tax_bps: default_tax_bps(),
            stable_tax_bps: default_stable_tax_bps(),
            swap_fee_bps: default_swap_fee_bps(),
            stable_swap_fee_bps: default_stable_swap_fee_bps(),
            margin_fee_bps: default_margin_fee_bps(),
        }
    }
}

impl FeeSchedule {
    /// Base swap fee for a swap between two stables or otherwise.
    pub fn swap_fee_bps(&self, is_stable: bool) -> u32 {
        if is_stable {
            self.stable_swap_fee_bps
        } else {
            self.swap_fee_bps
        }
    }

    /// Tax for a swap between two stables or otherwise.
    pub fn swap_tax_bps(&self, is_stable: bool) -> u32 {
        if is_stable {
            self.stable_tax_bps
        } else {
            self.tax_bps
        }
    }

    /// Position fee charged on `size_delta` (USD, 30 decimals).
    pub fn margin_fee(&self, size_delta: U256) -> U256 {
        size_delta - after_fee(size_delta, self.margin_fee_bps)
    }

    /// Reject schedules whose worst-case fee takes the whole amount.
    pub fn validate(&self) -> Result<(), FeeScheduleError> {
        let checks = [
            ("swap_fee_bps + tax_bps", self.swap_fee_bps + self.tax_bps),
            ("stable_swap_fee_bps + stable_tax_bps", self.stable_swap_fee_bps + self.stable_tax_bps),
            ("mint_burn_fee_bps + tax_bps", self.mint_burn_fee_bps + self.tax_bps),
            ("margin_fee_bps", self.margin_fee_bps),
        ];
        for (name, total) in checks {
            if u64::from(total) >= BASIS_POINTS_DIVISOR {
                return Err(FeeScheduleError::TooHigh { name, total });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeScheduleError {
    #[error("{name} is {total} bps, must stay below 10000")]
    TooHigh { name: &'static str, total: u32 },
}

/// `amount` less a fee of `fee_bps`; zero once the fee reaches 100%.
pub fn after_fee(amount: U256, fee_bps: u32) -> U256 {
    let divisor = U256::from(BASIS_POINTS_DIVISOR);
    amount * divisor.saturating_sub(U256::from(fee_bps)) / divisor
}

/// Vault-wide totals the target weights are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTotals {
    pub usdg_supply: U256,
    pub total_token_weights: U256,
}

impl PoolTotals {
    pub fn new(usdg_supply: U256, total_token_weights: U256) -> Self {
        Self {
            usdg_supply,
            total_token_weights,
        }
    }
}

/// Target USDG debt for a token: `weight * supply / totalWeights`.
///
/// `None` when the token's weight is unknown. Zero supply gives a zero
/// target, and so does a zero total weight.
pub fn target_usdg_amount(token: &TokenInfo, pool: &PoolTotals) -> Option<U256> {
    let weight = token.weight()?;
    if pool.usdg_supply.is_zero() || pool.total_token_weights.is_zero() {
        return Some(U256::ZERO);
    }
    Some(weight * pool.usdg_supply / pool.total_token_weights)
}

/// Fee in basis points for moving `usdg_delta` of USDG debt into
/// (`increment`) or out of the token's pool.
///
/// Always within `[0, fee_bps + tax_bps]`. Returns 0 when the token's USDG
/// debt or the pool totals are unknown, and the untaxed `fee_bps` when the
/// target amount is zero.
pub fn fee_basis_points(
    token: &TokenInfo,
    usdg_delta: U256,
    fee_bps: u32,
    tax_bps: u32,
    increment: bool,
    pool: Option<&PoolTotals>,
) -> u32 {
    let (Some(initial_amount), Some(pool)) = (token.usdg_amount(), pool) else {
        return 0;
    };

    let next_amount = if increment {
        initial_amount + usdg_delta
    } else if usdg_delta > initial_amount {
        U256::ZERO
    } else {
        initial_amount - usdg_delta
    };

    let target_amount = match target_usdg_amount(token, pool) {
        Some(t) if !t.is_zero() => t,
        _ => return fee_bps,
    };

    let initial_diff = abs_diff(initial_amount, target_amount);
    let next_diff = abs_diff(next_amount, target_amount);
    let fee = U256::from(fee_bps);
    let tax = U256::from(tax_bps);

    if next_diff < initial_diff {
        let rebate_bps = tax * initial_diff / target_amount;
        if rebate_bps > fee {
            return 0;
        }
        return to_bps(fee - rebate_bps);
    }

    let mut average_diff = (initial_diff + next_diff) / U256::from(2);
    if average_diff > target_amount {
        average_diff = target_amount;
    }
    let tax_bps = tax * average_diff / target_amount;
    to_bps(fee + tax_bps)
}

fn to_bps(value: U256) -> u32 {
    u32::try_from(to_u64_saturating(value)).unwrap_or(u32::MAX)
}

/// Position fee at the default margin rate.
pub fn margin_fee(size_delta: U256) -> U256 {
    FeeSchedule::default().margin_fee(size_delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vwave_core::amount::expand_decimals;
    use vwave_core::{Address, TokenSpec, VaultTokenState};

    fn token_with(usdg_amount: u64, weight: u64) -> TokenInfo {
        let mut info = TokenInfo::new(TokenSpec::erc20(Address::ZERO, "TKN", 18));
        info.vault = Some(VaultTokenState {
            usdg_amount: expand_decimals(usdg_amount, 18),
            weight: U256::from(weight),
            ..Default::default()
        });
        info
    }

    fn pool(supply: u64, weights: u64) -> PoolTotals {
        PoolTotals::new(expand_decimals(supply, 18), U256::from(weights))
    }

    #[test]
    fn test_target_usdg_amount() {
        let token = token_with(0, 25_000);
        let target = target_usdg_amount(&token, &pool(1_000_000, 100_000)).unwrap();
        assert_eq!(target, expand_decimals(250_000, 18));
    }

    #[test]
    fn test_zero_supply_returns_base_fee() {
        let token = token_with(100, 25_000);
        let fee = fee_basis_points(&token, expand_decimals(10, 18), 30, 50, true, Some(&pool(0, 100_000)));
        assert_eq!(fee, 30);
    }

    #[test]
    fn test_zero_total_weights_returns_base_fee() {
        let token = token_with(100, 25_000);
        let fee = fee_basis_points(&token, expand_decimals(10, 18), 30, 50, true, Some(&pool(1_000, 0)));
        assert_eq!(fee, 30);
    }

    #[test]
    fn test_missing_data_returns_zero() {
        let token = TokenInfo::new(TokenSpec::erc20(Address::ZERO, "TKN", 18));
        assert_eq!(fee_basis_points(&token, U256::from(1), 30, 50, true, Some(&pool(1, 1))), 0);

        let token = token_with(100, 1);
        assert_eq!(fee_basis_points(&token, U256::from(1), 30, 50, true, None), 0);
    }

    #[test]
    fn test_rebate_when_moving_toward_target() {
        // Target 250k, current 200k, depositing 10k moves closer
        let token = token_with(200_000, 25_000);
        let fee = fee_basis_points(
            &token,
            expand_decimals(10_000, 18),
            30,
            50,
            true,
            Some(&pool(1_000_000, 100_000)),
        );
        // rebate = 50 * 50k / 250k = 10
        assert_eq!(fee, 20);
    }

    #[test]
    fn test_rebate_clamped_at_zero() {
        // Far below target: rebate exceeds base fee
        let token = token_with(0, 25_000);
        let fee = fee_basis_points(
            &token,
            expand_decimals(1_000, 18),
            1,
            50,
            true,
            Some(&pool(1_000_000, 100_000)),
        );
        assert_eq!(fee, 0);
    }

    #[test]
    fn test_tax_when_moving_away_from_target() {
        // Target 250k, current 300k, depositing 100k moves away
        let token = token_with(300_000, 25_000);
        let fee = fee_basis_points(
            &token,
            expand_decimals(100_000, 18),
            30,
            50,
            true,
            Some(&pool(1_000_000, 100_000)),
        );
        // avg diff = (50k + 150k) / 2 = 100k; tax = 50 * 100k / 250k = 20
        assert_eq!(fee, 50);
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        let token = token_with(100, 25_000);
        let fee = fee_basis_points(
            &token,
            expand_decimals(1_000, 18),
            30,
            50,
            false,
            Some(&pool(1_000_000, 100_000)),
        );
        // Moving from 100 to 0, further from 250k target; avg diff capped at target
        assert!(fee >= 30 && fee <= 80);
    }

    #[test]
    fn test_fee_always_within_bounds() {
        let supplies = [0u64, 1, 1_000, 1_000_000];
        let amounts = [0u64, 1, 500, 250_000, 10_000_000];
        let deltas = [0u64, 1, 100, 1_000_000, 50_000_000];
        for &supply in &supplies {
            for &amount in &amounts {
                for &delta in &deltas {
                    for increment in [true, false] {
                        let token = token_with(amount, 25_000);
                        let fee = fee_basis_points(
                            &token,
                            expand_decimals(delta, 18),
                            30,
                            50,
                            increment,
                            Some(&pool(supply, 100_000)),
                        );
                        assert!(fee <= 80, "fee {fee} out of range");
                    }
                }
            }
        }
    }

    #[test]
    fn test_margin_fee() {
        // 10 bps of $1000
        let fee = margin_fee(expand_decimals(1_000, 30));
        assert_eq!(fee, expand_decimals(1, 30));
    }

    #[test]
    fn test_margin_fee_follows_schedule() {
        let size = expand_decimals(10_000, 30);
        assert_eq!(margin_fee(size), expand_decimals(10, 30));
        let schedule = FeeSchedule {
            margin_fee_bps: 100,
            ..Default::default()
        };
        assert_eq!(schedule.margin_fee(size), expand_decimals(100, 30));
    }

    #[test]
    fn test_after_fee_saturates() {
        assert_eq!(after_fee(U256::from(10_000), 30), U256::from(9_970));
        assert_eq!(after_fee(U256::from(10_000), 10_000), U256::ZERO);
        assert_eq!(after_fee(U256::from(10_000), 12_000), U256::ZERO);
    }

    #[test]
    fn test_validate_fee_schedule() {
        assert!(FeeSchedule::default().validate().is_ok());
        let schedule = FeeSchedule {
            swap_fee_bps: 6_000,
            tax_bps: 5_000,
            ..Default::default()
        };
        assert_eq!(
            schedule.validate(),
            Err(FeeScheduleError::TooHigh {
                name: "swap_fee_bps + tax_bps",
                total: 11_000
            })
        );
        let schedule = FeeSchedule {
            margin_fee_bps: 10_000,
            ..Default::default()
        };
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn test_fee_schedule_defaults_from_toml() {
        let schedule: FeeSchedule = toml::from_str("swap_fee_bps = 25").unwrap();
        assert_eq!(schedule.swap_fee_bps, 25);
        assert_eq!(schedule.tax_bps, 50);
        assert_eq!(schedule.swap_fee_bps(true), 1);
        assert_eq!(schedule.swap_tax_bps(true), 5);
    }
}
