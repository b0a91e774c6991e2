//! Staking and vesting previews.

use alloy::primitives::U256;
use thiserror::Error;
use vwave_core::constants::BASIS_POINTS_DIVISOR;

/// Why a stake, unstake or vester deposit amount is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Enter an amount")]
    EnterAmount,
    #[error("Max amount exceeded")]
    MaxAmountExceeded,
    #[error("Insufficient staked tokens")]
    InsufficientStakedTokens,
}

/// Validate a stake or unstake amount against an optional maximum.
pub fn validate_amount(amount: Option<U256>, max_amount: Option<U256>) -> Result<U256, AmountError> {
    let amount = amount.filter(|a| !a.is_zero()).ok_or(AmountError::EnterAmount)?;
    if max_amount.is_some_and(|max| amount > max) {
        return Err(AmountError::MaxAmountExceeded);
    }
    Ok(amount)
}

/// Multiplier points burned by unstaking and the resulting reward cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnstakePreview {
    pub burn_amount: U256,
    /// Reduction of fee rewards, basis points.
    pub reward_reduction_bps: U256,
}

/// Unstaking `amount` burns a proportional share of multiplier points.
pub fn unstake_preview(amount: U256, multiplier_points: U256, bonus_vwave_in_fee_vwave: U256) -> UnstakePreview {
    if multiplier_points.is_zero() || amount.is_zero() || bonus_vwave_in_fee_vwave.is_zero() {
        return UnstakePreview::default();
    }
    let burn_amount = multiplier_points * amount / bonus_vwave_in_fee_vwave;
    UnstakePreview {
        burn_amount,
        reward_reduction_bps: burn_amount * U256::from(BASIS_POINTS_DIVISOR) / bonus_vwave_in_fee_vwave,
    }
}

/// Vester state relevant to a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VesterPosition {
    pub vested_amount: U256,
    pub average_staked_amount: U256,
    pub max_vestable_amount: U256,
    /// Tokens currently reserved by the vester.
    pub reserve_amount: U256,
    /// Tokens available to be reserved.
    pub max_reserve_amount: U256,
}

/// Reserve requirement after a vester deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VesterDepositPreview {
    pub next_deposit_amount: U256,
    pub next_reserve_amount: U256,
    pub additional_reserve_amount: U256,
}

pub fn vester_deposit_preview(amount: Option<U256>, vester: &VesterPosition) -> VesterDepositPreview {
    let mut preview = VesterDepositPreview {
        next_deposit_amount: vester.vested_amount,
        next_reserve_amount: vester.reserve_amount,
        additional_reserve_amount: U256::ZERO,
    };
    let Some(amount) = amount else {
        return preview;
    };
    preview.next_deposit_amount = vester.vested_amount + amount;

    if !vester.average_staked_amount.is_zero() && !vester.max_vestable_amount.is_zero() {
        preview.next_reserve_amount =
            preview.next_deposit_amount * vester.average_staked_amount / vester.max_vestable_amount;
        if preview.next_reserve_amount > vester.reserve_amount {
            preview.additional_reserve_amount = preview.next_reserve_amount - vester.reserve_amount;
        }
    }
    preview
}

/// Validate a vester deposit, returning the amount on success.
pub fn validate_vester_deposit(
    amount: Option<U256>,
    max_amount: Option<U256>,
    vester: &VesterPosition,
) -> Result<U256, AmountError> {
    let amount = validate_amount(amount, max_amount)?;
    let preview = vester_deposit_preview(Some(amount), vester);
    if preview.next_reserve_amount > vester.max_reserve_amount {
        return Err(AmountError::InsufficientStakedTokens);
    }
    Ok(amount)
}

/// VWAVE that can be unstaked without breaking vester reservations.
pub fn max_unstakeable_vwave(
    total_reward_tokens: U256,
    vester_pair_amount: U256,
    multiplier_points: U256,
    bonus_vwave_in_fee_vwave: U256,
) -> U256 {
    let available = total_reward_tokens.saturating_sub(vester_pair_amount);
    let divisor = multiplier_points + bonus_vwave_in_fee_vwave;
    if divisor.is_zero() {
        return U256::ZERO;
    }
    available * bonus_vwave_in_fee_vwave / divisor
}

#[cfg(test)]
mod tests {
    use super::*;
    use vwave_core::amount::expand_decimals;

    #[test]
    fn test_unstake_preview() {
        let preview = unstake_preview(expand_decimals(100, 18), expand_decimals(50, 18), expand_decimals(1_000, 18));
        assert_eq!(preview.burn_amount, expand_decimals(5, 18));
        // 5 / 1000 = 0.5%
        assert_eq!(preview.reward_reduction_bps, U256::from(50));

        assert_eq!(unstake_preview(U256::ZERO, U256::from(1), U256::from(1)), UnstakePreview::default());
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(None, None), Err(AmountError::EnterAmount));
        assert_eq!(validate_amount(Some(U256::ZERO), None), Err(AmountError::EnterAmount));
        assert_eq!(
            validate_amount(Some(U256::from(11)), Some(U256::from(10))),
            Err(AmountError::MaxAmountExceeded)
        );
        assert_eq!(validate_amount(Some(U256::from(10)), Some(U256::from(10))), Ok(U256::from(10)));
    }

    #[test]
    fn test_vester_deposit_requires_reserve() {
        let vester = VesterPosition {
            vested_amount: expand_decimals(100, 18),
            average_staked_amount: expand_decimals(400, 18),
            max_vestable_amount: expand_decimals(200, 18),
            reserve_amount: expand_decimals(200, 18),
            max_reserve_amount: expand_decimals(300, 18),
        };
        let preview = vester_deposit_preview(Some(expand_decimals(50, 18)), &vester);
        // (100 + 50) * 400 / 200 = 300
        assert_eq!(preview.next_reserve_amount, expand_decimals(300, 18));
        assert_eq!(preview.additional_reserve_amount, expand_decimals(100, 18));
        assert!(validate_vester_deposit(Some(expand_decimals(50, 18)), None, &vester).is_ok());
        assert_eq!(
            validate_vester_deposit(Some(expand_decimals(51, 18)), None, &vester),
            Err(AmountError::InsufficientStakedTokens)
        );
    }

    #[test]
    fn test_max_unstakeable_vwave() {
        let max = max_unstakeable_vwave(
            expand_decimals(1_000, 18),
            expand_decimals(200, 18),
            expand_decimals(100, 18),
            expand_decimals(900, 18),
        );
        // 800 * 900 / 1000
        assert_eq!(max, expand_decimals(720, 18));
        assert_eq!(max_unstakeable_vwave(U256::ZERO, U256::ZERO, U256::ZERO, U256::ZERO), U256::ZERO);
    }
}
