//! Reward router, vester and ERC-20 transactions.

use crate::request::{TxMessages, TxRequest};
use alloy::primitives::{Address, U256};
use vwave_core::ChainConfig;
use vwave_rpc::abi::{IRewardRouter, IVester, IERC20};
use vwave_rpc::{ContractReader, RpcResult};

/// Tokens staked through the reward router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeToken {
    Vwave,
    EsVwave,
}

impl StakeToken {
    pub fn address(&self, chain: &ChainConfig) -> Address {
        match self {
            StakeToken::Vwave => chain.contracts.vwave,
            StakeToken::EsVwave => chain.contracts.es_vwave,
        }
    }
}

pub fn stake(chain: &ChainConfig, token: StakeToken, amount: U256) -> TxRequest {
    let router = chain.contracts.reward_router;
    let request = match token {
        StakeToken::Vwave => TxRequest::new(router, &IRewardRouter::stakeVwaveCall { amount }),
        StakeToken::EsVwave => TxRequest::new(router, &IRewardRouter::stakeEsVwaveCall { amount }),
    };
    request.with_messages(TxMessages::new("Stake submitted!", None, "Stake failed."))
}

pub fn unstake(chain: &ChainConfig, token: StakeToken, amount: U256) -> TxRequest {
    let router = chain.contracts.reward_router;
    let request = match token {
        StakeToken::Vwave => TxRequest::new(router, &IRewardRouter::unstakeVwaveCall { amount }),
        StakeToken::EsVwave => TxRequest::new(router, &IRewardRouter::unstakeEsVwaveCall { amount }),
    };
    request.with_messages(TxMessages::new("Unstake submitted!", Some("Unstake completed!"), "Unstake failed."))
}

/// Choices offered by the claim and compound dialogs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardOptions {
    pub claim_vwave: bool,
    pub stake_vwave: bool,
    pub claim_es_vwave: bool,
    pub stake_es_vwave: bool,
    pub stake_multiplier_points: bool,
    pub claim_weth: bool,
    pub convert_weth: bool,
}

/// Staking a reward implies claiming it; converting WETH implies claiming it.
pub fn compound(chain: &ChainConfig, options: &RewardOptions) -> TxRequest {
    let call = IRewardRouter::handleRewardsCall {
        shouldClaimVwave: options.claim_vwave || options.stake_vwave,
        shouldStakeVwave: options.stake_vwave,
        shouldClaimEsVwave: options.claim_es_vwave || options.stake_es_vwave,
        shouldStakeEsVwave: options.stake_es_vwave,
        shouldStakeMultiplierPoints: options.stake_multiplier_points,
        shouldClaimWeth: options.claim_weth || options.convert_weth,
        shouldConvertWethToEth: options.convert_weth,
    };
    TxRequest::new(chain.contracts.reward_router, &call).with_messages(TxMessages::new(
        "Compound submitted!",
        Some("Compound completed!"),
        "Compound failed.",
    ))
}

/// Claim without staking anything.
pub fn claim(chain: &ChainConfig, options: &RewardOptions) -> TxRequest {
    let call = IRewardRouter::handleRewardsCall {
        shouldClaimVwave: options.claim_vwave,
        shouldStakeVwave: false,
        shouldClaimEsVwave: options.claim_es_vwave,
        shouldStakeEsVwave: false,
        shouldStakeMultiplierPoints: false,
        shouldClaimWeth: options.claim_weth,
        shouldConvertWethToEth: options.convert_weth,
    };
    TxRequest::new(chain.contracts.reward_router, &call).with_messages(TxMessages::new(
        "Claim submitted.",
        Some("Claim completed!"),
        "Claim failed.",
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VesterKind {
    Vwave,
    Vlp,
}

impl VesterKind {
    pub fn address(&self, chain: &ChainConfig) -> Address {
        match self {
            VesterKind::Vwave => chain.contracts.vwave_vester,
            VesterKind::Vlp => chain.contracts.vlp_vester,
        }
    }
}

pub fn vester_deposit(chain: &ChainConfig, vester: VesterKind, amount: U256) -> TxRequest {
    TxRequest::new(vester.address(chain), &IVester::depositCall { amount }).with_messages(TxMessages::new(
        "Deposit submitted!",
        Some("Deposited!"),
        "Deposit failed!",
    ))
}

pub fn vester_withdraw(chain: &ChainConfig, vester: VesterKind) -> TxRequest {
    TxRequest::new(vester.address(chain), &IVester::withdrawCall {}).with_messages(TxMessages::new(
        "Withdraw submitted.",
        Some("Withdrawn!"),
        "Withdraw failed.",
    ))
}

/// First step of moving staked positions to another account.
pub fn signal_transfer(chain: &ChainConfig, receiver: Address) -> TxRequest {
    TxRequest::new(chain.contracts.reward_router, &IRewardRouter::signalTransferCall { receiver })
        .with_messages(TxMessages::new("Transfer submitted!", None, "Transfer failed."))
}

pub fn accept_transfer(chain: &ChainConfig, sender: Address) -> TxRequest {
    TxRequest::new(chain.contracts.reward_router, &IRewardRouter::acceptTransferCall { sender }).with_messages(
        TxMessages::new("Transfer submitted!", Some("Transfer completed!"), "Transfer failed."),
    )
}

/// Unlimited approval of `spender`.
pub fn approve(token: Address, spender: Address, symbol: Option<&str>) -> TxRequest {
    let call = IERC20::approveCall {
        spender,
        amount: U256::MAX,
    };
    let success = symbol.map(|s| format!("{s} Approved!"));
    TxRequest::new(token, &call).with_messages(TxMessages {
        sent: Some("Approval submitted!".to_string()),
        success,
        fail: Some("Approval failed".to_string()),
    })
}

pub fn transfer(token: Address, to: Address, amount: U256) -> TxRequest {
    TxRequest::new(token, &IERC20::transferCall { to, amount }).with_messages(TxMessages::new(
        "Transfer submitted!",
        Some("Transfer completed!"),
        "Transfer failed.",
    ))
}

/// Approval is needed when the spend exceeds the allowance. Unknown
/// values never require it.
pub fn needs_approval(allowance: Option<U256>, amount: Option<U256>) -> bool {
    matches!((allowance, amount), (Some(allowance), Some(amount)) if amount > allowance)
}

pub async fn fetch_allowance(
    reader: &ContractReader,
    token: Address,
    owner: Address,
    spender: Address,
) -> RpcResult<U256> {
    Ok(reader
        .call(token, &IERC20::allowanceCall { owner, spender })
        .await?
        ._0)
}

/// Buy VLP with `token`; the native token is sent as value.
pub fn mint_and_stake_vlp(chain: &ChainConfig, token: Address, amount: U256, min_usdg: U256, min_vlp: U256) -> TxRequest {
    let router = chain.contracts.reward_router;
    let request = if token == Address::ZERO {
        TxRequest::new(
            router,
            &IRewardRouter::mintAndStakeVlpETHCall {
                minUsdg: min_usdg,
                minVlp: min_vlp,
            },
        )
        .with_value(amount)
    } else {
        TxRequest::new(
            router,
            &IRewardRouter::mintAndStakeVlpCall {
                token,
                amount,
                minUsdg: min_usdg,
                minVlp: min_vlp,
            },
        )
    };
    request.with_messages(TxMessages::new("Buy submitted.", Some("VLP bought!"), "Buy failed."))
}

/// Sell VLP for `token_out`; the native token is unwrapped to `receiver`.
pub fn unstake_and_redeem_vlp(
    chain: &ChainConfig,
    token_out: Address,
    vlp_amount: U256,
    min_out: U256,
    receiver: Address,
) -> TxRequest {
    let router = chain.contracts.reward_router;
    let request = if token_out == Address::ZERO {
        TxRequest::new(
            router,
            &IRewardRouter::unstakeAndRedeemVlpETHCall {
                vlpAmount: vlp_amount,
                minOut: min_out,
                receiver,
            },
        )
    } else {
        TxRequest::new(
            router,
            &IRewardRouter::unstakeAndRedeemVlpCall {
                tokenOut: token_out,
                vlpAmount: vlp_amount,
                minOut: min_out,
                receiver,
            },
        )
    };
    request.with_messages(TxMessages::new("Sell submitted!", Some("VLP sold!"), "Sell failed."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolCall;
    use vwave_core::ContractAddresses;

    fn chain() -> ChainConfig {
        ChainConfig {
            chain_id: vwave_core::constants::AURORA,
            native_symbol: "ETH".to_string(),
            contracts: ContractAddresses {
                reward_router: Address::repeat_byte(0xa1),
                vwave: Address::repeat_byte(0xa2),
                es_vwave: Address::repeat_byte(0xa3),
                vwave_vester: Address::repeat_byte(0xa4),
                vlp_vester: Address::repeat_byte(0xa5),
                ..Default::default()
            },
            tokens: vec![],
            execution_fees: Default::default(),
            gas: Default::default(),
        }
    }

    #[test]
    fn test_stake_selects_method() {
        let chain = chain();
        assert_eq!(stake(&chain, StakeToken::Vwave, U256::from(1)).action, "stakeVwave");
        assert_eq!(stake(&chain, StakeToken::EsVwave, U256::from(1)).action, "stakeEsVwave");
        let request = unstake(&chain, StakeToken::EsVwave, U256::from(1));
        assert_eq!(request.action, "unstakeEsVwave");
        assert_eq!(request.to, chain.contracts.reward_router);
        assert_eq!(request.messages.success(), "Unstake completed!");
        assert_eq!(StakeToken::EsVwave.address(&chain), chain.contracts.es_vwave);
    }

    #[test]
    fn test_compound_implies_claim() {
        let request = compound(
            &chain(),
            &RewardOptions {
                stake_vwave: true,
                convert_weth: true,
                ..Default::default()
            },
        );
        let call = IRewardRouter::handleRewardsCall::abi_decode(&request.data, true).unwrap();
        assert!(call.shouldClaimVwave);
        assert!(call.shouldStakeVwave);
        assert!(!call.shouldClaimEsVwave);
        assert!(call.shouldClaimWeth);
        assert!(call.shouldConvertWethToEth);
    }

    #[test]
    fn test_claim_never_stakes() {
        let options = RewardOptions {
            claim_vwave: true,
            stake_vwave: true,
            stake_multiplier_points: true,
            ..Default::default()
        };
        let call = IRewardRouter::handleRewardsCall::abi_decode(&claim(&chain(), &options).data, true).unwrap();
        assert!(call.shouldClaimVwave);
        assert!(!call.shouldStakeVwave);
        assert!(!call.shouldStakeMultiplierPoints);
    }

    #[test]
    fn test_vester_targets() {
        let chain = chain();
        assert_eq!(vester_deposit(&chain, VesterKind::Vlp, U256::from(5)).to, chain.contracts.vlp_vester);
        let request = vester_withdraw(&chain, VesterKind::Vwave);
        assert_eq!(request.to, chain.contracts.vwave_vester);
        assert_eq!(request.data.len(), 4);
    }

    #[test]
    fn test_approve_max() {
        let token = Address::repeat_byte(0x33);
        let request = approve(token, Address::repeat_byte(0x44), Some("USDC"));
        let call = IERC20::approveCall::abi_decode(&request.data, true).unwrap();
        assert_eq!(call.amount, U256::MAX);
        assert_eq!(request.to, token);
        assert_eq!(request.messages.success(), "USDC Approved!");
    }

    #[test]
    fn test_needs_approval() {
        assert!(needs_approval(Some(U256::from(10)), Some(U256::from(11))));
        assert!(!needs_approval(Some(U256::from(10)), Some(U256::from(10))));
        assert!(!needs_approval(None, Some(U256::from(10))));
        assert!(!needs_approval(Some(U256::ZERO), None));
    }

    #[test]
    fn test_vlp_native_variants() {
        let chain = chain();
        let request = mint_and_stake_vlp(&chain, Address::ZERO, U256::from(7), U256::ZERO, U256::ZERO);
        assert_eq!(request.action, "mintAndStakeVlpETH");
        assert_eq!(request.value, U256::from(7));

        let request = mint_and_stake_vlp(&chain, Address::repeat_byte(1), U256::from(7), U256::ZERO, U256::ZERO);
        assert_eq!(request.action, "mintAndStakeVlp");
        assert_eq!(request.value, U256::ZERO);

        let request = unstake_and_redeem_vlp(&chain, Address::ZERO, U256::from(7), U256::ZERO, Address::repeat_byte(9));
        assert_eq!(request.action, "unstakeAndRedeemVlpETH");
    }
}
