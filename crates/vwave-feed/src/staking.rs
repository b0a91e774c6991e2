//! Staking, vesting and reward aggregation.
//!
//! The reader contracts return flat arrays with a fixed stride per entry;
//! the `*_data` functions slice them into named structs and
//! `processed_data` derives the USD values and APRs shown on the earn page.

use crate::server::ServerClient;
use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tracing::{debug, warn};
use vwave_core::amount::pow10;
use vwave_core::constants::{BASIS_POINTS_DIVISOR, SECONDS_PER_YEAR, VLP_DECIMALS};
use vwave_core::ChainConfig;
use vwave_rpc::abi::{IReader, IRewardReader, IVault, IVlpManager, IERC20};
use vwave_rpc::{ContractReader, RpcResult};

const BALANCE_PROPS_LENGTH: usize = 2;
const STAKING_PROPS_LENGTH: usize = 5;
const VESTING_PROPS_LENGTH: usize = 7;
const DEPOSIT_BALANCES_LENGTH: usize = 6;

/// One value per wallet token, in `getTokenBalancesWithSupplies` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletTokenAmounts {
    pub vwave: U256,
    pub es_vwave: U256,
    pub vlp: U256,
    pub staked_vwave_tracker: U256,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceAndSupply {
    pub balances: WalletTokenAmounts,
    pub supplies: WalletTokenAmounts,
}

/// Split `[balance, supply]` pairs for vwave, esVwave, vlp and the staked tracker.
pub fn balance_and_supply_data(raw: &[U256]) -> Option<BalanceAndSupply> {
    if raw.len() < 4 * BALANCE_PROPS_LENGTH {
        return None;
    }
    let pick = |offset: usize| WalletTokenAmounts {
        vwave: raw[offset],
        es_vwave: raw[BALANCE_PROPS_LENGTH + offset],
        vlp: raw[2 * BALANCE_PROPS_LENGTH + offset],
        staked_vwave_tracker: raw[3 * BALANCE_PROPS_LENGTH + offset],
    };
    Some(BalanceAndSupply {
        balances: pick(0),
        supplies: pick(1),
    })
}

/// Token amounts deposited into each reward tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepositBalances {
    pub vwave_in_staked_vwave: U256,
    pub es_vwave_in_staked_vwave: U256,
    pub staked_vwave_in_bonus_vwave: U256,
    pub bonus_vwave_in_fee_vwave: U256,
    pub bn_vwave_in_fee_vwave: U256,
    pub vlp_in_staked_vlp: U256,
}

pub fn deposit_balance_data(raw: &[U256]) -> Option<DepositBalances> {
    if raw.len() < DEPOSIT_BALANCES_LENGTH {
        return None;
    }
    Some(DepositBalances {
        vwave_in_staked_vwave: raw[0],
        es_vwave_in_staked_vwave: raw[1],
        staked_vwave_in_bonus_vwave: raw[2],
        bonus_vwave_in_fee_vwave: raw[3],
        bn_vwave_in_fee_vwave: raw[4],
        vlp_in_staked_vlp: raw[5],
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerInfo {
    pub claimable: U256,
    pub tokens_per_interval: U256,
    pub average_staked_amounts: U256,
    pub cumulative_rewards: U256,
    pub total_supply: U256,
}

impl TrackerInfo {
    fn from_props(props: &[U256]) -> Self {
        Self {
            claimable: props[0],
            tokens_per_interval: props[1],
            average_staked_amounts: props[2],
            cumulative_rewards: props[3],
            total_supply: props[4],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StakingData {
    pub staked_vwave_tracker: TrackerInfo,
    pub bonus_vwave_tracker: TrackerInfo,
    pub fee_vwave_tracker: TrackerInfo,
    pub staked_vlp_tracker: TrackerInfo,
    pub fee_vlp_tracker: TrackerInfo,
}

pub fn staking_data(raw: &[U256]) -> Option<StakingData> {
    if raw.len() < 5 * STAKING_PROPS_LENGTH {
        return None;
    }
    let mut chunks = raw.chunks_exact(STAKING_PROPS_LENGTH).map(TrackerInfo::from_props);
    Some(StakingData {
        staked_vwave_tracker: chunks.next()?,
        bonus_vwave_tracker: chunks.next()?,
        fee_vwave_tracker: chunks.next()?,
        staked_vlp_tracker: chunks.next()?,
        fee_vlp_tracker: chunks.next()?,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VesterInfo {
    pub pair_amount: U256,
    pub vested_amount: U256,
    pub escrowed_balance: U256,
    pub claimed_amounts: U256,
    pub claimable: U256,
    pub max_vestable_amount: U256,
    pub average_staked_amount: U256,
}

impl VesterInfo {
    fn from_props(props: &[U256]) -> Self {
        Self {
            pair_amount: props[0],
            vested_amount: props[1],
            escrowed_balance: props[2],
            claimed_amounts: props[3],
            claimable: props[4],
            max_vestable_amount: props[5],
            average_staked_amount: props[6],
        }
    }

    /// Claimed plus still claimable.
    pub fn claim_sum(&self) -> U256 {
        self.claimed_amounts + self.claimable
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VestingData {
    pub vwave_vester: VesterInfo,
    pub vlp_vester: VesterInfo,
}

pub fn vesting_data(raw: &[U256]) -> Option<VestingData> {
    if raw.len() < 2 * VESTING_PROPS_LENGTH {
        return None;
    }
    Some(VestingData {
        vwave_vester: VesterInfo::from_props(&raw[..VESTING_PROPS_LENGTH]),
        vlp_vester: VesterInfo::from_props(&raw[VESTING_PROPS_LENGTH..2 * VESTING_PROPS_LENGTH]),
    })
}

/// Everything `processed_data` needs. Any `None` means the page has no data yet.
#[derive(Debug, Clone, Default)]
pub struct StakingInputs {
    pub balance_and_supply: Option<BalanceAndSupply>,
    pub deposit_balances: Option<DepositBalances>,
    pub staking: Option<StakingData>,
    pub vesting: Option<VestingData>,
    /// VLP manager AUM, USD with 30 decimals.
    pub aum: Option<U256>,
    pub native_token_price: Option<U256>,
    pub staked_vwave_supply: Option<U256>,
    pub vwave_price: Option<U256>,
    pub vwave_supply: Option<U256>,
    pub es_vwave_supply: Option<U256>,
}

/// Derived staking figures. USD values carry 30 decimals, APRs are basis points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedData {
    pub vwave_balance: U256,
    pub vwave_balance_usd: U256,
    pub vwave_supply: U256,
    pub vwave_supply_usd: U256,
    pub staked_vwave_supply: U256,
    pub staked_vwave_supply_usd: U256,
    pub vwave_in_staked_vwave: U256,
    pub vwave_in_staked_vwave_usd: U256,
    pub es_vwave_balance: U256,
    pub es_vwave_balance_usd: U256,
    pub staked_vwave_tracker_supply: U256,
    pub staked_vwave_tracker_supply_usd: U256,
    pub staked_es_vwave_supply: U256,
    pub staked_es_vwave_supply_usd: U256,
    pub es_vwave_in_staked_vwave: U256,
    pub es_vwave_in_staked_vwave_usd: U256,
    pub bn_vwave_in_fee_vwave: U256,
    pub bonus_vwave_in_fee_vwave: U256,
    pub fee_vwave_supply: U256,
    pub fee_vwave_supply_usd: U256,
    pub staked_vwave_tracker_rewards: U256,
    pub staked_vwave_tracker_rewards_usd: U256,
    pub bonus_vwave_tracker_rewards: U256,
    pub fee_vwave_tracker_rewards: U256,
    pub fee_vwave_tracker_rewards_usd: U256,
    pub boost_basis_points: U256,
    pub staked_vwave_tracker_annual_rewards_usd: U256,
    pub vwave_apr_for_es_vwave: U256,
    pub fee_vwave_tracker_annual_rewards_usd: U256,
    pub vwave_apr_for_native_token: U256,
    pub vwave_boost_apr_for_native_token: U256,
    pub vwave_apr_total: U256,
    pub vwave_apr_total_with_boost: U256,
    pub vwave_apr_for_native_token_with_boost: U256,
    pub total_vwave_rewards_usd: U256,
    pub vlp_supply: U256,
    pub vlp_price: U256,
    pub vlp_supply_usd: U256,
    pub vlp_balance: U256,
    pub vlp_balance_usd: U256,
    pub staked_vlp_tracker_rewards: U256,
    pub staked_vlp_tracker_rewards_usd: U256,
    pub fee_vlp_tracker_rewards: U256,
    pub fee_vlp_tracker_rewards_usd: U256,
    pub staked_vlp_tracker_annual_rewards_usd: U256,
    pub vlp_apr_for_es_vwave: U256,
    pub fee_vlp_tracker_annual_rewards_usd: U256,
    pub vlp_apr_for_native_token: U256,
    pub vlp_apr_total: U256,
    pub total_vlp_rewards_usd: U256,
    pub total_es_vwave_rewards: U256,
    pub total_es_vwave_rewards_usd: U256,
    pub vwave_vester_rewards: U256,
    pub vlp_vester_rewards: U256,
    pub total_vester_rewards: U256,
    pub total_vester_rewards_usd: U256,
    pub total_native_token_rewards: U256,
    pub total_native_token_rewards_usd: U256,
    pub total_rewards_usd: U256,
}

/// `numerator * 10000 / denominator`, zero when the denominator is zero.
fn apr(annual_usd: U256, supply_usd: U256) -> U256 {
    if supply_usd.is_zero() {
        U256::ZERO
    } else {
        annual_usd * U256::from(BASIS_POINTS_DIVISOR) / supply_usd
    }
}

pub fn processed_data(inputs: &StakingInputs) -> Option<ProcessedData> {
    let BalanceAndSupply { balances, supplies } = inputs.balance_and_supply?;
    let deposits = inputs.deposit_balances?;
    let staking = inputs.staking?;
    let vesting = inputs.vesting?;
    let aum = inputs.aum?;
    let native_price = inputs.native_token_price?;
    let staked_vwave_supply = inputs.staked_vwave_supply?;
    let vwave_price = inputs.vwave_price?;
    let vwave_supply = inputs.vwave_supply?;

    let unit = pow10(18);
    let bps = U256::from(BASIS_POINTS_DIVISOR);
    let year = U256::from(SECONDS_PER_YEAR);
    let at_vwave = |amount: U256| amount * vwave_price / unit;
    let at_native = |amount: U256| amount * native_price / unit;

    let mut d = ProcessedData {
        vwave_balance: balances.vwave,
        vwave_balance_usd: at_vwave(balances.vwave),
        vwave_supply,
        vwave_supply_usd: U256::ZERO,
        staked_vwave_supply,
        staked_vwave_supply_usd: at_vwave(staked_vwave_supply),
        vwave_in_staked_vwave: deposits.vwave_in_staked_vwave,
        vwave_in_staked_vwave_usd: at_vwave(deposits.vwave_in_staked_vwave),
        es_vwave_balance: balances.es_vwave,
        es_vwave_balance_usd: at_vwave(balances.es_vwave),
        staked_vwave_tracker_supply: supplies.staked_vwave_tracker,
        staked_vwave_tracker_supply_usd: at_vwave(supplies.staked_vwave_tracker),
        ..Default::default()
    };

    d.staked_es_vwave_supply = d.staked_vwave_tracker_supply.saturating_sub(staked_vwave_supply);
    d.staked_es_vwave_supply_usd = at_vwave(d.staked_es_vwave_supply);
    d.es_vwave_in_staked_vwave = deposits.es_vwave_in_staked_vwave;
    d.es_vwave_in_staked_vwave_usd = at_vwave(deposits.es_vwave_in_staked_vwave);

    d.bn_vwave_in_fee_vwave = deposits.bn_vwave_in_fee_vwave;
    d.bonus_vwave_in_fee_vwave = deposits.bonus_vwave_in_fee_vwave;
    d.fee_vwave_supply = staking.fee_vwave_tracker.total_supply;
    d.fee_vwave_supply_usd = at_vwave(d.fee_vwave_supply);

    d.staked_vwave_tracker_rewards = staking.staked_vwave_tracker.claimable;
    d.staked_vwave_tracker_rewards_usd = at_vwave(d.staked_vwave_tracker_rewards);
    d.bonus_vwave_tracker_rewards = staking.bonus_vwave_tracker.claimable;
    d.fee_vwave_tracker_rewards = staking.fee_vwave_tracker.claimable;
    d.fee_vwave_tracker_rewards_usd = at_native(d.fee_vwave_tracker_rewards);

    if !d.bonus_vwave_in_fee_vwave.is_zero() {
        d.boost_basis_points = d.bn_vwave_in_fee_vwave * bps / d.bonus_vwave_in_fee_vwave;
    }

    d.staked_vwave_tracker_annual_rewards_usd = at_vwave(staking.staked_vwave_tracker.tokens_per_interval * year);
    d.vwave_apr_for_es_vwave = apr(d.staked_vwave_tracker_annual_rewards_usd, d.staked_vwave_tracker_supply_usd);
    d.fee_vwave_tracker_annual_rewards_usd = at_native(staking.fee_vwave_tracker.tokens_per_interval * year);
    d.vwave_apr_for_native_token = apr(d.fee_vwave_tracker_annual_rewards_usd, d.fee_vwave_supply_usd);
    d.vwave_boost_apr_for_native_token = d.vwave_apr_for_native_token * d.boost_basis_points / bps;
    d.vwave_apr_total = d.vwave_apr_for_native_token + d.vwave_apr_for_es_vwave;
    d.vwave_apr_total_with_boost = d.vwave_apr_total + d.vwave_boost_apr_for_native_token;
    d.vwave_apr_for_native_token_with_boost = d.vwave_apr_for_native_token + d.vwave_boost_apr_for_native_token;
    d.total_vwave_rewards_usd = d.staked_vwave_tracker_rewards_usd + d.fee_vwave_tracker_rewards_usd;

    d.vlp_supply = supplies.vlp;
    if !d.vlp_supply.is_zero() {
        d.vlp_price = aum * pow10(VLP_DECIMALS) / d.vlp_supply;
    }
    d.vlp_supply_usd = d.vlp_supply * d.vlp_price / unit;
    d.vlp_balance = deposits.vlp_in_staked_vlp;
    d.vlp_balance_usd = d.vlp_balance * d.vlp_price / pow10(VLP_DECIMALS);

    d.staked_vlp_tracker_rewards = staking.staked_vlp_tracker.claimable;
    d.staked_vlp_tracker_rewards_usd = at_vwave(d.staked_vlp_tracker_rewards);
    d.fee_vlp_tracker_rewards = staking.fee_vlp_tracker.claimable;
    d.fee_vlp_tracker_rewards_usd = at_native(d.fee_vlp_tracker_rewards);

    d.staked_vlp_tracker_annual_rewards_usd = at_vwave(staking.staked_vlp_tracker.tokens_per_interval * year);
    d.vlp_apr_for_es_vwave = apr(d.staked_vlp_tracker_annual_rewards_usd, d.vlp_supply_usd);
    d.fee_vlp_tracker_annual_rewards_usd = at_native(staking.fee_vlp_tracker.tokens_per_interval * year);
    d.vlp_apr_for_native_token = apr(d.fee_vlp_tracker_annual_rewards_usd, d.vlp_supply_usd);
    d.vlp_apr_total = d.vlp_apr_for_native_token + d.vlp_apr_for_es_vwave;
    d.total_vlp_rewards_usd = d.staked_vlp_tracker_rewards_usd + d.fee_vlp_tracker_rewards_usd;

    d.total_es_vwave_rewards = d.staked_vwave_tracker_rewards + d.staked_vlp_tracker_rewards;
    d.total_es_vwave_rewards_usd = d.staked_vwave_tracker_rewards_usd + d.staked_vlp_tracker_rewards_usd;

    d.vwave_vester_rewards = vesting.vwave_vester.claimable;
    d.vlp_vester_rewards = vesting.vlp_vester.claimable;
    d.total_vester_rewards = d.vwave_vester_rewards + d.vlp_vester_rewards;
    d.total_vester_rewards_usd = at_vwave(d.total_vester_rewards);

    d.total_native_token_rewards = d.fee_vwave_tracker_rewards + d.fee_vlp_tracker_rewards;
    d.total_native_token_rewards_usd = d.fee_vwave_tracker_rewards_usd + d.fee_vlp_tracker_rewards_usd;
    d.total_rewards_usd = d.total_es_vwave_rewards_usd + d.total_native_token_rewards_usd + d.total_vester_rewards_usd;

    Some(d)
}

/// Reads every staking source for one account.
pub struct StakingLoader {
    reader: ContractReader,
    server: Arc<ServerClient>,
    chain: Arc<ChainConfig>,
    /// Fixed VWAVE price; when unset the backend index price is used.
    vwave_price: Option<U256>,
}

impl StakingLoader {
    pub fn new(reader: ContractReader, server: Arc<ServerClient>, chain: Arc<ChainConfig>) -> Self {
        Self {
            reader,
            server,
            chain,
            vwave_price: None,
        }
    }

    #[must_use]
    pub fn with_vwave_price(mut self, price: Option<U256>) -> Self {
        self.vwave_price = price;
        self
    }

    pub async fn fetch_balance_and_supply(&self, account: Address) -> RpcResult<Vec<U256>> {
        let c = &self.chain.contracts;
        let call = IReader::getTokenBalancesWithSuppliesCall {
            account,
            tokens: vec![c.vwave, c.es_vwave, c.vlp, c.staked_vwave_tracker],
        };
        Ok(self.reader.call(c.reader, &call).await?._0)
    }

    pub async fn fetch_deposit_balances(&self, account: Address) -> RpcResult<Vec<U256>> {
        let c = &self.chain.contracts;
        let call = IRewardReader::getDepositBalancesCall {
            account,
            depositTokens: vec![
                c.vwave,
                c.es_vwave,
                c.staked_vwave_tracker,
                c.bonus_vwave_tracker,
                c.bn_vwave,
                c.vlp,
            ],
            rewardTrackers: vec![
                c.staked_vwave_tracker,
                c.staked_vwave_tracker,
                c.bonus_vwave_tracker,
                c.fee_vwave_tracker,
                c.fee_vwave_tracker,
                c.fee_vlp_tracker,
            ],
        };
        Ok(self.reader.call(c.reward_reader, &call).await?._0)
    }

    pub async fn fetch_staking_info(&self, account: Address) -> RpcResult<Vec<U256>> {
        let c = &self.chain.contracts;
        let call = IRewardReader::getStakingInfoCall {
            account,
            rewardTrackers: vec![
                c.staked_vwave_tracker,
                c.bonus_vwave_tracker,
                c.fee_vwave_tracker,
                c.staked_vlp_tracker,
                c.fee_vlp_tracker,
            ],
        };
        Ok(self.reader.call(c.reward_reader, &call).await?._0)
    }

    pub async fn fetch_vesting_info(&self, account: Address) -> RpcResult<Vec<U256>> {
        let c = &self.chain.contracts;
        let call = IReader::getVestingInfoCall {
            account,
            vesters: vec![c.vwave_vester, c.vlp_vester],
        };
        Ok(self.reader.call(c.reader, &call).await?._0)
    }

    /// VWAVE held by the staked tracker.
    pub async fn fetch_staked_vwave_supply(&self) -> RpcResult<U256> {
        let c = &self.chain.contracts;
        let call = IERC20::balanceOfCall {
            account: c.staked_vwave_tracker,
        };
        Ok(self.reader.call(c.vwave, &call).await?._0)
    }

    /// Mean of the VLP manager's min and max AUM.
    pub async fn fetch_aum(&self) -> RpcResult<Option<U256>> {
        let aums = self.reader.call(self.chain.contracts.vlp_manager, &IVlpManager::getAumsCall {}).await?._0;
        Ok(match aums.as_slice() {
            [a, b, ..] => Some((*a + *b) / U256::from(2)),
            _ => None,
        })
    }

    pub async fn fetch_native_token_price(&self) -> RpcResult<U256> {
        let c = &self.chain.contracts;
        let call = IVault::getMinPriceCall { token: c.native_token };
        Ok(self.reader.call(c.vault, &call).await?._0)
    }

    /// esVWAVE supply excluding the distributors' undistributed balances.
    pub async fn fetch_es_vwave_supply(&self) -> RpcResult<U256> {
        let c = &self.chain.contracts;
        let call = IReader::getTokenSupplyCall {
            token: c.es_vwave,
            excludedAccounts: vec![c.staked_vwave_distributor, c.staked_vlp_distributor],
        };
        Ok(self.reader.call(c.reader, &call).await?._0)
    }

    async fn fetch_vwave_price(&self) -> Option<U256> {
        if self.vwave_price.is_some() {
            return self.vwave_price;
        }
        match self.server.fetch_index_prices().await {
            Ok(prices) => prices.get(&self.chain.contracts.vwave).copied(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch VWAVE price");
                None
            }
        }
    }

    /// Read every source concurrently. `None` account reads as the zero address.
    pub async fn load(&self, account: Option<Address>) -> StakingInputs {
        let account = account.unwrap_or(Address::ZERO);
        let (balances, deposits, staking, vesting, staked_supply, aum, native_price, es_supply, vwave_supply, vwave_price) = tokio::join!(
            self.fetch_balance_and_supply(account),
            self.fetch_deposit_balances(account),
            self.fetch_staking_info(account),
            self.fetch_vesting_info(account),
            self.fetch_staked_vwave_supply(),
            self.fetch_aum(),
            self.fetch_native_token_price(),
            self.fetch_es_vwave_supply(),
            self.server.fetch_vwave_supply(),
            self.fetch_vwave_price(),
        );

        let inputs = StakingInputs {
            balance_and_supply: ok("balances with supplies", balances).and_then(|r| balance_and_supply_data(&r)),
            deposit_balances: ok("deposit balances", deposits).and_then(|r| deposit_balance_data(&r)),
            staking: ok("staking info", staking).and_then(|r| staking_data(&r)),
            vesting: ok("vesting info", vesting).and_then(|r| vesting_data(&r)),
            aum: ok("aums", aum).flatten(),
            native_token_price: ok("native token price", native_price),
            staked_vwave_supply: ok("staked vwave supply", staked_supply),
            vwave_price,
            vwave_supply: match vwave_supply {
                Ok(supply) => Some(supply),
                Err(e) => {
                    warn!(error = %e, "Failed to fetch VWAVE supply");
                    None
                }
            },
            es_vwave_supply: ok("esVWAVE supply", es_supply),
        };
        debug!(complete = processed_data(&inputs).is_some(), "Staking data loaded");
        inputs
    }
}

fn ok<T>(source: &str, result: RpcResult<T>) -> Option<T> {
    result
        .map_err(|e| warn!(source, error = %e, "Failed to read {source}"))
        .ok()
}
