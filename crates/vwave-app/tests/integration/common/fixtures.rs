//! Config and contract data shared by the integration tests.

use alloy::primitives::{Address, U256};
use vwave_app::AppConfig;
use vwave_core::amount::expand_decimals;
use vwave_core::constants::{USD_DECIMALS, VAULT_PROPS_LENGTH};

pub const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";
pub const WETH: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
pub const USDC: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

pub fn address(value: &str) -> Address {
    value.parse().unwrap()
}

pub fn usd(n: u64) -> U256 {
    expand_decimals(n, USD_DECIMALS)
}

/// ETH (native), WETH and USDC on a deployment whose contracts all live at
/// distinct fixed addresses.
pub fn test_config(rpc_url: &str, fallback_url: Option<&str>, server_url: &str) -> AppConfig {
    let fallback = fallback_url
        .map(|url| format!("fallback_url = \"{url}\"\n"))
        .unwrap_or_default();
    let content = format!(
        r#"
server_url = "{server_url}"
account = "{ACCOUNT}"

[rpc]
primary_url = "{rpc_url}"
wallet_url = "{rpc_url}"
primary_timeout_ms = 500
{fallback}

[contracts]
vault = "0x0000000000000000000000000000000000000001"
vault_reader = "0x0000000000000000000000000000000000000002"
reader = "0x0000000000000000000000000000000000000003"
position_router = "0x0000000000000000000000000000000000000004"
order_book = "0x0000000000000000000000000000000000000005"
order_book_reader = "0x0000000000000000000000000000000000000006"
usdg = "0x0000000000000000000000000000000000000007"
router = "0x0000000000000000000000000000000000000008"
position_manager = "0x0000000000000000000000000000000000000009"
native_token = "{WETH}"

[[tokens]]
address = "0x0000000000000000000000000000000000000000"
symbol = "ETH"
decimals = 18
is_native = true
is_shortable = true

[[tokens]]
address = "{WETH}"
symbol = "WETH"
decimals = 18
is_wrapped = true
is_shortable = true

[[tokens]]
address = "{USDC}"
symbol = "USDC"
decimals = 6
is_stable = true
"#
    );
    AppConfig::from_toml(&content).unwrap()
}

/// Vault props for one token with the given contract price band (USD).
pub fn token_props(min_price: U256, max_price: U256, usdg_amount: U256, weight: u64) -> Vec<U256> {
    let mut props = vec![U256::ZERO; VAULT_PROPS_LENGTH];
    props[0] = expand_decimals(1_000, 18);
    props[2] = usdg_amount;
    props[4] = U256::from(weight);
    props[10] = min_price;
    props[11] = max_price;
    props[13] = max_price;
    props[14] = min_price;
    props
}

/// Props for ETH, WETH and USDC in token list order.
pub fn vault_props(eth_min: U256, eth_max: U256) -> Vec<U256> {
    let usdg = expand_decimals(1_000_000, 18);
    let mut props = token_props(eth_min, eth_max, usdg, 5_000);
    props.extend(token_props(eth_min, eth_max, usdg, 5_000));
    props.extend(token_props(usd(1), usd(1), usdg, 5_000));
    props
}
