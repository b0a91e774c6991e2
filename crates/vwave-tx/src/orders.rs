//! Order book transactions: create, update and cancel limit orders.
//!
//! Paths use `Address::ZERO` for the native token. Creation replaces it
//! with the wrapped address and sets the wrap/unwrap flags and the value
//! sent along with the keeper execution fee.

use crate::error::{TxError, TxResult};
use crate::request::{TxMessages, TxRequest};
use alloy::primitives::{Address, U256};
use vwave_core::{ChainConfig, OrderKind};
use vwave_rpc::abi::{IOrderBook, IPositionManager, IRouter};
use vwave_rpc::{ContractReader, RpcResult};

/// Replace the zero address with the wrapped native token.
pub fn replace_native_token_address(path: &[Address], native_token_address: Address) -> Vec<Address> {
    path.iter()
        .map(|token| {
            if *token == Address::ZERO {
                native_token_address
            } else {
                *token
            }
        })
        .collect()
}

fn check_position_tokens(is_long: bool, index_token: Address, collateral_token: Address) -> TxResult<()> {
    if is_long && index_token != collateral_token {
        return Err(TxError::InvalidOrder("invalid token addresses".to_string()));
    }
    if index_token == Address::ZERO {
        return Err(TxError::InvalidOrder("indexToken is 0".to_string()));
    }
    if collateral_token == Address::ZERO {
        return Err(TxError::InvalidOrder("collateralToken is 0".to_string()));
    }
    Ok(())
}

fn check_path(path: &[Address]) -> TxResult<()> {
    if path.is_empty() {
        return Err(TxError::InvalidOrder("empty path".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOrderParams {
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub min_out: U256,
    pub trigger_ratio: U256,
}

/// Limit swap; executes when the price ratio falls to `trigger_ratio`.
pub fn create_swap_order(chain: &ChainConfig, params: &SwapOrderParams) -> TxResult<TxRequest> {
    check_path(&params.path)?;
    let execution_fee = chain.execution_fees.swap;
    let should_wrap = params.path.first() == Some(&Address::ZERO);
    let should_unwrap = params.path.last() == Some(&Address::ZERO);
    let value = if should_wrap {
        execution_fee + params.amount_in
    } else {
        execution_fee
    };

    let call = IOrderBook::createSwapOrderCall {
        path: replace_native_token_address(&params.path, chain.contracts.native_token),
        amountIn: params.amount_in,
        minOut: params.min_out,
        triggerRatio: params.trigger_ratio,
        triggerAboveThreshold: false,
        executionFee: execution_fee,
        shouldWrap: should_wrap,
        shouldUnwrap: should_unwrap,
    };
    Ok(TxRequest::new(chain.contracts.order_book, &call)
        .with_value(value)
        .with_messages(TxMessages::new("Limit order submitted!", Some("Limit order created!"), "Limit order creation failed.")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncreaseOrderParams {
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub index_token: Address,
    pub min_out: U256,
    pub size_delta: U256,
    pub collateral_token: Address,
    pub is_long: bool,
    pub trigger_price: U256,
}

/// Limit increase; longs trigger below the price, shorts above.
pub fn create_increase_order(chain: &ChainConfig, params: &IncreaseOrderParams) -> TxResult<TxRequest> {
    check_position_tokens(params.is_long, params.index_token, params.collateral_token)?;
    check_path(&params.path)?;

    let from_native = params.path.first() == Some(&Address::ZERO);
    let execution_fee = chain.execution_fees.increase;
    let value = if from_native {
        params.amount_in + execution_fee
    } else {
        execution_fee
    };

    let call = IOrderBook::createIncreaseOrderCall {
        path: replace_native_token_address(&params.path, chain.contracts.native_token),
        amountIn: params.amount_in,
        indexToken: params.index_token,
        minOut: params.min_out,
        sizeDelta: params.size_delta,
        collateralToken: params.collateral_token,
        isLong: params.is_long,
        triggerPrice: params.trigger_price,
        triggerAboveThreshold: !params.is_long,
        executionFee: execution_fee,
        shouldWrap: from_native,
    };
    Ok(TxRequest::new(chain.contracts.order_book, &call)
        .with_value(value)
        .with_messages(TxMessages::new("Limit order submitted!", Some("Limit order created!"), "Limit order creation failed.")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecreaseOrderParams {
    pub index_token: Address,
    pub size_delta: U256,
    pub collateral_token: Address,
    pub collateral_delta: U256,
    pub is_long: bool,
    pub trigger_price: U256,
    pub trigger_above_threshold: bool,
}

pub fn create_decrease_order(chain: &ChainConfig, params: &DecreaseOrderParams) -> TxResult<TxRequest> {
    check_position_tokens(params.is_long, params.index_token, params.collateral_token)?;

    let call = IOrderBook::createDecreaseOrderCall {
        indexToken: params.index_token,
        sizeDelta: params.size_delta,
        collateralToken: params.collateral_token,
        collateralDelta: params.collateral_delta,
        isLong: params.is_long,
        triggerPrice: params.trigger_price,
        triggerAboveThreshold: params.trigger_above_threshold,
    };
    Ok(TxRequest::new(chain.contracts.order_book, &call)
        .with_value(chain.execution_fees.decrease)
        .with_messages(TxMessages::new("Order submitted!", Some("Order created!"), "Order creation failed.")))
}

fn cancel_messages() -> TxMessages {
    TxMessages::new("Cancel submitted.", Some("Order cancelled."), "Cancel failed.")
}

pub fn cancel_order(chain: &ChainConfig, kind: OrderKind, index: u64) -> TxRequest {
    let order_book = chain.contracts.order_book;
    let order_index = U256::from(index);
    let request = match kind {
        OrderKind::Swap => TxRequest::new(order_book, &IOrderBook::cancelSwapOrderCall { orderIndex: order_index }),
        OrderKind::Increase => {
            TxRequest::new(order_book, &IOrderBook::cancelIncreaseOrderCall { orderIndex: order_index })
        }
        OrderKind::Decrease => {
            TxRequest::new(order_book, &IOrderBook::cancelDecreaseOrderCall { orderIndex: order_index })
        }
    };
    request.with_messages(cancel_messages())
}

/// Cancel several orders in one transaction.
pub fn cancel_multiple(chain: &ChainConfig, orders: &[(OrderKind, u64)]) -> TxRequest {
    let indexes = |kind: OrderKind| -> Vec<U256> {
        orders
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, index)| U256::from(*index))
            .collect()
    };
    let call = IOrderBook::cancelMultipleCall {
        swapOrderIndexes: indexes(OrderKind::Swap),
        increaseOrderIndexes: indexes(OrderKind::Increase),
        decreaseOrderIndexes: indexes(OrderKind::Decrease),
    };
    TxRequest::new(chain.contracts.order_book, &call).with_messages(TxMessages::new(
        "Cancel submitted.",
        Some("Orders cancelled."),
        "Cancel failed.",
    ))
}

/// Parse `"{kind}-{index}"` keys as shown in order lists.
pub fn parse_cancel_key(key: &str) -> TxResult<(OrderKind, u64)> {
    let (kind, index) = key
        .split_once('-')
        .ok_or_else(|| TxError::InvalidOrder(format!("bad order key {key}")))?;
    let kind: OrderKind = kind
        .parse()
        .map_err(|_| TxError::InvalidOrder(format!("bad order type in {key}")))?;
    let index = index
        .rsplit('-')
        .next()
        .and_then(|i| i.parse().ok())
        .ok_or_else(|| TxError::InvalidOrder(format!("bad order index in {key}")))?;
    Ok((kind, index))
}

/// Let `plugin` move funds through the router on the sender's behalf.
pub fn approve_plugin(chain: &ChainConfig, plugin: Address) -> TxRequest {
    TxRequest::new(chain.contracts.router, &IRouter::approvePluginCall { plugin }).with_messages(TxMessages::new(
        "Enable orders sent.",
        Some("Orders enabled!"),
        "Enable orders failed.",
    ))
}

/// The order book must be an approved plugin before any order is created.
pub fn approve_order_book(chain: &ChainConfig) -> TxRequest {
    approve_plugin(chain, chain.contracts.order_book)
}

pub async fn is_plugin_approved(
    reader: &ContractReader,
    chain: &ChainConfig,
    account: Address,
    plugin: Address,
) -> RpcResult<bool> {
    Ok(reader
        .call(chain.contracts.router, &IRouter::approvedPluginsCall { account, plugin })
        .await?
        ._0)
}

/// Execute another account's order through the position manager; the
/// keeper fee goes to `fee_receiver`.
pub fn execute_order(
    chain: &ChainConfig,
    kind: OrderKind,
    account: Address,
    index: u64,
    fee_receiver: Address,
) -> TxRequest {
    let position_manager = chain.contracts.position_manager;
    let order_index = U256::from(index);
    let request = match kind {
        OrderKind::Swap => TxRequest::new(
            position_manager,
            &IPositionManager::executeSwapOrderCall {
                account,
                orderIndex: order_index,
                feeReceiver: fee_receiver,
            },
        ),
        OrderKind::Increase => TxRequest::new(
            position_manager,
            &IPositionManager::executeIncreaseOrderCall {
                account,
                orderIndex: order_index,
                feeReceiver: fee_receiver,
            },
        ),
        OrderKind::Decrease => TxRequest::new(
            position_manager,
            &IPositionManager::executeDecreaseOrderCall {
                account,
                orderIndex: order_index,
                feeReceiver: fee_receiver,
            },
        ),
    };
    request.with_messages(TxMessages::new(
        "Execution submitted.",
        Some("Order executed!"),
        "Execution failed.",
    ))
}

fn update_messages() -> TxMessages {
    TxMessages::new("Order update submitted!", Some("Order updated!"), "Order update failed.")
}

pub fn update_swap_order(
    chain: &ChainConfig,
    index: u64,
    min_out: U256,
    trigger_ratio: U256,
    trigger_above_threshold: bool,
) -> TxRequest {
    let call = IOrderBook::updateSwapOrderCall {
        orderIndex: U256::from(index),
        minOut: min_out,
        triggerRatio: trigger_ratio,
        triggerAboveThreshold: trigger_above_threshold,
    };
    TxRequest::new(chain.contracts.order_book, &call).with_messages(update_messages())
}

pub fn update_increase_order(
    chain: &ChainConfig,
    index: u64,
    size_delta: U256,
    trigger_price: U256,
    trigger_above_threshold: bool,
) -> TxRequest {
    let call = IOrderBook::updateIncreaseOrderCall {
        orderIndex: U256::from(index),
        sizeDelta: size_delta,
        triggerPrice: trigger_price,
        triggerAboveThreshold: trigger_above_threshold,
    };
    TxRequest::new(chain.contracts.order_book, &call).with_messages(update_messages())
}

pub fn update_decrease_order(
    chain: &ChainConfig,
    index: u64,
    collateral_delta: U256,
    size_delta: U256,
    trigger_price: U256,
    trigger_above_threshold: bool,
) -> TxRequest {
    let call = IOrderBook::updateDecreaseOrderCall {
        orderIndex: U256::from(index),
        collateralDelta: collateral_delta,
        sizeDelta: size_delta,
        triggerPrice: trigger_price,
        triggerAboveThreshold: trigger_above_threshold,
    };
    TxRequest::new(chain.contracts.order_book, &call).with_messages(update_messages())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use alloy::sol_types::SolCall;
    use vwave_core::ContractAddresses;

    const WETH: Address = address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1");
    const USDC: Address = address!("FF970A61A04b1cA14834A43f5dE4533eBDDB5CC8");
    const ORDER_BOOK: Address = address!("09f77E8A13De9a35a7231028187e9fD5DB8a2ACB");
    const ROUTER: Address = address!("aBBc5F99639c9B6bCb58544ddf04EFA6802F4064");
    const POSITION_MANAGER: Address = address!("87a4088Bd721F83b6c2E5102e2FA47022Cb1c831");

    fn chain() -> ChainConfig {
        ChainConfig {
            chain_id: vwave_core::constants::AURORA,
            native_symbol: "ETH".to_string(),
            contracts: ContractAddresses {
                native_token: WETH,
                order_book: ORDER_BOOK,
                router: ROUTER,
                position_manager: POSITION_MANAGER,
                ..Default::default()
            },
            tokens: vec![],
            execution_fees: Default::default(),
            gas: Default::default(),
        }
    }

    #[test]
    fn test_swap_order_from_native_wraps() {
        let chain = chain();
        let request = create_swap_order(
            &chain,
            &SwapOrderParams {
                path: vec![Address::ZERO, USDC],
                amount_in: U256::from(1_000),
                min_out: U256::from(900),
                trigger_ratio: U256::from(7),
            },
        )
        .unwrap();

        assert_eq!(request.to, ORDER_BOOK);
        assert_eq!(request.action, "createSwapOrder");
        assert_eq!(request.value, chain.execution_fees.swap + U256::from(1_000));

        let call = IOrderBook::createSwapOrderCall::abi_decode(&request.data, true).unwrap();
        assert_eq!(call.path, vec![WETH, USDC]);
        assert!(call.shouldWrap);
        assert!(!call.shouldUnwrap);
        assert!(!call.triggerAboveThreshold);
        assert_eq!(call.executionFee, chain.execution_fees.swap);
    }

    #[test]
    fn test_swap_order_to_native_unwraps() {
        let chain = chain();
        let request = create_swap_order(
            &chain,
            &SwapOrderParams {
                path: vec![USDC, Address::ZERO],
                amount_in: U256::from(1_000),
                min_out: U256::ZERO,
                trigger_ratio: U256::from(7),
            },
        )
        .unwrap();
        assert_eq!(request.value, chain.execution_fees.swap);
        let call = IOrderBook::createSwapOrderCall::abi_decode(&request.data, true).unwrap();
        assert!(call.shouldUnwrap);
        assert_eq!(call.path, vec![USDC, WETH]);
    }

    #[test]
    fn test_increase_order_invariants() {
        let chain = chain();
        let mut params = IncreaseOrderParams {
            path: vec![USDC],
            amount_in: U256::from(100),
            index_token: WETH,
            min_out: U256::ZERO,
            size_delta: U256::from(1_000),
            collateral_token: USDC,
            is_long: true,
            trigger_price: U256::from(2_000),
        };
        match create_increase_order(&chain, &params) {
            Err(TxError::InvalidOrder(msg)) => assert_eq!(msg, "invalid token addresses"),
            other => panic!("unexpected: {other:?}"),
        }

        params.is_long = false;
        params.index_token = Address::ZERO;
        match create_increase_order(&chain, &params) {
            Err(TxError::InvalidOrder(msg)) => assert_eq!(msg, "indexToken is 0"),
            other => panic!("unexpected: {other:?}"),
        }

        params.index_token = WETH;
        params.collateral_token = Address::ZERO;
        match create_increase_order(&chain, &params) {
            Err(TxError::InvalidOrder(msg)) => assert_eq!(msg, "collateralToken is 0"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_increase_order_short_triggers_above() {
        let chain = chain();
        let request = create_increase_order(
            &chain,
            &IncreaseOrderParams {
                path: vec![Address::ZERO, USDC],
                amount_in: U256::from(100),
                index_token: WETH,
                min_out: U256::ZERO,
                size_delta: U256::from(1_000),
                collateral_token: USDC,
                is_long: false,
                trigger_price: U256::from(2_000),
            },
        )
        .unwrap();
        assert_eq!(request.value, U256::from(100) + chain.execution_fees.increase);
        let call = IOrderBook::createIncreaseOrderCall::abi_decode(&request.data, true).unwrap();
        assert!(call.triggerAboveThreshold);
        assert!(call.shouldWrap);
        assert_eq!(call.path[0], WETH);
    }

    #[test]
    fn test_decrease_order_sends_decrease_fee() {
        let chain = chain();
        let request = create_decrease_order(
            &chain,
            &DecreaseOrderParams {
                index_token: WETH,
                size_delta: U256::from(1_000),
                collateral_token: WETH,
                collateral_delta: U256::ZERO,
                is_long: true,
                trigger_price: U256::from(2_500),
                trigger_above_threshold: true,
            },
        )
        .unwrap();
        assert_eq!(request.value, chain.execution_fees.decrease);
        assert_eq!(request.messages.fail(), Some("Order creation failed."));
    }

    #[test]
    fn test_cancel_multiple_groups_by_kind() {
        let request = cancel_multiple(
            &chain(),
            &[(OrderKind::Decrease, 4), (OrderKind::Swap, 1), (OrderKind::Decrease, 2)],
        );
        let call = IOrderBook::cancelMultipleCall::abi_decode(&request.data, true).unwrap();
        assert_eq!(call.swapOrderIndexes, vec![U256::from(1)]);
        assert!(call.increaseOrderIndexes.is_empty());
        assert_eq!(call.decreaseOrderIndexes, vec![U256::from(4), U256::from(2)]);
    }

    #[test]
    fn test_cancel_order_by_kind() {
        let request = cancel_order(&chain(), OrderKind::Increase, 3);
        assert_eq!(request.action, "cancelIncreaseOrder");
        assert_eq!(request.messages.success(), "Order cancelled.");
    }

    #[test]
    fn test_parse_cancel_key() {
        assert_eq!(parse_cancel_key("Swap-3").unwrap(), (OrderKind::Swap, 3));
        assert_eq!(
            parse_cancel_key("Decrease-0x1111111111111111111111111111111111111111-12").unwrap(),
            (OrderKind::Decrease, 12)
        );
        tokio_test::assert_err!(parse_cancel_key("Swap"));
        tokio_test::assert_err!(parse_cancel_key("Limit-1"));
    }

    #[test]
    fn test_approve_order_book_targets_router() {
        let request = approve_order_book(&chain());
        assert_eq!(request.to, ROUTER);
        assert_eq!(request.action, "approvePlugin");
        assert_eq!(request.value, U256::ZERO);
        let call = IRouter::approvePluginCall::abi_decode(&request.data, true).unwrap();
        assert_eq!(call.plugin, ORDER_BOOK);
        assert_eq!(request.messages.sent(), "Enable orders sent.");
    }

    #[tokio::test]
    async fn test_is_plugin_approved_reads_router() {
        use std::sync::Arc;
        use vwave_rpc::{DynTransport, MockTransport};

        let transport = Arc::new(MockTransport::default());
        transport.set_default("eth_call", serde_json::json!(format!("0x{:064x}", 1)));
        let reader = ContractReader::new(transport.clone() as DynTransport);
        let account = Address::repeat_byte(0x11);

        let approved = is_plugin_approved(&reader, &chain(), account, ORDER_BOOK).await.unwrap();
        assert!(approved);

        let calls = transport.get_calls();
        assert_eq!(calls.len(), 1);
        let params = &calls[0].1;
        assert_eq!(params[0]["to"].as_str().unwrap().to_lowercase(), ROUTER.to_string().to_lowercase());
        let data = params[0]["data"].as_str().unwrap();
        let selector = alloy::primitives::hex::encode(IRouter::approvedPluginsCall::SELECTOR);
        assert!(data.starts_with(&format!("0x{selector}")));
    }

    #[test]
    fn test_execute_order_by_kind() {
        let account = Address::repeat_byte(0x11);
        let receiver = Address::repeat_byte(0x22);

        let request = execute_order(&chain(), OrderKind::Swap, account, 5, receiver);
        assert_eq!(request.to, POSITION_MANAGER);
        assert_eq!(request.action, "executeSwapOrder");
        let call = IPositionManager::executeSwapOrderCall::abi_decode(&request.data, true).unwrap();
        assert_eq!(call.account, account);
        assert_eq!(call.orderIndex, U256::from(5));
        assert_eq!(call.feeReceiver, receiver);

        let request = execute_order(&chain(), OrderKind::Increase, account, 1, receiver);
        assert_eq!(request.action, "executeIncreaseOrder");
        let request = execute_order(&chain(), OrderKind::Decrease, account, 2, receiver);
        assert_eq!(request.action, "executeDecreaseOrder");
        let call = IPositionManager::executeDecreaseOrderCall::abi_decode(&request.data, true).unwrap();
        assert_eq!(call.orderIndex, U256::from(2));
        assert_eq!(request.messages.success(), "Order executed!");
    }
}
