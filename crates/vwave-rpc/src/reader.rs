//! Typed `eth_call` and node queries on top of a transport.

use crate::error::{RpcError, RpcResult};
use crate::transport::DynTransport;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Encode a quantity as `0x`-prefixed hex without leading zeros.
pub fn to_quantity(value: U256) -> String {
    format!("{value:#x}")
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &Value) -> RpcResult<U256> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse(format!("expected hex quantity, got {value}")))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| RpcError::InvalidResponse(format!("bad quantity {text}: {e}")))
}

/// Parse `0x`-prefixed hex data.
pub fn parse_bytes(value: &Value) -> RpcResult<Bytes> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse(format!("expected hex data, got {value}")))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| RpcError::InvalidResponse(format!("bad hex data: {e}")))
}

/// Call or transaction parameters in the node's JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut object = Map::new();
        if let Some(from) = self.from {
            object.insert("from".into(), json!(from.to_string()));
        }
        object.insert("to".into(), json!(self.to.to_string()));
        object.insert("data".into(), json!(format!("0x{}", hex::encode(&self.data))));
        if let Some(value) = self.value {
            object.insert("value".into(), json!(to_quantity(value)));
        }
        object
    }
}

/// Read-only access to contracts and node state.
#[derive(Clone)]
pub struct ContractReader {
    transport: DynTransport,
}

impl ContractReader {
    pub fn new(transport: DynTransport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &DynTransport {
        &self.transport
    }

    /// `eth_call` a view function and decode its return values.
    pub async fn call<C: SolCall>(&self, to: Address, call: &C) -> RpcResult<C::Return> {
        let request = CallRequest::new(to, call.abi_encode());
        let result = self
            .transport
            .request("eth_call", json!([Value::Object(request.to_json()), "latest"]))
            .await?;
        let data = parse_bytes(&result)?;
        debug!(to = %to, function = C::SIGNATURE, bytes = data.len(), "eth_call returned");
        C::abi_decode_returns(&data, true)
            .map_err(|e| RpcError::Decode(format!("{}: {e}", C::SIGNATURE)))
    }

    pub async fn chain_id(&self) -> RpcResult<u64> {
        let value = parse_quantity(&self.transport.request("eth_chainId", json!([])).await?)?;
        u64::try_from(value).map_err(|e| RpcError::InvalidResponse(format!("chain id out of range: {e}")))
    }

    pub async fn gas_price(&self) -> RpcResult<U256> {
        parse_quantity(&self.transport.request("eth_gasPrice", json!([])).await?)
    }

    /// Suggested EIP-1559 tip; errors on nodes without EIP-1559 support.
    pub async fn max_priority_fee_per_gas(&self) -> RpcResult<U256> {
        parse_quantity(&self.transport.request("eth_maxPriorityFeePerGas", json!([])).await?)
    }

    pub async fn estimate_gas(&self, request: &CallRequest) -> RpcResult<U256> {
        parse_quantity(
            &self
                .transport
                .request("eth_estimateGas", json!([Value::Object(request.to_json())]))
                .await?,
        )
    }

    pub async fn native_balance(&self, account: Address) -> RpcResult<U256> {
        parse_quantity(
            &self
                .transport
                .request("eth_getBalance", json!([account.to_string(), "latest"]))
                .await?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{IVault, IVlpManager};
    use crate::transport::MockTransport;
    use alloy::sol_types::SolValue;
    use std::sync::Arc;

    #[test]
    fn test_quantity_round_trip() {
        assert_eq!(to_quantity(U256::from(255)), "0xff");
        assert_eq!(to_quantity(U256::ZERO), "0x0");
        assert_eq!(parse_quantity(&json!("0xff")).unwrap(), U256::from(255));
        assert_eq!(parse_quantity(&json!("0x")).unwrap(), U256::ZERO);
        assert!(parse_quantity(&json!(12)).is_err());
    }

    #[test]
    fn test_call_request_json() {
        let request = CallRequest::new(Address::repeat_byte(0x01), vec![0xab, 0xcd]).value(U256::from(16));
        let json = request.to_json();
        assert_eq!(json["data"], json!("0xabcd"));
        assert_eq!(json["value"], json!("0x10"));
        assert!(!json.contains_key("from"));
    }

    #[tokio::test]
    async fn test_call_decodes_returns() {
        let mock = Arc::new(MockTransport::default());
        let encoded = (vec![U256::from(7), U256::from(9)],).abi_encode_params();
        mock.set_default("eth_call", json!(format!("0x{}", hex::encode(encoded))));
        let reader = ContractReader::new(mock.clone());

        let aums = reader
            .call(Address::repeat_byte(0x02), &IVlpManager::getAumsCall {})
            .await
            .unwrap();
        assert_eq!(aums._0, vec![U256::from(7), U256::from(9)]);

        let (method, params) = &mock.get_calls()[0];
        assert_eq!(method, "eth_call");
        assert_eq!(params[1], json!("latest"));
    }

    #[tokio::test]
    async fn test_call_decode_error() {
        let mock = Arc::new(MockTransport::default());
        mock.set_default("eth_call", json!("0x"));
        let reader = ContractReader::new(mock);

        let result = reader
            .call(Address::ZERO, &IVault::totalTokenWeightsCall {})
            .await;
        assert!(matches!(result, Err(RpcError::Decode(_))));
    }

    #[tokio::test]
    async fn test_gas_price() {
        let mock = Arc::new(MockTransport::default());
        mock.set_default("eth_gasPrice", json!("0x3b9aca00"));
        let reader = ContractReader::new(mock);
        assert_eq!(reader.gas_price().await.unwrap(), U256::from(1_000_000_000u64));
    }
}
