//! Open positions of one account via `Reader.getPositions`.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use vwave_core::amount::to_u64_saturating;
use vwave_core::{ChainConfig, Position};
use vwave_rpc::abi::IReader;
use vwave_rpc::{ContractReader, RpcResult};

/// Values per position returned by the reader.
pub const POSITION_PROPS_LENGTH: usize = 9;

/// Every (collateral, index, side) combination the vault can hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionQuery {
    pub collateral_tokens: Vec<Address>,
    pub index_tokens: Vec<Address>,
    pub is_long: Vec<bool>,
}

impl PositionQuery {
    pub fn len(&self) -> usize {
        self.is_long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_long.is_empty()
    }
}

/// Longs use the index token as collateral; shorts pair every stable
/// collateral with every shortable token. Native tokens are queried by
/// their wrapped address.
pub fn position_query(chain: &ChainConfig) -> PositionQuery {
    let mut query = PositionQuery::default();
    let tradable: Vec<_> = chain
        .whitelisted_tokens()
        .iter()
        .filter(|t| !t.is_stable && !t.is_wrapped)
        .collect();

    for token in &tradable {
        let address = chain.reader_address(token);
        query.collateral_tokens.push(address);
        query.index_tokens.push(address);
        query.is_long.push(true);
    }

    for stable in chain.whitelisted_tokens().iter().filter(|t| t.is_stable) {
        for token in tradable.iter().filter(|t| t.is_shortable) {
            query.collateral_tokens.push(stable.address);
            query.index_tokens.push(chain.reader_address(token));
            query.is_long.push(false);
        }
    }
    query
}

/// Open positions keyed by position key.
pub fn parse_positions(
    query: &PositionQuery,
    raw: &[U256],
    account: Address,
    native_token_address: Address,
) -> HashMap<String, Position> {
    let mut positions = HashMap::new();
    for (i, props) in raw.chunks_exact(POSITION_PROPS_LENGTH).enumerate().take(query.len()) {
        let position = Position {
            account,
            collateral_token: query.collateral_tokens[i],
            index_token: query.index_tokens[i],
            is_long: query.is_long[i],
            size: props[0],
            collateral: props[1],
            average_price: props[2],
            entry_funding_rate: props[3],
            last_increased_time: to_u64_saturating(props[6]),
        };
        if position.is_open() {
            positions.insert(position.key(native_token_address), position);
        }
    }
    positions
}

pub async fn fetch_positions(
    reader: &ContractReader,
    chain: &ChainConfig,
    account: Address,
) -> RpcResult<HashMap<String, Position>> {
    let query = position_query(chain);
    if query.is_empty() {
        return Ok(HashMap::new());
    }
    let call = IReader::getPositionsCall {
        vault: chain.contracts.vault,
        account,
        collateralTokens: query.collateral_tokens.clone(),
        indexTokens: query.index_tokens.clone(),
        isLong: query.is_long.clone(),
    };
    let raw = reader.call(chain.contracts.reader, &call).await?._0;
    Ok(parse_positions(&query, &raw, account, chain.contracts.native_token))
}
