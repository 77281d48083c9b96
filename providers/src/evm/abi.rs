//! Hand-assembled calldata for the handful of read calls balance queries
//! need. Every encoder returns selector-prefixed bytes ready for `eth_call`.

use crate::RpcError;
use web3::{
    ethabi::{self, ParamType, Token},
    signing::keccak256,
    types::{Address, U256},
};

/// Canonical ABI name of a parameter type, as it appears in a signature.
fn type_name(kind: &ParamType) -> String {
    match kind {
        ParamType::Address => "address".into(),
        ParamType::Bool => "bool".into(),
        ParamType::Bytes => "bytes".into(),
        ParamType::String => "string".into(),
        ParamType::Uint(bits) => format!("uint{bits}"),
        ParamType::Int(bits) => format!("int{bits}"),
        ParamType::FixedBytes(len) => format!("bytes{len}"),
        ParamType::Array(inner) => format!("{}[]", type_name(inner)),
        ParamType::FixedArray(inner, len) => format!("{}[{len}]", type_name(inner)),
        ParamType::Tuple(fields) => format!("({})", type_names(fields)),
    }
}

fn type_names(params: &[ParamType]) -> String {
    params.iter().map(type_name).collect::<Vec<_>>().join(",")
}

/// First four bytes of `keccak256("name(type,...)")`.
pub fn selector(name: &str, params: &[ParamType]) -> [u8; 4] {
    let hash = keccak256(format!("{name}({})", type_names(params)).as_bytes());

    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_call(name: &str, params: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(name, params).to_vec();
    data.extend(ethabi::encode(tokens));
    data
}

pub fn balance_of(owner: Address) -> Vec<u8> {
    address_method("balanceOf", owner)
}

/// ERC-1155 `balanceOf(address,uint256)`.
pub fn balance_of_id(owner: Address, id: U256) -> Vec<u8> {
    encode_call(
        "balanceOf",
        &[ParamType::Address, ParamType::Uint(256)],
        &[Token::Address(owner), Token::Uint(id)],
    )
}

/// Any `method(address)` view, e.g. a staking contract's balance getter.
pub fn address_method(method: &str, owner: Address) -> Vec<u8> {
    encode_call(method, &[ParamType::Address], &[Token::Address(owner)])
}

/// Multicall3 `getEthBalance(address)`.
pub fn get_eth_balance(owner: Address) -> Vec<u8> {
    address_method("getEthBalance", owner)
}

fn aggregate_calls_type() -> ParamType {
    ParamType::Array(Box::new(ParamType::Tuple(vec![
        ParamType::Address,
        ParamType::Bytes,
    ])))
}

fn aggregate_results_type() -> ParamType {
    ParamType::Array(Box::new(ParamType::Tuple(vec![
        ParamType::Bool,
        ParamType::Bytes,
    ])))
}

/// `tryAggregate(false, calls)`: inner failures do not revert the bundle.
pub fn try_aggregate(calls: &[(Address, Vec<u8>)]) -> Vec<u8> {
    let calls = calls
        .iter()
        .map(|(target, data)| Token::Tuple(vec![Token::Address(*target), Token::Bytes(data.clone())]))
        .collect();

    encode_call(
        "tryAggregate",
        &[ParamType::Bool, aggregate_calls_type()],
        &[Token::Bool(false), Token::Array(calls)],
    )
}

pub fn try_aggregate_selector() -> [u8; 4] {
    selector("tryAggregate", &[ParamType::Bool, aggregate_calls_type()])
}

/// Decodes the `(bool success, bytes returnData)[]` a `tryAggregate` returns.
pub fn decode_try_aggregate(data: &[u8]) -> Result<Vec<(bool, Vec<u8>)>, RpcError> {
    let malformed = || RpcError::Decode("malformed tryAggregate response".into());

    let tokens = ethabi::decode(&[aggregate_results_type()], data)
        .map_err(|e| RpcError::Decode(e.to_string()))?;

    match tokens.into_iter().next() {
        Some(Token::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Token::Tuple(fields) => match fields.as_slice() {
                    [Token::Bool(success), Token::Bytes(bytes)] => Ok((*success, bytes.clone())),
                    _ => Err(malformed()),
                },
                _ => Err(malformed()),
            })
            .collect(),
        _ => Err(malformed()),
    }
}

/// Decodes a single `uint256` return value.
///
/// Some nodes answer with zero bytes instead of an encoded zero for tokens
/// that have never touched an account, so an empty response is a zero
/// balance.
pub fn decode_uint(data: &[u8]) -> Result<U256, RpcError> {
    if data.is_empty() {
        return Ok(U256::zero());
    }

    if data.len() < 32 {
        return Err(RpcError::Decode(format!(
            "expected a 32 byte word, got {} bytes",
            data.len()
        )));
    }

    Ok(U256::from_big_endian(&data[..32]))
}

/// Decodes `(uint256 amount, uint256 unlockTime)[]` stake listings.
pub fn decode_stakes(data: &[u8]) -> Result<Vec<(U256, U256)>, RpcError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let malformed = || RpcError::Decode("malformed stake listing".into());
    let kind = ParamType::Array(Box::new(ParamType::Tuple(vec![
        ParamType::Uint(256),
        ParamType::Uint(256),
    ])));

    let tokens = ethabi::decode(&[kind], data).map_err(|e| RpcError::Decode(e.to_string()))?;

    match tokens.into_iter().next() {
        Some(Token::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Token::Tuple(fields) => match fields.as_slice() {
                    [Token::Uint(amount), Token::Uint(unlock)] => Ok((*amount, *unlock)),
                    _ => Err(malformed()),
                },
                _ => Err(malformed()),
            })
            .collect(),
        _ => Err(malformed()),
    }
}
