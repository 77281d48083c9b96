//! Tezos balance lookups against a node's RPC.
//!
//! Token balances are read straight out of the token contract's ledger big
//! map, whose keys are addressed by the base58 `expr...` hash of the packed
//! Micheline key.

use crate::{Chain, ConnectionError, RpcError, WalletAddress, U256};
use blake2::{digest::consts::U32, Blake2b, Digest};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const TZ1: [u8; 3] = [6, 161, 159];
const TZ2: [u8; 3] = [6, 161, 161];
const TZ3: [u8; 3] = [6, 161, 164];
const KT1: [u8; 3] = [2, 90, 121];
const EXPR: [u8; 4] = [13, 44, 64, 27];

const PACK_TAG: u8 = 0x05;
const INT_TAG: u8 = 0x00;
const PRIM_TWO_ARGS_TAG: u8 = 0x07;
const PAIR: u8 = 0x07;
const BYTES_TAG: u8 = 0x0a;

/// Decodes a `tz1`/`tz2`/`tz3`/`KT1` address into its 22 byte binary form.
pub fn parse_address(raw: &str) -> Result<[u8; 22], RpcError> {
    let invalid = || RpcError::InvalidAddress(raw.to_string());

    let decoded = bs58::decode(raw)
        .with_check(None)
        .into_vec()
        .map_err(|_| invalid())?;

    if decoded.len() != 23 {
        return Err(invalid());
    }

    let (prefix, hash) = decoded.split_at(3);
    let prefix = <[u8; 3]>::try_from(prefix).map_err(|_| invalid())?;
    let mut binary = [0u8; 22];

    // implicit accounts: 0x00 <curve> <hash>, originated: 0x01 <hash> 0x00
    let curve = match prefix {
        TZ1 => 0,
        TZ2 => 1,
        TZ3 => 2,
        KT1 => {
            binary[0] = 1;
            binary[1..21].copy_from_slice(hash);
            return Ok(binary);
        }
        _ => return Err(invalid()),
    };

    binary[1] = curve;
    binary[2..].copy_from_slice(hash);

    Ok(binary)
}

/// Signed zarith encoding of a non-negative integer.
fn zarith(mut n: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut byte = (n & 0x3f) as u8;
    n >>= 6;

    loop {
        if n == 0 {
            out.push(byte);
            return out;
        }

        out.push(byte | 0x80);
        byte = (n & 0x7f) as u8;
        n >>= 7;
    }
}

fn pack_address(raw: &str, out: &mut Vec<u8>) -> Result<(), RpcError> {
    let binary = parse_address(raw)?;

    out.push(BYTES_TAG);
    out.extend((binary.len() as u32).to_be_bytes());
    out.extend(binary);

    Ok(())
}

/// Key of a token contract's ledger big map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerKey {
    /// FA1.2 ledgers keyed by owner.
    Address(String),
    /// FA2 ledgers keyed by `(owner, token_id)`.
    AddressToken(String, u64),
}

impl LedgerKey {
    pub fn pack(&self) -> Result<Vec<u8>, RpcError> {
        let mut out = vec![PACK_TAG];

        match self {
            LedgerKey::Address(owner) => pack_address(owner, &mut out)?,
            LedgerKey::AddressToken(owner, token_id) => {
                out.extend([PRIM_TWO_ARGS_TAG, PAIR]);
                pack_address(owner, &mut out)?;
                out.push(INT_TAG);
                out.extend(zarith(*token_id));
            }
        }

        Ok(out)
    }

    pub fn script_expr_hash(&self) -> Result<String, RpcError> {
        let digest = Blake2b::<U32>::digest(self.pack()?);

        let mut payload = EXPR.to_vec();
        payload.extend_from_slice(&digest);

        Ok(bs58::encode(payload).with_check().into_string())
    }
}

/// First `{"int": ...}` in a Micheline value, depth first.
///
/// FA1.2 ledgers store either a bare balance or `Pair balance allowances`;
/// either way the balance is the first integer.
fn first_int(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => match map.get("int") {
            Some(Value::String(int)) => Some(int),
            _ => map.get("args").and_then(first_int),
        },
        Value::Array(items) => items.iter().find_map(first_int),
        _ => None,
    }
}

fn parse_mutez(raw: &str) -> Result<U256, RpcError> {
    U256::from_dec_str(raw).map_err(|e| RpcError::Decode(format!("`{raw}`: {e:?}")))
}

pub struct TezosConnection {
    rpc_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TezosConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TezosConnection")
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl TezosConnection {
    pub async fn connect(rpc_url: &str, timeout: Duration) -> Result<Self, ConnectionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectionError::InvalidUrl {
                chain: Chain::Tezos,
                url: rpc_url.to_string(),
                reason: e.to_string(),
            })?;

        let connection = Self {
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            client,
        };

        let unreachable = |source: RpcError| ConnectionError::Unreachable {
            chain: Chain::Tezos,
            url: rpc_url.to_string(),
            source,
        };

        let chain_id: String = connection
            .get("/chains/main/chain_id")
            .await
            .map_err(unreachable)?
            .ok_or_else(|| unreachable(RpcError::Http(404)))?;

        log::info!("Connected to {} ({chain_id}) at {rpc_url}", Chain::Tezos);

        Ok(connection)
    }

    /// `None` when the node answers 404, which for context reads means
    /// "nothing stored here".
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, RpcError> {
        let res = self
            .client
            .get(format!("{}{path}", self.rpc_url))
            .send()
            .await?;

        let status = res.status();

        match status {
            StatusCode::OK => Ok(Some(res.json::<T>().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(RpcError::Http(status.as_u16())),
        }
    }

    /// Native balance in mutez.
    pub async fn native_balance(&self, wallet: &WalletAddress) -> Result<U256, RpcError> {
        parse_address(wallet.as_str())?;

        let balance: Option<String> = self
            .get(&format!(
                "/chains/main/blocks/head/context/contracts/{wallet}/balance"
            ))
            .await?;

        balance.map_or(Ok(U256::zero()), |raw| parse_mutez(&raw))
    }

    /// Balance stored under `key` in the ledger big map `big_map`.
    pub async fn ledger_balance(&self, big_map: u64, key: &LedgerKey) -> Result<U256, RpcError> {
        let hash = key.script_expr_hash()?;

        let value: Option<Value> = self
            .get(&format!(
                "/chains/main/blocks/head/context/big_maps/{big_map}/{hash}"
            ))
            .await?;

        match value {
            None => Ok(U256::zero()),
            Some(value) => first_int(&value)
                .ok_or_else(|| RpcError::Decode(format!("no balance in ledger value {value}")))
                .and_then(parse_mutez),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn encode(prefix: [u8; 3], hash: [u8; 20]) -> String {
        let mut payload = prefix.to_vec();
        payload.extend(hash);
        bs58::encode(payload).with_check().into_string()
    }

    #[test]
    fn address_prefixes() {
        let tz1 = encode(TZ1, [7; 20]);
        let kt1 = encode(KT1, [9; 20]);

        assert!(tz1.starts_with("tz1"));
        assert!(kt1.starts_with("KT1"));

        let binary = parse_address(&tz1).unwrap();
        assert_eq!(&binary[..2], &[0, 0]);
        assert_eq!(&binary[2..], &[7; 20]);

        let binary = parse_address(&encode(TZ2, [7; 20])).unwrap();
        assert_eq!(&binary[..2], &[0, 1]);

        let binary = parse_address(&kt1).unwrap();
        assert_eq!(binary[0], 1);
        assert_eq!(&binary[1..21], &[9; 20]);
        assert_eq!(binary[21], 0);
    }

    #[test]
    fn rejects_foreign_addresses() {
        assert!(parse_address("0x14DDFE8EA7FFc338015627D160ccAf99e8F16Dd3").is_err());
        assert!(parse_address("11111111111111111111111111111111").is_err());
    }

    #[test]
    fn zarith_encoding() {
        assert_eq!(zarith(0), vec![0x00]);
        assert_eq!(zarith(63), vec![0x3f]);
        assert_eq!(zarith(64), vec![0x80, 0x01]);
        assert_eq!(zarith(300), vec![0xac, 0x04]);
    }

    #[test]
    fn packed_keys() {
        let owner = encode(TZ1, [1; 20]);

        let packed = LedgerKey::Address(owner.clone()).pack().unwrap();
        assert_eq!(&packed[..8], &[0x05, 0x0a, 0, 0, 0, 22, 0, 0]);
        assert_eq!(packed.len(), 28);

        let packed = LedgerKey::AddressToken(owner, 3).pack().unwrap();
        assert_eq!(&packed[..3], &[0x05, 0x07, 0x07]);
        assert_eq!(&packed[packed.len() - 2..], &[0x00, 0x03]);
    }

    #[test]
    fn expr_hashes() {
        let hash = LedgerKey::Address(encode(TZ1, [1; 20]))
            .script_expr_hash()
            .unwrap();
        let other = LedgerKey::Address(encode(TZ1, [2; 20]))
            .script_expr_hash()
            .unwrap();

        assert!(hash.starts_with("expr"));
        assert_eq!(hash.len(), 54);
        assert_ne!(hash, other);
    }

    #[test]
    fn ledger_values() {
        assert_eq!(first_int(&json!({ "int": "42" })), Some("42"));
        assert_eq!(
            first_int(&json!({
                "prim": "Pair",
                "args": [{ "int": "1000" }, [{ "prim": "Elt", "args": [{ "bytes": "00" }, { "int": "5" }] }]]
            })),
            Some("1000")
        );
        assert_eq!(first_int(&json!({ "bytes": "00" })), None);
    }
}
