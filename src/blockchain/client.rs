//! Node JSON-RPC client.
//!
//! # Responsibilities
//! - Compose `<api>_<method>` requests and POST them to the node
//! - Unpack error / success envelopes into typed errors or a loose [`RpcValue`]
//! - Typed helpers for the methods this crate consumes, each checking the
//!   shape of the result before use
//!
//! No retries and no client-side timeouts; transport defaults apply.

use std::collections::BTreeMap;
use std::time::Duration;

use alloy::primitives::{hex, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{interval, Instant};

use crate::blockchain::coerce::{hex_to_int, parse_quantity, to_quantity};
use crate::blockchain::types::{
    ChainStatus, MiningStatus, NetStatus, NodeStatus, RpcError, RpcResult,
};

/// JSON-RPC protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Loosely-typed result returned by the node.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<RpcValue>),
    Map(BTreeMap<String, RpcValue>),
}

impl From<Value> for RpcValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RpcValue::Null,
            Value::Bool(b) => RpcValue::Bool(b),
            Value::Number(n) => RpcValue::Number(n),
            Value::String(s) => RpcValue::String(s),
            Value::Array(items) => RpcValue::List(items.into_iter().map(RpcValue::from).collect()),
            Value::Object(map) => {
                RpcValue::Map(map.into_iter().map(|(k, v)| (k, RpcValue::from(v))).collect())
            }
        }
    }
}

impl From<RpcValue> for Value {
    fn from(value: RpcValue) -> Self {
        match value {
            RpcValue::Null => Value::Null,
            RpcValue::Bool(b) => Value::Bool(b),
            RpcValue::Number(n) => Value::Number(n),
            RpcValue::String(s) => Value::String(s),
            RpcValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            RpcValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl RpcValue {
    fn shape(&self) -> &'static str {
        match self {
            RpcValue::Null => "null",
            RpcValue::Bool(_) => "boolean",
            RpcValue::Number(_) => "number",
            RpcValue::String(_) => "string",
            RpcValue::List(_) => "list",
            RpcValue::Map(_) => "mapping",
        }
    }

    fn unexpected(&self, method: &str, expected: &'static str) -> RpcError {
        RpcError::UnexpectedResult {
            method: method.to_string(),
            expected,
            actual: self.shape().to_string(),
        }
    }

    /// The result as a string, or `UnexpectedResult` naming `method`.
    pub fn into_string(self, method: &str) -> RpcResult<String> {
        match self {
            RpcValue::String(s) => Ok(s),
            other => Err(other.unexpected(method, "string")),
        }
    }

    pub fn into_bool(self, method: &str) -> RpcResult<bool> {
        match self {
            RpcValue::Bool(b) => Ok(b),
            other => Err(other.unexpected(method, "boolean")),
        }
    }

    pub fn into_map(self, method: &str) -> RpcResult<BTreeMap<String, RpcValue>> {
        match self {
            RpcValue::Map(m) => Ok(m),
            other => Err(other.unexpected(method, "mapping")),
        }
    }

    /// A hex quantity string (`"0x1a"`) or a JSON number.
    pub fn into_quantity(self, method: &str) -> RpcResult<U256> {
        match self {
            RpcValue::String(s) => parse_quantity(&s).map_err(|e| RpcError::UnexpectedResult {
                method: method.to_string(),
                expected: "hex quantity",
                actual: e.to_string(),
            }),
            RpcValue::Number(n) => match n.as_u64() {
                Some(v) => Ok(U256::from(v)),
                None => Err(RpcError::UnexpectedResult {
                    method: method.to_string(),
                    expected: "non-negative integer",
                    actual: n.to_string(),
                }),
            },
            other => Err(other.unexpected(method, "hex quantity")),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: String,
    params: &'a [Value],
    id: &'static str,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Block selector for state queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockId {
    Number(u64),
    Hash(B256),
    Latest,
    Pending,
}

impl BlockId {
    fn to_param(&self) -> Value {
        match self {
            BlockId::Number(n) => Value::String(format!("{:#x}", n)),
            BlockId::Hash(h) => Value::String(h.to_string()),
            BlockId::Latest => Value::String("latest".to_string()),
            BlockId::Pending => Value::String("pending".to_string()),
        }
    }
}

/// Message-call description for `eth_call` / `eth_estimateGas`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_quantity")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_quantity")]
    pub gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_quantity")]
    pub gas_price: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

fn ser_quantity<S: serde::Serializer>(value: &Option<U256>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => s.serialize_str(&to_quantity(*v)),
        None => s.serialize_none(),
    }
}

/// JSON-RPC client for one node endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RpcClient {
    /// Create a client for the node at `endpoint` (e.g. `http://localhost:8545`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue `<api>_<method>` with `params` and unpack the envelope.
    pub async fn call(&self, api: &str, method: &str, params: &[Value]) -> RpcResult<RpcValue> {
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method: format!("{}_{}", api, method),
            params,
            id: "",
        };
        tracing::debug!(method = %request.method, params = ?params, "Sending RPC request");

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|source| self.transport(source))?;
        let body = resp.bytes().await.map_err(|source| self.transport(source))?;

        unpack_response(&body)
    }

    fn transport(&self, source: reqwest::Error) -> RpcError {
        RpcError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        }
    }

    /// Current block height. Unparseable answers read as 0.
    pub async fn block_number(&self) -> RpcResult<i64> {
        let method = "eth_blockNumber";
        let height = self.call("eth", "blockNumber", &[]).await?.into_string(method)?;
        Ok(hex_to_int(&height))
    }

    /// Number of transactions sent from `address` as of `block`, i.e. its next nonce.
    pub async fn transaction_count(&self, address: Address, block: BlockId) -> RpcResult<u64> {
        let method = "eth_getTransactionCount";
        let count = self
            .call(
                "eth",
                "getTransactionCount",
                &[Value::String(address.to_string()), block.to_param()],
            )
            .await?
            .into_quantity(method)?;
        u64::try_from(count).map_err(|_| RpcError::UnexpectedResult {
            method: method.to_string(),
            expected: "64-bit nonce",
            actual: count.to_string(),
        })
    }

    /// Submit a signed wire encoding; returns the transaction id.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> RpcResult<String> {
        let raw_hex = hex::encode_prefixed(raw);
        self.call("eth", "sendRawTransaction", &[Value::String(raw_hex)])
            .await?
            .into_string("eth_sendRawTransaction")
    }

    pub async fn balance(&self, address: Address, block: BlockId) -> RpcResult<U256> {
        self.call(
            "eth",
            "getBalance",
            &[Value::String(address.to_string()), block.to_param()],
        )
        .await?
        .into_quantity("eth_getBalance")
    }

    pub async fn code(&self, address: Address, block: BlockId) -> RpcResult<Bytes> {
        let method = "eth_getCode";
        let code = self
            .call(
                "eth",
                "getCode",
                &[Value::String(address.to_string()), block.to_param()],
            )
            .await?
            .into_string(method)?;
        decode_data(method, &code)
    }

    pub async fn storage_at(&self, address: Address, key: U256, block: BlockId) -> RpcResult<B256> {
        let method = "eth_getStorageAt";
        let word = self
            .call(
                "eth",
                "getStorageAt",
                &[
                    Value::String(address.to_string()),
                    Value::String(to_quantity(key)),
                    block.to_param(),
                ],
            )
            .await?
            .into_quantity(method)?;
        Ok(B256::from(word.to_be_bytes::<32>()))
    }

    pub async fn gas_price(&self) -> RpcResult<U256> {
        self.call("eth", "gasPrice", &[]).await?.into_quantity("eth_gasPrice")
    }

    /// Execute a message call without creating a transaction.
    pub async fn eth_call(&self, request: &CallRequest, block: BlockId) -> RpcResult<Bytes> {
        let method = "eth_call";
        let out = self
            .call("eth", "call", &[to_param(request)?, block.to_param()])
            .await?
            .into_string(method)?;
        decode_data(method, &out)
    }

    pub async fn estimate_gas(&self, request: &CallRequest) -> RpcResult<U256> {
        self.call("eth", "estimateGas", &[to_param(request)?])
            .await?
            .into_quantity("eth_estimateGas")
    }

    /// Receipt for a transaction id, `None` while it is still pending.
    pub async fn transaction_receipt(
        &self,
        tx_id: &str,
    ) -> RpcResult<Option<BTreeMap<String, RpcValue>>> {
        let method = "eth_getTransactionReceipt";
        match self
            .call("eth", "getTransactionReceipt", &[Value::String(tx_id.to_string())])
            .await?
        {
            RpcValue::Null => Ok(None),
            other => other.into_map(method).map(Some),
        }
    }

    /// Block header and transaction hashes, `None` if the node does not know it.
    pub async fn block(&self, id: BlockId) -> RpcResult<Option<BTreeMap<String, RpcValue>>> {
        let (name, method) = match id {
            BlockId::Hash(_) => ("getBlockByHash", "eth_getBlockByHash"),
            _ => ("getBlockByNumber", "eth_getBlockByNumber"),
        };
        match self.call("eth", name, &[id.to_param(), Value::Bool(false)]).await? {
            RpcValue::Null => Ok(None),
            other => other.into_map(method).map(Some),
        }
    }

    /// Poll for a receipt until one appears or `limit` elapses.
    pub async fn wait_for_receipt(
        &self,
        tx_id: &str,
        poll_interval: Duration,
        limit: Duration,
    ) -> RpcResult<BTreeMap<String, RpcValue>> {
        let deadline = Instant::now() + limit;
        let mut ticker = interval(poll_interval);

        loop {
            ticker.tick().await;
            if let Some(receipt) = self.transaction_receipt(tx_id).await? {
                tracing::info!(tx_id = %tx_id, "Transaction mined");
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                return Err(RpcError::ReceiptTimeout {
                    tx_id: tx_id.to_string(),
                    secs: limit.as_secs(),
                });
            }
            tracing::debug!(tx_id = %tx_id, "Transaction pending");
        }
    }

    /// Gather chain, network and mining status in one pass.
    pub async fn node_status(&self) -> RpcResult<NodeStatus> {
        let block_number = self.block_number().await?;
        let protocol_version = self
            .call("eth", "protocolVersion", &[])
            .await?
            .into_string("eth_protocolVersion")?;

        let peer_count = self
            .call("net", "peerCount", &[])
            .await?
            .into_string("net_peerCount")?;
        let listening = self
            .call("net", "listening", &[])
            .await?
            .into_bool("net_listening")?;
        let version = self.call("net", "version", &[]).await?.into_string("net_version")?;

        let coinbase = self.call("eth", "coinbase", &[]).await?.into_string("eth_coinbase")?;
        let mining = self.call("eth", "mining", &[]).await?.into_bool("eth_mining")?;
        let gas_price = self.call("eth", "gasPrice", &[]).await?.into_string("eth_gasPrice")?;

        Ok(NodeStatus {
            chain: ChainStatus {
                protocol_version,
                block_number,
            },
            net: NetStatus {
                version,
                peer_count: hex_to_int(&peer_count),
                listening,
            },
            mining: MiningStatus {
                mining,
                coinbase,
                gas_price,
            },
        })
    }
}

/// Decode a response body into a result value or a typed error.
pub fn unpack_response(body: &[u8]) -> RpcResult<RpcValue> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RpcError::MalformedResponse(format!("body is not JSON: {}", e)))?;
    let Value::Object(mut envelope) = value else {
        return Err(RpcError::MalformedResponse(
            "body is not a JSON object".to_string(),
        ));
    };

    match envelope.remove("error") {
        Some(Value::Null) | None => {}
        Some(err) => {
            let err: RpcErrorBody = serde_json::from_value(err)
                .map_err(|e| RpcError::MalformedResponse(format!("bad error envelope: {}", e)))?;
            return Err(RpcError::Remote {
                code: err.code,
                message: err.message,
            });
        }
    }

    envelope
        .remove("result")
        .map(RpcValue::from)
        .ok_or_else(|| RpcError::MalformedResponse("neither result nor error present".to_string()))
}

fn to_param(request: &CallRequest) -> RpcResult<Value> {
    serde_json::to_value(request)
        .map_err(|e| RpcError::MalformedResponse(format!("unencodable call request: {}", e)))
}

fn decode_data(method: &str, s: &str) -> RpcResult<Bytes> {
    crate::blockchain::coerce::decode_hex(s)
        .map(Bytes::from)
        .map_err(|e| RpcError::UnexpectedResult {
            method: method.to_string(),
            expected: "hex data",
            actual: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unpack_success() {
        let v = unpack_response(br#"{"jsonrpc":"2.0","id":"","result":"0xa"}"#).unwrap();
        assert_eq!(v, RpcValue::String("0xa".to_string()));

        let v = unpack_response(br#"{"result":null}"#).unwrap();
        assert_eq!(v, RpcValue::Null);

        let v = unpack_response(br#"{"result":{"status":"0x1","logs":[]}}"#).unwrap();
        let map = v.into_map("eth_getTransactionReceipt").unwrap();
        assert_eq!(map["status"], RpcValue::String("0x1".into()));
        assert_eq!(map["logs"], RpcValue::List(vec![]));
    }

    #[test]
    fn test_unpack_error_envelope() {
        let err = unpack_response(br#"{"error":{"code":-32000,"message":"nonce too low"}}"#)
            .unwrap_err();
        match err {
            RpcError::Remote { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "nonce too low");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unpack_null_error_is_success() {
        let v = unpack_response(br#"{"error":null,"result":true}"#).unwrap();
        assert_eq!(v, RpcValue::Bool(true));
    }

    #[test]
    fn test_unpack_malformed() {
        assert!(matches!(
            unpack_response(b"<html>bad gateway</html>"),
            Err(RpcError::MalformedResponse(_))
        ));
        assert!(matches!(
            unpack_response(br#"{"jsonrpc":"2.0","id":""}"#),
            Err(RpcError::MalformedResponse(_))
        ));
        assert!(matches!(
            unpack_response(br#"[1,2]"#),
            Err(RpcError::MalformedResponse(_))
        ));
        assert!(matches!(
            unpack_response(br#"{"error":"boom"}"#),
            Err(RpcError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_shape_mismatch_is_explicit() {
        let err = RpcValue::Bool(true).into_string("eth_coinbase").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected result for eth_coinbase: expected string, got boolean"
        );
        assert!(RpcValue::String("0xzz".into()).into_quantity("eth_getBalance").is_err());
    }

    #[test]
    fn test_quantity_from_string_or_number() {
        assert_eq!(
            RpcValue::String("0x5".into()).into_quantity("m").unwrap(),
            U256::from(5)
        );
        assert_eq!(
            RpcValue::from(json!(7)).into_quantity("m").unwrap(),
            U256::from(7)
        );
        assert!(RpcValue::from(json!(-1)).into_quantity("m").is_err());
    }

    #[test]
    fn test_request_shape() {
        let params = [json!("0xabc"), json!("latest")];
        let req = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method: "eth_getBalance".to_string(),
            params: &params,
            id: "",
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"jsonrpc":"2.0","method":"eth_getBalance","params":["0xabc","latest"],"id":""})
        );
    }

    #[test]
    fn test_call_request_serialization() {
        let req = CallRequest {
            to: Some(Address::ZERO),
            value: Some(U256::from(16)),
            data: Some(Bytes::from(vec![0xca, 0xfe])),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "to": "0x0000000000000000000000000000000000000000",
                "value": "0x10",
                "data": "0xcafe"
            })
        );
    }

    #[test]
    fn test_block_id_params() {
        assert_eq!(BlockId::Number(10).to_param(), json!("0xa"));
        assert_eq!(BlockId::Latest.to_param(), json!("latest"));
    }

    #[test]
    fn test_rpc_value_round_trips_json() {
        let original = json!({"a": [1, "x", null, true], "b": {"c": "d"}});
        let back: Value = RpcValue::from(original.clone()).into();
        assert_eq!(back, original);
    }
}
