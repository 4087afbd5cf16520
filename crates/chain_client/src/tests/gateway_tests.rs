use super::*;
use std::{collections::VecDeque, sync::Arc};

use alloy_primitives::hex;
use alloy_sol_types::{Revert, SolError};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use shared::error::GENERIC_TRANSACTION_FAILURE;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct MockNode {
    scripted: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
    seen: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockNode {
    async fn script(&self, method: &str, reply: Value) {
        self.scripted
            .lock()
            .await
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    async fn seen(&self) -> Vec<(String, Value)> {
        self.seen.lock().await.clone()
    }

    async fn seen_methods(&self) -> Vec<String> {
        self.seen().await.into_iter().map(|(method, _)| method).collect()
    }
}

fn ok(result: Value) -> Value {
    json!({ "result": result })
}

fn rpc_error(code: i64, message: &str, data: Option<Value>) -> Value {
    let mut error = json!({ "code": code, "message": message });
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({ "error": error })
}

async fn handle_rpc(State(node): State<MockNode>, Json(request): Json<Value>) -> Json<Value> {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    node.seen
        .lock()
        .await
        .push((method.clone(), request["params"].clone()));

    let reply = node
        .scripted
        .lock()
        .await
        .get_mut(&method)
        .and_then(|queue| queue.pop_front())
        .unwrap_or_else(|| rpc_error(-32601, &format!("unscripted method {method}"), None));

    let mut body = json!({ "jsonrpc": "2.0", "id": request["id"].clone() });
    if let Some(result) = reply.get("result") {
        body["result"] = result.clone();
    }
    if let Some(error) = reply.get("error") {
        body["error"] = error.clone();
    }
    Json(body)
}

async fn spawn_node() -> (MockNode, Url) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let node = MockNode::default();
    let app = Router::new()
        .route("/", post(handle_rpc))
        .with_state(node.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (node, Url::parse(&format!("http://{addr}/")).expect("url"))
}

fn deployment() -> Deployment {
    Deployment {
        chain_id: ChainId(84532),
        network_name: "Base Sepolia".to_string(),
        lottery: Address::repeat_byte(0x11),
        token: Address::repeat_byte(0x22),
        token_symbol: "USDC".to_string(),
        token_decimals: 6,
    }
}

fn gateway(url: Url) -> RpcGateway {
    RpcGateway::new(
        url,
        None,
        deployment(),
        GatewayOptions {
            receipt_poll_interval: Duration::from_millis(10),
        },
    )
}

fn word_hex(value: u64) -> String {
    format!("0x{value:064x}")
}

fn tx_hash_hex() -> String {
    format!("0x{}", "ab".repeat(32))
}

fn error_string_revert(reason: &str) -> String {
    hex::encode_prefixed(
        Revert {
            reason: reason.to_string(),
        }
        .abi_encode(),
    )
}

fn param_address(params: &Value, field: &str) -> Address {
    params[0][field]
        .as_str()
        .expect("address field")
        .parse()
        .expect("address")
}

#[tokio::test]
async fn reads_status_and_price_from_lottery_contract() {
    let (node, url) = spawn_node().await;
    node.script("eth_call", ok(json!(word_hex(0)))).await;
    node.script("eth_call", ok(json!(word_hex(1_000_000)))).await;
    let gateway = gateway(url);

    assert_eq!(
        gateway.lottery_status().await.expect("status"),
        LotteryStatus::Open
    );
    assert_eq!(
        gateway.ticket_price().await.expect("price"),
        U256::from(1_000_000u64)
    );

    let seen = node.seen().await;
    assert_eq!(seen.len(), 2);
    for (method, params) in &seen {
        assert_eq!(method, "eth_call");
        assert_eq!(param_address(params, "to"), deployment().lottery);
        assert_eq!(params[1], "latest");
    }
}

#[tokio::test]
async fn allowance_reads_token_contract() {
    let (node, url) = spawn_node().await;
    node.script("eth_call", ok(json!(word_hex(2_000_000)))).await;
    let gateway = gateway(url);

    let owner = Address::repeat_byte(0x33);
    let allowance = gateway
        .allowance(owner, deployment().lottery)
        .await
        .expect("allowance");
    assert_eq!(allowance, U256::from(2_000_000u64));

    let seen = node.seen().await;
    assert_eq!(param_address(&seen[0].1, "to"), deployment().token);
    let data = seen[0].1[0]["data"].as_str().expect("data");
    assert!(data.starts_with("0xdd62ed3e"), "unexpected calldata {data}");
}

#[tokio::test]
async fn unknown_status_value_is_contract_read_error() {
    let (node, url) = spawn_node().await;
    node.script("eth_call", ok(json!(word_hex(5)))).await;

    let err = gateway(url).lottery_status().await.expect_err("must fail");
    assert!(matches!(err, FlowError::ContractRead(message) if message.contains("unknown lottery status")));
}

#[tokio::test]
async fn reverted_read_surfaces_reason() {
    let (node, url) = spawn_node().await;
    node.script(
        "eth_call",
        rpc_error(3, "execution reverted", Some(json!(error_string_revert("paused")))),
    )
    .await;

    let err = gateway(url).ticket_price().await.expect_err("must fail");
    assert_eq!(
        err,
        FlowError::ContractRead("TICKET_PRICE() reverted: paused".to_string())
    );
}

#[tokio::test]
async fn request_accounts_maps_user_rejection() {
    let (node, url) = spawn_node().await;
    node.script(
        "eth_requestAccounts",
        rpc_error(4001, "User rejected the request.", None),
    )
    .await;

    let err = gateway(url).request_accounts().await.expect_err("must fail");
    assert_eq!(err, FlowError::UserRejected);
}

#[tokio::test]
async fn accounts_without_authorization_is_empty() {
    let (node, url) = spawn_node().await;
    node.script("eth_accounts", rpc_error(4100, "Unauthorized", None))
        .await;

    let accounts = gateway(url).accounts().await.expect("accounts");
    assert!(accounts.is_empty());
}

#[tokio::test]
async fn unreachable_wallet_is_provider_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let url = Url::parse(&format!("http://{addr}/")).expect("url");

    let gateway = gateway(url);
    assert_eq!(
        gateway.request_accounts().await.expect_err("must fail"),
        FlowError::ProviderUnavailable
    );
    assert_eq!(
        gateway.chain_id().await.expect_err("must fail"),
        FlowError::ProviderUnavailable
    );
}

#[tokio::test]
async fn chain_id_parses_hex_quantity() {
    let (node, url) = spawn_node().await;
    node.script("eth_chainId", ok(json!("0x14a34"))).await;

    assert_eq!(gateway(url).chain_id().await.expect("chain id"), ChainId(84532));
}

#[tokio::test]
async fn buy_ticket_sends_explicit_gas_limit() {
    let (node, url) = spawn_node().await;
    node.script("eth_sendTransaction", ok(json!(tx_hash_hex())))
        .await;
    let buyer = Address::repeat_byte(0x33);

    let tx_hash = gateway(url)
        .buy_ticket(buyer, 300_000)
        .await
        .expect("buy");
    assert_eq!(tx_hash.0, tx_hash_hex().parse::<B256>().expect("hash"));

    let seen = node.seen().await;
    let params = &seen[0].1;
    assert_eq!(param_address(params, "from"), buyer);
    assert_eq!(param_address(params, "to"), deployment().lottery);
    assert_eq!(params[0]["gas"], "0x493e0");
}

#[tokio::test]
async fn approve_leaves_gas_to_wallet() {
    let (node, url) = spawn_node().await;
    node.script("eth_sendTransaction", ok(json!(tx_hash_hex())))
        .await;
    let owner = Address::repeat_byte(0x33);

    gateway(url)
        .approve(owner, deployment().lottery, U256::from(1_000_000u64))
        .await
        .expect("approve");

    let seen = node.seen().await;
    let params = &seen[0].1;
    assert_eq!(param_address(params, "to"), deployment().token);
    assert!(params[0].get("gas").is_none());
    let data = params[0]["data"].as_str().expect("data");
    assert!(data.starts_with("0x095ea7b3"));
    assert!(data.ends_with("00000f4240"), "approval must be for the exact price: {data}");
}

#[tokio::test]
async fn rejected_transaction_is_user_rejected() {
    let (node, url) = spawn_node().await;
    node.script(
        "eth_sendTransaction",
        rpc_error(4001, "User denied transaction signature.", None),
    )
    .await;

    let err = gateway(url)
        .buy_ticket(Address::repeat_byte(0x33), 300_000)
        .await
        .expect_err("must fail");
    assert_eq!(err, FlowError::UserRejected);
}

#[tokio::test]
async fn submission_failure_prefers_revert_reason_from_message() {
    let (node, url) = spawn_node().await;
    node.script(
        "eth_sendTransaction",
        rpc_error(-32603, "execution reverted: Lottery is not open", None),
    )
    .await;

    let err = gateway(url)
        .buy_ticket(Address::repeat_byte(0x33), 300_000)
        .await
        .expect_err("must fail");
    assert_eq!(err, FlowError::transaction("Lottery is not open"));
}

#[tokio::test]
async fn malformed_submission_response_uses_generic_message() {
    let (node, url) = spawn_node().await;
    node.script("eth_sendTransaction", ok(json!(42))).await;

    let err = gateway(url)
        .buy_ticket(Address::repeat_byte(0x33), 300_000)
        .await
        .expect_err("must fail");
    assert_eq!(err.to_string(), GENERIC_TRANSACTION_FAILURE);
}

#[tokio::test]
async fn waits_through_pending_receipts() {
    let (node, url) = spawn_node().await;
    node.script("eth_getTransactionReceipt", ok(Value::Null)).await;
    node.script("eth_getTransactionReceipt", ok(Value::Null)).await;
    node.script(
        "eth_getTransactionReceipt",
        ok(json!({
            "transactionHash": tx_hash_hex(),
            "blockNumber": "0x2a",
            "status": "0x1"
        })),
    )
    .await;

    let tx_hash = TxHash(tx_hash_hex().parse().expect("hash"));
    let finality = gateway(url)
        .wait_for_finality(tx_hash)
        .await
        .expect("finality");
    assert_eq!(finality.block_number, 42);
    assert_eq!(finality.tx_hash, tx_hash);
    assert_eq!(
        node.seen_methods().await,
        vec!["eth_getTransactionReceipt"; 3]
    );
}

#[tokio::test]
async fn receipt_lookup_errors_keep_waiting() {
    let (node, url) = spawn_node().await;
    node.script("eth_sendTransaction", ok(json!(tx_hash_hex())))
        .await;
    node.script(
        "eth_getTransactionReceipt",
        rpc_error(-32000, "header not found", None),
    )
    .await;
    node.script("eth_getTransactionReceipt", ok(Value::Null)).await;
    node.script(
        "eth_getTransactionReceipt",
        ok(json!({
            "transactionHash": tx_hash_hex(),
            "blockNumber": "0x2b",
            "status": "0x1"
        })),
    )
    .await;

    let gateway = gateway(url);
    let tx_hash = gateway
        .approve(
            Address::repeat_byte(0x33),
            deployment().lottery,
            U256::from(1_000_000u64),
        )
        .await
        .expect("submit");
    let finality = gateway
        .wait_for_finality(tx_hash)
        .await
        .expect("confirmed despite lookup error");
    assert_eq!(finality.block_number, 43);
    assert!(gateway.submitted.lock().await.is_empty());
    assert_eq!(
        node.seen_methods().await,
        vec![
            "eth_sendTransaction",
            "eth_getTransactionReceipt",
            "eth_getTransactionReceipt",
            "eth_getTransactionReceipt",
        ]
    );
}

#[tokio::test]
async fn reverted_receipt_replays_call_for_reason() {
    let (node, url) = spawn_node().await;
    node.script("eth_sendTransaction", ok(json!(tx_hash_hex())))
        .await;
    node.script(
        "eth_getTransactionReceipt",
        ok(json!({
            "transactionHash": tx_hash_hex(),
            "blockNumber": "0x2a",
            "status": "0x0"
        })),
    )
    .await;
    node.script(
        "eth_call",
        rpc_error(
            -32603,
            "Internal JSON-RPC error.",
            Some(json!({ "code": 3, "data": error_string_revert("Lottery is not open") })),
        ),
    )
    .await;

    let gateway = gateway(url);
    let tx_hash = gateway
        .buy_ticket(Address::repeat_byte(0x33), 300_000)
        .await
        .expect("submit");
    let err = gateway
        .wait_for_finality(tx_hash)
        .await
        .expect_err("must revert");
    assert_eq!(err, FlowError::transaction("Lottery is not open"));

    let seen = node.seen().await;
    let (method, params) = seen.last().expect("replay");
    assert_eq!(method, "eth_call");
    assert_eq!(params[1], "0x2a");
    assert_eq!(params[0]["gas"], "0x493e0");
}
