use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::models::AppState;
use crate::contracts::{self, ContractCall};

#[derive(Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn rpc_result(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

fn rpc_error(id: Value, code: i64, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
        }),
    }
}

/// Minimal JSON-RPC 2.0 surface over the simulated chain: `eth_call`
/// against the toy contracts, `eth_blockNumber` and `eth_getBlockByNumber`.
#[post("/rpc")]
pub async fn json_rpc(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => {
            return HttpResponse::Ok().json(rpc_error(Value::Null, -32700, "Parse error"));
        }
    };

    let response = match request.method.as_str() {
        "eth_call" => rpc_result(request.id, handle_eth_call(&state, &request.params)),
        "eth_blockNumber" => rpc_result(
            request.id,
            json!(format!("0x{:x}", state.chain.height())),
        ),
        "eth_getBlockByNumber" => rpc_result(
            request.id,
            handle_eth_get_block_by_number(&state, &request.params),
        ),
        _ => rpc_error(request.id, -32601, "Method not found"),
    };

    HttpResponse::Ok().json(response)
}

/// Contract-call errors collapse to "0x" on this surface; the structured
/// error stays internal.
fn handle_eth_call(state: &AppState, params: &Value) -> Value {
    let Some(call_obj) = params.get(0) else {
        return json!("0x");
    };
    let Ok(call) = serde_json::from_value::<ContractCall>(call_obj.clone()) else {
        return json!("0x");
    };

    let response = contracts::handle_call(&state.prices, &call);
    match response.result {
        Some(result) => json!(result),
        None => json!("0x"),
    }
}

fn handle_eth_get_block_by_number(state: &AppState, params: &Value) -> Value {
    let Some(tag) = params.get(0).and_then(Value::as_str) else {
        return Value::Null;
    };
    if tag != "latest" && tag != "0x" {
        return Value::Null;
    }
    match state.chain.latest_block() {
        Some(block) => json!({
            "number": format!("0x{:x}", block.number),
            "timestamp": format!("0x{:x}", block.timestamp),
            "transactions": [],
        }),
        None => Value::Null,
    }
}
