//! The HTTP surface of a node.
//!
//! Every operation of the engine is reachable here; request handlers stay
//! thin and delegate to [`AppState`], which owns the locking discipline.
//!
//! | Method | Path                        | Description                          |
//! |--------|-----------------------------|--------------------------------------|
//! | POST   | `/Transactions/unconfirmed` | Queue a new transaction              |
//! | GET    | `/Transactions/unconfirmed` | List pending transactions            |
//! | POST   | `/Transactions/validator`   | Merkle proof for a committed tx      |
//! | GET    | `/Transactions/mine`        | Consensus → mine → publish           |
//! | POST   | `/Block/add`                | Accept a block mined elsewhere       |
//! | POST   | `/Block/tamper`             | Debug: corrupt a committed tx        |
//! | GET    | `/Nodes/chain`              | Full chain + peer info               |
//! | GET    | `/Nodes/trustable`          | Tamper-vote verdict                  |
//! | GET    | `/Nodes/vote`               | Cast a tamper vote on this node      |
//! | POST   | `/Nodes/set_name`           | Set this node's identity             |
//! | POST   | `/Nodes/register_node`      | A remote node introduces itself      |
//! | POST   | `/Nodes/sync_node`          | Join the network through a target    |

use ac_blockchain::{Block, BlockchainError};
use ac_peer::Trustability;
use ac_sync::SyncError;
use axum::{
    extract::{Host, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::{error::NodeError, state::AppState};

/// Build the full router with all endpoints and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/Transactions/unconfirmed",
            get(list_unconfirmed).post(submit_transaction),
        )
        .route("/Transactions/validator", post(transaction_validator))
        .route("/Transactions/mine", get(mine))
        .route("/Block/add", post(add_block))
        .route("/Block/tamper", post(tamper_block))
        .route("/Nodes/chain", get(chain))
        .route("/Nodes/trustable", get(trustable))
        .route("/Nodes/vote", get(vote))
        .route("/Nodes/set_name", post(set_name))
        .route("/Nodes/register_node", post(register_node))
        .route("/Nodes/sync_node", post(sync_node))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Envelope used by every endpoint that answers with a human-readable (or
/// JSON-encoded) message.
#[derive(Debug, Serialize)]
struct ApiMessage {
    message: String,
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (
        status,
        Json(ApiMessage {
            message: text.into(),
        }),
    )
        .into_response()
}

/// Parse a request body, answering 400 on any missing or malformed field.
fn parse_body<T: DeserializeOwned>(value: Value) -> Result<T, Response> {
    serde_json::from_value(value).map_err(|_| {
        message(
            StatusCode::BAD_REQUEST,
            "Input data is not valid, please, check it",
        )
    })
}

// ── Request bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NewTransaction {
    author: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ProofRequest {
    transaction_index: usize,
    merkle_root: String,
}

#[derive(Debug, Deserialize)]
struct TamperRequest {
    author: String,
    content: String,
    block_index: usize,
    transaction_index: usize,
}

#[derive(Debug, Deserialize)]
struct SetNameRequest {
    node_name: String,
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    node_address: String,
    node_name: String,
}

#[derive(Debug, Deserialize)]
struct SyncRequest {
    node_address: String,
}

// ── Transactions ────────────────────────────────────────────────────────────

async fn list_unconfirmed(State(app): State<AppState>) -> Json<Vec<String>> {
    Json(app.pending_transactions())
}

async fn submit_transaction(State(app): State<AppState>, Json(body): Json<Value>) -> Response {
    let new_tx: NewTransaction = match parse_body(body) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    app.add_transaction(new_tx.author, new_tx.content);
    message(StatusCode::CREATED, "Transaction added, pending to validate")
}

async fn transaction_validator(State(app): State<AppState>, Json(body): Json<Value>) -> Response {
    let request: ProofRequest = match parse_body(body) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match app.proof_for(&request.merkle_root, request.transaction_index) {
        Ok(proof) => message(StatusCode::CREATED, proof),
        Err(NodeError::NoMatchingBlock) => message(
            StatusCode::NOT_FOUND,
            "No transactions found for this merkle root",
        ),
        Err(_) => message(
            StatusCode::BAD_REQUEST,
            "Input data is not valid, please, check it",
        ),
    }
}

async fn mine(State(app): State<AppState>) -> Response {
    match app.mine().await {
        Ok(report) => {
            let mut text = format!(
                "Block {} mined. Chain updated: {}",
                report.block_index, report.consensus_applied
            );
            if !report.failures.is_empty() {
                let failures = serde_json::to_string(&report.failures).unwrap_or_default();
                text.push_str(&format!(
                    ". Nodes that did not accept the block: {failures}"
                ));
            }
            message(StatusCode::OK, text)
        }
        Err(NodeError::Blockchain(BlockchainError::EmptyPending)) => {
            message(StatusCode::OK, "No unconfirmed transactions to mine")
        }
        Err(NodeError::Blockchain(BlockchainError::BadBatch(_))) => message(
            StatusCode::OK,
            "Unconfirmed transactions cannot be padded to a power of two",
        ),
        Err(error) => message(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

// ── Blocks ──────────────────────────────────────────────────────────────────

async fn add_block(State(app): State<AppState>, Json(body): Json<Value>) -> Response {
    let block: Block = match parse_body(body) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    if app.accept_block(block) {
        message(StatusCode::CREATED, "Block added to the chain")
    } else {
        message(
            StatusCode::BAD_REQUEST,
            "Block not valid, discarded by the node",
        )
    }
}

async fn tamper_block(State(app): State<AppState>, Json(body): Json<Value>) -> Response {
    let request: TamperRequest = match parse_body(body) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match app.tamper(
        request.block_index,
        request.transaction_index,
        request.author,
        request.content,
    ) {
        Ok(()) => message(
            StatusCode::CREATED,
            format!(
                "Transaction {} of block {} tampered",
                request.transaction_index, request.block_index
            ),
        ),
        Err(_) => message(StatusCode::BAD_REQUEST, "Transaction not found"),
    }
}

// ── Nodes ───────────────────────────────────────────────────────────────────

async fn chain(State(app): State<AppState>) -> Response {
    match app.local_info() {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(error) => message(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

async fn trustable(State(app): State<AppState>) -> Response {
    let text = match app.trustability() {
        Trustability::Unknown => "I don't know, add nodes to compare with!",
        Trustability::Trustable => "Your chain is okay! You're good to go!",
        Trustability::Tampered => {
            "Your chain has been tampered :(, please, re-sync to a trusted node!"
        }
    };
    message(StatusCode::OK, text)
}

async fn vote(State(app): State<AppState>) -> Response {
    app.record_vote();
    message(StatusCode::OK, "Voted as not trustable!")
}

async fn set_name(
    Host(host): Host,
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    let request: SetNameRequest = match parse_body(body) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    if request.node_name.trim().is_empty() {
        return message(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Can't name the node like that, please, choose another name",
        );
    }

    app.set_name(format!("http://{host}"), request.node_name.clone());
    message(StatusCode::OK, format!("Name set to {}", request.node_name))
}

async fn register_node(State(app): State<AppState>, Json(body): Json<Value>) -> Response {
    let invalid = || {
        message(
            StatusCode::REQUEST_TIMEOUT,
            "Can't add the node to the Chain. Invalid data",
        )
    };

    let Ok(request) = serde_json::from_value::<RegisterRequest>(body) else {
        return invalid();
    };

    if request.node_address.trim().is_empty() || request.node_name.trim().is_empty() {
        return invalid();
    }

    match app.register_peer(request.node_address, request.node_name) {
        Ok(info) => (StatusCode::CREATED, Json(info)).into_response(),
        Err(NodeError::DuplicatePeer) => {
            message(StatusCode::FORBIDDEN, "Node is already registered")
        }
        Err(error) => message(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

async fn sync_node(State(app): State<AppState>, Json(body): Json<Value>) -> Response {
    let request: SyncRequest = match parse_body(body) {
        Ok(v) => v,
        Err(rejection) => return rejection,
    };

    match app.sync_node(&request.node_address).await {
        Ok(()) => message(StatusCode::CREATED, "Registration successful"),
        Err(NodeError::NameUnset) => message(
            StatusCode::NOT_FOUND,
            "Please, set a name for your node",
        ),
        Err(NodeError::Sync(SyncError::ChainTampered { tampered })) => {
            let text = if tampered.is_empty() {
                "The chain is tampered, can't be added".to_string()
            } else {
                format!(
                    "The chain is tampered, the following transactions could not be validated: {}",
                    serde_json::to_string(&tampered).unwrap_or_default()
                )
            };
            message(StatusCode::METHOD_NOT_ALLOWED, text)
        }
        Err(NodeError::Sync(SyncError::Unreachable(_))) => {
            message(StatusCode::BAD_REQUEST, "Can't request to the node")
        }
        Err(NodeError::Sync(SyncError::MalformedChain(reason))) => {
            message(StatusCode::BAD_REQUEST, reason)
        }
        Err(error) => message(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}
