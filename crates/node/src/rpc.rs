use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tss_protocol::Operation;

use crate::node::Node;

/// Debug snapshot of a running node, mirroring the coordinator's own
/// `stats` endpoint: enough state to tell whether keygen/keysign are
/// running and who the node currently knows about, without exposing
/// key material.
#[derive(Serialize)]
pub struct Stats {
    http_port: u16,
    p2p_addr: String,
    pubkey: String,
    peers: Vec<String>,
    keygen_started: bool,
    keysign_started: bool,
}

/// Body of a `POST /sign` request.
#[derive(Deserialize)]
pub struct SignRequest {
    #[serde(with = "hex::serde")]
    msg: Vec<u8>,
    #[serde(default)]
    one_round_signing: bool,
}

/// Body of a `POST /sign` response.
#[derive(Serialize)]
pub struct SignResponse {
    signature: String,
}

/// Body of a `POST /verify` request.
#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(with = "hex::serde")]
    msg: Vec<u8>,
    #[serde(with = "hex::serde")]
    signature: Vec<u8>,
}

/// Body of a `POST /verify` response.
#[derive(Serialize)]
pub struct VerifyResponse {
    valid: bool,
}

/// Body of a `POST /notify` request.
#[derive(Deserialize)]
pub struct NotifyRequest {
    event: String,
}

/// Build the node's RPC router: `/keygen`, `/sign`, `/verify`,
/// `/stats`, `/notify`.
pub fn router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/keygen", post(start_keygen))
        .route("/sign", post(sign))
        .route("/verify", post(verify))
        .route("/stats", get(stats))
        .route("/notify", post(notify))
        .with_state(node)
}

async fn start_keygen(
    State(node): State<Arc<Node>>,
) -> impl IntoResponse {
    match node.start_keygen().await {
        Ok(()) => axum::http::StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "keygen start failed");
            (axum::http::StatusCode::CONFLICT, e.to_string())
                .into_response()
        }
    }
}

async fn sign(
    State(node): State<Arc<Node>>,
    Json(request): Json<SignRequest>,
) -> impl IntoResponse {
    match node
        .start_keysign(request.msg, request.one_round_signing)
        .await
    {
        Ok(signature) => Json(SignResponse {
            signature: hex::encode(signature),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "keysign failed");
            (axum::http::StatusCode::CONFLICT, e.to_string())
                .into_response()
        }
    }
}

async fn verify(
    State(node): State<Arc<Node>>,
    Json(request): Json<VerifyRequest>,
) -> impl IntoResponse {
    match node.verify(&request.msg, &request.signature).await {
        Ok(valid) => Json(VerifyResponse { valid }).into_response(),
        Err(e) => (axum::http::StatusCode::BAD_REQUEST, e.to_string())
            .into_response(),
    }
}

async fn stats(State(node): State<Arc<Node>>) -> Json<Stats> {
    Json(node.stats())
}

async fn notify(
    State(node): State<Arc<Node>>,
    Json(request): Json<NotifyRequest>,
) -> impl IntoResponse {
    node.notify(&request.event);
    axum::http::StatusCode::OK
}

impl Node {
    fn stats(&self) -> Stats {
        Stats {
            http_port: self.config().http.bind_addr.port(),
            p2p_addr: self.config().p2p.bind_addr.to_string(),
            pubkey: self.registry().local_id().to_string(),
            peers: self
                .registry()
                .peer_addresses()
                .iter()
                .map(|a| a.to_string())
                .collect(),
            keygen_started: self.controller().phase(Operation::Keygen)
                != tss_protocol::SessionPhase::Idle,
            keysign_started: self
                .controller()
                .phase(Operation::Keysign)
                != tss_protocol::SessionPhase::Idle,
        }
    }
}
