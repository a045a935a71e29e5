//! HTTP trigger: `POST /calls/new` starts an originated call.

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    config::Config,
    error::{GatewayError, GatewayResult},
    origination::OriginationClient,
};

#[derive(Clone)]
pub struct AppState {
    pub origination: OriginationClient,
}

/// Form body of `POST /calls/new`.
#[derive(Debug, Deserialize)]
pub struct NewCall {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

pub fn router(config: Arc<Config>) -> Router {
    let state = AppState {
        origination: OriginationClient::new(config),
    };
    Router::new()
        .route("/calls/new", post(new_call))
        .with_state(state)
}

async fn new_call(State(state): State<AppState>, Form(call): Form<NewCall>) -> impl IntoResponse {
    let from = call
        .from
        .trim();
    let to = call
        .to
        .trim();
    if from.is_empty() || to.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "failed",
                "error": "both 'from' and 'to' are required"
            })),
        );
    }

    info!("[HTTP] New call request {} -> {}", from, to);
    match state
        .origination
        .originate(from, to)
        .await
    {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "accepted" }))),
        Err(e @ GatewayError::InvalidNumber(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "failed", "error": e.to_string() })),
        ),
        Err(e) => {
            warn!("[HTTP] Origination {} -> {} failed: {}", from, to, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "status": "failed", "error": e.to_string() })),
            )
        }
    }
}

/// Serve the trigger endpoint on an already bound listener.
pub async fn serve(listener: TcpListener, config: Arc<Config>) -> GatewayResult<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("[HTTP] Listening on {}", addr);
    }
    axum::serve(listener, router(config)).await?;
    Ok(())
}
