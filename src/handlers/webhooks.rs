//! Provider webhook endpoints. Each passes the raw body and the provider's
//! signature header to the reconciler; the response status drives the
//! provider's redelivery behavior (400 is permanent, 500 retries).

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::domain::Gateway;
use crate::error::AppError;
use crate::AppState;

pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    handle(&state, Gateway::Stripe, &headers, "stripe-signature", &body).await
}

pub async fn paystack(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    handle(
        &state,
        Gateway::Paystack,
        &headers,
        "x-paystack-signature",
        &body,
    )
    .await
}

pub async fn flutterwave(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    handle(&state, Gateway::Flutterwave, &headers, "verif-hash", &body).await
}

async fn handle(
    state: &AppState,
    gateway: Gateway,
    headers: &HeaderMap,
    header_name: &str,
    body: &[u8],
) -> Result<Json<serde_json::Value>, AppError> {
    let signature = headers.get(header_name).and_then(|h| h.to_str().ok());

    state
        .reconciler
        .handle_webhook(state.gateways.select(gateway).as_ref(), body, signature)
        .await?;

    Ok(Json(json!({ "received": true })))
}
