use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Gateway;
use crate::error::AppError;
use crate::gateways::Continuation;
use crate::ports::AuthUser;
use crate::services::InitiatePayment;
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InitializePaymentRequest {
    pub course_id: Uuid,
    pub gateway: Gateway,
    pub currency: Option<String>,
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitializePaymentResponse {
    pub transaction_id: Uuid,
    pub gateway_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

pub async fn initialize(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<InitializePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(currency) = &payload.currency {
        validation::validate_currency(currency)?;
    }
    if let Some(return_url) = &payload.return_url {
        validation::validate_url("return_url", return_url)?;
    }

    let initiated = state
        .payments
        .initiate(
            &user,
            InitiatePayment {
                course_id: payload.course_id,
                gateway: payload.gateway,
                currency: payload.currency,
                return_url: payload.return_url,
            },
        )
        .await?;

    let (redirect_url, client_secret) = match initiated.continuation {
        Continuation::Redirect(url) => (Some(url), None),
        Continuation::ClientSecret(secret) => (None, Some(secret)),
    };

    Ok(Json(InitializePaymentResponse {
        transaction_id: initiated.transaction_id,
        gateway_reference: initiated.gateway_reference,
        redirect_url,
        client_secret,
    }))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state.ledger.get(id).await.map_err(|e| match e {
        crate::ports::StoreError::NotFound(_) => {
            AppError::NotFound(format!("transaction {id} not found"))
        }
        other => other.into(),
    })?;

    // The ledger is not a public feed; owners see their own rows, staff see all.
    if tx.user_id != user.id && user.role != "ADMIN" {
        return Err(AppError::NotFound(format!("transaction {id} not found")));
    }

    Ok(Json(tx))
}
