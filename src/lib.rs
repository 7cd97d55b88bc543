pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateways;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::adapters::{
    HttpUserDirectory, PostgresCourseCatalog, PostgresEnrollmentStore, PostgresTransactionLedger,
};
use crate::config::Config;
use crate::gateways::{FlutterwaveGateway, GatewayRegistry, PaystackGateway, StripeGateway};
use crate::middleware::ThrottleLayer;
use crate::ports::{CourseCatalog, EnrollmentStore, TransactionLedger, UserDirectory};
use crate::services::{EnrollmentService, MaintenanceSweep, PaymentService, Reconciler};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub ledger: Arc<dyn TransactionLedger>,
    pub payments: Arc<PaymentService>,
    pub enrollments: Arc<EnrollmentService>,
    pub reconciler: Arc<Reconciler>,
    pub gateways: Arc<GatewayRegistry>,
    pub identity: Arc<dyn UserDirectory>,
}

/// Wire adapters, gateways and services together. The sweep is returned
/// separately so the caller decides whether to run it once (CLI) or on an
/// interval (server).
pub fn build_state(config: &Config, pool: sqlx::PgPool) -> (AppState, Arc<MaintenanceSweep>) {
    let ledger: Arc<dyn TransactionLedger> =
        Arc::new(PostgresTransactionLedger::new(pool.clone()));
    let catalog: Arc<dyn CourseCatalog> = Arc::new(PostgresCourseCatalog::new(pool.clone()));
    let enrollment_store: Arc<dyn EnrollmentStore> =
        Arc::new(PostgresEnrollmentStore::new(pool.clone()));
    let identity: Arc<dyn UserDirectory> =
        Arc::new(HttpUserDirectory::new(config.identity_service_url.clone()));

    let timeout = Duration::from_secs(config.gateway_timeout_secs);
    let gateways = Arc::new(GatewayRegistry::new(
        Arc::new(StripeGateway::new(
            config.stripe_api_url.clone(),
            config.stripe_secret_key.clone(),
            config.stripe_webhook_secret.clone(),
            timeout,
        )),
        Arc::new(PaystackGateway::new(
            config.paystack_api_url.clone(),
            config.paystack_secret_key.clone(),
            timeout,
        )),
        Arc::new(FlutterwaveGateway::new(
            config.flutterwave_api_url.clone(),
            config.flutterwave_secret_key.clone(),
            config.flutterwave_webhook_hash.clone(),
            timeout,
        )),
    ));

    let enrollments = Arc::new(EnrollmentService::new(
        enrollment_store.clone(),
        catalog.clone(),
    ));
    let payments = Arc::new(PaymentService::new(
        ledger.clone(),
        catalog,
        enrollment_store.clone(),
        gateways.clone(),
    ));
    let reconciler = Arc::new(Reconciler::new(ledger.clone(), enrollments.clone()));
    let sweep = Arc::new(MaintenanceSweep::new(
        ledger.clone(),
        enrollment_store,
        enrollments.clone(),
        chrono::Duration::hours(config.pending_max_age_hours),
    ));

    let state = AppState {
        db: pool,
        ledger,
        payments,
        enrollments,
        reconciler,
        gateways,
        identity,
    };

    (state, sweep)
}

pub fn create_app(state: AppState, config: &Config) -> Router {
    let api_routes = Router::new()
        .route("/api/payments/initialize", post(handlers::payments::initialize))
        .route("/api/transactions/:id", get(handlers::payments::get_transaction))
        .route("/api/courses/:id/enroll", post(handlers::enrollments::enroll))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ))
        .layer(ThrottleLayer::new(
            config.api_throttle_max_requests,
            Duration::from_secs(config.api_throttle_window_secs),
        ));

    let webhook_routes = Router::new()
        .route("/api/payments/webhooks/stripe", post(handlers::webhooks::stripe))
        .route("/api/payments/webhooks/paystack", post(handlers::webhooks::paystack))
        .route(
            "/api/payments/webhooks/flutterwave",
            post(handlers::webhooks::flutterwave),
        )
        .layer(ThrottleLayer::new(
            config.webhook_throttle_max_requests,
            Duration::from_secs(config.webhook_throttle_window_secs),
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .merge(webhook_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
