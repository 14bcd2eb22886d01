//! HTTP surface: routes, shared state and request/response shapes.

mod auth;
mod clients;
mod extract;
mod health;
mod invoices;
pub mod schemas;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    routing::{get, patch, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{PasswordHasher, TokenService, require_auth};
use crate::config::Config;
use crate::db::Store;

/// State shared by every request for the lifetime of the process
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub hasher: PasswordHasher,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, hasher: PasswordHasher) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            hasher,
        }
    }

    /// Build the auth components from the loaded configuration
    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Self {
        Self::new(
            store,
            TokenService::from_config(config),
            PasswordHasher::new(config.bcrypt_cost),
        )
    }
}

/// All routes, without CORS or request tracing
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/clients", post(clients::create_client).get(clients::list_clients))
        .route(
            "/invoices",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route("/invoices/:id/toggle-paid", patch(invoices::toggle_invoice_paid))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}

/// The application as served: routes plus CORS and request tracing
pub fn app(state: AppState, config: &Config) -> Router {
    router(state)
        .layer(cors_layer(&config.cors_origins))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}
