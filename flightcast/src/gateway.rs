//! HTTP service exposing the cascade resolver to front ends.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::advisory::{AdvisoryRequest, AdvisoryResult, CascadeResolver, ADVISORY_ROUTE};
use crate::error::GatewayError;

pub const HEALTH_ROUTE: &str = "/api/health";

#[derive(Clone)]
pub struct AdvisoryGateway {
    state: Arc<GatewayState>,
}

struct GatewayState {
    resolver: Arc<CascadeResolver>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthStatusResponse {
    ok: bool,
    remote_configured: bool,
    preferred_model: Option<String>,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

impl AdvisoryGateway {
    pub fn new(resolver: Arc<CascadeResolver>) -> Self {
        Self {
            state: Arc::new(GatewayState { resolver }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(ADVISORY_ROUTE, post(advisory_handler))
            .route(HEALTH_ROUTE, get(health_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind `bind_addr` and serve until the process stops.
    pub async fn serve(self, bind_addr: &str) -> Result<(), GatewayError> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: bind_addr.to_string(),
                source,
            })?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), GatewayError> {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, configured = self.state.resolver.is_configured(), "Advisory gateway listening");
        }
        axum::serve(listener, self.router().into_make_service())
            .await
            .map_err(GatewayError::Serve)
    }
}

async fn advisory_handler(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<AdvisoryRequest>,
) -> Result<Json<AdvisoryResult>, HandlerError> {
    if let Err(e) = request.validate() {
        return Err(error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
    }

    match state.resolver.resolve(&request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            warn!("Advisory resolution failed: {}", e);
            Err(error_response(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthStatusResponse> {
    Json(HealthStatusResponse {
        ok: true,
        remote_configured: state.resolver.is_configured(),
        preferred_model: state
            .resolver
            .candidates()
            .first()
            .map(|c| c.model.clone()),
    })
}

fn error_response(status: StatusCode, error: String) -> HandlerError {
    (status, Json(ErrorResponse { error }))
}
