//! HTTP API for the web UI
//!
//! `GET /set` writes a CC into the cache and sends it to the device right
//! away, `GET /get` reads the cached value. Everything not matched by a
//! route is served from the device's web directory.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};

use crate::state::{parse_decimal_u8, CcAddress, CcCache};
use crate::transport::CcTransport;

/// Body returned by a successful `/set`
pub const SET_OK_BODY: &str = "CC value updated\n";

/// Shared state for API handlers
pub struct ApiState {
    pub cache: Arc<CcCache>,
    pub transport: Arc<dyn CcTransport>,
}

impl ApiState {
    pub fn new(cache: Arc<CcCache>, transport: Arc<dyn CcTransport>) -> Self {
        Self { cache, transport }
    }
}

/// Request rejected because a query parameter is missing or not a byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    param: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, format!("invalid {}\n", self.param)).into_response()
    }
}

type Params = Query<HashMap<String, String>>;

/// Read one unsigned 8-bit decimal query parameter
fn byte_param(params: &HashMap<String, String>, name: &'static str) -> Result<u8, ApiError> {
    let raw = params.get(name).map(String::as_str).unwrap_or_default();
    parse_decimal_u8(raw, name).map_err(|e| {
        debug!("Rejected request parameter: {}", e);
        ApiError { param: name }
    })
}

/// Build the API router without static files
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/set", get(set_cc))
        .route("/get", get(get_cc))
        .route("/state", get(dump_state))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Build the full application: API routes, static web UI, request tracing
pub fn build_app(state: Arc<ApiState>, web_dir: impl AsRef<Path>) -> Router {
    build_router(state)
        .fallback_service(ServeDir::new(web_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
}

/// GET /set?channel=&cc=&value= - Update cache and send to device
async fn set_cc(
    State(state): State<Arc<ApiState>>,
    Query(params): Params,
) -> Result<&'static str, ApiError> {
    let channel = byte_param(&params, "channel")?;
    let cc = byte_param(&params, "cc")?;
    let value = byte_param(&params, "value")?;

    state.cache.set(CcAddress::new(channel, cc), value);
    state.transport.send_cc(channel, cc, value);

    debug!("Set CC {}:{} = {}", channel, cc, value);
    Ok(SET_OK_BODY)
}

/// GET /get?channel=&cc= - Cached value, 0 if never set
async fn get_cc(
    State(state): State<Arc<ApiState>>,
    Query(params): Params,
) -> Result<String, ApiError> {
    let channel = byte_param(&params, "channel")?;
    let cc = byte_param(&params, "cc")?;

    Ok(state.cache.get(CcAddress::new(channel, cc)).to_string())
}

/// GET /state - Whole cache as {"<channel>:<controller>": value}
async fn dump_state(State(state): State<Arc<ApiState>>) -> Json<BTreeMap<String, u8>> {
    Json(state.cache.to_key_map())
}

/// GET /health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Serve the app until `shutdown` resolves
pub async fn start_server(
    app: Router,
    addr: std::net::SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    info!("HTTP server on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_byte_param() {
        let p = params(&[("channel", "15"), ("cc", "300"), ("value", "+1")]);

        assert_eq!(byte_param(&p, "channel"), Ok(15));
        assert_eq!(byte_param(&p, "cc"), Err(ApiError { param: "cc" }));
        assert_eq!(byte_param(&p, "value"), Err(ApiError { param: "value" }));
        assert_eq!(byte_param(&p, "missing"), Err(ApiError { param: "missing" }));
    }

    #[test]
    fn test_api_error_is_bad_request() {
        let response = ApiError { param: "channel" }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
