//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gate's own handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, admission)
//! - Bind server to listener
//! - Forward admitted requests to the upstream application
//! - Run the rate limit janitor alongside the server

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, Uri,
    },
    middleware,
    response::Response,
    routing::get,
    Json, Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{auth_routes, AuthGate, AuthGates};
use crate::config::{GateConfig, GateKind};
use crate::http::middleware::{admission_middleware, ClientContext};
use crate::http::request::{request_id_of, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response::{strip_hop_by_hop, upstream_failure};
use crate::observability::metrics;
use crate::routing::{PolicyTable, RoutingError};
use crate::security::cors::{AllowedOrigins, CorsGate};
use crate::security::headers::with_security_headers;
use crate::security::rate_limit::LimiterRegistry;

/// Error building the server from a validated config.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid upstream url '{0}'")]
    InvalidUpstream(String),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("invalid cookie settings: {0}")]
    Cookie(#[from] axum::http::header::InvalidHeaderValue),
}

/// Where admitted requests go.
#[derive(Debug, Clone)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
}

impl Upstream {
    pub fn parse(url: &str) -> Result<Self, ServerError> {
        let invalid = || ServerError::InvalidUpstream(url.to_string());
        let uri: Uri = url.parse().map_err(|_| invalid())?;
        let parts = uri.into_parts();
        Ok(Self {
            scheme: parts.scheme.ok_or_else(invalid)?,
            authority: parts.authority.ok_or_else(invalid)?,
        })
    }

    /// Same path and query, upstream scheme and authority.
    pub fn rewrite(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Ok(Uri::from_parts(parts)?)
    }
}

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub policies: Arc<PolicyTable>,
    pub limiters: Arc<LimiterRegistry>,
    pub cors: Arc<CorsGate>,
    pub gates: Arc<AuthGates>,
    pub upstream: Arc<Upstream>,
    pub client: Client<HttpConnector, Body>,
}

impl AppState {
    pub fn from_config(config: GateConfig) -> Result<Self, ServerError> {
        let limiters = Arc::new(LimiterRegistry::from_config(&config.rate_limit.limiters));
        let policies = PolicyTable::from_config(&config.routes, &config.bypass, &limiters)?;
        let cors = CorsGate::new(AllowedOrigins::from_config(&config.cors, config.environment));
        let gates = AuthGates::new(
            AuthGate::new(GateKind::Preview, &config.auth.preview, config.environment)?,
            AuthGate::new(GateKind::Admin, &config.auth.admin, config.environment)?,
        );

        for gate in gates.iter() {
            if gate.is_enabled() && !gate.has_secret() {
                tracing::warn!(
                    gate = %gate.kind(),
                    "No password configured; every login to this gate will be rejected"
                );
            }
        }

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            upstream: Arc::new(Upstream::parse(&config.upstream.url)?),
            config: Arc::new(config),
            policies: Arc::new(policies),
            limiters,
            cors: Arc::new(cors),
            gates: Arc::new(gates),
            client,
        })
    }
}

/// HTTP server for the admission gate.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GateConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(config)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        let router = Router::new()
            .route("/_gate/health", get(health_handler))
            .merge(auth_routes())
            .fallback(proxy_handler)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                admission_middleware,
            ))
            .with_state(state);

        let router = if config.security.enable_headers {
            with_security_headers(router)
        } else {
            router
        };

        router
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.state.config
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.state.config.upstream.url,
            "HTTP server starting"
        );

        let janitor = self.state.limiters.clone().run_janitor(
            Duration::from_secs(self.state.config.rate_limit.sweep_interval_secs),
            shutdown.resubscribe(),
        );
        tokio::spawn(janitor);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Forward an admitted request to the upstream application.
/// No retries: a failed upstream call is the caller's to retry.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id_of(request.headers()).to_string();
    let method = request.method().to_string();
    let (client, route) = request
        .extensions()
        .get::<ClientContext>()
        .map(|ctx| (ctx.client.clone(), ctx.route.clone()))
        .unwrap_or_else(|| ("-".to_string(), "bypass".to_string()));

    let (mut parts, body) = request.into_parts();
    parts.uri = match state.upstream.rewrite(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            metrics::record_upstream_error();
            return upstream_failure();
        }
    };
    strip_hop_by_hop(&mut parts.headers);

    tracing::debug!(
        request_id = %request_id,
        client = %client,
        route = %route,
        method = %method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), start_time);
            relay(response)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream_error();
            metrics::record_request(&method, 502, start_time);
            upstream_failure()
        }
    }
}

/// Stream an upstream response back to the client, minus hop-by-hop headers.
fn relay(response: Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
