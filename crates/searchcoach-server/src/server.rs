use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    error_handling::HandleErrorLayer,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use searchcoach_auth::{
    AuthState, GraphMemberValidator, MembershipCache, MembershipValidator, PolicyEvaluator,
    TokenVerifier,
};
use searchcoach_bot::TenantFilter;
use searchcoach_storage::{DynTeamStorage, InMemoryTeamStorage};

use crate::{config::AppConfig, handlers, middleware as app_middleware};

/// Shared state handed to every handler.
///
/// Holds the process-wide membership cache (through the policy evaluator),
/// the team storage and the bot's tenant filter.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub storage: DynTeamStorage,
    pub tenant_filter: Arc<TenantFilter>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    /// Wires the state from configuration, validating membership with
    /// Microsoft Graph.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let validator = GraphMemberValidator::new(&cfg.auth.graph)?;
        Self::with_validator(cfg, Arc::new(validator))
    }

    /// Wires the state with an explicit membership validator.
    pub fn with_validator(
        cfg: &AppConfig,
        validator: Arc<dyn MembershipValidator>,
    ) -> anyhow::Result<Self> {
        let verifier = TokenVerifier::from_config(&cfg.auth.token)?;
        let membership = MembershipCache::new(validator, cfg.auth.membership.clone());

        Ok(Self {
            auth: AuthState::new(Arc::new(verifier), PolicyEvaluator::new(membership)),
            storage: Arc::new(InMemoryTeamStorage::new()),
            tenant_filter: Arc::new(TenantFilter::new(
                cfg.bot.tenant_id.clone(),
                cfg.bot.invalid_tenant_text.clone(),
            )),
        })
    }

    pub fn membership(&self) -> &MembershipCache {
        self.auth.evaluator.membership()
    }
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/messages", post(handlers::messages))
        .route("/api/teams/{team_id}", get(handlers::get_team))
        .route("/api/me/membership", get(handlers::me_membership))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(app_middleware::handle_middleware_error))
                .load_shed()
                .concurrency_limit(cfg.server.max_concurrent_requests)
                .timeout(cfg.server.request_timeout),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct SearchCoachServer {
    addr: SocketAddr,
    app: Router,
    sweeper: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct ServerBuilder {
    config: AppConfig,
    validator: Option<Arc<dyn MembershipValidator>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Replaces the Graph validator, e.g. for local development.
    pub fn with_validator(mut self, validator: Arc<dyn MembershipValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Builds the server. Must run inside a Tokio runtime when a sweep
    /// interval is configured.
    pub fn build(self) -> anyhow::Result<SearchCoachServer> {
        let state = match self.validator {
            Some(validator) => AppState::with_validator(&self.config, validator)?,
            None => AppState::from_config(&self.config)?,
        };

        let sweeper = self.config.auth.membership.sweep_interval.map(|interval| {
            tracing::info!(interval = ?interval, "Starting membership cache sweeper");
            state.membership().spawn_sweeper(interval)
        });

        Ok(SearchCoachServer {
            addr: self.config.addr(),
            app: build_app(&self.config, state),
            sweeper,
        })
    }
}

impl SearchCoachServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        if let Some(sweeper) = self.sweeper {
            sweeper.abort();
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
