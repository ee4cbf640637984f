use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use hospital_auth::AuthService;
use hospital_core::{EmployeeService, PatientService};
use hospital_storage::DynRecordStore;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, StorageBackend};
use crate::middleware::RequestId;
use crate::{handlers, middleware as app_middleware};

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: DynRecordStore,
    pub patients: PatientService,
    pub employees: EmployeeService,
    pub auth: AuthService,
}

impl AppState {
    /// Wires the services over `store`.
    pub fn new(store: DynRecordStore, cfg: &AppConfig) -> anyhow::Result<Self> {
        let auth = AuthService::new(store.clone(), &cfg.auth).context("auth service")?;
        Ok(Self {
            patients: PatientService::new(store.clone())
                .with_write_mode(cfg.workflow.write_mode),
            employees: EmployeeService::new(store.clone()),
            auth,
            store,
        })
    }

    /// Opens the configured record store and wires the services over it.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let store = match cfg.storage.backend {
            StorageBackend::Postgres => {
                hospital_db_postgres::create_record_store(cfg.storage.postgres.clone())
                    .await
                    .context("failed to open PostgreSQL record store")?
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory record store; data is lost on exit");
                hospital_db_memory::create_record_store()
            }
        };
        tracing::info!(
            backend = store.backend_name(),
            write_mode = %cfg.workflow.write_mode,
            "record store ready"
        );
        Self::new(store, cfg)
    }
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and auth endpoints
        .route("/healthz", get(handlers::healthz))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/profile", get(handlers::profile))
        // Patients
        .route(
            "/patients",
            get(handlers::list_patients)
                .post(handlers::add_patient)
                .put(handlers::update_patient),
        )
        .route("/patients/search", get(handlers::search_patients))
        .route("/patients/me", get(handlers::my_record))
        .route("/patients/appointments", post(handlers::add_appointment))
        .route("/patients/history", post(handlers::add_medical_history))
        .route("/patients/{id}", get(handlers::get_patient))
        // Employees
        .route(
            "/employees",
            get(handlers::list_employees).post(handlers::add_employee),
        )
        .route("/employees/search", get(handlers::search_employees))
        .route(
            "/employees/{id}",
            get(handlers::get_employee).put(handlers::update_employee),
        )
        // Middleware stack (order: request id -> trace -> cors/compression -> body type -> auth -> body limit)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            let req_id = req
                                .extensions()
                                .get::<RequestId>()
                                .and_then(|id| id.0.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(middleware::from_fn(app_middleware::require_json))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    app_middleware::authenticate,
                ))
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

pub struct HospitalServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynRecordStore>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses `store` instead of opening the configured backend.
    pub fn with_store(mut self, store: DynRecordStore) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> anyhow::Result<HospitalServer> {
        let state = match self.store {
            Some(store) => AppState::new(store, &self.config)?,
            None => AppState::from_config(&self.config).await?,
        };
        let app = build_app(state, &self.config);

        Ok(HospitalServer {
            addr: self.addr,
            app,
        })
    }
}

impl HospitalServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
