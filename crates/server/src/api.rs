//! HTTP API: predictions, insights, audit, health and Prometheus metrics

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thermal_core::{
    audit::{AuditLog, LogEntry, LogStatus},
    health::{components, ComponentStatus, HealthRegistry},
    insights::{Baseline, DashboardSummary, InsightReport, InsightsService, SweepRequest, SweepResult},
    schema::FeatureSpec,
    store::{self, PredictionStore},
    FeatureInput, PredictionRecord, PredictionService, ServiceMetrics, StructuredLogger,
    ThermalError, ThermalResult, User,
};
use tracing::{error, info};

/// Header carrying the requesting user's id
pub const USER_HEADER: &str = "x-user-id";
/// Header carrying the requesting user's role; `admin` grants admin rights
pub const ROLE_HEADER: &str = "x-user-role";

const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: PredictionService,
    pub insights: InsightsService,
    pub store: Arc<dyn PredictionStore>,
    pub audit: AuditLog,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        predictor: PredictionService,
        store: Arc<dyn PredictionStore>,
        audit: AuditLog,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        let predictor = predictor
            .with_metrics(metrics.clone())
            .with_logger(logger.clone())
            .with_audit(audit.clone());
        let insights = InsightsService::new(predictor.clone()).with_metrics(metrics.clone());
        Self {
            predictor,
            insights,
            store,
            audit,
            health_registry,
            metrics,
            logger,
        }
    }

    /// Update the stored predictions gauge and the store's health
    async fn refresh_store_gauge(&self) {
        let count = self.store.count().await;
        match &count {
            Ok(count) => self.metrics.set_stored_predictions(*count as i64),
            Err(e) => error!(error = %e, "Failed to count stored predictions"),
        }
        self.health_registry
            .record_check(components::STORE, &count)
            .await;
    }

    /// The user's predictions; a failing store marks it unhealthy
    async fn history(&self, user: &User) -> ThermalResult<Vec<PredictionRecord>> {
        let records = self.predictor.history(user, self.store.as_ref()).await;
        if let Err(e) = &records {
            error!(error = %e, user_id = %user.id, "Failed to read prediction history");
        }
        self.health_registry
            .record_check(components::STORE, &records)
            .await;
        records
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Error returned by every API handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }
}

impl From<ThermalError> for ApiError {
    fn from(err: ThermalError) -> Self {
        let status = match &err {
            ThermalError::Validation(_) => StatusCode::BAD_REQUEST,
            ThermalError::Forbidden(_) => StatusCode::FORBIDDEN,
            ThermalError::NotFound(_) => StatusCode::NOT_FOUND,
            ThermalError::Inference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ThermalError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// The requesting user, taken from the identity headers
pub struct Requester(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    format!("missing {} header", USER_HEADER),
                )
            })?;

        let is_admin = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.eq_ignore_ascii_case("admin"));

        Ok(Requester(User {
            id: id.to_string(),
            is_admin,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePredictionBody {
    pub features: FeatureInput,
}

#[derive(Debug, Serialize)]
struct SchemaResponse<'a> {
    model_version: &'a str,
    features: &'a [FeatureSpec],
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightsQuery {
    #[serde(default)]
    pub baseline: Baseline,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Liveness: 200 while operational, 503 once a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn schema(State(state): State<Arc<AppState>>) -> Response {
    Json(SchemaResponse {
        model_version: state.predictor.model_version(),
        features: state.predictor.schema().features(),
    })
    .into_response()
}

async fn create_prediction(
    State(state): State<Arc<AppState>>,
    Requester(user): Requester,
    payload: Result<Json<CreatePredictionBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PredictionRecord>)> {
    let Json(body) = payload?;

    let outcome = state
        .predictor
        .predict_and_store(&user, &body.features, state.store.as_ref())
        .await;
    state.health_registry.record_prediction(&outcome).await;
    let record = outcome?;
    state.refresh_store_gauge().await;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_predictions(
    State(state): State<Arc<AppState>>,
    Requester(user): Requester,
) -> ApiResult<Json<Vec<PredictionRecord>>> {
    Ok(Json(state.history(&user).await?))
}

async fn get_prediction(
    State(state): State<Arc<AppState>>,
    Requester(user): Requester,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<PredictionRecord>> {
    let Path(id) = id?;
    let record = store::fetch_visible(state.store.as_ref(), &user, id).await?;
    Ok(Json(record))
}

async fn delete_prediction(
    State(state): State<Arc<AppState>>,
    Requester(user): Requester,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state
        .predictor
        .delete(&user, id, state.store.as_ref())
        .await?;
    state.refresh_store_gauge().await;

    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Requester(user): Requester,
) -> ApiResult<Json<DashboardSummary>> {
    let records = state.history(&user).await?;
    Ok(Json(state.insights.summarize(&records)))
}

async fn insights(
    State(state): State<Arc<AppState>>,
    Requester(user): Requester,
    query: Result<Query<InsightsQuery>, QueryRejection>,
) -> ApiResult<Json<InsightReport>> {
    let Query(query) = query?;
    let records = state.history(&user).await?;
    let report = state.insights.report(&records, query.baseline);

    state
        .logger
        .log_insights(&user.id, records.len(), report.statement_count());
    state
        .audit
        .record(
            Some(&user.id),
            "Generate insights",
            LogStatus::Info,
            format!("{} statements over {} predictions", report.statement_count(), records.len()),
        )
        .await;

    Ok(Json(report))
}

async fn sweep(
    State(state): State<Arc<AppState>>,
    Requester(user): Requester,
    payload: Result<Json<SweepRequest>, JsonRejection>,
) -> ApiResult<Json<SweepResult>> {
    let Json(request) = payload?;
    let records = state.history(&user).await?;
    let result = state.insights.sweep(&records, &request)?;

    state.logger.log_insights(&user.id, records.len(), 1);
    state
        .audit
        .record(
            Some(&user.id),
            "Run sweep",
            LogStatus::Info,
            format!("{} over {} points", request.feature, result.points.len()),
        )
        .await;

    Ok(Json(result))
}

async fn audit_log(
    State(state): State<Arc<AppState>>,
    Requester(user): Requester,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    if !user.is_admin {
        return Err(ThermalError::Forbidden("audit log requires admin".to_string()).into());
    }
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Ok(Json(state.audit.recent(limit).await))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/schema", get(schema))
        .route(
            "/api/v1/predictions",
            post(create_prediction).get(list_predictions),
        )
        .route(
            "/api/v1/predictions/:id",
            get(get_prediction).delete(delete_prediction),
        )
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/insights", get(insights))
        .route("/api/v1/insights/sweep", post(sweep))
        .route("/api/v1/audit", get(audit_log))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
