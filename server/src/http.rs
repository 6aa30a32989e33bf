use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode, request::Parts},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use platform_api::{ApiError, ApiResult, check_object_permissions, check_permissions};
use platform_authn::{Authenticated, Principal, PrincipalId, TokenRegistry};
use platform_authz::{ALL_PERMISSIONS, ApiView, Request, ViewSet};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    store::{OrganizationSettings, Schedule, SlackSettings, Store},
    views::Views,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<TokenRegistry>,
    pub views: Arc<Views>,
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, registry: TokenRegistry, store: Store) -> anyhow::Result<Self> {
        let views = Views::declare().context("invalid view permission declarations")?;
        Ok(Self {
            config,
            registry: Arc::new(registry),
            views: Arc::new(views),
            store: Arc::new(store),
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "rbac server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let api = Router::new()
        .route("/permissions", get(list_permissions))
        .route(
            "/slack_settings",
            get(get_slack_settings).put(update_slack_settings),
        )
        .route(
            "/organization",
            get(get_organization).put(update_organization),
        )
        .route(
            "/users/{id}/export_token",
            get(get_export_token)
                .post(create_export_token)
                .delete(delete_export_token),
        )
        .route("/schedules", get(list_schedules))
        .route(
            "/schedules/{id}",
            get(retrieve_schedule).delete(destroy_schedule),
        )
        .route("/schedules/{id}/shifts/{shift_id}", get(retrieve_shift))
        .route("/staff/principals", get(list_principals));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/internal/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// The authenticated caller, resolved from the `Authorization` header.
pub struct Caller(pub Authenticated);

impl Caller {
    fn request(&self, method: Method) -> Request<'_> {
        Request::new(&self.0.principal, method).with_auth_method(self.0.method)
    }

    fn principal(&self) -> &Principal {
        &self.0.principal
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        Ok(Caller(state.registry.authenticate(header)?))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct PermissionEntry {
    pub id: &'static str,
    pub resource: &'static str,
    pub action: &'static str,
}

#[instrument(name = "http.permissions.list", skip_all)]
async fn list_permissions(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
) -> ApiResult<Json<Vec<PermissionEntry>>> {
    let view = ApiView::new(state.views.permissions.clone());
    check_permissions(&caller.request(method), &view)?;
    let entries = ALL_PERMISSIONS
        .iter()
        .map(|perm| PermissionEntry {
            id: perm.as_str(),
            resource: perm.resource().as_str(),
            action: perm.action().as_str(),
        })
        .collect();
    Ok(Json(entries))
}

#[instrument(name = "http.slack_settings.get", skip_all)]
async fn get_slack_settings(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
) -> ApiResult<Json<SlackSettings>> {
    let view = ApiView::new(state.views.slack_settings.clone());
    check_permissions(&caller.request(method), &view)?;
    Ok(Json(state.store.slack_settings().await))
}

#[instrument(name = "http.slack_settings.put", skip_all)]
async fn update_slack_settings(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
    Json(settings): Json<SlackSettings>,
) -> ApiResult<Json<SlackSettings>> {
    let view = ApiView::new(state.views.slack_settings.clone());
    check_permissions(&caller.request(method), &view)?;
    if settings.alert_group_timeout_hours == 0 {
        return Err(ApiError::InvalidInput(
            "alert_group_timeout_hours must be positive".into(),
        ));
    }
    state.store.set_slack_settings(settings.clone()).await;
    Ok(Json(settings))
}

#[instrument(name = "http.organization.get", skip_all)]
async fn get_organization(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
) -> ApiResult<Json<OrganizationSettings>> {
    let view = ApiView::new(state.views.organization.clone());
    check_permissions(&caller.request(method), &view)?;
    Ok(Json(state.store.organization().await))
}

#[instrument(name = "http.organization.put", skip_all)]
async fn update_organization(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
    Json(settings): Json<OrganizationSettings>,
) -> ApiResult<Json<OrganizationSettings>> {
    let view = ApiView::new(state.views.organization.clone());
    check_permissions(&caller.request(method), &view)?;
    if settings.name.trim().is_empty() {
        return Err(ApiError::InvalidInput("name must not be empty".into()));
    }
    state.store.set_organization(settings.clone()).await;
    Ok(Json(settings))
}

#[derive(Serialize)]
struct ExportTokenPayload {
    created_at: DateTime<Utc>,
    active: bool,
}

#[derive(Serialize)]
struct CreatedExportToken {
    token: String,
    created_at: DateTime<Utc>,
    export_url: String,
}

/// Export tokens are only visible to the user they belong to; any other id
/// reads as not found.
fn own_user_id(caller: &Caller, id: Uuid) -> ApiResult<PrincipalId> {
    let requested = PrincipalId(id);
    if requested != caller.principal().id {
        return Err(ApiError::NotFound);
    }
    Ok(requested)
}

#[instrument(name = "http.export_token.get", skip_all, fields(user = %id))]
async fn get_export_token(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ExportTokenPayload>> {
    let view = ApiView::new(state.views.user_export_token.clone());
    check_permissions(&caller.request(method), &view)?;
    let user = own_user_id(&caller, id)?;
    let token = state
        .store
        .export_token(user)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ExportTokenPayload {
        created_at: token.created_at,
        active: true,
    }))
}

#[instrument(name = "http.export_token.create", skip_all, fields(user = %id))]
async fn create_export_token(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<CreatedExportToken>)> {
    let view = ApiView::new(state.views.user_export_token.clone());
    check_permissions(&caller.request(method), &view)?;
    let user = own_user_id(&caller, id)?;
    let token = state
        .store
        .create_export_token(user)
        .await
        .ok_or_else(|| ApiError::Conflict("schedule export token already exists".into()))?;
    let export_url = format!("/api/v1/users/{user}/schedule_export?token={}", token.token);
    Ok((
        StatusCode::CREATED,
        Json(CreatedExportToken {
            token: token.token,
            created_at: token.created_at,
            export_url,
        }),
    ))
}

#[instrument(name = "http.export_token.delete", skip_all, fields(user = %id))]
async fn delete_export_token(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let view = ApiView::new(state.views.user_export_token.clone());
    check_permissions(&caller.request(method), &view)?;
    let user = own_user_id(&caller, id)?;
    state
        .store
        .revoke_export_token(user)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct SchedulePayload {
    id: Uuid,
    name: String,
    user: PrincipalId,
}

impl SchedulePayload {
    fn new(schedule: &Schedule) -> Self {
        Self {
            id: schedule.id,
            name: schedule.name.clone(),
            user: schedule.user.id,
        }
    }
}

#[derive(Serialize)]
struct ShiftPayload {
    id: Uuid,
    title: String,
    schedule: Uuid,
}

#[instrument(name = "http.schedules.list", skip_all)]
async fn list_schedules(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
) -> ApiResult<Json<Vec<SchedulePayload>>> {
    let view = ViewSet::new(state.views.schedules.clone(), "list");
    check_permissions(&caller.request(method), &view)?;
    let schedules = state.store.schedules().await;
    Ok(Json(schedules.iter().map(|s| SchedulePayload::new(s)).collect()))
}

#[instrument(name = "http.schedules.retrieve", skip_all, fields(schedule = %id))]
async fn retrieve_schedule(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SchedulePayload>> {
    let view = ViewSet::new(state.views.schedules.clone(), "retrieve");
    let request = caller.request(method);
    check_permissions(&request, &view)?;
    let schedule = state.store.schedule(id).await.ok_or(ApiError::NotFound)?;
    check_object_permissions(&request, &view, &*schedule)?;
    Ok(Json(SchedulePayload::new(&schedule)))
}

#[instrument(name = "http.schedules.destroy", skip_all, fields(schedule = %id))]
async fn destroy_schedule(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let view = ViewSet::new(state.views.schedules.clone(), "destroy");
    let request = caller.request(method);
    check_permissions(&request, &view)?;
    let schedule = state.store.schedule(id).await.ok_or(ApiError::NotFound)?;
    check_object_permissions(&request, &view, &*schedule)?;
    state.store.remove_schedule(schedule.id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ShiftPath {
    id: Uuid,
    shift_id: Uuid,
}

#[instrument(name = "http.schedules.shift", skip_all)]
async fn retrieve_shift(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
    Path(path): Path<ShiftPath>,
) -> ApiResult<Json<ShiftPayload>> {
    let view = ViewSet::new(state.views.schedules.clone(), "shift");
    let request = caller.request(method);
    check_permissions(&request, &view)?;
    let shift = state
        .store
        .shift(path.id, path.shift_id)
        .await
        .ok_or(ApiError::NotFound)?;
    check_object_permissions(&request, &view, &*shift)?;
    Ok(Json(ShiftPayload {
        id: shift.id,
        title: shift.title.clone(),
        schedule: shift.schedule.id,
    }))
}

#[derive(Serialize)]
struct PrincipalPayload {
    id: PrincipalId,
    name: String,
    is_staff: bool,
    permissions: Vec<String>,
}

#[instrument(name = "http.staff.principals", skip_all)]
async fn list_principals(
    State(state): State<AppState>,
    method: Method,
    caller: Caller,
) -> ApiResult<Json<Vec<PrincipalPayload>>> {
    let view = ApiView::new(state.views.staff_principals.clone());
    check_permissions(&caller.request(method), &view)?;
    let principals = state
        .registry
        .principals()
        .into_iter()
        .map(|p| PrincipalPayload {
            id: p.id,
            name: p.name.clone(),
            is_staff: p.is_staff,
            permissions: p.permissions.iter().map(|g| g.action.clone()).collect(),
        })
        .collect();
    Ok(Json(principals))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
