use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::application::{Monitor, MonitoringStats, TaskSnapshot};
use crate::domain::{ConnectionKind, Device, DeviceId, MonitoringCategory};
use crate::error::MonitorError;

/// Custom error type that implements IntoResponse
#[derive(Debug)]
pub struct AppError(StatusCode, String);

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<MonitorError> for AppError {
    fn from(err: MonitorError) -> Self {
        let status = match err {
            MonitorError::NotFound(_) => StatusCode::NOT_FOUND,
            MonitorError::InvalidInterval(_) | MonitorError::Precondition(_) => {
                StatusCode::BAD_REQUEST
            }
            MonitorError::Transport(_) => StatusCode::BAD_GATEWAY,
        };
        Self(status, err.to_string())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

fn parse_category(raw: &str) -> Result<MonitoringCategory, AppError> {
    MonitoringCategory::parse(raw)
        .ok_or_else(|| AppError::bad_request(format!("unknown category: {raw}")))
}

/// Request body for POST /api/devices
#[derive(Debug, Deserialize)]
pub struct NewDeviceRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub host: String,
    pub connection: ConnectionKind,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_monitored")]
    pub monitored: bool,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

fn default_monitored() -> bool {
    true
}

impl NewDeviceRequest {
    fn into_device(self) -> Device {
        Device::new(
            self.id.unwrap_or_default(),
            self.name,
            self.host,
            self.connection,
        )
        .with_credentials(self.username, self.password)
        .with_monitored(self.monitored)
        .with_cloud_id(self.cloud_id)
    }
}

/// Response for POST /api/devices
#[derive(Debug, Serialize)]
pub struct DeviceCreatedResponse {
    pub id: String,
}

/// Response for /api/devices
#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub timestamp: String,
    pub devices: Vec<Device>,
}

/// Response for /api/stats
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub stats: MonitoringStats,
}

/// One row of /api/categories
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: MonitoringCategory,
    pub interval_secs: u64,
    pub paused: bool,
}

/// Request body for PUT /api/categories/{category}/interval
#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    pub seconds: u64,
}

/// Response for POST /api/devices/{id}/run/{category}
#[derive(Debug, Serialize)]
pub struct RunNowResponse {
    pub ran: bool,
}

/// Response for /api/devices/{id}/tasks
#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub device: String,
    pub tasks: Vec<TaskSnapshot>,
}

/// Handler for GET /api/health
pub async fn health_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": "fleetmon"
        })),
    )
}

/// Handler for GET /api/devices
#[debug_handler]
pub async fn list_devices_handler(State(state): State<AppState>) -> Response {
    let devices = state.monitor.list_devices();
    (
        StatusCode::OK,
        Json(DevicesResponse {
            timestamp: chrono::Utc::now().to_rfc3339(),
            devices,
        }),
    )
        .into_response()
}

/// Handler for POST /api/devices
pub async fn create_device_handler(
    State(state): State<AppState>,
    Json(request): Json<NewDeviceRequest>,
) -> Response {
    let id = state.monitor.add_device(request.into_device());
    (
        StatusCode::CREATED,
        Json(DeviceCreatedResponse { id: id.to_string() }),
    )
        .into_response()
}

/// Handler for GET /api/devices/{id}
pub async fn get_device_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Device>, AppError> {
    state
        .monitor
        .get_device(&DeviceId::new(&id))
        .map(Json)
        .ok_or_else(|| AppError::from(MonitorError::NotFound(id)))
}

/// Handler for DELETE /api/devices/{id}
pub async fn delete_device_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.monitor.remove_device(&DeviceId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/devices/{id}/tasks
pub async fn device_tasks_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TasksResponse>, AppError> {
    let device_id = DeviceId::new(&id);
    if state.monitor.get_device(&device_id).is_none() {
        return Err(AppError::from(MonitorError::NotFound(id)));
    }
    Ok(Json(TasksResponse {
        device: id,
        tasks: state.monitor.device_tasks(&device_id),
    }))
}

/// Handler for POST /api/devices/{id}/run/{category}
pub async fn run_now_handler(
    State(state): State<AppState>,
    Path((id, category)): Path<(String, String)>,
) -> Result<Json<RunNowResponse>, AppError> {
    let category = parse_category(&category)?;
    let device_id = DeviceId::new(&id);
    if state.monitor.get_device(&device_id).is_none() {
        return Err(AppError::from(MonitorError::NotFound(id)));
    }
    let ran = state.monitor.run_now(&device_id, category).await;
    Ok(Json(RunNowResponse { ran }))
}

/// Handler for GET /api/stats
#[debug_handler]
pub async fn stats_handler(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(StatsResponse {
            timestamp: chrono::Utc::now().to_rfc3339(),
            stats: state.monitor.stats(),
        }),
    )
        .into_response()
}

/// Handler for GET /api/categories
pub async fn list_categories_handler(State(state): State<AppState>) -> Json<Vec<CategoryResponse>> {
    let rows = MonitoringCategory::ALL
        .into_iter()
        .map(|category| CategoryResponse {
            category,
            interval_secs: state.monitor.interval(category),
            paused: state.monitor.is_paused(category),
        })
        .collect();
    Json(rows)
}

/// Handler for PUT /api/categories/{category}/interval
pub async fn set_interval_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(request): Json<IntervalRequest>,
) -> Result<StatusCode, AppError> {
    let category = parse_category(&category)?;
    state.monitor.set_interval(category, request.seconds)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/categories/{category}/pause
pub async fn pause_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<StatusCode, AppError> {
    state.monitor.pause(parse_category(&category)?);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/categories/{category}/resume
pub async fn resume_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<StatusCode, AppError> {
    state.monitor.resume(parse_category(&category)?);
    Ok(StatusCode::NO_CONTENT)
}
