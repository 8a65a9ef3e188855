//! HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::{AppError, AppResult, AppState};
use crate::constants::{APP_NAME, APP_VERSION};
use crate::logic::report::{self, HostRecord, InferenceReport, RunSummary};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    report_available: bool,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub total_alerts: usize,
    pub alerts: Vec<HostRecord>,
}

fn load_report(state: &AppState) -> AppResult<InferenceReport> {
    Ok(report::read_json(&state.report_path)?)
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": APP_NAME,
        "version": APP_VERSION,
        "endpoints": ["/health", "/summary", "/results", "/host/{host_id}", "/alerts"],
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: APP_VERSION,
        timestamp: chrono::Utc::now().timestamp(),
        report_available: state.report_path.exists(),
    })
}

pub async fn summary(State(state): State<AppState>) -> AppResult<Json<RunSummary>> {
    Ok(Json(load_report(&state)?.summary))
}

pub async fn results(State(state): State<AppState>) -> AppResult<Json<Vec<HostRecord>>> {
    Ok(Json(load_report(&state)?.results))
}

pub async fn host(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> AppResult<Json<HostRecord>> {
    let report = load_report(&state)?;
    report
        .find_host(&host_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Host {} not in report", host_id)))
}

/// Flagged hosts only
pub async fn alerts(State(state): State<AppState>) -> AppResult<Json<AlertsResponse>> {
    let report = load_report(&state)?;
    let alerts: Vec<HostRecord> = report.alerts().cloned().collect();
    Ok(Json(AlertsResponse { total_alerts: alerts.len(), alerts }))
}
