use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app::AppState;

/// Health check status
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Available,
    Degraded,
    Unavailable,
}

/// Health of a single collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub version: String,
    pub status: HealthStatus,
    /// Whole seconds, e.g. `1h2m3s`
    pub uptime: String,
    /// RFC 3339, local offset
    pub timestamp: String,
    pub checks: Vec<ComponentHealth>,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let status_code = match self.status {
            HealthStatus::Available | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status_code, Json(self)).into_response()
    }
}

/// Format like `1h2m3s`, dropping sub-second precision
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Build the health report for `state`
pub fn check_health(state: &AppState) -> HealthResponse {
    let mut checks = Vec::new();

    let sessions = if state.sessions.store().is_healthy() {
        ComponentHealth {
            name: "sessions".to_string(),
            status: HealthStatus::Available,
            message: None,
        }
    } else {
        ComponentHealth {
            name: "sessions".to_string(),
            status: HealthStatus::Unavailable,
            message: Some("Session store is not responding".to_string()),
        }
    };
    checks.push(sessions);

    checks.push(ComponentHealth {
        name: "templates".to_string(),
        status: HealthStatus::Available,
        message: Some(format!(
            "{} cached, caching {}",
            state.templates.len(),
            if state.templates.use_cache() { "on" } else { "off" }
        )),
    });

    let status = if checks.iter().any(|c| c.status == HealthStatus::Unavailable) {
        HealthStatus::Unavailable
    } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Available
    };

    HealthResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status,
        uptime: format_uptime(state.uptime()),
        timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        checks,
    }
}

/// Handler for the health endpoint
pub async fn health_handler(State(state): State<AppState>) -> HealthResponse {
    check_health(&state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_millis(4_900)), "4s");
        assert_eq!(format_uptime(Duration::from_secs(125)), "2m5s");
        assert_eq!(format_uptime(Duration::from_secs(3_600)), "1h0m0s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "25h1m1s");
    }

    #[test]
    fn test_check_health() {
        let state = AppState::builder(Config::default()).build();
        let report = check_health(&state);

        assert_eq!(report.status, HealthStatus::Available);
        assert_eq!(report.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(report.checks.len(), 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());
    }

    #[test]
    fn test_serialized_shape() {
        let state = AppState::builder(Config::default()).build();
        let json = serde_json::to_value(check_health(&state)).unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["checks"][0]["name"], "sessions");
        assert!(json["checks"][0].get("message").is_none());
    }
}
