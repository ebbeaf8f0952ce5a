use axum::{extract::State, response::IntoResponse, Json};
use ksql_connector::check_health;
use ksql_core::{DataSourceJsonData, PluginSettings, SecureJsonFields};
use serde::Serialize;

use crate::{ApiResponse, LiveHub};

pub mod live;

#[derive(Clone)]
pub struct AppState {
    pub hub: LiveHub,
}

/// Public view of the configured data source; secrets only appear as flags
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInfo {
    pub uid: String,
    pub json_data: DataSourceJsonData,
    pub secure_json_fields: SecureJsonFields,
}

/// Backend `/health` resource
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let settings = PluginSettings::load(state.hub.settings());
    Json(check_health(settings).await)
}

pub async fn get_datasource(State(state): State<AppState>) -> ApiResponse<DataSourceInfo> {
    let instance = state.hub.settings();
    let settings = match PluginSettings::load(instance) {
        Ok(settings) => settings,
        Err(e) => {
            return ApiResponse::internal_error("Unable to load settings", vec![e.to_string()])
        }
    };

    let info = DataSourceInfo {
        uid: instance.uid.clone(),
        json_data: DataSourceJsonData {
            ksqlserver: settings.ksqlserver.clone(),
            http: settings.http,
            username: Some(settings.username.clone()).filter(|u| !u.is_empty()),
        },
        secure_json_fields: SecureJsonFields {
            password: !settings.password.is_empty(),
        },
    };

    ApiResponse::success(info, "Data source retrieved successfully")
}

pub async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    let channels = state.hub.active_channels();
    ApiResponse::success(channels, "Channels retrieved successfully")
}
