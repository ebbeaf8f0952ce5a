use crate::handlers::{get_datasource, health_check, list_channels, live::live_socket, AppState};
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    host: String,
    port: u16,
    cors_enabled: bool,
    state: AppState,
}

impl ApiServer {
    pub fn new(host: String, port: u16, cors_enabled: bool, state: AppState) -> Self {
        Self {
            host,
            port,
            cors_enabled,
            state,
        }
    }

    pub fn router(&self) -> Router {
        let mut app = Router::new()
            // Backend resources
            .route("/health", get(health_check))
            .route("/api/datasource", get(get_datasource))
            // Live channels
            .route("/api/channels", get(list_channels))
            .route("/api/live/ws", get(live_socket))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.cors_enabled {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);

            app = app.layer(cors);
        }

        app
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.host, self.port);
        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
