use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let server = &self.state.config().server;
        let timeout = Duration::from_secs(server.request_timeout_secs);

        Router::new()
            .route("/check-login", get(handlers::check_login))
            .route("/health", get(handlers::health))
            .route("/api/positions", get(handlers::get_positions))
            .route("/api/toggle-demo", post(handlers::toggle_demo))
            .route("/api/session", get(handlers::get_session))
            .fallback_service(ServeDir::new(&server.static_dir))
            .layer(TimeoutLayer::new(timeout))
            // Outside the timeout layer; bounded by the brokerage call timeouts.
            .route("/api/exit", post(handlers::exit_positions))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
