//! HTTP endpoint for recipe suggestions.
//!
//! Serves `POST /api/suggestRecipe` for browser clients plus a `GET /health`
//! probe. The handler is stateless apart from the shared [`RecipeService`].

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::RecipeService;

/// Path of the recipe endpoint.
pub const SUGGEST_RECIPE_PATH: &str = "/api/suggestRecipe";

/// Message returned to clients when the completion call fails.
pub const RECIPE_FAILURE_MESSAGE: &str = "Failed to fetch a recipe. Please try again later.";

/// Body of a recipe request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRecipeRequest {
    /// Comma-separated item names.
    #[serde(default)]
    pub pantry_items: String,
}

/// Body of a successful recipe response.
#[derive(Debug, Serialize)]
pub struct SuggestRecipeResponse {
    /// Suggested recipe text.
    pub recipe: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Error returned by the recipe handler.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Recipe request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: RECIPE_FAILURE_MESSAGE,
            }),
        )
            .into_response()
    }
}

/// Build the application router.
pub fn router(service: Arc<RecipeService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            SUGGEST_RECIPE_PATH,
            post(suggest_recipe).fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn suggest_recipe(
    State(service): State<Arc<RecipeService>>,
    Json(request): Json<SuggestRecipeRequest>,
) -> std::result::Result<Json<SuggestRecipeResponse>, ApiError> {
    let recipe = service.suggest(&request.pantry_items).await?;
    Ok(Json(SuggestRecipeResponse { recipe }))
}

async fn method_not_allowed(method: Method) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, HeaderValue::from_static("POST"))],
        format!("Method {method} Not Allowed"),
    )
        .into_response()
}

async fn health() -> &'static str {
    "OK"
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns [`Error::Server`] if the address cannot be bound or serving fails.
pub async fn start_server(config: &Config, service: Arc<RecipeService>) -> Result<()> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| Error::Server {
            address: address.clone(),
            source,
        })?;

    info!("Recipe endpoint listening on http://{address}{SUGGEST_RECIPE_PATH}");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| Error::Server { address, source })?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!("Failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
