//! Recipe suggestions from a text-completion API.
//!
//! [`RecipeService`] turns the pantry contents into a fixed prompt and asks a
//! [`CompletionClient`] for a short recipe. [`OpenAiClient`] is the production
//! client; tests substitute a mock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::Result;

/// Errors from the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipeError {
    /// The request could not be sent or the API answered with an error status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The API answered, but not with a usable completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Prompt text.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// Port for a text-completion backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the generated text for `request`.
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<String, RecipeError>;
}

/// Build the prompt sent for a list of pantry items.
#[must_use]
pub fn build_prompt(pantry_items: &str) -> String {
    format!("Suggest a recipe using the following ingredients: {pantry_items}.")
}

/// Client for the OpenAI completions endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client for `base_url` using `model`.
    #[must_use]
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    /// Create a client from the `recipe` configuration section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let api_key = config.recipe_api_key();
        if api_key.is_none() {
            warn!("No completion API key configured; recipe requests will likely fail");
        }
        Self::new(
            &config.recipe.base_url,
            &config.recipe.model,
            api_key,
            config.recipe_timeout(),
        )
    }
}

#[derive(Debug, Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<String, RecipeError> {
        let body = CompletionsRequest {
            model: &self.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RecipeError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecipeError::RequestFailed(format!("{status}: {error_text}")));
        }

        let completion: CompletionsResponse = response
            .json()
            .await
            .map_err(|e| RecipeError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| RecipeError::InvalidResponse("no choices returned".to_string()))
    }
}

/// Suggests recipes for a set of pantry items.
pub struct RecipeService {
    client: Arc<dyn CompletionClient>,
    max_tokens: u32,
}

impl std::fmt::Debug for RecipeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeService")
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl RecipeService {
    /// Create a service over `client` with the given token budget.
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    /// Create a service backed by [`OpenAiClient`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(OpenAiClient::from_config(config)),
            config.recipe.max_tokens,
        )
    }

    /// Ask for a recipe using `pantry_items` (comma-separated names).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UpstreamRecipeFailure`] if the completion call fails.
    #[instrument(skip(self))]
    pub async fn suggest(&self, pantry_items: &str) -> Result<String> {
        let request = CompletionRequest {
            prompt: build_prompt(pantry_items),
            max_tokens: self.max_tokens,
        };

        let text = self.client.complete(request).await?;
        debug!("Received {} characters of recipe text", text.len());
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::Error;

    #[test]
    fn test_build_prompt() {
        assert_eq!(
            build_prompt("eggs, flour"),
            "Suggest a recipe using the following ingredients: eggs, flour."
        );
        assert_eq!(
            build_prompt(""),
            "Suggest a recipe using the following ingredients: ."
        );
    }

    #[tokio::test]
    async fn test_suggest_uses_prompt_and_budget() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .withf(|request| {
                request.prompt == "Suggest a recipe using the following ingredients: eggs."
                    && request.max_tokens == 100
            })
            .times(1)
            .returning(|_| Ok("\n\nOmelette\n".to_string()));

        let service = RecipeService::new(Arc::new(client), 100);
        assert_eq!(service.suggest("eggs").await.unwrap(), "Omelette");
    }

    #[tokio::test]
    async fn test_suggest_surfaces_upstream_failure() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(|_| Err(RecipeError::RequestFailed("429".to_string())));

        let service = RecipeService::new(Arc::new(client), 100);
        let err = service.suggest("eggs").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamRecipeFailure(_)));
    }

    #[derive(Clone)]
    struct StubState {
        status: StatusCode,
        body: Value,
    }

    async fn completions(
        State(state): State<StubState>,
        headers: HeaderMap,
        Json(request): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer test-key");
        if !authorized || request["model"] != "gpt-3.5-turbo-instruct" {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad request"})));
        }
        (state.status, Json(state.body))
    }

    async fn spawn_stub(status: StatusCode, body: Value) -> OpenAiClient {
        let app = Router::new()
            .route("/v1/completions", post(completions))
            .with_state(StubState { status, body });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        OpenAiClient::new(
            &format!("http://{address}/"),
            "gpt-3.5-turbo-instruct",
            Some("test-key".to_string()),
            Duration::from_secs(5),
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            prompt: build_prompt("rice, beans"),
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn test_openai_client_returns_first_choice() {
        let client = spawn_stub(
            StatusCode::OK,
            json!({"choices": [{"text": " Rice and beans"}, {"text": "ignored"}]}),
        )
        .await;

        assert_eq!(client.complete(request()).await.unwrap(), " Rice and beans");
    }

    #[tokio::test]
    async fn test_openai_client_error_status() {
        let client = spawn_stub(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": {"message": "overloaded"}}),
        )
        .await;

        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, RecipeError::RequestFailed(ref m) if m.contains("overloaded")));
    }

    #[tokio::test]
    async fn test_openai_client_no_choices() {
        let client = spawn_stub(StatusCode::OK, json!({"choices": []})).await;

        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, RecipeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_openai_client_unreachable() {
        let client = OpenAiClient::new(
            "http://127.0.0.1:1",
            "gpt-3.5-turbo-instruct",
            None,
            Duration::from_secs(2),
        );

        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, RecipeError::RequestFailed(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = OpenAiClient::new(
            "https://api.openai.com",
            "gpt-3.5-turbo-instruct",
            Some("sk-secret".to_string()),
            Duration::from_secs(1),
        );
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("redacted"));
    }
}
