use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};
use uuid::Uuid;

use sourcely_agent::AgentRuntime;
use sourcely_core::errors::{ApplicationError, DomainError, InterfaceError};
use sourcely_db::repositories::{
    ChatHistoryRepository, ProductRepository, RepositoryError, SupplierRepository,
};
use sourcely_db::DbPool;

use crate::{catalog, chatbot, health};

/// Handles shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub suppliers: Arc<dyn SupplierRepository>,
    pub chats: Arc<dyn ChatHistoryRepository>,
    pub runtime: Arc<AgentRuntime>,
}

/// The full HTTP surface: catalog CRUD, chatbot and health.
pub fn router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .merge(catalog::router(state.clone()))
        .merge(chatbot::router(state))
        .merge(health::router(db_pool))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
    correlation_id: &'a str,
}

/// Request failure rendered as `{detail, correlation_id}` with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApplicationError::Domain(DomainError::InvariantViolation(message.into())).into()
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ApplicationError::NotFound { entity, id: id.to_string() }.into()
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let interface = error.into_interface(Uuid::new_v4().to_string());
        match &interface {
            InterfaceError::ServiceUnavailable { message, correlation_id }
            | InterfaceError::Internal { message, correlation_id } => {
                error!(
                    event_name = "http.request.failed",
                    correlation_id = %correlation_id,
                    error = %message,
                    "request failed"
                );
            }
            other => {
                warn!(
                    event_name = "http.request.rejected",
                    correlation_id = %other.correlation_id(),
                    error = %other,
                    "request rejected"
                );
            }
        }
        Self(interface)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self.0 {
            InterfaceError::BadRequest { message, .. }
            | InterfaceError::NotFound { message, .. }
            | InterfaceError::Conflict { message, .. } => message.as_str(),
            // Storage and configuration detail stays in the logs.
            other => other.user_message(),
        };
        let body = ErrorBody { detail, correlation_id: self.0.correlation_id() };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use sourcely_agent::{AgentRuntime, ScriptedLlmClient};
    use sourcely_core::domain::supplier::NewSupplier;
    use sourcely_db::repositories::{
        InMemoryChatHistoryRepository, InMemoryProductRepository, InMemorySupplierRepository,
        ProductRepository, SupplierRepository,
    };

    use super::AppState;

    /// In-memory state whose classifier always receives `reply`.
    pub fn state(reply: &str) -> AppState {
        let products: Arc<dyn ProductRepository> = Arc::new(InMemoryProductRepository::default());
        let suppliers: Arc<dyn SupplierRepository> =
            Arc::new(InMemorySupplierRepository::default());
        let llm = Arc::new(ScriptedLlmClient::replying(reply));

        AppState {
            runtime: Arc::new(AgentRuntime::with_llm(llm, products.clone(), suppliers.clone())),
            products,
            suppliers,
            chats: Arc::new(InMemoryChatHistoryRepository::default()),
        }
    }

    pub fn new_supplier(name: &str, email: &str) -> NewSupplier {
        NewSupplier {
            name: name.to_string(),
            email: email.to_string(),
            phone: "555-0100".to_string(),
            address: "1 Market St".to_string(),
            categories_offered: vec!["Gaming".to_string()],
        }
    }

    pub async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
    use serde_json::Value;
    use sourcely_db::repositories::RepositoryError;

    use super::ApiError;

    #[test]
    fn conflicts_map_to_409() {
        let error = ApiError::from(RepositoryError::Conflict("email taken".to_string()));
        assert_eq!(error.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn storage_failures_hide_detail() {
        let error = ApiError::from(RepositoryError::Decode("bad categories".to_string()));
        assert_eq!(error.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(error.into_response().into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            body["detail"],
            "The service is temporarily unavailable. Please retry shortly."
        );
        assert!(body["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let error = ApiError::not_found("product", 9);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.0.to_string(), "not found: product `9` not found");
    }
}
