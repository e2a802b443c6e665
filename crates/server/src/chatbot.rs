//! Chat endpoint over the query pipeline, plus per-conversation history.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use sourcely_core::domain::chat::{conversation_title, ChatExchange, ChatId, NewChatExchange};

use crate::api::{ApiError, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chatbot/chat", post(chat))
        .route("/chatbot/chat/{chat_id}", get(chat_messages))
        .route("/chatbot/history", get(history))
        .with_state(state)
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub chat_id: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let existing = request.chat_id.filter(|id| !id.trim().is_empty());
    // Only the opening exchange of a conversation carries a title.
    let title = existing.is_none().then(|| conversation_title(&request.message));
    let chat_id = ChatId(existing.unwrap_or_else(|| Uuid::new_v4().to_string()));

    let response = state.runtime.process_query(&request.message).await;

    state
        .chats
        .append(NewChatExchange {
            chat_id: chat_id.clone(),
            title,
            user_message: request.message,
            bot_response: response.clone(),
            timestamp: Utc::now(),
        })
        .await?;
    info!(event_name = "chatbot.exchange.recorded", chat_id = %chat_id.0, "chat exchange recorded");

    Ok(Json(ChatResponse { response, chat_id: chat_id.0 }))
}

async fn history(State(state): State<AppState>) -> Result<Json<Vec<ChatExchange>>, ApiError> {
    Ok(Json(state.chats.latest_per_chat().await?))
}

async fn chat_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<ChatExchange>>, ApiError> {
    let exchanges = state.chats.list_for_chat(&ChatId(chat_id.clone())).await?;
    if exchanges.is_empty() {
        return Err(ApiError::not_found("chat", chat_id));
    }
    Ok(Json(exchanges))
}
