mod list;
mod messages;
mod personal;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/personal", post(personal::create_personal_chat))
        .route("/user/{uuid}", get(list::chats_for_user))
        .route("/{uuid}/messages", get(messages::messages_for_chat))
}

/// One chat as the clients see it, participants included.
pub(crate) async fn chat_summary(
    db_pool: &SqlitePool,
    chat_id: &str,
    name: &str,
    is_group: bool,
) -> Result<Value, sqlx::Error> {
    let participants: Vec<(String, String)> = sqlx::query_as(
        "SELECT u.uuid,u.username FROM users u \
         JOIN chat_participants cp ON cp.user_id = u.uuid WHERE cp.chat_id=?",
    )
    .bind(chat_id)
    .fetch_all(db_pool)
    .await?;

    let participants: Vec<Value> = participants
        .into_iter()
        .map(|(uuid, username)| json!({ "id": uuid, "username": username }))
        .collect();

    Ok(json!({
        "id": chat_id,
        "name": name,
        "is_group": is_group,
        "participants": participants,
    }))
}
