use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{ApiError, AppResult};

#[debug_handler]
pub(crate) async fn messages_for_chat(
    Path(uuid): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Value>> {
    if sqlx::query_as::<_, (i64,)>("SELECT 1 FROM chats WHERE uuid=?")
        .bind(uuid.to_string())
        .fetch_optional(&db_pool)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Chat not found".to_owned()));
    }

    let rows: Vec<(String, String, String, String)> = sqlx::query_as(
        "SELECT id,sender_id,content,timestamp FROM messages \
         WHERE chat_id=? ORDER BY timestamp,id",
    )
    .bind(uuid.to_string())
    .fetch_all(&db_pool)
    .await?;

    let messages: Vec<Value> = rows
        .into_iter()
        .map(|(id, sender_id, content, timestamp)| {
            json!({
                "id": id,
                "sender_id": sender_id,
                "content": content,
                "timestamp": timestamp,
            })
        })
        .collect();

    Ok(Json(Value::Array(messages)))
}
