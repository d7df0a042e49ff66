use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{ApiError, AppResult};

#[debug_handler]
pub(crate) async fn chats_for_user(
    Path(uuid): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Value>> {
    if sqlx::query_as::<_, (i64,)>("SELECT 1 FROM users WHERE uuid=?")
        .bind(uuid.to_string())
        .fetch_optional(&db_pool)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("User not found".to_owned()));
    }

    let chats: Vec<(String, String, bool)> = sqlx::query_as(
        "SELECT c.uuid,c.name,c.is_group FROM chats c \
         JOIN chat_participants cp ON cp.chat_id = c.uuid WHERE cp.user_id=?",
    )
    .bind(uuid.to_string())
    .fetch_all(&db_pool)
    .await?;

    let mut out = Vec::with_capacity(chats.len());
    for (chat_id, name, is_group) in chats {
        out.push(super::chat_summary(&db_pool, &chat_id, &name, is_group).await?);
    }

    Ok(Json(Value::Array(out)))
}
