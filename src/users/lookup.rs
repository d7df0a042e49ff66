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
pub(crate) async fn user_by_id(
    Path(uuid): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Value>> {
    let Some((uuid, username)) =
        sqlx::query_as::<_, (String, String)>("SELECT uuid,username FROM users WHERE uuid=?")
            .bind(uuid.to_string())
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(ApiError::NotFound("User not found".to_owned()));
    };

    Ok(Json(json!({ "id": uuid, "username": username })))
}

#[debug_handler]
pub(crate) async fn user_profile(
    Path(uuid): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Value>> {
    let Some((username, email)) =
        sqlx::query_as::<_, (String, String)>("SELECT username,email FROM users WHERE uuid=?")
            .bind(uuid.to_string())
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(ApiError::NotFound("User not found".to_owned()));
    };

    Ok(Json(json!({ "username": username, "email": email })))
}
