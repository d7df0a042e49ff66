use axum::{
    debug_handler,
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{ApiError, AppResult};

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    pub(crate) username: Option<String>,
}

#[debug_handler]
pub(crate) async fn search_users(
    Query(SearchQuery { username }): Query<SearchQuery>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Value>> {
    let Some(username) = username.filter(|s| !s.is_empty()) else {
        return Err(ApiError::BadRequest(
            "Username parameter is required".to_owned(),
        ));
    };

    // sqlite LIKE is case-insensitive for ASCII, matching the ilike the
    // clients expect
    let matches: Vec<(String, String)> =
        sqlx::query_as("SELECT uuid,username FROM users WHERE username LIKE '%' || ? || '%'")
            .bind(&username)
            .fetch_all(&db_pool)
            .await?;

    let users: Vec<Value> = matches
        .into_iter()
        .map(|(uuid, username)| json!({ "id": uuid, "username": username }))
        .collect();

    Ok(Json(Value::Array(users)))
}
