use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{ApiError, AppResult};

use super::password;

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
}

#[debug_handler]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let (Some(username), Some(password)) = (
        req.username.filter(|s| !s.is_empty()),
        req.password.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::InvalidCredentials);
    };

    let Some((uuid, password_hash)) =
        sqlx::query_as::<_, (String, String)>("SELECT uuid,password_hash FROM users WHERE username=?")
            .bind(&username)
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(ApiError::InvalidCredentials);
    };

    password::verify_password(&password, &password_hash)?;

    Ok(Json(json!({
        "message": "Login successful!",
        "user_id": uuid,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;

    async fn seed(db_pool: &SqlitePool, username: &str, pw: &str) -> String {
        let uuid = uuid::Uuid::now_v7().to_string();
        sqlx::query("INSERT INTO users (uuid,username,email,password_hash) VALUES (?,?,?,?)")
            .bind(&uuid)
            .bind(username)
            .bind(format!("{username}@example.com"))
            .bind(password::hash_password(pw).unwrap())
            .execute(db_pool)
            .await
            .unwrap();
        uuid
    }

    #[tokio::test]
    async fn correct_credentials_return_the_user_id() {
        let db_pool = memory_pool().await;
        let uuid = seed(&db_pool, "alice", "pw1").await;

        let Json(body) = login(
            State(db_pool),
            Json(LoginRequest {
                username: Some("alice".to_owned()),
                password: Some("pw1".to_owned()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body["user_id"], json!(uuid));
        assert_eq!(body["message"], json!("Login successful!"));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let db_pool = memory_pool().await;
        seed(&db_pool, "alice", "pw1").await;

        let err = login(
            State(db_pool),
            Json(LoginRequest {
                username: Some("alice".to_owned()),
                password: Some("wrong".to_owned()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn unknown_username_is_unauthorized() {
        let db_pool = memory_pool().await;
        let err = login(
            State(db_pool),
            Json(LoginRequest {
                username: Some("ghost".to_owned()),
                password: Some("pw1".to_owned()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }
}
