use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{ApiError, AppResult};

#[derive(Deserialize)]
pub(crate) struct PersonalChatRequest {
    pub(crate) user_id: Option<String>,
    pub(crate) participant_id: Option<String>,
}

#[derive(Debug)]
pub(crate) enum PersonalChat {
    Existing(Value),
    Created(Value),
}

#[debug_handler]
pub(crate) async fn create_personal_chat(
    State(db_pool): State<SqlitePool>,
    Json(req): Json<PersonalChatRequest>,
) -> AppResult<Response> {
    let (Some(user_id), Some(participant_id)) = (
        req.user_id.filter(|s| !s.is_empty()),
        req.participant_id.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Both user_id and participant_id are required".to_owned(),
        ));
    };

    match find_or_create_personal_chat(&db_pool, &user_id, &participant_id).await? {
        PersonalChat::Existing(chat) => Ok((
            StatusCode::OK,
            Json(json!({ "message": "Chat already exists", "chat": chat })),
        )
            .into_response()),
        PersonalChat::Created(chat) => Ok((
            StatusCode::CREATED,
            Json(json!({ "message": "Personal chat created successfully", "chat": chat })),
        )
            .into_response()),
    }
}

/// Look up the non-group chat between the pair, creating it if it is not
/// there. At most one such chat exists per pair; repeat calls return the
/// first one. A new chat is named after the invited user, not the creator.
pub(crate) async fn find_or_create_personal_chat(
    db_pool: &SqlitePool,
    user_id: &str,
    participant_id: &str,
) -> Result<PersonalChat, ApiError> {
    let not_found = || ApiError::NotFound("One or both users not found".to_owned());

    if sqlx::query_as::<_, (i64,)>("SELECT 1 FROM users WHERE uuid=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .is_none()
    {
        return Err(not_found());
    }
    let Some((participant_name,)) =
        sqlx::query_as::<_, (String,)>("SELECT username FROM users WHERE uuid=?")
            .bind(participant_id)
            .fetch_optional(db_pool)
            .await?
    else {
        return Err(not_found());
    };

    let existing: Option<(String, String, bool)> = sqlx::query_as(
        "SELECT c.uuid,c.name,c.is_group FROM chats c \
         JOIN chat_participants a ON a.chat_id = c.uuid AND a.user_id=? \
         JOIN chat_participants b ON b.chat_id = c.uuid AND b.user_id=? \
         WHERE c.is_group = FALSE",
    )
    .bind(user_id)
    .bind(participant_id)
    .fetch_optional(db_pool)
    .await?;

    if let Some((chat_id, name, is_group)) = existing {
        let chat = super::chat_summary(db_pool, &chat_id, &name, is_group).await?;
        return Ok(PersonalChat::Existing(chat));
    }

    let chat_id = Uuid::now_v7().to_string();
    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO chats (uuid,name,is_group) VALUES (?,?,FALSE)")
        .bind(&chat_id)
        .bind(&participant_name)
        .execute(&mut *tx)
        .await?;
    for id in [user_id, participant_id] {
        sqlx::query("INSERT OR IGNORE INTO chat_participants (user_id,chat_id) VALUES (?,?)")
            .bind(id)
            .bind(&chat_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(%chat_id, name = %participant_name, "created personal chat");

    let chat = super::chat_summary(db_pool, &chat_id, &participant_name, false).await?;
    Ok(PersonalChat::Created(chat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{memory_pool, seed_user};

    fn chat_of(result: &PersonalChat) -> &Value {
        match result {
            PersonalChat::Existing(chat) | PersonalChat::Created(chat) => chat,
        }
    }

    #[tokio::test]
    async fn second_call_returns_the_same_chat() {
        let db_pool = memory_pool().await;
        let alice = seed_user(&db_pool, "alice").await.to_string();
        let bob = seed_user(&db_pool, "bob").await.to_string();

        let first = find_or_create_personal_chat(&db_pool, &alice, &bob)
            .await
            .unwrap();
        assert!(matches!(first, PersonalChat::Created(_)));

        let second = find_or_create_personal_chat(&db_pool, &alice, &bob)
            .await
            .unwrap();
        assert!(matches!(second, PersonalChat::Existing(_)));
        assert_eq!(chat_of(&first)["id"], chat_of(&second)["id"]);

        // swapping the pair still finds the same chat
        let swapped = find_or_create_personal_chat(&db_pool, &bob, &alice)
            .await
            .unwrap();
        assert_eq!(chat_of(&first)["id"], chat_of(&swapped)["id"]);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chats")
            .fetch_one(&db_pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn chat_is_named_after_the_invited_user() {
        let db_pool = memory_pool().await;
        let alice = seed_user(&db_pool, "alice").await.to_string();
        let bob = seed_user(&db_pool, "bob").await.to_string();

        let created = find_or_create_personal_chat(&db_pool, &alice, &bob)
            .await
            .unwrap();
        let chat = chat_of(&created);
        assert_eq!(chat["name"], json!("bob"));
        assert_eq!(chat["is_group"], json!(false));
        assert_eq!(chat["participants"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_participant_is_not_found() {
        let db_pool = memory_pool().await;
        let alice = seed_user(&db_pool, "alice").await.to_string();

        let err = find_or_create_personal_chat(&db_pool, &alice, &Uuid::now_v7().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
