use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::mail::{Mailer, VerificationCodes};
use crate::{ApiError, AppResult, AppState};

use super::password;

#[derive(Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) email: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    State(mailer): State<Mailer>,
    State(codes): State<VerificationCodes>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let (Some(email), Some(username), Some(password)) = (
        req.email.filter(|s| !s.is_empty()),
        req.username.filter(|s| !s.is_empty()),
        req.password.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Missing required fields".to_owned()));
    };

    if sqlx::query_as::<_, (i64,)>("SELECT 1 FROM users WHERE email=?")
        .bind(&email)
        .fetch_optional(&db_pool)
        .await?
        .is_some()
    {
        return Err(ApiError::DuplicateEmail);
    }

    let code = codes.issue(&email);
    mailer.send(&email, "Verification Code", &format!("Your code: {code}"));

    let uuid = Uuid::now_v7();
    let password_hash = password::hash_password(&password)?;
    sqlx::query("INSERT INTO users (uuid,username,email,password_hash) VALUES (?,?,?,?)")
        .bind(uuid.to_string())
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .execute(&db_pool)
        .await?;

    tracing::info!(%uuid, %username, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered. Check your email for the verification code."
        })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::db::testing::memory_pool;
    use crate::mail::MailTransport;

    struct CapturingTransport {
        sent: Arc<Mutex<Vec<(String, String, String)>>>,
    }

    impl MailTransport for CapturingTransport {
        fn deliver(&self, to: &str, subject: &str, body: &str) {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_owned(), subject.to_owned(), body.to_owned()));
        }
    }

    fn request(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.to_owned()),
            username: Some(username.to_owned()),
            password: Some(password.to_owned()),
        }
    }

    #[tokio::test]
    async fn register_stores_a_hash_and_mails_the_code() {
        let db_pool = memory_pool().await;
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mailer = Mailer::with_transport(Arc::new(CapturingTransport { sent: sent.clone() }));
        let codes = VerificationCodes::default();

        register(
            State(db_pool.clone()),
            State(mailer),
            State(codes.clone()),
            Json(request("alice@example.com", "alice", "pw1")),
        )
        .await
        .unwrap();

        let (stored_hash,): (String,) =
            sqlx::query_as("SELECT password_hash FROM users WHERE username=?")
                .bind("alice")
                .fetch_one(&db_pool)
                .await
                .unwrap();
        assert_ne!(stored_hash, "pw1");
        assert!(password::verify_password("pw1", &stored_hash).is_ok());

        let code = codes.get("alice@example.com").unwrap();
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert_eq!(sent[0].2, format!("Your code: {code}"));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db_pool = memory_pool().await;
        let mailer = Mailer::log();
        let codes = VerificationCodes::default();

        register(
            State(db_pool.clone()),
            State(mailer.clone()),
            State(codes.clone()),
            Json(request("alice@example.com", "alice", "pw1")),
        )
        .await
        .unwrap();

        let err = register(
            State(db_pool),
            State(mailer),
            State(codes),
            Json(request("alice@example.com", "alice2", "pw2")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEmail));
    }

    #[tokio::test]
    async fn empty_fields_are_a_bad_request() {
        let db_pool = memory_pool().await;
        let err = register(
            State(db_pool),
            State(Mailer::log()),
            State(VerificationCodes::default()),
            Json(RegisterRequest {
                email: Some("alice@example.com".to_owned()),
                username: Some(String::new()),
                password: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
