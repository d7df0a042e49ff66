use sqlx::SqlitePool;

/// Create the tables if they are not there yet. Idempotent, runs at startup.
pub async fn init_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            uuid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS chats (
            uuid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            is_group BOOLEAN NOT NULL DEFAULT FALSE
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS chat_participants (
            user_id TEXT NOT NULL REFERENCES users(uuid),
            chat_id TEXT NOT NULL REFERENCES chats(uuid),
            PRIMARY KEY (user_id, chat_id)
        )",
    )
    .execute(db_pool)
    .await?;

    // append-only; timestamp is RFC 3339 UTC, ties broken by the v7 id
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            chat_id TEXT NOT NULL REFERENCES chats(uuid),
            sender_id TEXT NOT NULL REFERENCES users(uuid),
            content TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    Ok(())
}
