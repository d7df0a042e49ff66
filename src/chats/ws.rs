use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use time::format_description::BorrowedFormatItem;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::rooms::{ClientEvent, Rooms, ServerEvent, SessionSender};
use crate::AppState;

#[derive(Debug, thiserror::Error)]
pub(crate) enum RoomEventError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Invalid user or chat")]
    UnknownUserOrChat,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Clock(#[from] time::error::Format),
}

#[debug_handler(state = AppState)]
pub async fn chat_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One connection = one session. Outbound events funnel through an unbounded
/// channel so room broadcasts never wait on this socket's I/O.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::now_v7();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let (mut sink, mut stream) = socket.split();

    let forward_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(payload) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::from(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        let Ok(event) = serde_json::from_slice::<ClientEvent>(&msg.into_data()) else {
            continue;
        };
        dispatch(&state.db_pool, &state.rooms, session_id, &tx, event).await;
    }

    state.rooms.leave_all(session_id);
    forward_task.abort();
    tracing::debug!(%session_id, "session closed");
}

/// Run one inbound event. A failure turns into exactly one `error` event on
/// the requesting session; it never reaches the room and never tears down the
/// connection.
pub(crate) async fn dispatch(
    db_pool: &SqlitePool,
    rooms: &Rooms,
    session_id: Uuid,
    session: &SessionSender,
    event: ClientEvent,
) {
    let result = match event {
        ClientEvent::JoinChat { chat_id } => handle_join(rooms, session_id, session, chat_id),
        ClientEvent::SendMessage {
            chat_id,
            user_id,
            text,
        } => handle_send(db_pool, rooms, session_id, session, chat_id, user_id, text).await,
    };

    if let Err(err) = result {
        let message = match &err {
            RoomEventError::MissingFields | RoomEventError::UnknownUserOrChat => err.to_string(),
            RoomEventError::Storage(_) | RoomEventError::Clock(_) => {
                tracing::error!(%session_id, "realtime event failed: {err}");
                "Internal server error".to_owned()
            }
        };
        let _ = session.send(ServerEvent::Error { message });
    }
}

/// Join is unconditional: the chat id is not checked against the chat table,
/// so any session can subscribe to any room.
fn handle_join(
    rooms: &Rooms,
    session_id: Uuid,
    session: &SessionSender,
    chat_id: Option<String>,
) -> Result<(), RoomEventError> {
    let chat_id = chat_id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(RoomEventError::MissingFields)?;

    rooms.join(chat_id, session_id, session.clone());
    tracing::debug!(%session_id, %chat_id, "joined room");
    rooms.broadcast(
        chat_id,
        &ServerEvent::Status {
            message: format!("Joined chat {chat_id}"),
        },
    );
    Ok(())
}

/// Validate, persist, then fan out. The broadcast carries the sender's
/// username and the stored timestamp, and the sender's own session receives
/// it too; the echo is the delivery confirmation.
async fn handle_send(
    db_pool: &SqlitePool,
    rooms: &Rooms,
    session_id: Uuid,
    session: &SessionSender,
    chat_id: Option<String>,
    user_id: Option<String>,
    text: Option<String>,
) -> Result<(), RoomEventError> {
    let (Some(chat_id), Some(user_id), Some(text)) = (
        chat_id.filter(|s| !s.is_empty()),
        user_id.filter(|s| !s.is_empty()),
        text.filter(|s| !s.is_empty()),
    ) else {
        return Err(RoomEventError::MissingFields);
    };

    let (Some(chat_id), Some(user_id)) = (
        Uuid::parse_str(&chat_id).ok(),
        Uuid::parse_str(&user_id).ok(),
    ) else {
        return Err(RoomEventError::UnknownUserOrChat);
    };

    let Some((username,)) =
        sqlx::query_as::<_, (String,)>("SELECT username FROM users WHERE uuid=?")
            .bind(user_id.to_string())
            .fetch_optional(db_pool)
            .await?
    else {
        return Err(RoomEventError::UnknownUserOrChat);
    };
    if sqlx::query_as::<_, (i64,)>("SELECT 1 FROM chats WHERE uuid=?")
        .bind(chat_id.to_string())
        .fetch_optional(db_pool)
        .await?
        .is_none()
    {
        return Err(RoomEventError::UnknownUserOrChat);
    }

    let timestamp = append_message(db_pool, chat_id, user_id, &text).await?;

    rooms.join(chat_id, session_id, session.clone());
    rooms.broadcast(
        chat_id,
        &ServerEvent::ReceiveMessage {
            chat_id,
            sender_id: user_id,
            text,
            username,
            timestamp,
        },
    );
    Ok(())
}

// fixed width so the timestamp column sorts lexicographically
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = time::macros::format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
);

/// Append one message row; returns the server-assigned timestamp.
pub(crate) async fn append_message(
    db_pool: &SqlitePool,
    chat_id: Uuid,
    sender_id: Uuid,
    content: &str,
) -> Result<String, RoomEventError> {
    let id = Uuid::now_v7();
    let timestamp = OffsetDateTime::now_utc().format(TIMESTAMP_FORMAT)?;
    sqlx::query("INSERT INTO messages (id,chat_id,sender_id,content,timestamp) VALUES (?,?,?,?,?)")
        .bind(id.to_string())
        .bind(chat_id.to_string())
        .bind(sender_id.to_string())
        .bind(content)
        .bind(&timestamp)
        .execute(db_pool)
        .await?;
    Ok(timestamp)
}
