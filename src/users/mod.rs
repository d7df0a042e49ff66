mod lookup;
mod search;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search::search_users))
        .route("/{uuid}", get(lookup::user_by_id))
        .route("/{uuid}/profile", get(lookup::user_profile))
}
