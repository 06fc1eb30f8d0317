pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::state::AppState;
use crate::wizard::handlers;
use crate::wizard::photo::MAX_PHOTO_BYTES;

/// Multipart overhead allowed on top of the photo itself, so oversized
/// images reach the size check instead of being cut off by the body limit.
const PHOTO_BODY_LIMIT: usize = MAX_PHOTO_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/nic/decode", post(handlers::handle_decode_nic))
        .route("/api/v1/sessions", post(handlers::handle_mount))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_session))
        .route(
            "/api/v1/sessions/:id/health",
            post(handlers::handle_check_health),
        )
        .route(
            "/api/v1/sessions/:id/fields",
            patch(handlers::handle_set_field),
        )
        .route(
            "/api/v1/sessions/:id/items",
            post(handlers::handle_append_item).delete(handlers::handle_remove_item),
        )
        .route(
            "/api/v1/sessions/:id/personal",
            put(handlers::handle_put_personal),
        )
        .route(
            "/api/v1/sessions/:id/olevels/:index",
            put(handlers::handle_put_olevel),
        )
        .route("/api/v1/sessions/:id/alevel", put(handlers::handle_put_alevel))
        .route(
            "/api/v1/sessions/:id/profile",
            put(handlers::handle_put_profile),
        )
        .route(
            "/api/v1/sessions/:id/entries/:section",
            post(handlers::handle_add_entry),
        )
        .route(
            "/api/v1/sessions/:id/entries/:section/:index",
            delete(handlers::handle_remove_entry),
        )
        .route(
            "/api/v1/sessions/:id/photo",
            post(handlers::handle_upload_photo).layer(DefaultBodyLimit::max(PHOTO_BODY_LIMIT)),
        )
        .route("/api/v1/sessions/:id/next", post(handlers::handle_next))
        .route(
            "/api/v1/sessions/:id/previous",
            post(handlers::handle_previous),
        )
        .route("/api/v1/sessions/:id/review", get(handlers::handle_review))
        .route("/api/v1/sessions/:id/submit", post(handlers::handle_submit))
        .with_state(state)
}
