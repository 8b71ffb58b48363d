use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_url_handler, delete_blank_key_handler, delete_url_handler, get_blank_key_handler,
    get_url_handler, health_handler, list_urls_handler, undelete_blank_key_handler,
    undelete_url_handler,
};
use crate::state::AppState;

/// Path of the url collection. Single records live under `{URLS_PATH}/{key}`.
pub const URLS_PATH: &str = "/littleurl";

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route(
                URLS_PATH,
                get(list_urls_handler).post(create_url_handler),
            )
            .route(
                "/littleurl/",
                get(get_blank_key_handler)
                    .delete(delete_blank_key_handler)
                    .post(undelete_blank_key_handler),
            )
            .route(
                "/littleurl/{key}",
                get(get_url_handler)
                    .delete(delete_url_handler)
                    .post(undelete_url_handler),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
