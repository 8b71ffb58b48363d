use crate::app::URLS_PATH;
use crate::error::Result;
use crate::model::CreateUrlRequest;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use littleurl_core::UrlRecord;
use tracing::info;

pub async fn list_urls_handler(State(state): State<AppState>) -> Result<Json<Vec<UrlRecord>>> {
    let records = state.service().list().await?;
    Ok(Json(records))
}

pub async fn get_url_handler(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UrlRecord>> {
    let record = state.service().get(&key).await?;
    Ok(Json(record))
}

/// Responds `201 Created` with a `Location` header pointing at the record,
/// also when the long URL was already shortened.
pub async fn create_url_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateUrlRequest>,
) -> Result<Response> {
    let record = state.service().create(&request.long_url).await?;
    let location = record.short_key.to_path(URLS_PATH);
    info!(key = %record.short_key, %location, "shortened url");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(record),
    )
        .into_response())
}

pub async fn delete_url_handler(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UrlRecord>> {
    let record = state.service().delete(&key).await?;
    Ok(Json(record))
}

pub async fn undelete_url_handler(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UrlRecord>> {
    let record = state.service().undelete(&key).await?;
    Ok(Json(record))
}

/// `{URLS_PATH}/` with nothing after the slash is a blank key.
pub async fn get_blank_key_handler(state: State<AppState>) -> Result<Json<UrlRecord>> {
    get_url_handler(Path(String::new()), state).await
}

pub async fn delete_blank_key_handler(state: State<AppState>) -> Result<Json<UrlRecord>> {
    delete_url_handler(Path(String::new()), state).await
}

pub async fn undelete_blank_key_handler(state: State<AppState>) -> Result<Json<UrlRecord>> {
    undelete_url_handler(Path(String::new()), state).await
}
