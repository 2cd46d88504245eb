//! `/api/upload`: image uploads

use axum::{
    extract::{multipart::{MultipartError, MultipartRejection}, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::auth::guard::require_auth;
use crate::error::{ApiError, Result};
use crate::response::ApiResponse;
use crate::services::upload::{self as service, IncomingFile, MAX_FILES, MAX_FILE_BYTES};
use crate::state::AppState;
use crate::validation::ValidatedJson;

/// Room for multipart boundaries and headers on top of the file bytes.
const ENVELOPE_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    #[validate(length(min = 1, message = "File URL is required"))]
    pub file_url: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(upload_one)
                .layer(DefaultBodyLimit::max(MAX_FILE_BYTES + ENVELOPE_BYTES))
                .delete(remove),
        )
        .route(
            "/multiple",
            post(upload_many).layer(DefaultBodyLimit::max(MAX_FILES * MAX_FILE_BYTES + ENVELOPE_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::BadRequest("File too large. Maximum size is 10MB".into());
    }
    ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
}

/// Collects every part named `field`.
async fn read_files(multipart: std::result::Result<Multipart, MultipartRejection>, field: &str) -> Result<Vec<IncomingFile>> {
    let mut multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e.body_text())))?;
    let mut files = Vec::new();
    while let Some(part) = multipart.next_field().await.map_err(multipart_error)? {
        if part.name() != Some(field) {
            continue;
        }
        let name = part.file_name().unwrap_or("upload").to_string();
        let mime = part.content_type().unwrap_or_default().to_string();
        let body = part.bytes().await.map_err(multipart_error)?;
        files.push(IncomingFile { name, mime, body });
    }
    Ok(files)
}

async fn upload_one(State(s): State<AppState>, multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<impl IntoResponse> {
    let store = s.storage()?;
    let file = read_files(multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;
    let uploaded = service::store_file(store, file).await?;
    tracing::info!(key = %uploaded.filename, "File uploaded");
    Ok(ApiResponse::success("File uploaded successfully", uploaded))
}

async fn upload_many(State(s): State<AppState>, multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<impl IntoResponse> {
    let store = s.storage()?;
    let files = read_files(multipart, "files").await?;
    let uploaded = service::store_files(store, files).await?;
    Ok(ApiResponse::success("Files uploaded successfully", uploaded))
}

async fn remove(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<DeleteFileRequest>) -> Result<impl IntoResponse> {
    service::delete_file(s.storage()?, &req.file_url).await?;
    Ok(ApiResponse::message("File deleted successfully"))
}
