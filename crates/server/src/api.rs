use crate::config::AppConfig;
use crate::error::AppError;
use crate::upload::{save_upload, validate_content_type, validate_filename};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stamp::{generate_qr_png, overlay_qr_on_pdf, QrOptions, StampLayout, VERIFICATION_TEXT};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

/// QR box side, in points, for documents stamped over HTTP
pub const ENDPOINT_QR_SIZE: f64 = 110.0;

const UPLOAD_FIELD: &str = "file";

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Response for a stamped upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Link under `/files` to the stamped document
    pub download_url: String,
    pub filename: String,
}

/// Build the application router with all routes configured
pub fn app(state: AppState) -> Router {
    let files = ServeDir::new(&state.config.output_dir);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/upload-pdf", post(upload_pdf))
        .route("/healthz", get(health_check))
        .nest_service("/files", files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Upload form
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint for monitoring and load balancing
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Accept a PDF upload, stamp every page with the verification QR code
/// and return where to download the result
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut saved_path: Option<PathBuf> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        validate_content_type(field.content_type())?;
        let extension = validate_filename(field.file_name())?;
        saved_path = Some(save_upload(field, &state.config.upload_dir, &extension).await?);
        break;
    }

    let saved_path = saved_path.ok_or(AppError::MissingField(UPLOAD_FIELD))?;

    let stem = saved_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_filename = format!("{stem}_stamped.pdf");
    let output_path = state.config.output_dir.join(&output_filename);
    let output_dir = state.config.output_dir.clone();
    let input_path = saved_path.clone();

    let report = tokio::task::spawn_blocking(move || {
        let qr_png = generate_qr_png(VERIFICATION_TEXT, &QrOptions::default(), &output_dir)?;
        let layout = StampLayout::default().with_qr_size(ENDPOINT_QR_SIZE);
        overlay_qr_on_pdf(&input_path, &output_path, &qr_png, &layout)
    })
    .await??;

    info!(
        upload = %saved_path.display(),
        output = %output_filename,
        pages = report.pages,
        "upload stamped"
    );

    Ok(Json(UploadResponse {
        message: "تم رفع الملف وختمه بالباركود".to_string(),
        download_url: format!("/files/{output_filename}"),
        filename: output_filename,
    }))
}
