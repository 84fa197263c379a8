//! Route handlers.

use super::error::{AppError, JsonError};
use super::intake::{
    decode_pasted_image, docx_name_for, pasted_docx_name, read_form, secure_filename,
    API_UPLOAD_NAME, PASTED_IMAGE_NAME,
};
use super::page::render_index;
use super::AppState;
use crate::convert::convert;
use crate::pipeline::input::allowed_file;
use crate::registry::list_recent;
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, Response};
use axum::Json;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub struct LastFilesResponse {
    files: Vec<String>,
}

#[derive(Serialize)]
pub struct ConvertResponse {
    filename: String,
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state).await)
}

/// POST /
///
/// Converts either a pasted image or an uploaded file, then re-renders the
/// page. A pasted image wins when both are present.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, AppError> {
    let multipart = multipart.map_err(|e| {
        debug!("Form post without multipart body: {}", e);
        AppError::NothingSubmitted
    })?;
    let form = read_form(multipart).await?;
    let upload_dir = &state.service().upload_dir;

    let (source, output_name) = match (form.pasted_image, form.file) {
        (Some(data_url), _) if !data_url.is_empty() => {
            let image = decode_pasted_image(&data_url)?;
            let path = upload_dir.join(PASTED_IMAGE_NAME);
            save_png(image, upload_dir, &path).await?;
            (path, pasted_docx_name(&Local::now()))
        }
        (_, Some(file)) if !file.filename.is_empty() => {
            if !allowed_file(&file.filename) {
                return Err(AppError::DisallowedExtension(file.filename));
            }
            let filename = secure_filename(&file.filename);
            if !allowed_file(&filename) {
                return Err(AppError::DisallowedExtension(file.filename));
            }
            let path = upload_dir.join(&filename);
            save_upload(&file.data, upload_dir, &path).await?;
            (path, docx_name_for(&filename))
        }
        _ => return Err(AppError::NothingSubmitted),
    };

    let output = convert(&source, &output_name, form.use_ai, state.conversion()).await?;
    info!("Converted upload into {}", output.file_name());

    Ok(Html(render_page(&state).await))
}

/// POST /convert
///
/// API variant: the upload is always stored as `pasted_image1.png` and the
/// output named after the current time.
pub async fn convert_api(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>, JsonError> {
    let multipart = multipart.map_err(|_| AppError::NoFilePart)?;
    let form = read_form(multipart).await?;
    let file = form.file.ok_or(AppError::NoFilePart)?;
    if file.filename.is_empty() {
        return Err(AppError::NoSelectedFile.into());
    }

    let upload_dir = &state.service().upload_dir;
    let path = upload_dir.join(API_UPLOAD_NAME);
    save_upload(&file.data, upload_dir, &path).await?;

    let output_name = pasted_docx_name(&Local::now());
    convert(&path, &output_name, form.use_ai, state.conversion()).await?;
    info!("Converted API upload into {}", output_name);

    Ok(Json(ConvertResponse {
        filename: output_name,
    }))
}

/// GET /download/:filename
///
/// The file is streamed from disk, never buffered whole.
pub async fn download(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<Response, AppError> {
    let safe = secure_filename(&filename);
    if safe.is_empty() {
        return Err(AppError::NotFound(filename));
    }
    let path = state.service().converted_dir.join(&safe);

    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(safe))
        }
        Err(e) => return Err(e.into()),
    };
    let meta = file.metadata().await?;
    if !meta.is_file() {
        return Err(AppError::NotFound(safe));
    }
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, meta.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", safe),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /last_files
pub async fn last_files(State(state): State<AppState>) -> Json<LastFilesResponse> {
    let service = state.service();
    Json(LastFilesResponse {
        files: list_recent(&service.converted_dir, service.recent_count).await,
    })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn render_page(state: &AppState) -> String {
    let service = state.service();
    let recent = list_recent(&service.converted_dir, service.recent_count).await;
    render_index(&recent)
}

async fn save_upload(data: &[u8], dir: &Path, path: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, data).await?;
    debug!("Saved {} bytes to {}", data.len(), path.display());
    Ok(())
}

async fn save_png(image: image::DynamicImage, dir: &Path, path: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(dir).await?;
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || image.save_with_format(&path, image::ImageFormat::Png))
        .await
        .map_err(|e| AppError::Internal(format!("PNG save task panicked: {e}")))?
        .map_err(|e| AppError::Internal(format!("cannot save pasted image: {e}")))
}
