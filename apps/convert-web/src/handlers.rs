//! HTTP handlers for the conversion service

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use convert_core::{
    extract_text, has_pdf_extension, images_to_pdf, merge_pdfs, pdf_to_slides, protect_pdf,
    ConvertError,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{base_name, HealthResponse, HistoryResponse, Operation};
use crate::pages;
use crate::state::AppState;
use crate::store::Output;

/// One uploaded file from a multipart form
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A parsed multipart form: files and text fields by field name
#[derive(Debug, Default)]
struct FormData {
    files: HashMap<String, Vec<Upload>>,
    text: HashMap<String, String>,
}

impl FormData {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid form data: {}", e.body_text())))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Invalid form data: {}", e.body_text())))?;

            match file_name {
                // Browsers send an empty part for an untouched file input.
                Some(file_name) if file_name.is_empty() && bytes.is_empty() => {}
                Some(file_name) => form.files.entry(name).or_default().push(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                }),
                None => {
                    form.text
                        .insert(name, String::from_utf8_lossy(&bytes).into_owned());
                }
            }
        }

        Ok(form)
    }

    fn take_files(&mut self, name: &str) -> Vec<Upload> {
        self.files.remove(name).unwrap_or_default()
    }

    fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.take_files(name).into_iter().next()
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }
}

/// What a completed operation hands back to the browser
enum Completed {
    Download(i64),
    Text { id: i64, text: String },
}

/// Run a conversion library call on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(result?)
}

/// Store the inputs and open a pending record that references the first one.
async fn accept_uploads(
    state: &AppState,
    operation: Operation,
    uploads: &[Upload],
) -> Result<i64, ApiError> {
    let mut first_blob = None;
    let mut total_size: i64 = 0;

    for upload in uploads {
        let blob = state
            .blobs
            .save_upload(&upload.file_name, &upload.bytes)
            .await?;
        first_blob.get_or_insert(blob);
        total_size += upload.bytes.len() as i64;
    }

    let original = first_blob.ok_or_else(|| ApiError::Validation("No files uploaded.".into()))?;
    state.store.create(operation, &original, total_size).await
}

/// Mark the record failed when `result` is an error, then pass it through.
async fn record_failure<T>(
    state: &AppState,
    id: i64,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    if let Err(err) = &result {
        if let Err(mark_err) = state.store.mark_failed(id, &err.to_string()).await {
            tracing::error!("Could not mark record {} failed: {}", id, mark_err);
        }
    }
    result
}

/// Save the produced file under the operation's output name and complete the record.
async fn store_output(
    state: &AppState,
    operation: Operation,
    id: i64,
    bytes: Vec<u8>,
) -> Result<Completed, ApiError> {
    let name = operation
        .output_name(id)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("{} has no output file", operation)))?;
    let blob = state.blobs.save_processed(&name, &bytes).await?;
    state.store.attach_output(id, Output::Blob(blob)).await?;

    tracing::info!("{} completed: record {} ({} bytes)", operation, id, bytes.len());
    Ok(Completed::Download(id))
}

/// Turn an operation's outcome into the browser response.
fn respond(operation: Operation, result: Result<Completed, ApiError>) -> Response {
    match result {
        Ok(Completed::Download(id)) => Redirect::to(&format!("/download/{}/", id)).into_response(),
        Ok(Completed::Text { id, text }) => Html(pages::ocr_result(id, &text)).into_response(),
        Err(err) => {
            tracing::warn!("{} failed ({}): {}", operation, err.kind(), err);
            let location = format!(
                "{}?error={}",
                operation.form_path(),
                urlencoding::encode(&err.user_message(operation))
            );
            Redirect::to(&location).into_response()
        }
    }
}

/// Error flash carried back to a form
#[derive(Debug, Default, Deserialize)]
pub struct FlashParams {
    pub error: Option<String>,
}

fn form_page(operation: Operation, params: FlashParams) -> Html<String> {
    Html(pages::operation_form(operation, params.error.as_deref()))
}

// ============================================================
// Image to PDF
// ============================================================

pub async fn image_to_pdf_form(Query(params): Query<FlashParams>) -> Html<String> {
    form_page(Operation::ImageToPdf, params)
}

pub async fn image_to_pdf(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let operation = Operation::ImageToPdf;
    respond(operation, run_image_to_pdf(&state, multipart).await)
}

async fn run_image_to_pdf(state: &AppState, multipart: Multipart) -> Result<Completed, ApiError> {
    let operation = Operation::ImageToPdf;
    let mut form = FormData::read(multipart).await?;
    let uploads = form.take_files("images");
    if uploads.is_empty() {
        return Err(ApiError::Validation(
            "Please select at least one image file.".into(),
        ));
    }

    let id = accept_uploads(state, operation, &uploads).await?;
    let result = async {
        let images: Vec<Vec<u8>> = uploads.into_iter().map(|u| u.bytes).collect();
        let pdf = run_blocking(move || images_to_pdf(&images)).await?;
        store_output(state, operation, id, pdf).await
    }
    .await;
    record_failure(state, id, result).await
}

// ============================================================
// PDF merge
// ============================================================

pub async fn pdf_merge_form(Query(params): Query<FlashParams>) -> Html<String> {
    form_page(Operation::PdfMerge, params)
}

pub async fn pdf_merge(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let operation = Operation::PdfMerge;
    respond(operation, run_pdf_merge(&state, multipart).await)
}

async fn run_pdf_merge(state: &AppState, multipart: Multipart) -> Result<Completed, ApiError> {
    let operation = Operation::PdfMerge;
    let mut form = FormData::read(multipart).await?;
    let uploads = form.take_files("pdfs");
    if uploads.len() < 2 {
        return Err(ApiError::Validation(
            "Please select at least two PDF files to merge.".into(),
        ));
    }

    let id = accept_uploads(state, operation, &uploads).await?;
    let result = async {
        if let Some(bad) = uploads.iter().find(|u| !has_pdf_extension(&u.file_name)) {
            return Err(ApiError::Format(format!(
                "{} is not a PDF file.",
                base_name(&bad.file_name)
            )));
        }

        let pdfs: Vec<Vec<u8>> = uploads.into_iter().map(|u| u.bytes).collect();
        let merged = run_blocking(move || merge_pdfs(&pdfs)).await?;
        store_output(state, operation, id, merged).await
    }
    .await;
    record_failure(state, id, result).await
}

// ============================================================
// PDF password protection
// ============================================================

pub async fn pdf_password_form(Query(params): Query<FlashParams>) -> Html<String> {
    form_page(Operation::PdfPassword, params)
}

pub async fn pdf_password(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let operation = Operation::PdfPassword;
    respond(operation, run_pdf_password(&state, multipart).await)
}

async fn run_pdf_password(state: &AppState, multipart: Multipart) -> Result<Completed, ApiError> {
    let operation = Operation::PdfPassword;
    let mut form = FormData::read(multipart).await?;
    let password = form.text("password").unwrap_or_default().to_string();
    let upload = match form.take_file("pdf") {
        Some(upload) if !password.is_empty() => upload,
        _ => {
            return Err(ApiError::Validation(
                "Please select a PDF file and enter a password.".into(),
            ))
        }
    };

    let id = accept_uploads(state, operation, std::slice::from_ref(&upload)).await?;
    let result = async {
        let pdf = upload.bytes;
        let protected = run_blocking(move || protect_pdf(&pdf, &password)).await?;
        store_output(state, operation, id, protected).await
    }
    .await;
    record_failure(state, id, result).await
}

// ============================================================
// PDF to slide deck
// ============================================================

pub async fn pdf_to_ppt_form(Query(params): Query<FlashParams>) -> Html<String> {
    form_page(Operation::PdfToPpt, params)
}

pub async fn pdf_to_ppt(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let operation = Operation::PdfToPpt;
    respond(operation, run_pdf_to_ppt(&state, multipart).await)
}

async fn run_pdf_to_ppt(state: &AppState, multipart: Multipart) -> Result<Completed, ApiError> {
    let operation = Operation::PdfToPpt;
    let mut form = FormData::read(multipart).await?;
    let upload = form
        .take_file("pdf")
        .ok_or_else(|| ApiError::Validation("Please select a PDF file.".into()))?;

    let id = accept_uploads(state, operation, std::slice::from_ref(&upload)).await?;
    let result = async {
        let pdf = upload.bytes;
        let rasterizer = Arc::clone(&state.rasterizer);
        let pptx = run_blocking(move || pdf_to_slides(&pdf, rasterizer.as_ref())).await?;
        store_output(state, operation, id, pptx).await
    }
    .await;
    record_failure(state, id, result).await
}

// ============================================================
// OCR extraction
// ============================================================

pub async fn ocr_extraction_form(Query(params): Query<FlashParams>) -> Html<String> {
    form_page(Operation::OcrExtraction, params)
}

pub async fn ocr_extraction(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let operation = Operation::OcrExtraction;
    respond(operation, run_ocr_extraction(&state, multipart).await)
}

async fn run_ocr_extraction(state: &AppState, multipart: Multipart) -> Result<Completed, ApiError> {
    let operation = Operation::OcrExtraction;
    let mut form = FormData::read(multipart).await?;
    let upload = form
        .take_file("image")
        .ok_or_else(|| ApiError::Validation("Please select an image file.".into()))?;

    let id = accept_uploads(state, operation, std::slice::from_ref(&upload)).await?;
    let result = async {
        let image = upload.bytes;
        let recognizer = Arc::clone(&state.recognizer);
        let text = run_blocking(move || extract_text(&image, recognizer.as_ref())).await?;
        state
            .store
            .attach_output(id, Output::Text(text.clone()))
            .await?;

        tracing::info!("{} completed: record {} ({} chars)", operation, id, text.len());
        Ok(Completed::Text { id, text })
    }
    .await;
    record_failure(state, id, result).await
}

// ============================================================
// Download, history, delete
// ============================================================

fn content_type_for(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => "application/octet-stream",
    }
}

/// Serve a record's processed file as an attachment
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound("File".into());

    let record = state.store.get(id).await.map_err(|e| match e {
        ApiError::NotFound(_) => not_found(),
        other => other,
    })?;
    let blob = record.processed_file.ok_or_else(not_found)?;

    let bytes = match state.blobs.read(&blob).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let file_name = base_name(&blob).to_string();
    tracing::debug!("Serving {} for record {}", file_name, id);

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&file_name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Recent conversions as an HTML table
pub async fn history(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let files = state.store.list_recent(state.history_limit).await?;
    Ok(Html(pages::history(&files)))
}

/// Recent conversions as JSON
pub async fn api_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let files = state.store.list_recent(state.history_limit).await?;
    let count = files.len();
    Ok(Json(HistoryResponse { files, count }))
}

/// Delete a record and its files
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    state.store.delete(id, &state.blobs).await?;
    Ok(Redirect::to("/history/"))
}

pub async fn home() -> Html<String> {
    Html(pages::home())
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "convert-web",
        version: env!("CARGO_PKG_VERSION"),
    })
}
