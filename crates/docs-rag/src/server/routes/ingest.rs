//! Document ingestion endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::ingestion::PdfExtractor;
use crate::server::state::AppState;
use crate::types::{IngestResponse, IngestTextRequest};

/// Multipart field carrying the PDF bytes
const PDF_FIELD: &str = "pdf";

/// Multipart field overriding the source id
const FILENAME_FIELD: &str = "filename";

/// Source id for uploads that carry no file name at all
const UNNAMED_PDF: &str = "upload.pdf";

/// POST /api/rag/ingest-text - Chunk, embed and index raw text
pub async fn ingest_text(
    State(state): State<AppState>,
    Json(request): Json<IngestTextRequest>,
) -> Result<Json<IngestResponse>> {
    let source_id = request
        .filename
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| state.config().ingestion.default_source_id.clone());

    tracing::info!("Ingesting text as {} ({} chars)", source_id, request.text.len());

    let response = state.ingest().ingest(&request.text, &source_id, &request.extra).await?;
    Ok(Json(response))
}

/// POST /api/rag/ingest-pdf - Extract, chunk, embed and index an uploaded PDF
pub async fn ingest_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    let mut filename_override: Option<String> = None;
    let mut extra = Map::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_request(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == PDF_FIELD {
            let file_name = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::invalid_request(format!("Failed to read file: {}", e)))?;
            upload = Some((file_name, data.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| Error::invalid_request(format!("Failed to read field '{}': {}", name, e)))?;

        if name == FILENAME_FIELD {
            if !value.trim().is_empty() {
                filename_override = Some(value);
            }
        } else if !name.is_empty() {
            extra.insert(name, Value::String(value));
        }
    }

    let (file_name, data) = upload.ok_or_else(|| Error::invalid_request("PDF file required"))?;
    let source_id = filename_override
        .or(file_name.filter(|name| !name.trim().is_empty()))
        .unwrap_or_else(|| UNNAMED_PDF.to_string());

    tracing::info!("Processing PDF: {} ({} bytes)", source_id, data.len());

    let text = PdfExtractor::extract(&source_id, data).await?;
    if text.trim().is_empty() {
        return Err(Error::file_parse(&source_id, "No text content could be extracted"));
    }

    let response = state.ingest().ingest(&text, &source_id, &extra).await?;
    Ok(Json(response))
}
