//! PDF text extraction

use lopdf::Document;

use crate::error::{Error, Result};

/// Extracts plain text from PDF bytes, page by page
pub struct PdfExtractor;

impl PdfExtractor {
    /// Extract text on the blocking pool
    ///
    /// lopdf is synchronous and large documents take a while to decode.
    pub async fn extract(filename: &str, data: Vec<u8>) -> Result<String> {
        let name = filename.to_string();
        tokio::task::spawn_blocking(move || Self::extract_sync(&name, &data))
            .await
            .map_err(|e| Error::internal(format!("PDF extraction task failed: {}", e)))?
    }

    /// Extract text from every page in order
    ///
    /// Each page contributes its whitespace-normalised text followed by a
    /// newline. Pages without a text layer contribute an empty line.
    pub fn extract_sync(filename: &str, data: &[u8]) -> Result<String> {
        let doc = Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        if doc.is_encrypted() {
            return Err(Error::file_parse(filename, "PDF is encrypted"));
        }

        let mut text = String::new();
        for (page_number, _) in doc.get_pages() {
            match doc.extract_text(&[page_number]) {
                Ok(page_text) => text.push_str(&normalize_whitespace(&page_text)),
                Err(e) => {
                    tracing::debug!("No text on page {} of {}: {}", page_number, filename, e);
                }
            }
            text.push('\n');
        }

        tracing::debug!(
            "Extracted {} chars from {} ({} pages)",
            text.len(),
            filename,
            doc.get_pages().len()
        );

        Ok(text)
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
