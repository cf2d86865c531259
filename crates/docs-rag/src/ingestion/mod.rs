//! Document ingestion: segmentation, PDF extraction and indexing

pub mod pdf;
mod pipeline;
pub mod segmenter;

pub use pdf::PdfExtractor;
pub use pipeline::IngestPipeline;
pub use segmenter::{approximate_tokens, Segmenter};
