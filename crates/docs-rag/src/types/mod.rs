//! Core types for the RAG service

pub mod document;
pub mod filter;
pub mod query;
pub mod response;

pub use document::{Chunk, IndexedPoint, PointPayload, SearchHit, RESERVED_PAYLOAD_KEYS};
pub use filter::{FilterSet, FilterValue};
pub use query::{IngestTextRequest, QueryRequest};
pub use response::{IngestResponse, QueryResponse, RankedChunk};
