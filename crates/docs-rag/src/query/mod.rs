//! Question answering over the indexed corpus

mod greeting;
mod pipeline;

pub use greeting::GreetingDetector;
pub use pipeline::{QueryPipeline, NO_CONTEXT_ANSWER};
