pub mod chunker;
pub mod config;
pub mod context;
pub mod convert;
pub mod embeddings;
pub mod error;
pub mod lexicon;
pub mod pipeline;
pub mod retriever;
pub mod store;
pub mod synthesis;
pub mod types;

pub use config::CoreConfig;
pub use context::Context;
pub use error::{CoreError, Result};
pub use types::{Document, SearchResult, SynthesisResult};
