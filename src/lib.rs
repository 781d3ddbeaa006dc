pub mod config;
pub mod core;
pub mod error;
pub mod handlers;
pub mod knowledge_graph;
pub mod utils;

pub use config::ExtractionConfig;
pub use crate::core::{extract, ExtractionResult, SchemaExtractor};
pub use error::{ExtractError, ExtractResult};
pub use handlers::{CsvDirectorySource, TabularSource, Workbooks};
pub use knowledge_graph::{Partition, SubjectGraph, TripleSet};
