pub mod extractor;
pub mod iri;
pub mod predicates;
pub mod resolver;
pub mod schema;

#[cfg(test)]
pub(crate) mod fixtures;

pub use extractor::{extract, Extraction, ExtractionResult, SchemaExtractor, SchemaRowInterpreter};
pub use iri::{convert_string_to_label, IriSanitizer};
pub use predicates::{LabelFormatter, PredicateCollector, TypePredicateDeriver};
pub use resolver::{Contribution, ForeignKeyResolver, MissReason, Resolution, ResolutionMiss};
pub use schema::{EntityKey, ForeignReference, RuleKind, SchemaRow, SchemaTable};
