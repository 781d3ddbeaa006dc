use anyhow::{Result, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ExtractionConfig, Vocabulary};
use crate::core::iri::IriSanitizer;
use crate::core::predicates::{
    split_cell, LabelFormatter, PredicateCollector, TypePredicateDeriver,
};
use crate::core::resolver::{ForeignKeyResolver, ResolutionMiss};
use crate::core::schema::{SchemaRow, SchemaTable};
use crate::error::ExtractResult;
use crate::handlers::{CsvDirectorySource, TabularSource, Workbooks};
use crate::knowledge_graph::{Partition, PartitionStats, SubjectGraph};

/// Subjects produced from one declaring schema row, plus the lookups that failed on the way.
#[derive(Debug, Clone, Default)]
pub struct SheetExtraction {
    pub graph: SubjectGraph,
    pub misses: Vec<ResolutionMiss>,
}

/// Walks the data sheet a declaring schema row names and yields one subject per row.
pub struct SchemaRowInterpreter<'a> {
    workbooks: &'a Workbooks,
    sanitizer: &'a IriSanitizer,
    collector: PredicateCollector<'a>,
}

impl<'a> SchemaRowInterpreter<'a> {
    pub fn new(
        schema: &'a SchemaTable,
        workbooks: &'a Workbooks,
        sanitizer: &'a IriSanitizer,
        vocabulary: &'a Vocabulary,
    ) -> Self {
        let collector = PredicateCollector::new(
            schema,
            ForeignKeyResolver::new(workbooks, sanitizer),
            LabelFormatter::new(sanitizer, &vocabulary.language),
            TypePredicateDeriver::new(sanitizer, vocabulary),
        );
        Self { workbooks, sanitizer, collector }
    }

    pub fn interpret(&self, owner: &SchemaRow) -> ExtractResult<SheetExtraction> {
        let table = self.workbooks.table(&owner.file, &owner.sheet)?;
        let mut extraction = SheetExtraction::default();

        for row in &table.rows {
            let Some(cell) = row.get(&owner.indexed_entity).as_text() else {
                continue;
            };

            // Only the first segment of a multi-valued cell names the subject.
            let first = split_cell(cell, owner.split_indexed_by.as_deref())
                .into_iter()
                .next()
                .unwrap_or(cell);
            let Some(subject) = self.sanitizer.sanitize(first) else {
                continue;
            };

            let contribution = self.collector.collect(row, owner)?;
            extraction.misses.extend(contribution.misses);
            if !contribution.triples.is_empty() {
                extraction.graph.merge(subject, contribution.triples);
            }
        }

        debug!(
            "{}/{} column '{}': {} subjects",
            owner.file,
            owner.sheet,
            owner.column_header,
            extraction.graph.len()
        );
        Ok(extraction)
    }
}

/// The partitioned graph and every swallowed lookup failure.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub partition: Partition,
    pub diagnostics: Vec<ResolutionMiss>,
}

/// Run every indexed-entity declaration in `schema` over `workbooks`.
///
/// Contributions are unioned per subject, so neither schema row order nor data row order
/// changes the result.
pub fn extract(
    schema: &SchemaTable,
    workbooks: &Workbooks,
    sanitizer: &IriSanitizer,
    vocabulary: &Vocabulary,
) -> ExtractResult<Extraction> {
    let interpreter = SchemaRowInterpreter::new(schema, workbooks, sanitizer, vocabulary);
    let mut partition = Partition::new(
        sanitizer
            .sanitize(&vocabulary.source_predicate)
            .unwrap_or_else(|| vocabulary.source_predicate.clone()),
    );
    let mut diagnostics = Vec::new();

    for declaration in schema.indexed_declarations() {
        let extraction = interpreter.interpret(declaration)?;

        for miss in &extraction.misses {
            warn!("Foreign key lookup skipped: {}", miss);
        }
        diagnostics.extend(extraction.misses);
        partition.merge_graph(extraction.graph);
    }

    Ok(Extraction { partition, diagnostics })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub id: String,
    pub config_name: String,
    pub extraction_timestamp: DateTime<Utc>,
    pub processing_time_seconds: f64,
    pub partition: Partition,
    #[serde(default)]
    pub diagnostics: Vec<ResolutionMiss>,
}

impl ExtractionResult {
    pub fn sourced(&self) -> SubjectGraph {
        self.partition.sourced()
    }

    pub fn unsourced(&self) -> SubjectGraph {
        self.partition.unsourced()
    }

    pub fn statistics(&self) -> PartitionStats {
        self.partition.statistics()
    }

    pub fn into_graphs(self) -> (SubjectGraph, SubjectGraph) {
        self.partition.into_graphs()
    }
}

/// Configured front door: loads the schema table and the sheets it names, then extracts.
pub struct SchemaExtractor {
    config: ExtractionConfig,
    sanitizer: IriSanitizer,
}

impl SchemaExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        let sanitizer = IriSanitizer::new(&config.base_prefix, config.known_prefixes());
        Ok(Self { config, sanitizer })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn sanitizer(&self) -> &IriSanitizer {
        &self.sanitizer
    }

    pub fn load_schema(&self, source: &dyn TabularSource) -> Result<SchemaTable> {
        let location = &self.config.schema;
        let table = source
            .parse(&location.file, &location.sheet)
            .with_context(|| {
                format!("Failed to load schema table {}/{}", location.file, location.sheet)
            })?;

        let schema = SchemaTable::from_table(&table, &self.config.vocabulary)?;
        info!("Schema table loaded with {} rules", schema.rows().len());
        Ok(schema)
    }

    pub fn extract_from_source(&self, source: &dyn TabularSource) -> Result<ExtractionResult> {
        let schema = self.load_schema(source)?;
        let workbooks = Workbooks::load(schema.referenced_sheets(), source)?;
        self.extract_from_workbooks(&schema, &workbooks)
    }

    /// Use the configured `data_dir` as a CSV workbook directory.
    pub fn extract_from_data_dir(&self) -> Result<ExtractionResult> {
        let data_dir = self
            .config
            .data_dir
            .as_deref()
            .context("No data_dir configured")?;
        self.extract_from_source(&CsvDirectorySource::new(data_dir))
    }

    pub fn extract_from_workbooks(
        &self,
        schema: &SchemaTable,
        workbooks: &Workbooks,
    ) -> Result<ExtractionResult> {
        let start_time = Instant::now();

        info!("Starting extraction: {}", self.config.name);
        let extraction = extract(schema, workbooks, &self.sanitizer, &self.config.vocabulary)?;
        let processing_time = start_time.elapsed().as_secs_f64();

        let stats = extraction.partition.statistics();
        info!(
            "Extraction completed: {} triples ({} sourced, {} unsourced subjects, {} skipped lookups) in {:.2}s",
            stats.total_triples,
            stats.sourced_subjects,
            stats.unsourced_subjects,
            extraction.diagnostics.len(),
            processing_time
        );

        Ok(ExtractionResult {
            id: Uuid::new_v4().to_string(),
            config_name: self.config.name.clone(),
            extraction_timestamp: Utc::now(),
            processing_time_seconds: processing_time,
            partition: extraction.partition,
            diagnostics: extraction.diagnostics,
        })
    }
}
