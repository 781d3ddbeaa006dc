use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use anyhow::{Result, Context};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Prefix used for IRIs minted from plain labels, e.g. `mhdb:Anxiety`.
    #[serde(default = "default_base_prefix")]
    pub base_prefix: String,
    /// Known Turtle prefixes, prefix name to namespace IRI.
    #[serde(default = "default_prefixes")]
    pub prefixes: BTreeMap<String, String>,
    pub schema: SchemaLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub vocabulary: Vocabulary,
}

/// Where the structure-to-keep table lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaLocation {
    pub file: String,
    pub sheet: String,
}

/// Sentinels and predicates the extraction engine interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default = "default_foreign_key_type")]
    pub foreign_key_type: String,
    #[serde(default = "default_literal_predicates")]
    pub literal_predicates: Vec<String>,
    #[serde(default = "default_source_predicate")]
    pub source_predicate: String,
    #[serde(default = "default_subclass_predicate")]
    pub subclass_predicate: String,
    #[serde(default = "default_subproperty_predicate")]
    pub subproperty_predicate: String,
    #[serde(default = "default_type_predicate")]
    pub type_predicate: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            foreign_key_type: default_foreign_key_type(),
            literal_predicates: default_literal_predicates(),
            source_predicate: default_source_predicate(),
            subclass_predicate: default_subclass_predicate(),
            subproperty_predicate: default_subproperty_predicate(),
            type_predicate: default_type_predicate(),
            language: default_language(),
        }
    }
}

fn default_version() -> String { "1.0".to_string() }
fn default_base_prefix() -> String { "mhdb".to_string() }
fn default_foreign_key_type() -> String { "foreign key".to_string() }
fn default_literal_predicates() -> Vec<String> {
    vec!["rdfs:label".to_string(), "schema:text".to_string()]
}
fn default_source_predicate() -> String { "dcterms:source".to_string() }
fn default_subclass_predicate() -> String { "rdfs:subClassOf".to_string() }
fn default_subproperty_predicate() -> String { "rdfs:subPropertyOf".to_string() }
fn default_type_predicate() -> String { "rdf:type".to_string() }
fn default_language() -> String { "en".to_string() }

pub fn default_prefixes() -> BTreeMap<String, String> {
    [
        ("dcterms", "http://purl.org/dc/terms/"),
        ("owl", "http://www.w3.org/2002/07/owl#"),
        ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
        ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
        ("schema", "http://schema.org/"),
        ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ]
    .into_iter()
    .map(|(prefix, iri)| (prefix.to_string(), iri.to_string()))
    .collect()
}

impl ExtractionConfig {
    /// Load configuration from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        };

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_prefix.trim().is_empty() {
            anyhow::bail!("No base prefix defined");
        }

        if self.schema.file.trim().is_empty() || self.schema.sheet.trim().is_empty() {
            anyhow::bail!("Schema location needs both a file and a sheet");
        }

        for (prefix, iri) in &self.prefixes {
            if iri.trim().is_empty() {
                anyhow::bail!("Prefix '{}' has an empty namespace IRI", prefix);
            }
        }

        if self.vocabulary.literal_predicates.is_empty() {
            anyhow::bail!("At least one literal predicate is required");
        }

        Ok(())
    }

    /// Prefix names the IRI sanitizer accepts as-is, including the base prefix.
    pub fn known_prefixes(&self) -> Vec<String> {
        let mut known: Vec<String> = self.prefixes.keys().cloned().collect();
        if !self.prefixes.contains_key(&self.base_prefix) {
            known.push(self.base_prefix.clone());
        }
        known
    }

    /// Create an example configuration
    pub fn example() -> Self {
        let mut prefixes = default_prefixes();
        prefixes.insert("mhdb".to_string(), "https://mentalhealth.example.org/mhdb#".to_string());

        ExtractionConfig {
            name: "Example structure-to-keep extraction".to_string(),
            description: "Convert linked questionnaire spreadsheets into RDF".to_string(),
            version: default_version(),
            base_prefix: default_base_prefix(),
            prefixes,
            schema: SchemaLocation {
                file: "structure".to_string(),
                sheet: "structure_to_keep".to_string(),
            },
            data_dir: Some("data".to_string()),
            vocabulary: Vocabulary::default(),
        }
    }
}
