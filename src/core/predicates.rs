use crate::config::Vocabulary;
use crate::core::iri::IriSanitizer;
use crate::core::resolver::{Contribution, ForeignKeyResolver};
use crate::core::schema::{SchemaRow, SchemaTable};
use crate::error::ExtractResult;
use crate::handlers::DataRow;
use crate::knowledge_graph::TripleSet;

/// Split on `delimiter` only when one is configured and actually occurs in `text`.
pub fn split_cell<'t>(text: &'t str, delimiter: Option<&str>) -> Vec<&'t str> {
    match delimiter {
        Some(d) if !d.is_empty() && text.contains(d) => text.split(d).collect(),
        _ => vec![text],
    }
}

/// `"""text"""@lang` with newlines flattened and inner quotes escaped; `None` for blank text.
pub fn language_literal(text: &str, language: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let escaped = text.replace('\n', " ").replace('"', "\\\"");
    Some(format!("\"\"\"{}\"\"\"@{}", escaped, language))
}

pub struct LabelFormatter<'a> {
    sanitizer: &'a IriSanitizer,
    language: &'a str,
}

impl<'a> LabelFormatter<'a> {
    pub fn new(sanitizer: &'a IriSanitizer, language: &'a str) -> Self {
        Self { sanitizer, language }
    }

    /// One literal per segment of the rule's own column.
    pub fn format(&self, rule: &SchemaRow, row: &DataRow) -> TripleSet {
        let mut triples = TripleSet::new();

        let Some(predicate) = rule.definition.as_deref().and_then(|d| self.sanitizer.sanitize(d))
        else {
            return triples;
        };
        let Some(text) = row.text(&rule.column_header) else {
            return triples;
        };

        for segment in split_cell(&text, rule.split_indexed_by.as_deref()) {
            if let Some(literal) = language_literal(segment, self.language) {
                if let Some(object) = self.sanitizer.sanitize(&literal) {
                    triples.insert(predicate.clone(), object);
                }
            }
        }

        triples
    }
}

pub struct TypePredicateDeriver<'a> {
    sanitizer: &'a IriSanitizer,
    vocabulary: &'a Vocabulary,
}

impl<'a> TypePredicateDeriver<'a> {
    pub fn new(sanitizer: &'a IriSanitizer, vocabulary: &'a Vocabulary) -> Self {
        Self { sanitizer, vocabulary }
    }

    /// `Class` rows become subclasses, `Property` rows subproperties, anything else an
    /// instance of its type.
    pub fn derive(&self, rule: &SchemaRow) -> Option<(String, String)> {
        let domain_type = rule.domain_type.as_deref()?;

        let predicate = match rule.classification.as_deref() {
            Some("Class") => &self.vocabulary.subclass_predicate,
            Some("Property") => &self.vocabulary.subproperty_predicate,
            _ => &self.vocabulary.type_predicate,
        };

        Some((
            self.sanitizer.sanitize(predicate)?,
            self.sanitizer.sanitize(domain_type)?,
        ))
    }
}

/// Gathers everything the schema says about one subject in one data row.
pub struct PredicateCollector<'a> {
    schema: &'a SchemaTable,
    resolver: ForeignKeyResolver<'a>,
    labels: LabelFormatter<'a>,
    types: TypePredicateDeriver<'a>,
}

impl<'a> PredicateCollector<'a> {
    pub fn new(
        schema: &'a SchemaTable,
        resolver: ForeignKeyResolver<'a>,
        labels: LabelFormatter<'a>,
        types: TypePredicateDeriver<'a>,
    ) -> Self {
        Self { schema, resolver, labels, types }
    }

    /// Union of the contributions of every rule targeting `owner`'s column.
    pub fn collect(&self, row: &DataRow, owner: &SchemaRow) -> ExtractResult<Contribution> {
        let mut contribution = Contribution::default();

        for rule in self.schema.referencing(&owner.own_key()) {
            if rule.foreign_reference().is_some() {
                contribution.absorb(self.resolver.resolve(row, rule)?);
            } else if owner.is_literal() {
                contribution.triples.union(self.labels.format(owner, row));
            }
        }

        if let Some((predicate, object)) = self.types.derive(owner) {
            contribution.triples.insert(predicate, object);
        }

        Ok(contribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::*;
    use crate::handlers::{CellValue, Table, Workbooks};

    fn single_row(columns: &[&str], values: Vec<CellValue>) -> DataRow {
        Table::from_records(columns, vec![values]).rows.remove(0)
    }

    fn first_rule(records: Vec<Vec<CellValue>>) -> SchemaRow {
        schema_table(records).unwrap().rows()[0].clone()
    }

    #[test]
    fn test_split_cell_requires_present_delimiter() {
        assert_eq!(split_cell("a;b", Some(";")), vec!["a", "b"]);
        assert_eq!(split_cell("a,b", Some(";")), vec!["a,b"]);
        assert_eq!(split_cell("a;b", None), vec!["a;b"]);
    }

    #[test]
    fn test_label_flattens_newlines_and_escapes_quotes() {
        let sanitizer = sanitizer();
        let formatter = LabelFormatter::new(&sanitizer, "en");
        let rule = first_rule(vec![rule("f", "s", "name", "name", "", "rdfs:label", "")]);
        let row = single_row(&["name"], vec!["Line1\nLine2\"quoted\"".into()]);

        let triples = formatter.format(&rule, &row);

        assert_eq!(triples.len(), 1);
        assert!(triples.contains("rdfs:label", r#""""Line1 Line2\"quoted\""""@en"#));
    }

    #[test]
    fn test_label_one_literal_per_segment() {
        let sanitizer = sanitizer();
        let formatter = LabelFormatter::new(&sanitizer, "en");
        let mut record = rule("f", "s", "name", "name", "", "schema:text", "");
        record[6] = ";".into();
        let rule = first_rule(vec![record]);
        let row = single_row(&["name"], vec![" worry ; fear ".into()]);

        let triples = formatter.format(&rule, &row);

        assert_eq!(triples.len(), 2);
        assert!(triples.contains("schema:text", "\"\"\"worry\"\"\"@en"));
        assert!(triples.contains("schema:text", "\"\"\"fear\"\"\"@en"));
    }

    #[test]
    fn test_label_skips_empty_cell() {
        let sanitizer = sanitizer();
        let formatter = LabelFormatter::new(&sanitizer, "en");
        let rule = first_rule(vec![rule("f", "s", "name", "name", "", "rdfs:label", "")]);
        let row = single_row(&["name"], vec![CellValue::Number(f64::NAN)]);

        assert!(formatter.format(&rule, &row).is_empty());
    }

    #[test]
    fn test_type_predicate_by_classification() {
        let sanitizer = sanitizer();
        let vocabulary = Vocabulary::default();
        let deriver = TypePredicateDeriver::new(&sanitizer, &vocabulary);

        let class = first_rule(vec![rule("f", "s", "c", "c", "Disorder", "", "Class")]);
        assert_eq!(
            deriver.derive(&class),
            Some(("rdfs:subClassOf".to_string(), "mhdb:Disorder".to_string()))
        );

        let property = first_rule(vec![rule("f", "s", "c", "c", "relatesTo", "", "Property")]);
        assert_eq!(deriver.derive(&property).unwrap().0, "rdfs:subPropertyOf");

        let instance = first_rule(vec![rule("f", "s", "c", "c", "Symptom", "", "Instance")]);
        assert_eq!(deriver.derive(&instance).unwrap().0, "rdf:type");
    }

    #[test]
    fn test_type_predicate_absent_without_type() {
        let sanitizer = sanitizer();
        let vocabulary = Vocabulary::default();
        let deriver = TypePredicateDeriver::new(&sanitizer, &vocabulary);

        let untyped = first_rule(vec![rule("f", "s", "c", "c", "", "", "Class")]);
        assert_eq!(deriver.derive(&untyped), None);
    }

    #[test]
    fn test_foreign_key_row_types_with_its_sentinel() {
        let sanitizer = sanitizer();
        let vocabulary = Vocabulary::default();
        let deriver = TypePredicateDeriver::new(&sanitizer, &vocabulary);

        let foreign_key = first_rule(vec![part_of_rule().record()]);
        assert_eq!(
            deriver.derive(&foreign_key),
            Some(("rdf:type".to_string(), "mhdb:foreign_key".to_string()))
        );
    }

    #[test]
    fn test_collector_unions_label_type_and_foreign_key() {
        let schema = questionnaire_schema();
        let workbooks: Workbooks = questionnaire_workbooks();
        let sanitizer = sanitizer();
        let vocabulary = Vocabulary::default();
        let collector = PredicateCollector::new(
            &schema,
            ForeignKeyResolver::new(&workbooks, &sanitizer),
            LabelFormatter::new(&sanitizer, &vocabulary.language),
            TypePredicateDeriver::new(&sanitizer, &vocabulary),
        );

        let owner = &schema.rows()[0];
        let row = &workbooks.table("questions", "Question").unwrap().rows[0];
        let contribution = collector.collect(row, owner).unwrap();

        assert!(contribution.misses.is_empty());
        assert_eq!(contribution.triples.len(), 3);
        assert!(contribution.triples.contains("rdf:type", "mhdb:Question"));
        assert!(contribution.triples.contains("dcterms:isPartOf", "mhdb:Anxiety_Scale"));
        assert!(contribution
            .triples
            .contains("rdfs:label", "\"\"\"How often do you feel anxious?\"\"\"@en"));
    }

    #[test]
    fn test_collector_drops_terms_with_unknown_prefix() {
        let schema = schema_table(vec![
            rule("people", "Person", "name", "name", "foaf:Person", "rdfs:label", ""),
            ForeignRule {
                file: "people",
                sheet: "Person",
                column: "friend_id",
                indexed: "name",
                definition: "foaf:knows",
                split_key_by: "",
                split_value_by: "",
                foreign_file: "people",
                foreign_sheet: "Friends",
                key_column: "index",
                value_column: "name",
                backup_column: "",
            }
            .record(),
        ])
        .unwrap();
        let workbooks = Workbooks::new()
            .with_table(
                "people",
                "Person",
                Table::from_records(&["name", "friend_id"], vec![vec!["Ada".into(), 1i64.into()]]),
            )
            .with_table(
                "people",
                "Friends",
                Table::from_records(&["index", "name"], vec![vec![1i64.into(), "Grace".into()]]),
            );
        let sanitizer = sanitizer();
        let vocabulary = Vocabulary::default();
        let collector = PredicateCollector::new(
            &schema,
            ForeignKeyResolver::new(&workbooks, &sanitizer),
            LabelFormatter::new(&sanitizer, &vocabulary.language),
            TypePredicateDeriver::new(&sanitizer, &vocabulary),
        );

        let owner = &schema.rows()[0];
        let row = &workbooks.table("people", "Person").unwrap().rows[0];
        let contribution = collector.collect(row, owner).unwrap();

        assert!(contribution.misses.is_empty());
        assert_eq!(contribution.triples.len(), 1);
        assert!(contribution.triples.contains("rdfs:label", "\"\"\"Ada\"\"\"@en"));
        assert!(!contribution.triples.has_predicate("rdf:type"));
        assert!(!contribution.triples.has_predicate("foaf:knows"));
    }
}
