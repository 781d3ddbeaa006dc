//! Shared test fixtures: a questionnaire workbook and its structure-to-keep table.

use crate::config::Vocabulary;
use crate::core::iri::IriSanitizer;
use crate::core::schema::*;
use crate::error::ExtractResult;
use crate::handlers::{CellValue, Table, Workbooks};

pub const SCHEMA_COLUMNS: [&str; 15] = [
    FILE,
    SHEET,
    COLUMN_HEADER,
    INDEXED_ENTITY,
    TYPE,
    DEFINITION,
    SPLIT_INDEXED_BY,
    CLASSIFICATION,
    SPLIT_KEY_BY,
    SPLIT_VALUE_BY,
    FOREIGN_FILE,
    FOREIGN_SHEET,
    FOREIGN_KEY_COLUMN,
    FOREIGN_VALUE_COLUMN,
    FOREIGN_VALUE_BACKUP_COLUMN,
];

pub fn schema_table(records: Vec<Vec<CellValue>>) -> ExtractResult<SchemaTable> {
    SchemaTable::from_table(
        &Table::from_records(&SCHEMA_COLUMNS, records),
        &Vocabulary::default(),
    )
}

/// A plain (non foreign-key) rule.
pub fn rule(
    file: &str,
    sheet: &str,
    column: &str,
    indexed: &str,
    type_field: &str,
    definition: &str,
    classification: &str,
) -> Vec<CellValue> {
    let cell = |s: &str| if s.is_empty() { CellValue::Empty } else { s.into() };
    vec![
        cell(file),
        cell(sheet),
        cell(column),
        cell(indexed),
        cell(type_field),
        cell(definition),
        CellValue::Empty,
        cell(classification),
    ]
}

pub struct ForeignRule<'a> {
    pub file: &'a str,
    pub sheet: &'a str,
    pub column: &'a str,
    pub indexed: &'a str,
    pub definition: &'a str,
    pub split_key_by: &'a str,
    pub split_value_by: &'a str,
    pub foreign_file: &'a str,
    pub foreign_sheet: &'a str,
    pub key_column: &'a str,
    pub value_column: &'a str,
    pub backup_column: &'a str,
}

impl ForeignRule<'_> {
    pub fn record(&self) -> Vec<CellValue> {
        let cell = |s: &str| if s.is_empty() { CellValue::Empty } else { s.into() };
        vec![
            cell(self.file),
            cell(self.sheet),
            cell(self.column),
            cell(self.indexed),
            "foreign key".into(),
            cell(self.definition),
            CellValue::Empty,
            CellValue::Empty,
            cell(self.split_key_by),
            cell(self.split_value_by),
            cell(self.foreign_file),
            cell(self.foreign_sheet),
            cell(self.key_column),
            cell(self.value_column),
            cell(self.backup_column),
        ]
    }
}

pub fn part_of_rule() -> ForeignRule<'static> {
    ForeignRule {
        file: "questions",
        sheet: "Question",
        column: "questionnaire_id",
        indexed: "question",
        definition: "dcterms:isPartOf",
        split_key_by: "|",
        split_value_by: "",
        foreign_file: "questions",
        foreign_sheet: "Questionnaire",
        key_column: "index",
        value_column: "title",
        backup_column: "short_title",
    }
}

/// Question subjects linked to their questionnaire, plus questionnaires as subjects.
pub fn questionnaire_schema() -> SchemaTable {
    schema_table(vec![
        rule("questions", "Question", "question", "question", "Question", "rdfs:label", ""),
        part_of_rule().record(),
        rule("questions", "Questionnaire", "title", "title", "Questionnaire", "rdfs:label", ""),
    ])
    .expect("fixture schema is valid")
}

pub fn questionnaire_workbooks() -> Workbooks {
    Workbooks::new()
        .with_table(
            "questions",
            "Question",
            Table::from_records(
                &["question", "questionnaire_id"],
                vec![
                    vec!["How often do you feel anxious?".into(), 1i64.into()],
                    vec!["Do you sleep well?".into(), 2i64.into()],
                    vec!["Rate your mood".into(), 1i64.into()],
                ],
            ),
        )
        .with_table(
            "questions",
            "Questionnaire",
            Table::from_records(
                &["index", "title", "short_title"],
                vec![
                    vec![1i64.into(), "Anxiety Scale".into(), CellValue::Empty],
                    vec![2i64.into(), CellValue::Empty, "Sleep Inventory".into()],
                    vec![3i64.into(), "Mood Scale".into(), CellValue::Empty],
                ],
            ),
        )
}

pub fn sanitizer() -> IriSanitizer {
    IriSanitizer::new("mhdb", ["rdf", "rdfs", "dcterms", "schema"])
}
