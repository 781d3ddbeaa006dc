use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::config::Vocabulary;
use crate::error::{ExtractError, ExtractResult};
use crate::handlers::{DataRow, Table};

pub const FILE: &str = "File";
pub const SHEET: &str = "Sheet";
pub const COLUMN_HEADER: &str = "Column_Header";
pub const INDEXED_ENTITY: &str = "Indexed_Entity";
pub const TYPE: &str = "Type";
pub const DEFINITION: &str = "Definition or Relationship";
pub const SPLIT_INDEXED_BY: &str = "split_indexed_by";
pub const CLASSIFICATION: &str = "Class, Property or Instance";
pub const SPLIT_KEY_BY: &str = "split_key_by";
pub const SPLIT_VALUE_BY: &str = "split_value_by";
pub const FOREIGN_FILE: &str = "Foreign File";
pub const FOREIGN_SHEET: &str = "Foreign Sheet";
pub const FOREIGN_KEY_COLUMN: &str = "Foreign Key Column_Header";
pub const FOREIGN_VALUE_COLUMN: &str = "Foreign Value Column_Header";
pub const FOREIGN_VALUE_BACKUP_COLUMN: &str = "Foreign Value Column_Backup_Header";

const REQUIRED_COLUMNS: [&str; 6] = [FILE, SHEET, COLUMN_HEADER, INDEXED_ENTITY, TYPE, DEFINITION];

/// Where a foreign-key column points and how to split what it finds there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignReference {
    pub split_key_by: Option<String>,
    pub split_value_by: Option<String>,
    pub foreign_file: String,
    pub foreign_sheet: String,
    pub key_column: String,
    pub value_column: String,
    pub backup_column: Option<String>,
}

/// Behaviour of a schema row, fixed when the schema table is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    ForeignKey(ForeignReference),
    /// The row's predicate produces language-tagged text literals.
    Literal,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRow {
    pub file: String,
    pub sheet: String,
    pub column_header: String,
    pub indexed_entity: String,
    /// Raw `Type` cell; `None` when blank. Foreign-key rows keep their sentinel here.
    pub domain_type: Option<String>,
    pub definition: Option<String>,
    pub split_indexed_by: Option<String>,
    pub classification: Option<String>,
    pub kind: RuleKind,
}

/// `(File, Sheet, column)` identifying one column of one data sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub file: String,
    pub sheet: String,
    pub column: String,
}

impl EntityKey {
    pub fn new(file: &str, sheet: &str, column: &str) -> Self {
        Self {
            file: file.to_string(),
            sheet: sheet.to_string(),
            column: column.to_string(),
        }
    }
}

impl SchemaRow {
    /// The column this row turns into subjects when it declares a sheet of entities.
    pub fn own_key(&self) -> EntityKey {
        EntityKey::new(&self.file, &self.sheet, &self.column_header)
    }

    /// The indexed column this row contributes predicates to.
    pub fn target_key(&self) -> EntityKey {
        EntityKey::new(&self.file, &self.sheet, &self.indexed_entity)
    }

    pub fn foreign_reference(&self) -> Option<&ForeignReference> {
        match &self.kind {
            RuleKind::ForeignKey(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, RuleKind::Literal)
    }

    /// Interpret one row of the schema table.
    pub fn from_data_row(row: &DataRow, vocabulary: &Vocabulary) -> ExtractResult<Self> {
        let file = text(row, FILE).unwrap_or_default();
        let sheet = text(row, SHEET).unwrap_or_default();
        let column_header = text(row, COLUMN_HEADER).unwrap_or_default();
        let type_field = text(row, TYPE);
        let definition = text(row, DEFINITION);

        let is_foreign_key = type_field
            .as_deref()
            .map(|t| t == vocabulary.foreign_key_type)
            .unwrap_or(false);

        let kind = if is_foreign_key {
            let missing = |field: &str| ExtractError::Configuration {
                file: file.clone(),
                sheet: sheet.clone(),
                column: column_header.clone(),
                message: format!("foreign key row is missing '{}'", field),
            };
            if column_header.is_empty() {
                return Err(missing(COLUMN_HEADER));
            }
            RuleKind::ForeignKey(ForeignReference {
                split_key_by: delimiter(row, SPLIT_KEY_BY),
                split_value_by: delimiter(row, SPLIT_VALUE_BY),
                foreign_file: text(row, FOREIGN_FILE).ok_or_else(|| missing(FOREIGN_FILE))?,
                foreign_sheet: text(row, FOREIGN_SHEET).ok_or_else(|| missing(FOREIGN_SHEET))?,
                key_column: text(row, FOREIGN_KEY_COLUMN)
                    .ok_or_else(|| missing(FOREIGN_KEY_COLUMN))?,
                value_column: text(row, FOREIGN_VALUE_COLUMN)
                    .ok_or_else(|| missing(FOREIGN_VALUE_COLUMN))?,
                backup_column: text(row, FOREIGN_VALUE_BACKUP_COLUMN),
            })
        } else if definition
            .as_deref()
            .map(|d| vocabulary.literal_predicates.iter().any(|p| p == d))
            .unwrap_or(false)
        {
            RuleKind::Literal
        } else {
            RuleKind::Plain
        };

        Ok(SchemaRow {
            file,
            sheet,
            column_header,
            indexed_entity: text(row, INDEXED_ENTITY).unwrap_or_default(),
            domain_type: type_field,
            definition,
            split_indexed_by: delimiter(row, SPLIT_INDEXED_BY),
            classification: text(row, CLASSIFICATION),
            kind,
        })
    }
}

fn text(row: &DataRow, column: &str) -> Option<String> {
    row.text(column)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Delimiters keep their whitespace.
fn delimiter(row: &DataRow, column: &str) -> Option<String> {
    row.text(column).filter(|s| !s.is_empty())
}

/// The structure-to-keep table with a precomputed reverse index from an indexed column to
/// every rule that targets it.
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    rows: Vec<SchemaRow>,
    by_target: HashMap<EntityKey, Vec<usize>>,
}

impl SchemaTable {
    pub fn new(rows: Vec<SchemaRow>) -> Self {
        let mut by_target: HashMap<EntityKey, Vec<usize>> = HashMap::new();
        for (position, row) in rows.iter().enumerate() {
            by_target.entry(row.target_key()).or_default().push(position);
        }
        Self { rows, by_target }
    }

    /// Read the schema sheet. Rows without a file or sheet are skipped as spreadsheet padding.
    pub fn from_table(table: &Table, vocabulary: &Vocabulary) -> ExtractResult<Self> {
        for column in REQUIRED_COLUMNS {
            if !table.has_column(column) {
                return Err(ExtractError::MissingColumn(column.to_string()));
            }
        }

        let mut rows = Vec::new();
        for data_row in &table.rows {
            let row = SchemaRow::from_data_row(data_row, vocabulary)?;
            if row.file.is_empty() || row.sheet.is_empty() {
                debug!("Skipping schema row without file or sheet");
                continue;
            }
            rows.push(row);
        }

        Ok(Self::new(rows))
    }

    pub fn rows(&self) -> &[SchemaRow] {
        &self.rows
    }

    /// Rules whose `(File, Sheet, Indexed_Entity)` equals `key`.
    pub fn referencing(&self, key: &EntityKey) -> impl Iterator<Item = &SchemaRow> {
        self.by_target
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&position| &self.rows[position])
    }

    /// A row declares a sheet of subjects when some rule targets its own column.
    pub fn is_indexed_declaration(&self, row: &SchemaRow) -> bool {
        self.by_target.contains_key(&row.own_key())
    }

    pub fn indexed_declarations(&self) -> impl Iterator<Item = &SchemaRow> {
        self.rows.iter().filter(move |row| self.is_indexed_declaration(row))
    }

    /// Every `(workbook, sheet)` extraction will read.
    pub fn referenced_sheets(&self) -> BTreeSet<(String, String)> {
        let mut sheets = BTreeSet::new();
        for declaration in self.indexed_declarations() {
            sheets.insert((declaration.file.clone(), declaration.sheet.clone()));
            for rule in self.referencing(&declaration.own_key()) {
                if let Some(reference) = rule.foreign_reference() {
                    sheets.insert((reference.foreign_file.clone(), reference.foreign_sheet.clone()));
                }
            }
        }
        sheets
    }
}
