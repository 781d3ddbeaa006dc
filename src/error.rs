use thiserror::Error;

/// Fatal errors raised while loading the schema table or the sheets it names.
///
/// Per-cell problems (unmatched foreign keys, non-numeric keys, blank values) are not
/// errors; they surface as [`crate::core::MissReason`] diagnostics instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("configuration error in {file}/{sheet} column '{column}': {message}")]
    Configuration {
        file: String,
        sheet: String,
        column: String,
        message: String,
    },

    #[error("schema table is missing required column '{0}'")]
    MissingColumn(String),

    #[error("table not loaded: {file}/{sheet}")]
    MissingTable { file: String, sheet: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
