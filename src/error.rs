//! Input errors that abort a run

use thiserror::Error;

/// Fatal problems with the membership table
///
/// Unresolved cities and missing population figures are not errors; they are
/// reported in `ResolutionReport` and `AggregationDiagnostics`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Required column(s) absent from the header row
    #[error("Input table is missing required column(s): {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// A cell that cannot be parsed for its column
    #[error("Row {row}: invalid value {value:?} in column '{column}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_names_every_column() {
        let err = InputError::MissingColumns {
            missing: vec!["year".to_string(), "region".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "Input table is missing required column(s): year, region"
        );
    }

    #[test]
    fn test_invalid_value_message() {
        let err = InputError::InvalidValue {
            row: 3,
            column: "year".to_string(),
            value: "2O24".to_string(),
        };

        assert_eq!(err.to_string(), "Row 3: invalid value \"2O24\" in column 'year'");
    }
}
