use crate::ast::{NodeKind, Position};
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum ConvertError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),

    #[error("Sheet `{name}` is listed more than once")]
    #[diagnostic(
        code(workbook::duplicate_sheet),
        help("Two target sheets map to the same output name once the sheet marker is removed. Rename one of them.")
    )]
    DuplicateSheet { name: String },

    #[error("Failed to write `{}`", path.display())]
    #[diagnostic(code(workbook::write_failed))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SchemaError {
    #[error("No `$scheme_end` marker found in sheet `{sheet}`")]
    #[diagnostic(
        code(schema::missing_end_marker),
        help("Put `$scheme_end` in column A of the row that closes the schema block (row 3 or later).")
    )]
    MissingEndMarker { sheet: String },

    #[error("Schema start row 2 of sheet `{sheet}` is empty")]
    #[diagnostic(
        code(schema::missing_start_row),
        help("The schema block always starts on row 2; row 1 is reserved for comments.")
    )]
    MissingStartRow { sheet: String },

    #[error("Unknown node type `{token}` at {position}")]
    #[diagnostic(
        code(schema::unknown_node_type),
        help("The segment after the last `$` must be one of `{{}}`, `[]`, `key`, `value` or `^`.")
    )]
    UnknownNodeType { token: String, position: Position },

    #[error("Root node at {position} is a {kind}, expected a map or an array")]
    #[diagnostic(
        code(schema::invalid_root),
        help("The first schema cell must describe a map (`${{}}`) or an array (`$[]`).")
    )]
    InvalidRoot { kind: NodeKind, position: Position },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Cannot generate a document from a {kind} root at {position}")]
    #[diagnostic(
        code(generator::unsupported_root),
        help("Only unnamed map or array roots can be turned into a document.")
    )]
    UnsupportedRoot { kind: NodeKind, position: Position },
}

#[derive(Error, Debug, Diagnostic)]
pub enum InputError {
    #[error("Invalid cell range `{text}`")]
    #[diagnostic(
        code(input::invalid_range),
        help("Ranges use A1 notation, e.g. `B2` or `B2:D2`.")
    )]
    InvalidRange { text: String },

    #[error("Malformed JSON input")]
    #[diagnostic(code(input::json))]
    Json(#[from] serde_json::Error),

    #[error("Malformed YAML input")]
    #[diagnostic(code(input::yaml))]
    Yaml(#[from] serde_yaml::Error),
}
