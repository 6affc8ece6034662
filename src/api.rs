use crate::config::{ConvertOptions, Context};
use crate::error::ConvertError;
use crate::generator::Generator;
use crate::grid::{CellGrid, Workbook};
use crate::parser::{ParsedSchema, SchemaParser};
use crate::serialization::Value;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The result of converting one sheet.
///
/// Holds the parsed schema next to the generated document so callers can inspect both,
/// and renders the document with the options it was produced under.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub sheet_name: String,
    pub schema: ParsedSchema,
    pub document: Value,
    pub options: ConvertOptions,
}

impl Serialize for ConversionResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.document.serialize(serializer)
    }
}

impl ConversionResult {
    #[must_use]
    pub fn to_value(&self) -> &Value {
        &self.document
    }

    /// Pretty-printed JSON in document order.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.document.to_json_pretty()
    }

    /// YAML using the style, indent and quoting of `self.options`.
    #[must_use]
    pub fn to_yaml(&self) -> String {
        self.document.to_yaml(
            self.options.yaml_style,
            self.options.yaml_indent,
            self.options.yaml_force_quotes,
        )
    }

    /// JSON or YAML, whichever `self.options.format` selects.
    #[must_use]
    pub fn render(&self) -> String {
        self.document.render(&self.options)
    }
}

/// Parses the schema block of `grid` and generates its document.
///
/// # Errors
///
/// Returns a `ConvertError` if the schema is malformed or its root cannot be generated.
pub fn convert_sheet<G: CellGrid + ?Sized>(
    grid: &G,
    ctx: &Context<'_>,
) -> Result<ConversionResult, ConvertError> {
    let parser = SchemaParser::new(grid, ctx)?;
    let schema = parser.parse()?;
    let document = Generator::new(&schema.tree, grid, ctx).generate(schema.data_rows())?;

    Ok(ConversionResult {
        sheet_name: grid.name().to_string(),
        schema,
        document,
        options: ctx.options().clone(),
    })
}

/// Rendered output of one workbook sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedSheet {
    /// Sheet name with the sheet marker removed.
    pub name: String,
    /// `<name>.json` or `<name>.yaml`.
    pub file_name: String,
    pub text: String,
}

impl ConvertedSheet {
    /// Writes the text to `dir/<file_name>` and returns that path.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::Io` if the file cannot be written.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ConvertError> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.text).map_err(|source| ConvertError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Converts every sheet whose name starts with the configured sheet marker.
///
/// Sheets are converted in workbook order. Names are checked for collisions before any
/// sheet is converted.
///
/// # Errors
///
/// Returns `ConvertError::DuplicateSheet` if two target sheets share an output name, or
/// the first error raised while converting a sheet.
pub fn convert_workbook(
    workbook: &Workbook,
    ctx: &Context<'_>,
) -> Result<Vec<ConvertedSheet>, ConvertError> {
    let marker = ctx.options().sheet_marker.as_str();

    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for sheet in &workbook.sheets {
        if !sheet.name().starts_with(marker) {
            event!(ctx, Debug, "skipping sheet `{}`", sheet.name());
            continue;
        }
        let name = sheet.name().replace(marker, "");
        if !seen.insert(name.clone()) {
            return Err(ConvertError::DuplicateSheet { name });
        }
        targets.push((name, sheet));
    }

    let extension = ctx.options().format.extension();
    let mut converted = Vec::with_capacity(targets.len());
    for (name, sheet) in targets {
        let result = convert_sheet(sheet, ctx)?;
        converted.push(ConvertedSheet {
            file_name: format!("{name}.{extension}"),
            text: result.render(),
            name,
        });
    }

    event!(ctx, Info, "converted {} sheet(s)", converted.len());
    Ok(converted)
}
