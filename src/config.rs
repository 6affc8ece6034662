//! Conversion options and the per-call context.

use crate::error::InputError;
use log::{Level, Log, Metadata, Record};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

/// YAML layout: one entry per line, or compact `{...}` / `[...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YamlStyle {
    #[default]
    Block,
    Flow,
}

/// Options controlling how a sheet is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub format: OutputFormat,
    pub yaml_style: YamlStyle,
    /// Spaces per YAML nesting level. Values below 1 are treated as 1.
    pub yaml_indent: usize,
    /// Double-quote every YAML string value. Keys are still quoted only when the
    /// automatic rule asks for it.
    pub yaml_force_quotes: bool,
    /// Only sheets whose name starts with this marker take part in workbook conversion.
    pub sheet_marker: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            yaml_style: YamlStyle::Block,
            yaml_indent: 2,
            yaml_force_quotes: false,
            sheet_marker: "!".to_string(),
        }
    }
}

impl ConvertOptions {
    pub fn from_json_str(source: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, InputError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn yaml() -> Self {
        Self {
            format: OutputFormat::Yaml,
            ..Self::default()
        }
    }
}

/// Options plus the log sink, threaded explicitly through parsing and generation.
///
/// [`Context::new`] forwards records to whatever logger the process installed through
/// the `log` facade; [`Context::with_logger`] routes them to a caller-owned sink instead.
pub struct Context<'a> {
    options: ConvertOptions,
    logger: &'a dyn Log,
}

impl Context<'static> {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            logger: log::logger(),
        }
    }
}

impl Default for Context<'static> {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

impl<'a> Context<'a> {
    pub fn with_logger(options: ConvertOptions, logger: &'a dyn Log) -> Self {
        Self { options, logger }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub(crate) fn emit(&self, level: Level, target: &str, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(target).build();
        if !self.logger.enabled(&metadata) {
            return;
        }
        self.logger.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path(Some(target))
                .build(),
        );
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
