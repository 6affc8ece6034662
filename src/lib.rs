/// Sends a record to the log sink of a [`config::Context`].
macro_rules! event {
    ($ctx:expr, $level:ident, $($arg:tt)+) => {
        $ctx.emit(log::Level::$level, module_path!(), format_args!($($arg)+))
    };
}

pub mod api;
pub mod ast;
pub mod config;
pub mod error;
pub mod generator;
pub mod grid;
pub mod parser;
pub mod resolver;
pub mod serialization;
pub mod utils;

pub use api::{convert_sheet, convert_workbook, ConversionResult, ConvertedSheet};
pub use config::{ConvertOptions, Context, OutputFormat, YamlStyle};
pub use error::{ConvertError, GenerationError, InputError, SchemaError};
pub use grid::{CellGrid, CellValue, MergedRange, Sheet, Workbook};
pub use serialization::Value;
