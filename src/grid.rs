//! Read-only worksheet access.
//!
//! The converter only ever looks at a sheet through [`CellGrid`]. [`Sheet`] is the
//! in-memory implementation; it can be built cell by cell or loaded from a JSON/YAML
//! fixture such as
//!
//! ```json
//! { "name": "!items", "rows": [["comment"], ["$[]"], ["id", "name"], ["$scheme_end"], [1, "a"]],
//!   "merges": ["A2:B2"] }
//! ```
//!
//! `rows[0]` is row 1. A cell is `null`, a string, a number, a bool, `{"date": ".."}`
//! or `{"error": ".."}`.

use crate::error::InputError;
use crate::utils::{cell_ref, parse_cell_ref};
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// The typed content of a single cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Date/time cells keep the host's rendering.
    DateTime(String),
    /// Error cells such as `#N/A`.
    Error(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Blank cells and zero-length text both count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, CellValue::Text(_))
    }

    /// The cell as the host would display it.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Text(s) | CellValue::DateTime(s) | CellValue::Error(s) => Cow::Borrowed(s),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Boolean(b) => Cow::Owned(b.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

/// A rectangle of merged cells, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub first_row: u32,
    pub first_column: u32,
    pub last_row: u32,
    pub last_column: u32,
}

impl MergedRange {
    pub fn new(first_row: u32, first_column: u32, last_row: u32, last_column: u32) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_column: first_column.min(last_column),
            last_row: first_row.max(last_row),
            last_column: first_column.max(last_column),
        }
    }

    pub fn contains(&self, row: u32, column: u32) -> bool {
        self.covers_row(row) && (self.first_column..=self.last_column).contains(&column)
    }

    pub fn covers_row(&self, row: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
    }
}

impl FromStr for MergedRange {
    type Err = InputError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidRange {
            text: text.to_string(),
        };
        let (start, end) = match text.split_once(':') {
            Some((a, b)) => (a, b),
            None => (text, text),
        };
        let (r1, c1) = parse_cell_ref(start).ok_or_else(invalid)?;
        let (r2, c2) = parse_cell_ref(end).ok_or_else(invalid)?;
        Ok(MergedRange::new(r1, c1, r2, c2))
    }
}

impl fmt::Display for MergedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            cell_ref(self.first_row, self.first_column),
            cell_ref(self.last_row, self.last_column)
        )
    }
}

/// Read-only view of a worksheet. Rows and columns are 1-based.
pub trait CellGrid {
    fn name(&self) -> &str;

    /// The cell at `(row, column)`; positions outside the data are [`CellValue::Empty`].
    fn cell(&self, row: u32, column: u32) -> &CellValue;

    fn merged_ranges(&self) -> &[MergedRange];

    /// The last row holding at least one non-empty cell.
    fn last_used_row(&self) -> Option<u32>;

    fn first_used_column(&self, row: u32) -> Option<u32>;

    fn last_used_column(&self, row: u32) -> Option<u32>;
}

/// An in-memory worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    merges: Vec<MergedRange>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builds a sheet from rows of cells, `rows[0]` being row 1.
    pub fn from_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<CellValue>,
    {
        Self {
            name: name.into(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
            merges: Vec::new(),
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, InputError> {
        let repr: SheetRepr = serde_json::from_str(source)?;
        repr.try_into()
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, InputError> {
        let repr: SheetRepr = serde_yaml::from_str(source)?;
        repr.try_into()
    }

    pub fn set(&mut self, row: u32, column: u32, value: impl Into<CellValue>) {
        if row == 0 || column == 0 {
            return;
        }
        let (r, c) = ((row - 1) as usize, (column - 1) as usize);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        if cells.len() <= c {
            cells.resize_with(c + 1, CellValue::default);
        }
        cells[c] = value.into();
    }

    pub fn merge(&mut self, range: MergedRange) {
        self.merges.push(range);
    }

    /// Convenience for `merge(text.parse()?)`.
    pub fn merge_a1(&mut self, text: &str) -> Result<(), InputError> {
        self.merges.push(text.parse()?);
        Ok(())
    }

    pub fn with_merge(mut self, text: &str) -> Result<Self, InputError> {
        self.merge_a1(text)?;
        Ok(self)
    }

    fn used_columns(&self, row: u32) -> impl Iterator<Item = u32> + '_ {
        let cells = row
            .checked_sub(1)
            .and_then(|r| self.rows.get(r as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(i, _)| i as u32 + 1)
    }
}

impl CellGrid for Sheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell(&self, row: u32, column: u32) -> &CellValue {
        if row == 0 || column == 0 {
            return &EMPTY_CELL;
        }
        self.rows
            .get((row - 1) as usize)
            .and_then(|cells| cells.get((column - 1) as usize))
            .unwrap_or(&EMPTY_CELL)
    }

    fn merged_ranges(&self) -> &[MergedRange] {
        &self.merges
    }

    fn last_used_row(&self) -> Option<u32> {
        self.rows
            .iter()
            .rposition(|cells| cells.iter().any(|c| !c.is_empty()))
            .map(|i| i as u32 + 1)
    }

    fn first_used_column(&self, row: u32) -> Option<u32> {
        self.used_columns(row).next()
    }

    fn last_used_column(&self, row: u32) -> Option<u32> {
        self.used_columns(row).last()
    }
}

/// A set of named sheets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn from_json_str(source: &str) -> Result<Self, InputError> {
        let repr: WorkbookRepr = serde_json::from_str(source)?;
        repr.try_into()
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, InputError> {
        let repr: WorkbookRepr = serde_yaml::from_str(source)?;
        repr.try_into()
    }
}

// --- Fixture representation ---

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CellRepr {
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
    Date { date: String },
    Error { error: String },
}

impl From<CellRepr> for CellValue {
    fn from(repr: CellRepr) -> Self {
        match repr {
            CellRepr::Empty => CellValue::Empty,
            CellRepr::Boolean(b) => CellValue::Boolean(b),
            CellRepr::Number(n) => CellValue::Number(n),
            CellRepr::Text(s) => CellValue::from(s),
            CellRepr::Date { date } => CellValue::DateTime(date),
            CellRepr::Error { error } => CellValue::Error(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SheetRepr {
    name: String,
    #[serde(default)]
    rows: Vec<Vec<CellRepr>>,
    #[serde(default)]
    merges: Vec<String>,
}

impl TryFrom<SheetRepr> for Sheet {
    type Error = InputError;

    fn try_from(repr: SheetRepr) -> Result<Self, Self::Error> {
        let mut sheet = Sheet::from_rows(repr.name, repr.rows);
        for range in &repr.merges {
            sheet.merge_a1(range)?;
        }
        Ok(sheet)
    }
}

#[derive(Debug, Deserialize)]
struct WorkbookRepr {
    sheets: Vec<SheetRepr>,
}

impl TryFrom<WorkbookRepr> for Workbook {
    type Error = InputError;

    fn try_from(repr: WorkbookRepr) -> Result<Self, Self::Error> {
        let sheets = repr
            .sheets
            .into_iter()
            .map(Sheet::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Workbook { sheets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_range_from_a1() {
        let range: MergedRange = "B2:D3".parse().unwrap();
        assert_eq!(range, MergedRange::new(2, 2, 3, 4));
        assert!(range.contains(3, 3));
        assert!(!range.contains(4, 3));
        assert!(!range.contains(2, 1));
        assert_eq!(range.to_string(), "B2:D3");

        let single: MergedRange = "C5".parse().unwrap();
        assert_eq!(single, MergedRange::new(5, 3, 5, 3));

        // Reversed corners are normalised.
        let reversed: MergedRange = "D3:B2".parse().unwrap();
        assert_eq!(reversed, range);

        assert!(matches!(
            "2B:C".parse::<MergedRange>(),
            Err(InputError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_sheet_used_ranges() {
        let mut sheet = Sheet::new("s");
        sheet.set(2, 3, "b");
        sheet.set(2, 5, "c");
        sheet.set(4, 1, "");
        sheet.set(3, 2, 1.5);

        assert_eq!(sheet.first_used_column(2), Some(3));
        assert_eq!(sheet.last_used_column(2), Some(5));
        assert_eq!(sheet.first_used_column(1), None);
        // Row 4 only holds an empty string.
        assert_eq!(sheet.last_used_row(), Some(3));
        assert_eq!(sheet.cell(99, 99), &CellValue::Empty);
        assert_eq!(sheet.cell(0, 1), &CellValue::Empty);
        assert_eq!(sheet.cell(3, 2).text(), "1.5");
    }

    #[test]
    fn test_sheet_from_json_fixture() {
        let sheet = Sheet::from_json_str(
            r##"{
                "name": "!items",
                "rows": [
                    ["comment"],
                    ["$[]"],
                    ["id", null, "flag"],
                    ["$scheme_end"],
                    [1, "x", true, {"date": "2024-01-02"}, {"error": "#N/A"}]
                ],
                "merges": ["A2:C2"]
            }"##,
        )
        .unwrap();

        assert_eq!(sheet.name(), "!items");
        assert_eq!(sheet.cell(3, 2), &CellValue::Empty);
        assert_eq!(sheet.cell(5, 1), &CellValue::Number(1.0));
        assert_eq!(sheet.cell(5, 3), &CellValue::Boolean(true));
        assert_eq!(
            sheet.cell(5, 4),
            &CellValue::DateTime("2024-01-02".to_string())
        );
        assert_eq!(sheet.cell(5, 5), &CellValue::Error("#N/A".to_string()));
        assert_eq!(sheet.merged_ranges(), &[MergedRange::new(2, 1, 2, 3)]);
    }

    #[test]
    fn test_workbook_from_yaml_fixture() {
        let book = Workbook::from_yaml_str(
            "sheets:\n  - name: '!a'\n    rows:\n      - [x]\n  - name: b\n    rows: []\n",
        )
        .unwrap();
        assert_eq!(book.sheets.len(), 2);
        assert_eq!(book.sheets[0].cell(1, 1), &CellValue::Text("x".to_string()));
        assert_eq!(book.sheets[1].last_used_row(), None);
    }

    #[test]
    fn test_bad_merge_in_fixture_is_reported() {
        let err = Sheet::from_json_str(r#"{"name": "s", "merges": ["nope"]}"#).unwrap_err();
        assert!(matches!(err, InputError::InvalidRange { ref text } if text == "nope"));
    }
}
