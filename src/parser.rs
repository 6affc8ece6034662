use crate::ast::{NodeId, NodeKind, Position, SchemeNode, SchemeTree, TreeBuilder};
use crate::config::Context;
use crate::error::SchemaError;
use crate::grid::CellGrid;
use std::ops::RangeInclusive;

/// Row 1 is reserved for comments; the schema block always starts on row 2.
pub const SCHEMA_START_ROW: u32 = 2;

/// Column-A text that closes the schema block. Compared case-insensitively.
pub const SCHEME_END: &str = "$scheme_end";

const MARKER: char = '$';
const SKIP: &str = "^";

/// The outcome of parsing a sheet's schema block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSchema {
    pub tree: SchemeTree,
    /// First data row, right below the end marker.
    pub content_start_row: u32,
    /// Last data row (inclusive).
    pub end_row: u32,
}

impl ParsedSchema {
    /// The data rows to feed the generator. Empty when the sheet has no data below the marker.
    pub fn data_rows(&self) -> RangeInclusive<u32> {
        self.content_start_row..=self.end_row
    }
}

/// Parses a single schema literal such as `items$[]`, `${}` or `name`.
///
/// ```text
/// literal ::= text                      (Property, key = text)
///           | [key] { "$" segment }     (kind from the last segment)
/// segment ::= "{}" | "[]" | "key" | "value" | "^"
/// ```
///
/// Empty segments are dropped, and a literal containing `$[]` anywhere is an array. The key is
/// the first segment when at least one more follows it, so `${}` and `$key` are anonymous.
pub fn parse_literal(text: &str, position: Position) -> Result<SchemeNode, SchemaError> {
    if !text.contains(MARKER) {
        return Ok(SchemeNode::new(text, NodeKind::Property, position));
    }

    let segments: Vec<&str> = text.split(MARKER).filter(|s| !s.is_empty()).collect();
    let key = match segments.as_slice() {
        [first, _, ..] => *first,
        _ => "",
    };

    if text.contains("$[]") {
        return Ok(SchemeNode::new(key, NodeKind::Array, position));
    }

    let token = segments.last().copied().unwrap_or("");
    let kind = match token {
        "{}" => NodeKind::Map,
        "[]" => NodeKind::Array,
        "key" => NodeKind::Key,
        "value" => NodeKind::Value,
        "^" => NodeKind::Ignore,
        _ => {
            return Err(SchemaError::UnknownNodeType {
                token: token.to_string(),
                position,
            })
        }
    };
    Ok(SchemeNode::new(key, kind, position))
}

/// A recursive descent parser over the two-dimensional schema block of a sheet.
///
/// Each schema row describes the children of the containers on the row above it; a
/// container's children are found in the columns covered by its merged cell.
pub struct SchemaParser<'a, G: CellGrid + ?Sized> {
    grid: &'a G,
    ctx: &'a Context<'a>,
    schema_end_row: u32,
    first_column: u32,
    last_column: u32,
    builder: TreeBuilder,
}

impl<'a, G: CellGrid + ?Sized> SchemaParser<'a, G> {
    /// Locates the end marker and the column span of the schema block.
    pub fn new(grid: &'a G, ctx: &'a Context<'a>) -> Result<Self, SchemaError> {
        event!(ctx, Debug, "scanning sheet `{}` for {}", grid.name(), SCHEME_END);

        let schema_end_row =
            find_end_marker(grid).ok_or_else(|| SchemaError::MissingEndMarker {
                sheet: grid.name().to_string(),
            })?;

        let (first_column, last_column) = match (
            grid.first_used_column(SCHEMA_START_ROW),
            grid.last_used_column(SCHEMA_START_ROW),
        ) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(SchemaError::MissingStartRow {
                    sheet: grid.name().to_string(),
                })
            }
        };

        event!(
            ctx,
            Debug,
            "schema block rows {}..{}, columns {}..={}",
            SCHEMA_START_ROW,
            schema_end_row,
            first_column,
            last_column
        );

        Ok(Self {
            grid,
            ctx,
            schema_end_row,
            first_column,
            last_column,
            builder: TreeBuilder::new(),
        })
    }

    // === Main Parsing Methods ===

    /// Builds the node tree and the data row range.
    pub fn parse(mut self) -> Result<ParsedSchema, SchemaError> {
        let root = match self.find_root()? {
            Some((root, row)) => {
                // The root's own row is scanned in full, so its defining cell shows up again
                // as the root's first child.
                self.parse_row(root, row, self.first_column, self.last_column)?;
                root
            }
            None => {
                event!(
                    self.ctx,
                    Warn,
                    "no root cell found in `{}`, using an unnamed array root",
                    self.grid.name()
                );
                let position = Position::new(SCHEMA_START_ROW, self.first_column);
                let root = self
                    .builder
                    .push(SchemeNode::new("", NodeKind::Array, position));
                self.parse_row(root, SCHEMA_START_ROW, self.first_column, self.last_column)?;
                root
            }
        };

        let root_node = self.builder.node(root);
        if !matches!(root_node.kind, NodeKind::Map | NodeKind::Array) {
            return Err(SchemaError::InvalidRoot {
                kind: root_node.kind,
                position: root_node.position,
            });
        }

        let tree = self.builder.finish(root);
        let content_start_row = self.schema_end_row + 1;
        let end_row = self.grid.last_used_row().unwrap_or(content_start_row);

        event!(self.ctx, Trace, "schema tree of `{}`:\n{}", self.grid.name(), tree);
        event!(
            self.ctx,
            Info,
            "parsed schema of `{}`: {} nodes, data rows {}..={}",
            self.grid.name(),
            tree.linear().len(),
            content_start_row,
            end_row
        );

        Ok(ParsedSchema {
            tree,
            content_start_row,
            end_row,
        })
    }

    /// The first usable cell of the schema block, turned into a map root unless it
    /// already declares a map or an array.
    fn find_root(&mut self) -> Result<Option<(NodeId, u32)>, SchemaError> {
        for row in SCHEMA_START_ROW..self.schema_end_row {
            for column in self.first_column..=self.last_column {
                let Some(text) = self.schema_text(row, column) else {
                    continue;
                };
                let literal = if text.contains("{}") {
                    text
                } else {
                    format!("{text}${{}}")
                };
                let node = parse_literal(&literal, Position::new(row, column))?;
                event!(
                    self.ctx,
                    Debug,
                    "root `{}` is a {} at {}",
                    literal,
                    node.kind,
                    node.position
                );
                return Ok(Some((self.builder.push(node), row)));
            }
        }
        Ok(None)
    }

    /// Parses the cells `start..=end` of `row` as children of `parent`.
    fn parse_row(
        &mut self,
        parent: NodeId,
        row: u32,
        start: u32,
        end: u32,
    ) -> Result<(), SchemaError> {
        event!(
            self.ctx,
            Trace,
            "row {} columns {}..={} under {}",
            row,
            start,
            end,
            self.builder.node(parent).position
        );

        let mut column = start;
        while column <= end {
            let Some(text) = self.schema_text(row, column) else {
                column += 1;
                continue;
            };

            let node = parse_literal(&text, Position::new(row, column))?;
            let kind = node.kind;
            let id = self.builder.push(node);
            self.attach(parent, id);

            if kind == NodeKind::Key {
                // A key always owns the cell right next to it.
                self.parse_row(id, row, column + 1, column + 1)?;
                column += 2;
                continue;
            }

            if kind.is_container() {
                let span = self.merged_span(row, column);
                if row + 1 < self.schema_end_row {
                    self.parse_row(id, row + 1, *span.start(), *span.end())?;
                }
                column = *span.end();
            }
            column += 1;
        }
        Ok(())
    }

    // === Helper Methods ===

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Err(rejection) = self.builder.attach(parent, child) {
            let parent = self.builder.node(parent);
            let child = self.builder.node(child);
            event!(
                self.ctx,
                Warn,
                "dropping {} `{}` at {} under {} at {}: {:?}",
                child.kind,
                child.key,
                child.position,
                parent.kind,
                parent.position,
                rejection
            );
        }
    }

    /// The columns a container at `(row, column)` spans on the next schema row.
    fn merged_span(&self, row: u32, column: u32) -> RangeInclusive<u32> {
        self.grid
            .merged_ranges()
            .iter()
            .find(|range| range.contains(row, column))
            .map(|range| {
                event!(
                    self.ctx,
                    Trace,
                    "merged range {} spans {}",
                    range,
                    Position::new(row, column)
                );
                range.first_column..=range.last_column
            })
            .unwrap_or(column..=column)
    }

    /// The cell text when it takes part in the schema; empty and `^` cells do not.
    fn schema_text(&self, row: u32, column: u32) -> Option<String> {
        let cell = self.grid.cell(row, column);
        if cell.is_empty() {
            return None;
        }
        let text = cell.text();
        if text.is_empty() || text.eq_ignore_ascii_case(SKIP) {
            return None;
        }
        Some(text.into_owned())
    }
}

fn find_end_marker<G: CellGrid + ?Sized>(grid: &G) -> Option<u32> {
    let last = grid.last_used_row()?;
    (SCHEMA_START_ROW + 1..=last).find(|&row| {
        let cell = grid.cell(row, 1);
        cell.is_text() && cell.text().eq_ignore_ascii_case(SCHEME_END)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Sheet;

    fn pos(row: u32, column: u32) -> Position {
        Position::new(row, column)
    }

    fn parse(sheet: &Sheet) -> Result<ParsedSchema, SchemaError> {
        let ctx = Context::default();
        let parser = SchemaParser::new(sheet, &ctx)?;
        parser.parse()
    }

    #[test]
    fn test_literal_without_marker_is_property() {
        for text in ["name", "first name", "{}", "[]", "key", "a^b"] {
            let node = parse_literal(text, pos(3, 2)).unwrap();
            assert_eq!(node.kind, NodeKind::Property);
            assert_eq!(node.key, text);
        }
    }

    #[test]
    fn test_literal_kinds() {
        let cases = [
            ("items$[]", NodeKind::Array, "items"),
            ("meta${}", NodeKind::Map, "meta"),
            ("id$key", NodeKind::Key, "id"),
            ("$key", NodeKind::Key, ""),
            ("$value", NodeKind::Value, ""),
            ("note$^", NodeKind::Ignore, "note"),
            ("${}", NodeKind::Map, ""),
            ("$$[]", NodeKind::Array, ""),
            // `$[]` anywhere wins over the trailing segment.
            ("list$[]${}", NodeKind::Array, "list"),
        ];
        for (text, kind, key) in cases {
            let node = parse_literal(text, pos(3, 2)).unwrap();
            assert_eq!((node.kind, node.key.as_str()), (kind, key), "literal {text}");
        }
    }

    #[test]
    fn test_literal_unknown_type() {
        let err = parse_literal("name$list", pos(4, 3)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownNodeType {
                token: "list".to_string(),
                position: pos(4, 3)
            }
        );
        assert_eq!(err.to_string(), "Unknown node type `list` at C4");
    }

    #[test]
    fn test_missing_end_marker() {
        let sheet = Sheet::from_rows("s", vec![vec!["c"], vec!["${}"], vec!["name"]]);
        assert_eq!(
            parse(&sheet).unwrap_err(),
            SchemaError::MissingEndMarker {
                sheet: "s".to_string()
            }
        );
    }

    #[test]
    fn test_end_marker_is_case_insensitive_and_skips_row_two() {
        // Row 2 itself never closes the block.
        let sheet = Sheet::from_rows("s", vec![vec![""], vec!["$scheme_end"]]);
        assert!(matches!(
            parse(&sheet),
            Err(SchemaError::MissingEndMarker { .. })
        ));

        let sheet = Sheet::from_rows(
            "s",
            vec![vec![""], vec!["name"], vec!["$Scheme_END"], vec!["x"]],
        );
        let parsed = parse(&sheet).unwrap();
        assert_eq!(parsed.content_start_row, 4);
        assert_eq!(parsed.end_row, 4);
    }

    #[test]
    fn test_end_marker_must_be_text() {
        let mut sheet = Sheet::from_rows("s", vec![vec![""], vec!["name"]]);
        sheet.set(3, 1, crate::grid::CellValue::Error("$scheme_end".into()));
        assert!(matches!(
            parse(&sheet),
            Err(SchemaError::MissingEndMarker { .. })
        ));
    }

    #[test]
    fn test_missing_start_row() {
        let sheet = Sheet::from_rows("s", vec![vec!["c"], vec![""], vec!["$scheme_end"]]);
        assert_eq!(
            parse(&sheet).unwrap_err(),
            SchemaError::MissingStartRow {
                sheet: "s".to_string()
            }
        );
    }

    #[test]
    fn test_plain_root_cell_becomes_map() {
        let sheet = Sheet::from_rows(
            "s",
            vec![vec![""], vec!["name"], vec!["$scheme_end"], vec!["Alice"]],
        );
        let tree = parse(&sheet).unwrap().tree;
        assert_eq!(tree.root_node().kind, NodeKind::Map);
        assert_eq!(tree.root_node().key, "");
        let children: Vec<_> = tree.children(tree.root()).map(|(_, n)| n.clone()).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind, NodeKind::Property);
        assert_eq!(children[0].key, "name");
    }

    #[test]
    fn test_array_root_with_merged_children() {
        let sheet = Sheet::from_rows(
            "items",
            vec![
                vec!["comment"],
                vec!["$[]"],
                vec!["${}"],
                vec!["id", "name", "tags$[]"],
                vec!["", "", "tag"],
                vec!["$scheme_end"],
            ],
        )
        .with_merge("A2:C2")
        .unwrap()
        .with_merge("A3:C3")
        .unwrap();

        let parsed = parse(&sheet).unwrap();
        assert_eq!(
            parsed.tree.to_string(),
            "\
:array@A2
  :array@A2
    :map@A3
      id:property@A4
      name:property@B4
      tags:array@C4
        tag:property@C5
"
        );
        assert_eq!(parsed.content_start_row, 7);
        // No data: the range is empty.
        assert!(parsed.data_rows().is_empty());
    }

    #[test]
    fn test_children_never_reach_the_marker_row() {
        let sheet = Sheet::from_rows(
            "s",
            vec![vec![""], vec!["${}"], vec!["$scheme_end"], vec!["x"]],
        );
        let tree = parse(&sheet).unwrap().tree;
        let (_, anon) = tree.children(tree.root()).next().unwrap();
        assert!(anon.children.is_empty());
    }

    #[test]
    fn test_key_consumes_next_cell() {
        let sheet = Sheet::from_rows(
            "s",
            vec![
                vec![""],
                vec!["${}"],
                vec!["$key", "$value", "note"],
                vec!["$scheme_end"],
            ],
        )
        .with_merge("A2:C2")
        .unwrap();

        let tree = parse(&sheet).unwrap().tree;
        assert_eq!(
            tree.to_string(),
            "\
:map@A2
  :map@A2
    :key@A3
      :value@B3
    note:property@C3
"
        );
    }

    #[test]
    fn test_key_providers_reject_key_children() {
        // The cell after `$key` is another key: it is parsed and then dropped.
        let sheet = Sheet::from_rows(
            "s",
            vec![
                vec![""],
                vec!["${}"],
                vec!["$key", "other", "kept"],
                vec!["$scheme_end"],
            ],
        )
        .with_merge("A2:C2")
        .unwrap();

        let tree = parse(&sheet).unwrap().tree;
        let (_, anon) = tree.children(tree.root()).next().unwrap();
        let kinds: Vec<_> = anon
            .children
            .iter()
            .map(|&id| (tree.node(id).kind, tree.node(id).key.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (NodeKind::Key, String::new()),
                (NodeKind::Property, "kept".to_string())
            ]
        );
        let key = anon.children[0];
        assert!(tree.node(key).children.is_empty());
    }

    #[test]
    fn test_skip_cells_are_ignored() {
        let sheet = Sheet::from_rows(
            "s",
            vec![
                vec![""],
                vec!["${}"],
                vec!["a", "^", "b"],
                vec!["$scheme_end"],
            ],
        )
        .with_merge("A2:C2")
        .unwrap();
        let tree = parse(&sheet).unwrap().tree;
        let keys: Vec<_> = tree
            .linear()
            .into_iter()
            .map(|id| tree.node(id).key.clone())
            .filter(|k| !k.is_empty())
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_type_in_body_is_fatal() {
        let sheet = Sheet::from_rows(
            "s",
            vec![vec![""], vec!["${}"], vec!["x$list"], vec!["$scheme_end"]],
        );
        assert!(matches!(
            parse(&sheet),
            Err(SchemaError::UnknownNodeType { ref token, position }) if token == "list" && position == pos(3, 1)
        ));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let sheet = Sheet::from_rows(
            "s",
            vec![
                vec![""],
                vec!["$[]"],
                vec!["${}"],
                vec!["a", "b$[]", "c${}"],
                vec!["", "x", "y"],
                vec!["$scheme_end"],
                vec!["1", "2", "3"],
            ],
        )
        .with_merge("A2:C2")
        .unwrap()
        .with_merge("A3:C3")
        .unwrap();
        assert_eq!(parse(&sheet).unwrap(), parse(&sheet).unwrap());
    }
}
