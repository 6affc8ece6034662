//! Cell coercion and per-row key/value resolution over a parsed schema.

use crate::ast::{NodeId, NodeKind, SchemeTree};
use crate::grid::{CellGrid, CellValue};
use crate::serialization::{Number, Value};

/// Converts a cell into a document scalar. Never fails.
///
/// Text without any whitespace is read as an `i32`, then as an invariant float; anything
/// else is kept as text. Empty cells become `Null`.
pub fn coerce_cell(cell: &CellValue) -> Value {
    match cell {
        CellValue::Empty => Value::Null,
        CellValue::Boolean(b) => Value::Bool(*b),
        CellValue::Number(n) => Value::Number(Number::Float(*n)),
        CellValue::DateTime(s) => Value::String(s.clone()),
        CellValue::Text(s) => coerce_text(s),
        CellValue::Error(s) => Value::String(s.clone()),
    }
}

fn coerce_text(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    if text.chars().any(char::is_whitespace) {
        return Value::String(text.to_string());
    }
    if let Ok(i) = text.parse::<i32>() {
        return Value::Number(Number::Int(i as i64));
    }
    match parse_invariant_float(text) {
        Some(x) => Value::Number(Number::Float(x)),
        None => Value::String(text.to_string()),
    }
}

const CURRENCY_SIGN: char = '\u{A4}';

/// Invariant-culture number parse in the lenient "any" style.
///
/// Besides plain decimal and exponent notation this accepts `,` group separators in the
/// integer part (`1,000`), a trailing sign (`5-`), parentheses for negatives (`(5)`) and
/// the generic currency sign `¤` at either end. `inf`/`nan` spellings stay text.
fn parse_invariant_float(text: &str) -> Option<f64> {
    let mut body = text;
    let mut negative = false;

    let parenthesized = body.starts_with('(') && body.ends_with(')') && body.len() >= 2;
    if parenthesized {
        body = &body[1..body.len() - 1];
        negative = true;
    }
    body = body.strip_prefix(CURRENCY_SIGN).unwrap_or(body);
    body = body.strip_suffix(CURRENCY_SIGN).unwrap_or(body);

    let leading = body.strip_prefix(['+', '-']).map(|rest| (body.starts_with('-'), rest));
    let trailing = body.strip_suffix(['+', '-']).map(|rest| (body.ends_with('-'), rest));
    match (leading, trailing) {
        (Some(_), Some(_)) => return None,
        (Some((minus, rest)), None) | (None, Some((minus, rest))) => {
            if parenthesized {
                return None;
            }
            negative = minus;
            body = rest;
        }
        (None, None) => {}
    }
    body = body.strip_prefix(CURRENCY_SIGN).unwrap_or(body);
    body = body.strip_suffix(CURRENCY_SIGN).unwrap_or(body);

    let mut normalized = String::with_capacity(body.len() + 1);
    if negative {
        normalized.push('-');
    }
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], Some(&body[at + 1..])),
        None => (body, None),
    };

    let mut seen_digit = false;
    let mut seen_point = false;
    for c in mantissa.chars() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                normalized.push(c);
            }
            '.' if !seen_point => {
                seen_point = true;
                normalized.push(c);
            }
            ',' if seen_digit && !seen_point => {}
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }

    if let Some(exponent) = exponent {
        let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        normalized.push('e');
        normalized.push_str(exponent);
    }

    normalized.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Resolves node values and keys for individual data rows.
pub struct Resolver<'a, G: CellGrid + ?Sized> {
    tree: &'a SchemeTree,
    grid: &'a G,
}

impl<'a, G: CellGrid + ?Sized> Resolver<'a, G> {
    pub fn new(tree: &'a SchemeTree, grid: &'a G) -> Self {
        Self { tree, grid }
    }

    /// The coerced cell under `id` in `row`; a blank cell yields an empty string.
    pub fn value(&self, id: NodeId, row: u32) -> Value {
        let cell = self.grid.cell(row, self.tree.node(id).position.column);
        if cell.is_empty() {
            return Value::String(String::new());
        }
        coerce_cell(cell)
    }

    fn own_cell_text(&self, id: NodeId, row: u32) -> Option<String> {
        let cell = self.grid.cell(row, self.tree.node(id).position.column);
        if cell.is_empty() {
            None
        } else {
            Some(coerce_cell(cell).to_key_text())
        }
    }

    /// The key a key-providing node (`Key` or `Property`) supplies for `row`.
    ///
    /// A static key always wins. Otherwise a `Key` node reads its `Value` child, or its own
    /// cell when it has none, and anything else defers to its key-providing parent.
    pub fn key(&self, id: NodeId, row: u32) -> String {
        let node = self.tree.node(id);
        if !node.kind.is_key_providable() {
            return String::new();
        }
        if !node.key.is_empty() {
            return node.key.clone();
        }

        if node.kind == NodeKind::Key {
            let value_child = self
                .tree
                .children(id)
                .find(|(_, child)| child.kind == NodeKind::Value);
            if let Some((value_id, _)) = value_child {
                return self.value(value_id, row).to_key_text();
            }
            if let Some(text) = self.own_cell_text(id, row) {
                return text;
            }
        }

        if let Some(parent) = self.tree.parent(id) {
            if self.tree.node(parent).kind.is_key_providable() {
                if self.tree.node(parent).key.is_empty() {
                    if let Some(text) = self.own_cell_text(parent, row) {
                        return text;
                    }
                }
                return self.key(parent, row);
            }
        }

        String::new()
    }

    /// The static key, overridden by the row's dynamic key when one resolves.
    pub fn node_key(&self, id: NodeId, row: u32) -> String {
        let node = self.tree.node(id);
        if node.kind.is_key_providable() {
            let dynamic = self.key(id, row);
            if !dynamic.is_empty() {
                return dynamic;
            }
        }
        node.key.clone()
    }
}
