use crate::config::{ConvertOptions, OutputFormat, YamlStyle};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt::{self, Write};

/// An ordered object. Re-inserting a key replaces the value but keeps the original slot.
pub type Object = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// A generated document node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn object() -> Self {
        Value::Object(Object::new())
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Scalars are present when non-null and, for strings, non-empty.
    /// Containers are present when they hold at least one entry.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Bool(_) | Value::Number(_) => true,
            Value::Array(items) => !items.is_empty(),
            Value::Object(entries) => !entries.is_empty(),
        }
    }

    /// Text form used when a scalar becomes an object key.
    pub fn to_key_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self.to_json_compact(),
        }
    }

    /// Removes absent scalars and containers left empty, bottom-up.
    ///
    /// Returns whether `self` is still present afterwards. A root that is not present
    /// is emptied in place.
    pub fn prune(&mut self) -> bool {
        let present = prune_node(self);
        if !present {
            match self {
                Value::Object(entries) => entries.clear(),
                Value::Array(items) => items.clear(),
                _ => *self = Value::Null,
            }
        }
        present
    }

    pub fn to_json_compact(&self) -> String {
        let mut out = String::new();
        write_compact(self, &mut out);
        out
    }

    /// Two-space indented JSON.
    pub fn to_json_pretty(&self) -> String {
        pretty_print(&self.to_json_compact())
    }

    pub fn to_yaml(&self, style: YamlStyle, indent: usize, force_quotes: bool) -> String {
        YamlWriter {
            style,
            indent: indent.max(1),
            force_quotes,
        }
        .write(self)
    }

    /// Renders according to `options.format` and the YAML settings.
    pub fn render(&self, options: &ConvertOptions) -> String {
        match options.format {
            OutputFormat::Json => self.to_json_pretty(),
            OutputFormat::Yaml => self.to_yaml(
                options.yaml_style,
                options.yaml_indent,
                options.yaml_force_quotes,
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::Float(x))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Float(x)) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

fn prune_node(value: &mut Value) -> bool {
    match value {
        Value::Object(entries) => {
            entries.retain(|_, v| prune_node(v));
            !entries.is_empty()
        }
        Value::Array(items) => {
            items.retain_mut(prune_node);
            !items.is_empty()
        }
        scalar => scalar.is_present(),
    }
}

// --- JSON ---

fn write_compact(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(Number::Float(x)) if !x.is_finite() => out.push_str("null"),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => {
            out.push('"');
            escape_json_into(s, out);
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_compact(item, out);
            }
            out.push(']');
        }
        Value::Object(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('"');
                escape_json_into(k, out);
                out.push_str("\":");
                write_compact(v, out);
            }
            out.push('}');
        }
    }
}

/// Escapes quotes, backslashes and control characters. Everything else is kept verbatim.
fn escape_json_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Re-indents compact JSON text: a line break after `{`, `[` and `,`, two spaces per level.
/// String contents are copied untouched.
pub fn pretty_print(json: &str) -> String {
    let mut out = String::with_capacity(json.len() * 2);
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = json.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                let close = if c == '{' { '}' } else { ']' };
                // Empty containers stay on one line.
                if chars.peek() == Some(&close) {
                    chars.next();
                    out.push(c);
                    out.push(close);
                    continue;
                }
                out.push(c);
                depth += 1;
                newline(&mut out, depth);
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                newline(&mut out, depth);
                out.push(c);
            }
            ',' => {
                out.push(c);
                newline(&mut out, depth);
            }
            ':' => out.push_str(": "),
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out
}

fn newline(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str("  ");
    }
}

// --- YAML ---

struct YamlWriter {
    style: YamlStyle,
    indent: usize,
    force_quotes: bool,
}

impl YamlWriter {
    fn write(&self, value: &Value) -> String {
        let mut out = String::new();
        match (self.style, value) {
            (YamlStyle::Block, Value::Object(entries)) if !entries.is_empty() => {
                self.block_object(entries, 0, false, &mut out)
            }
            (YamlStyle::Block, Value::Array(items)) if !items.is_empty() => {
                self.block_array(items, 0, false, &mut out)
            }
            _ => {
                self.flow(value, &mut out);
                out.push('\n');
            }
        }
        out
    }

    /// Writes `entries` at `column`. With `continued`, the first key goes on the current
    /// line (right after a `- `).
    fn block_object(&self, entries: &Object, column: usize, continued: bool, out: &mut String) {
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 || !continued {
                pad(out, column);
            }
            self.key(key, out);
            out.push(':');
            self.block_entry(value, column + self.indent, out);
        }
    }

    fn block_array(&self, items: &[Value], column: usize, continued: bool, out: &mut String) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 || !continued {
                pad(out, column);
            }
            out.push_str("- ");
            match item {
                Value::Object(entries) if !entries.is_empty() => {
                    self.block_object(entries, column + 2, true, out)
                }
                Value::Array(nested) if !nested.is_empty() => {
                    self.block_array(nested, column + 2, true, out)
                }
                _ => {
                    self.flow(item, out);
                    out.push('\n');
                }
            }
        }
    }

    /// The value half of `key:` in block style; nested containers start on the next line.
    fn block_entry(&self, value: &Value, column: usize, out: &mut String) {
        match value {
            Value::Object(entries) if !entries.is_empty() => {
                out.push('\n');
                self.block_object(entries, column, false, out);
            }
            Value::Array(items) if !items.is_empty() => {
                out.push('\n');
                self.block_array(items, column, false, out);
            }
            _ => {
                out.push(' ');
                self.flow(value, out);
                out.push('\n');
            }
        }
    }

    fn flow(&self, value: &Value, out: &mut String) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(Number::Float(x)) if x.is_nan() => out.push_str(".nan"),
            Value::Number(Number::Float(x)) if x.is_infinite() => {
                out.push_str(if *x > 0.0 { ".inf" } else { "-.inf" })
            }
            Value::Number(n) => {
                let _ = write!(out, "{n}");
            }
            Value::String(s) => self.scalar(s, out),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.flow(item, out);
                }
                out.push(']');
            }
            Value::Object(entries) => {
                out.push('{');
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.key(k, out);
                    out.push_str(": ");
                    self.flow(v, out);
                }
                out.push('}');
            }
        }
    }

    fn scalar(&self, s: &str, out: &mut String) {
        if self.force_quotes || needs_quotes(s) {
            quote_into(s, out);
        } else {
            out.push_str(s);
        }
    }

    fn key(&self, key: &str, out: &mut String) {
        if needs_quotes(key) {
            quote_into(key, out);
        } else {
            out.push_str(key);
        }
    }
}

fn pad(out: &mut String, column: usize) {
    out.extend(std::iter::repeat(' ').take(column));
}

const RESERVED_WORDS: &[&str] = &[
    "true", "false", "null", "~", "yes", "no", "on", "off", "y", "n", ".inf", "-.inf", "+.inf",
    ".nan",
];

/// Whether a plain YAML scalar would be misread or break the surrounding syntax.
fn needs_quotes(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return true;
    };
    if s.starts_with(' ') || s.ends_with(' ') {
        return true;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }
    if first.is_ascii_digit() {
        return true;
    }
    if s.chars().any(|c| {
        matches!(c, ':' | '#' | ',' | '[' | ']' | '{' | '}' | '"' | '\'')
            || c.is_control()
            || needs_escape(c)
    }) {
        return true;
    }
    let lower = s.to_ascii_lowercase();
    RESERVED_WORDS.contains(&lower.as_str()) || s.parse::<f64>().is_ok()
}

/// Characters a YAML reader rejects in a document, plus the Unicode line breaks and the
/// byte order mark, which would change the scalar if written raw.
fn needs_escape(c: char) -> bool {
    let printable = matches!(
        c,
        '\t' | '\n' | '\r'
            | '\u{20}'..='\u{7E}'
            | '\u{A0}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    );
    !printable || matches!(c, '\u{2028}' | '\u{2029}' | '\u{FEFF}')
}

fn quote_into(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || needs_escape(c) => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
