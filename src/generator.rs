//! Walks a parsed schema against the data rows of a sheet and assembles the document.

use crate::ast::{NodeId, NodeKind, SchemeTree};
use crate::config::Context;
use crate::error::GenerationError;
use crate::grid::CellGrid;
use crate::resolver::Resolver;
use crate::serialization::{Object, Value};
use std::ops::RangeInclusive;

/// Where a root child's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Stored under its resolved key.
    Nest(String),
    /// Anonymous: its entries are merged into the enclosing object.
    Splice,
}

impl Placement {
    pub fn for_key(key: String) -> Self {
        if key.is_empty() {
            Placement::Splice
        } else {
            Placement::Nest(key)
        }
    }
}

pub struct Generator<'a, G: CellGrid + ?Sized> {
    tree: &'a SchemeTree,
    resolver: Resolver<'a, G>,
    ctx: &'a Context<'a>,
}

impl<'a, G: CellGrid + ?Sized> Generator<'a, G> {
    pub fn new(tree: &'a SchemeTree, grid: &'a G, ctx: &'a Context<'a>) -> Self {
        Self {
            tree,
            resolver: Resolver::new(tree, grid),
            ctx,
        }
    }

    /// Builds and prunes the document for `rows`.
    pub fn generate(&self, rows: RangeInclusive<u32>) -> Result<Value, GenerationError> {
        let root = self.tree.root_node();
        let mut document = match root.kind {
            NodeKind::Map => Value::Object(self.map_root(rows)),
            NodeKind::Array => Value::Array(self.array_root(rows)),
            kind => {
                return Err(GenerationError::UnsupportedRoot {
                    kind,
                    position: root.position,
                })
            }
        };

        if !document.prune() {
            event!(self.ctx, Debug, "document is empty after pruning");
        }
        event!(self.ctx, Info, "generated {} root", root.kind);
        Ok(document)
    }

    // === Roots ===

    /// One object accumulated over every row. The first row to fill a key keeps it.
    fn map_root(&self, rows: RangeInclusive<u32>) -> Object {
        let root = self.tree.root();
        let mut document = Object::new();
        for row in rows {
            for (child, node) in self.tree.children(root) {
                match Placement::for_key(self.resolver.node_key(child, row)) {
                    Placement::Nest(key) => {
                        if document.contains_key(&key) {
                            continue;
                        }
                        if let Some(value) = self.child_value(child, row) {
                            event!(self.ctx, Trace, "row {}: `{}` set", row, key);
                            document.insert(key, value);
                        }
                    }
                    Placement::Splice => {
                        if node.kind == NodeKind::Property {
                            continue;
                        }
                        for (key, value) in self.spliced_entries(child, row) {
                            document.entry(key).or_insert(value);
                        }
                    }
                }
            }
        }
        document
    }

    /// One object per row; rows that produce nothing are dropped.
    fn array_root(&self, rows: RangeInclusive<u32>) -> Vec<Value> {
        let root = self.tree.root();
        let mut items = Vec::new();
        for row in rows {
            let mut entry = Object::new();
            for (child, node) in self.tree.children(root) {
                match Placement::for_key(self.resolver.node_key(child, row)) {
                    Placement::Nest(key) => {
                        if let Some(value) = self.child_value(child, row) {
                            entry.insert(key, value);
                        }
                    }
                    Placement::Splice if node.kind == NodeKind::Property => {
                        let value = self.resolver.value(child, row);
                        if value.is_present() {
                            entry.insert("value".to_string(), value);
                        }
                    }
                    Placement::Splice => entry.extend(self.spliced_entries(child, row)),
                }
            }

            event!(self.ctx, Debug, "row {}: {} entries", row, entry.len());
            if !entry.is_empty() {
                items.push(Value::Object(entry));
            }
        }
        items
    }

    // === Containers ===

    /// The value a keyed child contributes for `row`, if any.
    fn child_value(&self, id: NodeId, row: u32) -> Option<Value> {
        match self.tree.node(id).kind {
            NodeKind::Property => {
                let value = self.resolver.value(id, row);
                value.is_present().then_some(value)
            }
            NodeKind::Map => {
                let entries = self.map_entries(id, row);
                (!entries.is_empty()).then_some(Value::Object(entries))
            }
            NodeKind::Array => {
                let items = self.array_items(id, row);
                (!items.is_empty()).then_some(Value::Array(items))
            }
            NodeKind::Key | NodeKind::Value | NodeKind::Ignore => None,
        }
    }

    /// Entries an anonymous container merges into its parent: a map's own entries, or
    /// the entries of an array's first element when that element is an object.
    fn spliced_entries(&self, id: NodeId, row: u32) -> Object {
        match self.tree.node(id).kind {
            NodeKind::Map => self.map_entries(id, row),
            NodeKind::Array => match self.array_items(id, row).into_iter().next() {
                Some(Value::Object(first)) => first,
                _ => Object::new(),
            },
            _ => Object::new(),
        }
    }

    fn map_entries(&self, id: NodeId, row: u32) -> Object {
        let mut entries = Object::new();
        for (child, _) in self.tree.children(id) {
            let key = self.resolver.node_key(child, row);
            if key.is_empty() {
                continue;
            }
            if let Some(value) = self.child_value(child, row) {
                entries.insert(key, value);
            }
        }
        entries
    }

    fn array_items(&self, id: NodeId, row: u32) -> Vec<Value> {
        let node = self.tree.node(id);
        let mut items = Vec::new();

        if node.children.is_empty() {
            let key = self.resolver.node_key(id, row);
            let value = self.resolver.value(id, row);
            if !key.is_empty() && value.is_present() {
                items.push(Value::Object(Object::from([(key, value)])));
            }
            return items;
        }

        for (child, child_node) in self.tree.children(id) {
            match child_node.kind {
                NodeKind::Property => {
                    let value = self.resolver.value(child, row);
                    if !value.is_present() {
                        continue;
                    }
                    let key = self.resolver.node_key(child, row);
                    if key.is_empty() {
                        items.push(value);
                    } else {
                        items.push(Value::Object(Object::from([(key, value)])));
                    }
                }
                NodeKind::Map => {
                    let entries = self.map_entries(child, row);
                    if !entries.is_empty() {
                        items.push(Value::Object(entries));
                    }
                }
                NodeKind::Array => items.extend(self.array_items(child, row)),
                NodeKind::Key | NodeKind::Value | NodeKind::Ignore => {}
            }
        }
        items
    }
}
