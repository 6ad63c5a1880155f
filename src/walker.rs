//! Validate pass
//!
//! Walks a schema, optionally together with an entry conforming to it, and
//! reports every dangling reference. Nothing is mutated: the walk only holds
//! shared borrows of the schema and entry.
//!
//! Without an entry the walk is structural (content types, global fields):
//! reference targets and global field definitions are checked, every block and
//! group is descended into. With an entry the walk follows the data: stored
//! references, extension metadata, RTE embeds, block keys and select values
//! are checked, and only containers present in the entry are descended into.

use serde_json::{Map, Value};

use crate::checks::{display_value, Checks};
use crate::path::TreePath;
use crate::record::{MissingRef, MissingRefs, Owner};
use crate::schema::{FieldKind, SchemaField};

/// Read-only tree walker
#[derive(Debug, Clone, Copy)]
pub struct Walker<'a> {
    checks: Checks<'a>,
}

impl<'a> Walker<'a> {
    pub fn new(checks: Checks<'a>) -> Self {
        Self { checks }
    }

    /// Walk a schema definition on its own
    pub fn walk_schema(&self, owner: &Owner, path: &TreePath, schema: &[SchemaField]) -> Vec<MissingRef> {
        let mut visit = Visit::new(self.checks, owner);
        visit.fields(path, schema, None);
        visit.records
    }

    /// Walk an entry against its content type schema
    pub fn walk_entry(
        &self,
        owner: &Owner,
        path: &TreePath,
        schema: &[SchemaField],
        entry: &Map<String, Value>,
    ) -> Vec<MissingRef> {
        let mut visit = Visit::new(self.checks, owner);
        visit.fields(path, schema, Some(entry));
        visit.records
    }
}

struct Visit<'a, 'o> {
    checks: Checks<'a>,
    owner: &'o Owner,
    records: Vec<MissingRef>,
}

impl<'a, 'o> Visit<'a, 'o> {
    fn new(checks: Checks<'a>, owner: &'o Owner) -> Self {
        Self {
            checks,
            owner,
            records: Vec::new(),
        }
    }

    fn report(&mut self, path: &TreePath, field: &SchemaField, missing: MissingRefs) {
        self.records.push(MissingRef::new(
            self.owner,
            path,
            field.data_type.as_str(),
            field.display_name.as_str(),
            missing,
        ));
    }

    fn fields(&mut self, path: &TreePath, fields: &[SchemaField], data: Option<&Map<String, Value>>) {
        for field in fields {
            self.field(path, field, data);
        }
    }

    fn field(&mut self, path: &TreePath, field: &SchemaField, data: Option<&Map<String, Value>>) {
        let here = path.join(&field.uid, &field.display_name);
        let kind = field.kind();
        let handled = self.checks.handles(kind);

        let Some(data) = data else {
            self.structure(&here, field, kind, handled);
            return;
        };
        let Some(value) = data.get(&field.uid) else {
            // Absent values only matter to selects with a minimum
            if kind == FieldKind::Select && handled {
                self.select(&here, field, None);
            }
            return;
        };

        match kind {
            FieldKind::Reference => {
                if handled {
                    let missing = self.checks.missing_entries(value);
                    if !missing.is_empty() {
                        self.report(&here, field, MissingRefs::List(missing));
                    }
                }
            }
            FieldKind::GlobalField | FieldKind::Group => self.nested(&here, field.nested(), value),
            FieldKind::Extension => {
                if handled {
                    if let Some(uid) = self.checks.missing_extension(value) {
                        self.report(&here, field, MissingRefs::List(vec![uid]));
                    }
                }
            }
            FieldKind::JsonRte => {
                if handled {
                    for doc in rte_documents(value) {
                        self.rte(&here, field, doc);
                    }
                }
            }
            FieldKind::Blocks => self.blocks(&here, field, value, handled),
            FieldKind::Select => {
                if handled {
                    self.select(&here, field, Some(value));
                }
            }
            FieldKind::Leaf => {}
        }
    }

    fn structure(&mut self, here: &TreePath, field: &SchemaField, kind: FieldKind, handled: bool) {
        match kind {
            FieldKind::Reference | FieldKind::JsonRte => {
                if handled {
                    let missing = self.checks.missing_content_types(field);
                    if !missing.is_empty() {
                        self.report(here, field, MissingRefs::List(missing));
                    }
                }
            }
            FieldKind::GlobalField => {
                if handled {
                    if let Some(problem) = self.checks.global_field_problem(field) {
                        self.report(here, field, problem);
                    }
                }
                self.fields(here, field.nested(), None);
            }
            FieldKind::Blocks => {
                for block in field.block_list() {
                    self.fields(&here.join(&block.uid, &block.title), &block.schema, None);
                }
            }
            FieldKind::Group => self.fields(here, field.nested(), None),
            // Data-only checks
            FieldKind::Extension | FieldKind::Select | FieldKind::Leaf => {}
        }
    }

    /// Group or global field value: one object, or an array of them
    fn nested(&mut self, here: &TreePath, schema: &[SchemaField], value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(obj) = item {
                        self.fields(here, schema, Some(obj));
                    }
                }
            }
            Value::Object(obj) => self.fields(here, schema, Some(obj)),
            _ => {}
        }
    }

    fn rte(&mut self, here: &TreePath, field: &SchemaField, node: &Value) {
        let Some(children) = node.get("children").and_then(Value::as_array) else {
            return;
        };
        for child in children {
            let child_path = rte_child_path(here, child);
            if let Some(uid) = self.checks.dangling_rte_entry(child) {
                self.report(&child_path, field, MissingRefs::List(vec![uid]));
            }
            self.rte(&child_path, field, child);
        }
    }

    fn blocks(&mut self, here: &TreePath, field: &SchemaField, value: &Value, handled: bool) {
        let Some(items) = value.as_array() else { return };
        let blocks = field.block_list();

        if handled {
            for item in items.iter().filter_map(Value::as_object) {
                for key in Checks::invalid_block_keys(blocks, item) {
                    let key_path = here.join(&key, &key);
                    self.report(&key_path, field, MissingRefs::List(vec![key]));
                }
            }
        }

        for block in blocks {
            let block_path = here.join(&block.uid, &block.title);
            for item in items {
                if let Some(Value::Object(inner)) = item.get(&block.uid) {
                    self.fields(&block_path, &block.schema, Some(inner));
                }
            }
        }
    }

    fn select(&mut self, here: &TreePath, field: &SchemaField, value: Option<&Value>) {
        let findings = Checks::select(field, value);
        if !findings.invalid.is_empty() {
            let invalid = findings.invalid.iter().map(display_value).collect();
            self.report(here, field, MissingRefs::List(invalid));
        }
        if let Some((min, found)) = findings.shortfall {
            self.report(here, field, min_instance_message(min, found));
        }
    }
}

/// Documents of a rich text value (multiple RTE fields store an array)
pub(crate) fn rte_documents(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(docs) => docs.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

/// Path of an RTE child: a synthetic `children` crumb, then the child's uid
pub(crate) fn rte_child_path(here: &TreePath, child: &Value) -> TreePath {
    let uid = child.get("uid").and_then(Value::as_str).unwrap_or_default();
    here.join("children", "children").join(uid, uid)
}

pub(crate) fn min_instance_message(min: u64, found: usize) -> MissingRefs {
    MissingRefs::Message(format!("Required minimum of {} value(s), found {}", min, found))
}
