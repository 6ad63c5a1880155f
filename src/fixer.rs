//! Fix pass
//!
//! Same dispatch as the walker, but every finding is repaired and reported
//! with `fixStatus: Fixed`. The fixer takes ownership of the schema or entry
//! and hands back the repaired value; that return value is the only result a
//! caller should keep.
//!
//! Repairs:
//! - references: dangling targets are dropped, an emptied field is removed
//! - global fields: unknown or empty definitions are removed from the schema
//! - extensions: a field pointing at an unknown extension is removed
//! - JSON RTE: nodes embedding unknown entries are pruned
//! - blocks: keys naming no declared block are deleted
//! - selects: invalid values are replaced or dropped, minimums are topped up

use serde_json::{Map, Value};

use crate::checks::{display_value, same_choice, select_values, Checks};
use crate::path::TreePath;
use crate::record::{MissingRef, MissingRefs, Owner};
use crate::schema::{FieldKind, SchemaField};
use crate::walker::{min_instance_message, rte_child_path};

/// A repaired value and the records describing the repairs
#[derive(Debug, Clone)]
pub struct Fixed<T> {
    pub value: T,
    pub records: Vec<MissingRef>,
}

impl<T> Fixed<T> {
    pub fn changed(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Mutating tree walker
#[derive(Debug, Clone, Copy)]
pub struct Fixer<'a> {
    checks: Checks<'a>,
}

impl<'a> Fixer<'a> {
    pub fn new(checks: Checks<'a>) -> Self {
        Self { checks }
    }

    /// Repair a schema definition
    pub fn fix_schema(
        &self,
        owner: &Owner,
        path: &TreePath,
        schema: Vec<SchemaField>,
    ) -> Fixed<Vec<SchemaField>> {
        let mut repair = Repair::new(self.checks, owner);
        let value = repair.fields(path, schema);
        Fixed {
            value,
            records: repair.records,
        }
    }

    /// Repair an entry against its content type schema
    pub fn fix_entry(
        &self,
        owner: &Owner,
        path: &TreePath,
        schema: &[SchemaField],
        entry: Map<String, Value>,
    ) -> Fixed<Map<String, Value>> {
        let mut repair = Repair::new(self.checks, owner);
        let value = repair.object(path, schema, entry);
        Fixed {
            value,
            records: repair.records,
        }
    }
}

struct Repair<'a, 'o> {
    checks: Checks<'a>,
    owner: &'o Owner,
    records: Vec<MissingRef>,
}

impl<'a, 'o> Repair<'a, 'o> {
    fn new(checks: Checks<'a>, owner: &'o Owner) -> Self {
        Self {
            checks,
            owner,
            records: Vec::new(),
        }
    }

    fn report(&mut self, path: &TreePath, field: &SchemaField, missing: MissingRefs, message: Option<String>) {
        let mut record = MissingRef::new(
            self.owner,
            path,
            field.data_type.as_str(),
            field.display_name.as_str(),
            missing,
        )
        .fixed();
        record.fix_message = message;
        self.records.push(record);
    }

    // Schema repairs

    fn fields(&mut self, path: &TreePath, fields: Vec<SchemaField>) -> Vec<SchemaField> {
        fields
            .into_iter()
            .filter_map(|field| self.field(path, field))
            .collect()
    }

    /// `None` removes the field from the rebuilt schema
    fn field(&mut self, path: &TreePath, mut field: SchemaField) -> Option<SchemaField> {
        let here = path.join(&field.uid, &field.display_name);
        let kind = field.kind();
        let handled = self.checks.handles(kind);

        match kind {
            FieldKind::Reference => {
                if handled {
                    let missing = self.checks.missing_content_types(&field);
                    if !missing.is_empty() {
                        if let Some(targets) = field.reference_to.as_mut() {
                            targets.retain(|uid| !missing.iter().any(|m| m == uid));
                        }
                        let emptied = field.reference_to.as_ref().map_or(true, |t| t.is_empty());
                        let message = emptied.then(|| format!("Removed field {}", field.uid));
                        self.report(&here, &field, MissingRefs::List(missing), message);
                        if emptied {
                            return None;
                        }
                    }
                }
            }
            FieldKind::JsonRte => {
                if handled {
                    let missing = self.checks.missing_content_types(&field);
                    if !missing.is_empty() {
                        // Rich text survives without embeddable types
                        if let Some(targets) = field.reference_to.as_mut() {
                            targets.retain(|uid| !missing.iter().any(|m| m == uid));
                        }
                        self.report(&here, &field, MissingRefs::List(missing), None);
                    }
                }
            }
            FieldKind::GlobalField => {
                if handled {
                    if let Some(problem) = self.checks.global_field_problem(&field) {
                        let message = format!("Removed field {}", field.uid);
                        self.report(&here, &field, problem, Some(message));
                        return None;
                    }
                }
                field.schema = field.schema.take().map(|s| self.fields(&here, s));
            }
            FieldKind::Blocks => {
                field.blocks = field.blocks.take().map(|blocks| {
                    blocks
                        .into_iter()
                        .map(|mut block| {
                            let block_path = here.join(&block.uid, &block.title);
                            block.schema = self.fields(&block_path, std::mem::take(&mut block.schema));
                            block
                        })
                        .collect()
                });
            }
            FieldKind::Group => {
                field.schema = field.schema.take().map(|s| self.fields(&here, s));
            }
            FieldKind::Extension | FieldKind::Select | FieldKind::Leaf => {}
        }
        Some(field)
    }

    // Entry repairs

    fn object(&mut self, path: &TreePath, schema: &[SchemaField], mut data: Map<String, Value>) -> Map<String, Value> {
        for field in schema {
            let value = data.remove(&field.uid);
            if let Some(fixed) = self.value(path, field, value) {
                data.insert(field.uid.clone(), fixed);
            }
        }
        data
    }

    /// `None` deletes the field from the entry
    fn value(&mut self, path: &TreePath, field: &SchemaField, value: Option<Value>) -> Option<Value> {
        let here = path.join(&field.uid, &field.display_name);
        let kind = field.kind();
        let handled = self.checks.handles(kind);

        if kind == FieldKind::Select {
            return if handled { self.select(&here, field, value) } else { value };
        }
        let value = value?;

        match kind {
            FieldKind::Reference if handled => self.reference(&here, field, value),
            FieldKind::GlobalField | FieldKind::Group => Some(self.nested(&here, field.nested(), value)),
            FieldKind::Extension if handled => match self.checks.missing_extension(&value) {
                Some(uid) => {
                    let message = format!("Removed field {}", field.uid);
                    self.report(&here, field, MissingRefs::List(vec![uid]), Some(message));
                    None
                }
                None => Some(value),
            },
            FieldKind::JsonRte if handled => self.rte_value(&here, field, value),
            FieldKind::Blocks => Some(self.blocks(&here, field, value, handled)),
            FieldKind::Reference
            | FieldKind::Extension
            | FieldKind::JsonRte
            | FieldKind::Select
            | FieldKind::Leaf => Some(value),
        }
    }

    fn reference(&mut self, here: &TreePath, field: &SchemaField, value: Value) -> Option<Value> {
        let missing = self.checks.missing_entries(&value);
        if missing.is_empty() {
            return Some(value);
        }

        let kept = match value {
            Value::Array(mut items) => {
                items.retain(|item| self.checks.dangling_entry(item).is_none());
                (!items.is_empty()).then_some(Value::Array(items))
            }
            _ => None,
        };
        let message = kept.is_none().then(|| format!("Removed field {}", field.uid));
        self.report(here, field, MissingRefs::List(missing), message);
        kept
    }

    fn nested(&mut self, here: &TreePath, schema: &[SchemaField], value: Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(obj) => Value::Object(self.object(here, schema, obj)),
                        other => other,
                    })
                    .collect(),
            ),
            Value::Object(obj) => Value::Object(self.object(here, schema, obj)),
            other => other,
        }
    }

    fn rte_value(&mut self, here: &TreePath, field: &SchemaField, value: Value) -> Option<Value> {
        match value {
            Value::Array(docs) => {
                let kept: Vec<Value> = docs
                    .into_iter()
                    .filter_map(|mut doc| self.rte_document(here, field, &mut doc).then_some(doc))
                    .collect();
                (!kept.is_empty()).then_some(Value::Array(kept))
            }
            mut doc @ Value::Object(_) => self.rte_document(here, field, &mut doc).then_some(doc),
            other => Some(other),
        }
    }

    /// Prune a document; `false` when pruning left it without children
    fn rte_document(&mut self, here: &TreePath, field: &SchemaField, doc: &mut Value) -> bool {
        let had_children = rte_child_count(doc) > 0;
        let pruned = self.rte_node(here, field, doc);
        !(had_children && pruned && rte_child_count(doc) == 0)
    }

    /// Returns whether anything below `node` was pruned
    fn rte_node(&mut self, here: &TreePath, field: &SchemaField, node: &mut Value) -> bool {
        let Some(Value::Array(children)) = node.get_mut("children") else {
            return false;
        };
        let mut pruned = false;
        let mut kept = Vec::with_capacity(children.len());
        for mut child in std::mem::take(children) {
            let child_path = rte_child_path(here, &child);
            if let Some(uid) = self.checks.dangling_rte_entry(&child) {
                let message = format!("Removed embedded entry {}", uid);
                self.report(&child_path, field, MissingRefs::List(vec![uid]), Some(message));
                pruned = true;
                continue;
            }
            pruned |= self.rte_node(&child_path, field, &mut child);
            kept.push(child);
        }
        *children = kept;
        pruned
    }

    fn blocks(&mut self, here: &TreePath, field: &SchemaField, value: Value, handled: bool) -> Value {
        let Value::Array(mut items) = value else {
            return value;
        };
        let blocks = field.block_list();

        if handled {
            for item in items.iter_mut() {
                let Value::Object(obj) = item else { continue };
                for key in Checks::invalid_block_keys(blocks, obj) {
                    obj.remove(&key);
                    let key_path = here.join(&key, &key);
                    let message = format!("Removed block {}", key);
                    self.report(&key_path, field, MissingRefs::List(vec![key]), Some(message));
                }
            }
        }

        for block in blocks {
            let block_path = here.join(&block.uid, &block.title);
            for item in items.iter_mut() {
                let Value::Object(obj) = item else { continue };
                if let Some(Value::Object(inner)) = obj.get_mut(&block.uid) {
                    let taken = std::mem::take(inner);
                    *inner = self.object(&block_path, &block.schema, taken);
                }
            }
        }
        Value::Array(items)
    }

    fn select(&mut self, here: &TreePath, field: &SchemaField, value: Option<Value>) -> Option<Value> {
        let findings = Checks::select(field, value.as_ref());
        if findings.is_clean() {
            return value;
        }
        let choices: Vec<&Value> = field.choices().iter().map(|c| &c.value).collect();

        if !field.is_multiple() {
            let invalid = findings.invalid.iter().map(display_value).collect::<Vec<_>>();
            return match choices.first() {
                Some(first) => {
                    let message = format!("Replaced '{}' with '{}'", invalid.join(", "), display_value(first));
                    self.report(here, field, MissingRefs::List(invalid), Some(message));
                    Some((*first).clone())
                }
                None => {
                    let message = format!("Removed '{}'", invalid.join(", "));
                    self.report(here, field, MissingRefs::List(invalid), Some(message));
                    None
                }
            };
        }

        let mut kept: Vec<Value> = select_values(value.as_ref())
            .into_iter()
            .filter(|v| choices.iter().any(|c| same_choice(c, v)))
            .cloned()
            .collect();

        if !findings.invalid.is_empty() {
            let invalid = findings.invalid.iter().map(display_value).collect::<Vec<_>>();
            let message = format!("Removed '{}'", invalid.join(", "));
            self.report(here, field, MissingRefs::List(invalid), Some(message));
        }

        if let Some((min, found)) = findings.shortfall {
            for choice in choices {
                if kept.len() as u64 >= min {
                    break;
                }
                if kept.iter().any(|v| same_choice(choice, v)) {
                    continue;
                }
                kept.push(choice.clone());
                let message = format!(
                    "Added '{}' to meet the minimum of {} value(s)",
                    display_value(choice),
                    min
                );
                self.report(here, field, min_instance_message(min, found), Some(message));
            }
        }

        Some(Value::Array(kept))
    }
}

fn rte_child_count(node: &Value) -> usize {
    node.get("children").and_then(Value::as_array).map_or(0, Vec::len)
}
