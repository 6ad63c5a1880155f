//! Per-field-kind checks
//!
//! Pure functions answering "what is dangling here?" for one field occurrence.
//! The walker turns their answers into records; the fixer turns them into
//! records plus a repaired value. Neither pass decides validity on its own, so
//! a value the fixer leaves behind always passes the walker.

use serde_json::{Map, Value};

use crate::index::ReferenceIndex;
use crate::record::{MissingRefs, EMPTY_SCHEMA, MISSING_GLOBAL_FIELD};
use crate::schema::{Block, FieldKind, SchemaField};

/// Attribute of a JSON RTE node that embeds an entry
pub const RTE_ENTRY_UID: &str = "entry-uid";

/// Which field kinds a module inspects.
///
/// Container kinds (global fields, groups, blocks) are always traversed; a
/// disabled flag only turns off the check performed at that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHandlers {
    pub reference: bool,
    pub global_field: bool,
    pub extension: bool,
    pub json_rte: bool,
    pub blocks: bool,
    pub select: bool,
}

impl FieldHandlers {
    pub const ALL: Self = Self {
        reference: true,
        global_field: true,
        extension: true,
        json_rte: true,
        blocks: true,
        select: true,
    };

    pub const NONE: Self = Self {
        reference: false,
        global_field: false,
        extension: false,
        json_rte: false,
        blocks: false,
        select: false,
    };

    pub fn handles(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Reference => self.reference,
            FieldKind::GlobalField => self.global_field,
            FieldKind::Extension => self.extension,
            FieldKind::JsonRte => self.json_rte,
            FieldKind::Blocks => self.blocks,
            FieldKind::Select => self.select,
            FieldKind::Group | FieldKind::Leaf => false,
        }
    }
}

impl Default for FieldHandlers {
    fn default() -> Self {
        Self::ALL
    }
}

/// Problems found on a select field value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectFindings {
    /// Stored values that are not among the choices
    pub invalid: Vec<Value>,
    /// `(min_instance, valid count)` when more values are required and
    /// unused choices exist to provide them
    pub shortfall: Option<(u64, usize)>,
}

impl SelectFindings {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.shortfall.is_none()
    }
}

/// The check table, bound to one reference index
#[derive(Debug, Clone, Copy)]
pub struct Checks<'a> {
    pub index: &'a ReferenceIndex,
    pub handlers: FieldHandlers,
    pub skip_refs: &'a [String],
}

impl<'a> Checks<'a> {
    pub fn new(index: &'a ReferenceIndex, handlers: FieldHandlers, skip_refs: &'a [String]) -> Self {
        Self {
            index,
            handlers,
            skip_refs,
        }
    }

    pub fn handles(&self, kind: FieldKind) -> bool {
        self.handlers.handles(kind)
    }

    fn skipped(&self, uid: &str) -> bool {
        self.skip_refs.iter().any(|s| s == uid)
    }

    /// `reference_to` targets that are not known content types
    pub fn missing_content_types(&self, field: &SchemaField) -> Vec<String> {
        field
            .reference_uids()
            .into_iter()
            .filter(|uid| !self.skipped(uid) && !self.index.has_content_type(uid))
            .map(str::to_string)
            .collect()
    }

    /// Unknown global field, or one with nothing inside
    pub fn global_field_problem(&self, field: &SchemaField) -> Option<MissingRefs> {
        let exists = field
            .reference_uids()
            .first()
            .is_some_and(|uid| self.index.has_global_field(uid));
        if !exists {
            Some(MissingRefs::Message(MISSING_GLOBAL_FIELD.to_string()))
        } else if field.nested().is_empty() {
            Some(MissingRefs::Message(EMPTY_SCHEMA.to_string()))
        } else {
            None
        }
    }

    /// Uid of a stored reference if it points at no exported entry
    pub fn dangling_entry(&self, item: &Value) -> Option<String> {
        let (uid, content_type) = match item {
            Value::String(uid) => (uid.as_str(), None),
            Value::Object(obj) => (
                obj.get("uid")?.as_str()?,
                obj.get("_content_type_uid").and_then(Value::as_str),
            ),
            _ => return None,
        };
        if content_type.is_some_and(|ct| self.skipped(ct)) || self.index.has_entry(uid) {
            None
        } else {
            Some(uid.to_string())
        }
    }

    /// Dangling uids of a reference field value (array or single reference)
    pub fn missing_entries(&self, value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.iter().filter_map(|i| self.dangling_entry(i)).collect(),
            other => self.dangling_entry(other).into_iter().collect(),
        }
    }

    /// Extension uid stored in an extension field's metadata, if unknown
    pub fn missing_extension(&self, value: &Value) -> Option<String> {
        let uid = value.get("metadata")?.get("extension_uid")?.as_str()?;
        (!self.index.has_extension(uid)).then(|| uid.to_string())
    }

    /// Entry uid embedded in an RTE node, if it points at no exported entry
    pub fn dangling_rte_entry(&self, node: &Value) -> Option<String> {
        let uid = node.get("attrs")?.get(RTE_ENTRY_UID)?.as_str()?;
        (!self.index.has_entry(uid)).then(|| uid.to_string())
    }

    /// Keys of a modular block item that name no declared block
    pub fn invalid_block_keys(blocks: &[Block], item: &Map<String, Value>) -> Vec<String> {
        item.keys()
            .filter(|key| !blocks.iter().any(|b| &b.uid == *key))
            .cloned()
            .collect()
    }

    /// Validate a select value against the field's choices
    pub fn select(field: &SchemaField, value: Option<&Value>) -> SelectFindings {
        let choices: Vec<&Value> = field.choices().iter().map(|c| &c.value).collect();
        let mut findings = SelectFindings::default();

        if field.is_multiple() {
            let stored = select_values(value);
            let (valid, invalid): (Vec<&Value>, Vec<&Value>) = stored
                .into_iter()
                .partition(|v| choices.iter().any(|c| same_choice(c, v)));
            findings.invalid = invalid.into_iter().cloned().collect();

            let min = field.min_instance.unwrap_or(0);
            let unused = choices
                .iter()
                .filter(|c| !valid.iter().any(|v| same_choice(c, v)))
                .count();
            if (valid.len() as u64) < min && unused > 0 {
                findings.shortfall = Some((min, valid.len()));
            }
        } else if let Some(v) = value.filter(|v| !is_blank(v)) {
            if !choices.iter().any(|c| same_choice(c, v)) {
                findings.invalid.push(v.clone());
            }
        }
        findings
    }
}

/// Stored values of a multiple select, tolerating a scalar
pub fn select_values(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Choice equality; numbers exported as strings still match
pub fn same_choice(choice: &Value, value: &Value) -> bool {
    choice == value || display_value(choice) == display_value(value)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Human-readable form of a JSON scalar
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
