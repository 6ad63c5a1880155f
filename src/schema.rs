//! Schema types and structures
//!
//! Content types and global fields share one shape: a uid, a title and an
//! ordered `schema` array of field definitions. Fields are kept close to the
//! exported JSON so that a fixed schema can be written back without losing
//! attributes the auditor does not interpret (`extra`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw `data_type` discriminator of a field definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    Reference,
    GlobalField,
    Json,
    Blocks,
    Group,
    Text,
    Number,
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Reference => "reference",
            DataType::GlobalField => "global_field",
            DataType::Json => "json",
            DataType::Blocks => "blocks",
            DataType::Group => "group",
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Other(other) => other,
        }
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "reference" => DataType::Reference,
            "global_field" => DataType::GlobalField,
            "json" => DataType::Json,
            "blocks" => DataType::Blocks,
            "group" => DataType::Group,
            "text" => DataType::Text,
            "number" => DataType::Number,
            _ => DataType::Other(value),
        }
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

/// What the auditor does with a field, derived from `data_type` and its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Reference to other content types / entries
    Reference,
    /// Embedded global field with its own nested schema
    GlobalField,
    /// JSON field backed by a custom extension or marketplace app
    Extension,
    /// JSON rich text document
    JsonRte,
    /// Modular blocks
    Blocks,
    /// Group (possibly repeatable)
    Group,
    /// Dropdown / checkbox / radio select on text or number
    Select,
    /// Nothing to validate
    Leaf,
}

impl FieldKind {
    /// Label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Reference => "reference",
            FieldKind::GlobalField => "global_field",
            FieldKind::Extension => "json-extension",
            FieldKind::JsonRte => "json-rte",
            FieldKind::Blocks => "blocks",
            FieldKind::Group => "group",
            FieldKind::Select => "select",
            FieldKind::Leaf => "leaf",
        }
    }
}

/// `reference_to` is either a single uid or a list of uids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefTargets {
    One(String),
    Many(Vec<String>),
}

impl RefTargets {
    pub fn uids(&self) -> Vec<&str> {
        match self {
            RefTargets::One(uid) => vec![uid.as_str()],
            RefTargets::Many(uids) => uids.iter().map(String::as_str).collect(),
        }
    }

    /// Keep only uids accepted by `keep`, preserving the original shape
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        match self {
            RefTargets::One(uid) => {
                if !keep(uid) {
                    *self = RefTargets::Many(Vec::new());
                }
            }
            RefTargets::Many(uids) => uids.retain(|uid| keep(uid)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RefTargets::One(uid) => uid.is_empty(),
            RefTargets::Many(uids) => uids.is_empty(),
        }
    }
}

/// Flags stored under `field_metadata`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_json_rte: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_multiple: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One selectable option of a select field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `enum` payload of a select field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectEnum {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named shape inside a modular blocks field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub schema: Vec<SchemaField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_to: Option<RefTargets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<SchemaField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectEnum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instance: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_metadata: Option<FieldMetadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SchemaField {
    /// Classify the field for dispatch
    pub fn kind(&self) -> FieldKind {
        let meta = self.field_metadata.as_ref();
        match self.data_type {
            DataType::Reference => FieldKind::Reference,
            DataType::GlobalField => FieldKind::GlobalField,
            DataType::Json if meta.and_then(|m| m.extension).unwrap_or(false) => FieldKind::Extension,
            DataType::Json if meta.and_then(|m| m.allow_json_rte).unwrap_or(false) => FieldKind::JsonRte,
            DataType::Blocks => FieldKind::Blocks,
            DataType::Group => FieldKind::Group,
            DataType::Text | DataType::Number if self.display_type.is_some() => FieldKind::Select,
            DataType::Json
            | DataType::Text
            | DataType::Number
            | DataType::Other(_) => FieldKind::Leaf,
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple.unwrap_or(false)
    }

    pub fn reference_uids(&self) -> Vec<&str> {
        self.reference_to.as_ref().map(RefTargets::uids).unwrap_or_default()
    }

    pub fn nested(&self) -> &[SchemaField] {
        self.schema.as_deref().unwrap_or(&[])
    }

    pub fn block_list(&self) -> &[Block] {
        self.blocks.as_deref().unwrap_or(&[])
    }

    pub fn choices(&self) -> &[Choice] {
        self.select.as_ref().map(|s| s.choices.as_slice()).unwrap_or(&[])
    }
}

/// A condition of a field rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub operand_field: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An action of a field rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    pub target_field: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Conditional show/hide rule attached to a content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A content type or global field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub schema: Vec<SchemaField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_rules: Option<Vec<FieldRule>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
