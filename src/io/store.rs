//! JSON file access

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::OutputFormat;
use crate::error::{AuditError, Result};

/// Read and deserialize a required JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| AuditError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read an auxiliary JSON file.
///
/// A missing file is logged at info, a malformed one at debug; both yield
/// `None` so the caller can degrade to an empty lookup.
pub fn read_optional(path: &Path) -> Option<Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            info!("{} not found, skipping", path.display());
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Ignoring malformed {}: {}", path.display(), e);
            None
        }
    }
}

/// Serialize `value` to `path`, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| AuditError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| AuditError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// An exported collection, stored either as a uid-keyed map or as an array.
///
/// Written back in the shape it was read in.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    keyed: bool,
    items: Vec<(String, T)>,
}

impl<T> Collection<T> {
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|(_, item)| item)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut().map(|(_, item)| item)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.items.retain(|(_, item)| keep(item));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: DeserializeOwned + Serialize> Collection<T> {
    pub fn from_value(value: Value, path: &Path) -> Result<Self> {
        let parse = |v: Value| {
            serde_json::from_value::<T>(v).map_err(|source| AuditError::Parse {
                path: path.to_path_buf(),
                source,
            })
        };
        match value {
            Value::Object(map) => {
                let items = map
                    .into_iter()
                    .map(|(key, v)| Ok((key, parse(v)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self { keyed: true, items })
            }
            Value::Array(list) => {
                let items = list
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| Ok((i.to_string(), parse(v)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self { keyed: false, items })
            }
            _ => Ok(Self { keyed: false, items: Vec::new() }),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let value: Value = read_json(path)?;
        Self::from_value(value, path)
    }

    pub fn to_value(&self) -> Result<Value> {
        if self.keyed {
            let mut map = Map::new();
            for (key, item) in &self.items {
                map.insert(key.clone(), serde_json::to_value(item)?);
            }
            Ok(Value::Object(map))
        } else {
            let list = self
                .items
                .iter()
                .map(|(_, item)| serde_json::to_value(item))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Value::Array(list))
        }
    }

    pub fn save(&self, path: &Path, format: OutputFormat) -> Result<()> {
        write_json(path, &self.to_value()?, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_keeps_shape() {
        let path = Path::new("workflows.json");
        let keyed: Collection<Value> =
            Collection::from_value(json!({"a": {"uid": "a"}, "b": {"uid": "b"}}), path).unwrap();
        assert_eq!(keyed.len(), 2);
        assert!(keyed.to_value().unwrap().is_object());

        let mut listed: Collection<Value> =
            Collection::from_value(json!([{"uid": "a"}, {"uid": "b"}]), path).unwrap();
        listed.retain(|v| v["uid"] == "b");
        assert_eq!(listed.to_value().unwrap(), json!([{"uid": "b"}]));
    }

    #[test]
    fn test_save_keeps_export_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.json");
        fs::write(&path, r#"{"zeta": {"uid": "zeta", "name": "Z"}, "alpha": {"uid": "alpha", "name": "A"}}"#).unwrap();

        let collection: Collection<Value> = Collection::load(&path).unwrap();
        collection.save(&path, OutputFormat::Compact).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            r#"{"zeta":{"uid":"zeta","name":"Z"},"alpha":{"uid":"alpha","name":"A"}}"#
        );
    }

    #[test]
    fn test_read_optional_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(read_optional(&missing).is_none());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(read_optional(&broken).is_none());
    }
}
