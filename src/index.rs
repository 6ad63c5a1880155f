//! Reference index
//!
//! Lookup sets built once per run from the exported tree and then only read:
//! content type uids, global field uids, locale codes, environment uids,
//! extension uids (custom extensions and marketplace app locations) and entry
//! metadata. Missing or malformed auxiliary files leave their set empty.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::Result;
use crate::io::chunk::INDEX_FILE;
use crate::io::{read_optional, ChunkSource, FsChunkReader};

/// Relative locations of the exported files
pub mod paths {
    pub const CONTENT_TYPES: &str = "content_types/schema.json";
    pub const GLOBAL_FIELDS: &str = "global_fields/globalfields.json";
    pub const ENTRIES: &str = "entries";
    pub const LOCALES: &str = "locales/locales.json";
    pub const MASTER_LOCALE: &str = "locales/master-locale.json";
    pub const ENVIRONMENTS: &str = "environments/environments.json";
    pub const EXTENSIONS: &str = "extensions/extensions.json";
    pub const MARKETPLACE_APPS: &str = "marketplace_apps/marketplace_apps.json";
    pub const CUSTOM_ROLES: &str = "custom-roles/custom-roles.json";
    pub const WORKFLOWS: &str = "workflows/workflows.json";
    pub const ASSETS: &str = "assets/assets.json";
    pub const COMPOSABLE_STUDIO: &str = "composable_studio/composable_studio.json";
    pub const VARIANTS_DIR: &str = "variants";
}

/// Identity of an exported entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub uid: String,
    pub title: String,
    pub content_type_uid: String,
    pub locale: String,
}

/// Read-only lookup sets for existence checks
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    content_types: BTreeSet<String>,
    global_fields: BTreeSet<String>,
    locales: BTreeSet<String>,
    master_locale: Option<String>,
    environments: BTreeSet<String>,
    extensions: BTreeSet<String>,
    entries: BTreeMap<String, Vec<EntryMeta>>,
}

impl ReferenceIndex {
    pub fn has_content_type(&self, uid: &str) -> bool {
        self.content_types.contains(uid)
    }

    pub fn has_global_field(&self, uid: &str) -> bool {
        self.global_fields.contains(uid)
    }

    pub fn has_locale(&self, code: &str) -> bool {
        self.locales.contains(code)
    }

    pub fn has_environment(&self, uid: &str) -> bool {
        self.environments.contains(uid)
    }

    pub fn has_extension(&self, uid: &str) -> bool {
        self.extensions.contains(uid)
    }

    pub fn has_entry(&self, uid: &str) -> bool {
        self.entries.contains_key(uid)
    }

    /// Every exported locale variant of an entry
    pub fn entry(&self, uid: &str) -> &[EntryMeta] {
        self.entries.get(uid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn content_type_count(&self) -> usize {
        self.content_types.len()
    }

    /// Locale codes, master locale first
    pub fn locale_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::with_capacity(self.locales.len());
        if let Some(master) = &self.master_locale {
            codes.push(master);
        }
        codes.extend(
            self.locales
                .iter()
                .map(String::as_str)
                .filter(|c| Some(*c) != self.master_locale.as_deref()),
        );
        codes
    }

    // In-memory construction

    pub fn with_content_types<I: IntoIterator<Item = S>, S: Into<String>>(mut self, uids: I) -> Self {
        self.content_types.extend(uids.into_iter().map(Into::into));
        self
    }

    pub fn with_global_fields<I: IntoIterator<Item = S>, S: Into<String>>(mut self, uids: I) -> Self {
        self.global_fields.extend(uids.into_iter().map(Into::into));
        self
    }

    pub fn with_locales<I: IntoIterator<Item = S>, S: Into<String>>(mut self, codes: I) -> Self {
        self.locales.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn with_master_locale(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.locales.insert(code.clone());
        self.master_locale = Some(code);
        self
    }

    pub fn with_environments<I: IntoIterator<Item = S>, S: Into<String>>(mut self, uids: I) -> Self {
        self.environments.extend(uids.into_iter().map(Into::into));
        self
    }

    pub fn with_extensions<I: IntoIterator<Item = S>, S: Into<String>>(mut self, uids: I) -> Self {
        self.extensions.extend(uids.into_iter().map(Into::into));
        self
    }

    pub fn with_entry(mut self, meta: EntryMeta) -> Self {
        self.add_entry(meta);
        self
    }

    fn add_entry(&mut self, meta: EntryMeta) {
        self.entries.entry(meta.uid.clone()).or_default().push(meta);
    }
}

/// Builds a [`ReferenceIndex`] from an exported tree
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    base: PathBuf,
    with_entries: bool,
}

impl IndexBuilder {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            with_entries: false,
        }
    }

    /// Also scan entry collections for entry metadata
    pub fn with_entries(mut self, with_entries: bool) -> Self {
        self.with_entries = with_entries;
        self
    }

    pub fn build(&self) -> Result<ReferenceIndex> {
        let mut index = ReferenceIndex {
            content_types: self.uids_of(paths::CONTENT_TYPES),
            global_fields: self.uids_of(paths::GLOBAL_FIELDS),
            environments: self.uids_of(paths::ENVIRONMENTS),
            ..Default::default()
        };

        index.locales = self.locale_codes(paths::LOCALES);
        let master = self.locale_codes(paths::MASTER_LOCALE);
        index.master_locale = master.iter().next().cloned();
        index.locales.extend(master);

        index.extensions = self.uids_of(paths::EXTENSIONS);
        if let Some(apps) = read_optional(&self.base.join(paths::MARKETPLACE_APPS)) {
            collect_key(&apps, "extension_uid", &mut index.extensions);
        }

        if self.with_entries {
            self.scan_entries(&mut index)?;
        }

        info!(
            content_types = index.content_types.len(),
            global_fields = index.global_fields.len(),
            locales = index.locales.len(),
            environments = index.environments.len(),
            extensions = index.extensions.len(),
            entries = index.entry_count(),
            "Reference index built"
        );
        Ok(index)
    }

    fn uids_of(&self, relative: &str) -> BTreeSet<String> {
        let Some(value) = read_optional(&self.base.join(relative)) else {
            return BTreeSet::new();
        };
        collection_items(&value)
            .filter_map(|(key, item)| {
                item.get("uid")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or(key)
            })
            .collect()
    }

    fn locale_codes(&self, relative: &str) -> BTreeSet<String> {
        let Some(value) = read_optional(&self.base.join(relative)) else {
            return BTreeSet::new();
        };
        collection_items(&value)
            .filter_map(|(_, item)| item.get("code").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Entry metadata from `entries/<ct>/<locale>/index.json` collections
    fn scan_entries(&self, index: &mut ReferenceIndex) -> Result<()> {
        let root = self.base.join(paths::ENTRIES);
        if !root.is_dir() {
            info!("{} not found, entry metadata is empty", root.display());
            return Ok(());
        }

        for dir_entry in WalkDir::new(&root)
            .min_depth(3)
            .max_depth(3)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() == INDEX_FILE)
        {
            let Some(locale_dir) = dir_entry.path().parent() else { continue };
            let (Some(locale), Some(ct_uid)) = (
                file_name(locale_dir),
                locale_dir.parent().and_then(file_name),
            ) else {
                continue;
            };

            let Some(mut reader) = FsChunkReader::open(locale_dir)? else { continue };
            while let Some(chunk) = reader.next_chunk()? {
                for (uid, entry) in &chunk.entries {
                    index.add_entry(EntryMeta {
                        uid: uid.clone(),
                        title: entry.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
                        content_type_uid: ct_uid.clone(),
                        locale: locale.clone(),
                    });
                }
            }
            debug!("Indexed entries of {}/{}", ct_uid, locale);
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

/// Items of an exported collection with their map key, if any
pub fn collection_items(value: &Value) -> Box<dyn Iterator<Item = (Option<String>, &Value)> + '_> {
    match value {
        Value::Object(map) => Box::new(map.iter().map(|(k, v)| (Some(k.clone()), v))),
        Value::Array(list) => Box::new(list.iter().map(|v| (None, v))),
        _ => Box::new(std::iter::empty()),
    }
}

/// Collect every string stored under `key`, at any depth
fn collect_key(value: &Value, key: &str, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    if let Some(s) = v.as_str() {
                        out.insert(s.to_string());
                    }
                }
                collect_key(v, key, out);
            }
        }
        Value::Array(list) => {
            for v in list {
                collect_key(v, key, out);
            }
        }
        _ => {}
    }
}
