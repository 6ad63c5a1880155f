//! Entries
//!
//! Every `entries/<content type>/<locale>/` collection is streamed chunk by
//! chunk and each entry is walked against its content type schema. Entry
//! `publish_details` rows are checked against exported environments and
//! locales. A fixed chunk is written back to its own file.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{Module, RunContext};
use crate::checks::{Checks, FieldHandlers};
use crate::collector::Collector;
use crate::error::{AuditError, Result};
use crate::fixer::Fixer;
use crate::index::paths;
use crate::io::{Chunk, ChunkSource, Collection, FsChunkReader};
use crate::path::TreePath;
use crate::record::{MissingRef, Owner};
use crate::schema::ContentType;
use crate::variants::{PublishScope, PublishValidator};
use crate::walker::Walker;

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    let schema_path = required(ctx.base, paths::CONTENT_TYPES)?;
    let entries_dir = required(ctx.base, paths::ENTRIES)?;
    let content_types: Collection<ContentType> = Collection::load(&schema_path)?;

    let mut collector = Collector::new();
    for content_type in content_types.values() {
        let ct_dir = entries_dir.join(&content_type.uid);
        if !ct_dir.is_dir() {
            debug!("No entries exported for {}", content_type.uid);
            continue;
        }
        for locale in locale_dirs(&ct_dir)? {
            let Some(mut reader) = FsChunkReader::open(&ct_dir.join(&locale))? else {
                warn!("No index for {}/{}", content_type.uid, locale);
                continue;
            };
            audit_collection(ctx, content_type, &locale, &mut reader, &mut collector)?;
        }
    }
    collector.finalize();
    Ok(collector)
}

fn required(base: &Path, relative: &str) -> Result<PathBuf> {
    let path = base.join(relative);
    if path.exists() {
        Ok(path)
    } else {
        Err(AuditError::InvalidPath {
            module: Module::Entries.to_string(),
            path,
        })
    }
}

/// Locale subdirectories of a content type's entry folder, sorted
pub(crate) fn locale_dirs(ct_dir: &Path) -> Result<Vec<String>> {
    let mut locales = Vec::new();
    for dir_entry in fs::read_dir(ct_dir)? {
        let dir_entry = dir_entry?;
        if dir_entry.file_type()?.is_dir() {
            if let Some(name) = dir_entry.file_name().to_str() {
                locales.push(name.to_string());
            }
        }
    }
    locales.sort();
    Ok(locales)
}

/// Entry title, falling back to its uid
pub(crate) fn entry_title<'e>(uid: &'e str, entry: &'e Map<String, Value>) -> &'e str {
    entry.get("title").and_then(Value::as_str).unwrap_or(uid)
}

fn audit_collection(
    ctx: &mut RunContext<'_>,
    content_type: &ContentType,
    locale: &str,
    reader: &mut dyn ChunkSource,
    collector: &mut Collector,
) -> Result<()> {
    let checks = Checks::new(ctx.index, FieldHandlers::ALL, ctx.skip_refs);
    let publish = PublishValidator::new(ctx.index);
    let root = TreePath::root();

    while let Some(mut chunk) = reader.next_chunk()? {
        let entries = std::mem::take(&mut chunk.entries);
        let mut changed = false;

        for (uid, entry) in entries {
            let Value::Object(entry) = entry else {
                chunk.entries.insert(uid, entry);
                continue;
            };
            let owner = Owner::entry(&uid, entry_title(&uid, &entry), &content_type.uid, locale);
            collector.begin(&uid);

            let (entry, records): (Map<String, Value>, Vec<MissingRef>) = if ctx.fix {
                let fixed = Fixer::new(checks).fix_entry(&owner, &root, &content_type.schema, entry);
                let published = publish.fix(&owner, &root, fixed.value, PublishScope::default());
                let mut records = fixed.records;
                records.extend(published.records);
                (published.value, records)
            } else {
                let mut records = Walker::new(checks).walk_entry(&owner, &root, &content_type.schema, &entry);
                records.extend(publish.validate(&owner, &root, &entry, PublishScope::default()));
                (entry, records)
            };

            changed |= ctx.fix && !records.is_empty();
            ctx.progress.tick(records.is_empty(), &uid, None);
            collector.extend(&uid, records);
            chunk.entries.insert(uid, Value::Object(entry));
        }

        if changed {
            write_chunk(ctx, &chunk)?;
        }
    }
    Ok(())
}

fn write_chunk(ctx: &mut RunContext<'_>, chunk: &Chunk) -> Result<()> {
    debug!("Writing {}", chunk.path.display());
    ctx.persist(Module::Entries, |format| chunk.write(format))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::{read, run_module, write};
    use serde_json::json;

    fn export(base: &Path) {
        write(
            base,
            paths::CONTENT_TYPES,
            json!([{
                "uid": "page",
                "title": "Page",
                "schema": [
                    {"uid": "title", "display_name": "Title", "data_type": "text"},
                    {"uid": "related", "display_name": "Related", "data_type": "reference",
                     "reference_to": ["page"]}
                ]
            }]),
        );
        write(base, paths::ENVIRONMENTS, json!({"env1": {"uid": "env1", "name": "production"}}));
        write(base, paths::MASTER_LOCALE, json!({"en": {"code": "en-us"}}));
        write(base, "entries/page/en-us/index.json", json!({"1": "chunk.json"}));
        write(
            base,
            "entries/page/en-us/chunk.json",
            json!({
                "e1": {
                    "uid": "e1",
                    "title": "Home",
                    "related": [
                        {"uid": "e2", "_content_type_uid": "page"},
                        {"uid": "gone", "_content_type_uid": "page"}
                    ],
                    "publish_details": [
                        {"environment": "env1", "locale": "en-us"},
                        {"environment": "deleted", "locale": "en-us"}
                    ]
                },
                "e2": {"uid": "e2", "title": "About", "related": []}
            }),
        );
    }

    #[test]
    fn test_validate_entries() {
        let dir = tempfile::tempdir().unwrap();
        export(dir.path());

        let collector = run_module(dir.path(), Module::Entries, false);
        assert_eq!(collector.owners().collect::<Vec<_>>(), vec!["e1"]);

        let records = collector.get("e1").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].missing_refs.to_string(), "gone");
        assert_eq!(records[0].content_type_uid.as_deref(), Some("page"));
        assert_eq!(records[0].locale.as_deref(), Some("en-us"));
        assert_eq!(records[1].missing_refs.to_string(), "environment:deleted");
    }

    #[test]
    fn test_fix_rewrites_chunk() {
        let dir = tempfile::tempdir().unwrap();
        export(dir.path());

        let collector = run_module(dir.path(), Module::Entries, true);
        assert_eq!(collector.record_count(), 2);
        assert!(collector.records().all(|r| r.is_fixed()));

        let chunk = read(dir.path(), "entries/page/en-us/chunk.json");
        assert_eq!(chunk["e1"]["related"], json!([{"uid": "e2", "_content_type_uid": "page"}]));
        assert_eq!(chunk["e1"]["publish_details"].as_array().unwrap().len(), 1);
        assert_eq!(chunk["e2"]["title"], "About");

        assert!(run_module(dir.path(), Module::Entries, false).is_empty());
    }

    #[test]
    fn test_missing_entries_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), paths::CONTENT_TYPES, json!([]));
        let index = crate::index::ReferenceIndex::default();
        let mut gate = crate::io::WriteGate::always();
        let mut progress = crate::io::NoProgress;
        let mut ctx = RunContext {
            base: dir.path(),
            index: &index,
            fix: false,
            skip_refs: &[],
            format: crate::config::OutputFormat::Pretty,
            gate: &mut gate,
            progress: &mut progress,
        };
        assert!(matches!(run(&mut ctx), Err(AuditError::InvalidPath { .. })));
    }
}
