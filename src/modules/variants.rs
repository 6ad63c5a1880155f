//! Entry variants
//!
//! Variants are exported next to their base entries under
//! `entries/<content type>/<locale>/variants/`. Each one is checked with the
//! publish validator, scoped to its locale and variant uid, and with the
//! change-set reference validator. Records are keyed by the base entry uid.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::entries::locale_dirs;
use super::{Module, RunContext};
use crate::checks::{Checks, FieldHandlers};
use crate::collector::Collector;
use crate::error::Result;
use crate::index::paths;
use crate::io::{Chunk, ChunkSource, FsChunkReader};
use crate::path::TreePath;
use crate::record::Owner;
use crate::variants::{variant_uid, PublishScope, PublishValidator, ReferenceValidator};

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    let entries_dir = ctx.base.join(paths::ENTRIES);
    let mut collector = Collector::new();
    if !entries_dir.is_dir() {
        warn!("{} not found, skipping variants", entries_dir.display());
        return Ok(collector);
    }

    for ct_uid in locale_dirs(&entries_dir)? {
        let ct_dir = entries_dir.join(&ct_uid);
        for locale in locale_dirs(&ct_dir)? {
            let dir = ct_dir.join(&locale).join(paths::VARIANTS_DIR);
            let Some(mut reader) = FsChunkReader::open(&dir)? else { continue };
            debug!("Auditing variants of {}/{}", ct_uid, locale);
            audit_variants(ctx, &ct_uid, &locale, &mut reader, &mut collector)?;
        }
    }
    collector.finalize();
    Ok(collector)
}

fn audit_variants(
    ctx: &mut RunContext<'_>,
    ct_uid: &str,
    locale: &str,
    reader: &mut dyn ChunkSource,
    collector: &mut Collector,
) -> Result<()> {
    let checks = Checks::new(ctx.index, FieldHandlers::ALL, ctx.skip_refs);
    let publish = PublishValidator::new(ctx.index);
    let references = ReferenceValidator::new(checks);

    while let Some(mut chunk) = reader.next_chunk()? {
        let variants = std::mem::take(&mut chunk.entries);
        let mut changed = false;

        for (key, variant) in variants {
            let Value::Object(variant) = variant else {
                chunk.entries.insert(key, variant);
                continue;
            };
            let owner = owner_of(ctx, &key, &variant, ct_uid, locale);
            let uid = variant_uid(&variant).map(str::to_string);
            let path = TreePath::root().join(uid.as_deref().unwrap_or(&key), "Variant");
            let scope = PublishScope {
                locale: Some(locale),
                variant_uid: uid.as_deref(),
            };
            collector.begin(&owner.uid);

            let (variant, records) = if ctx.fix {
                let published = publish.fix(&owner, &path, variant, scope);
                let referenced = references.fix(&owner, &path, published.value);
                let mut records = published.records;
                records.extend(referenced.records);
                (referenced.value, records)
            } else {
                let mut records = publish.validate(&owner, &path, &variant, scope);
                records.extend(references.validate(&owner, &path, &variant));
                (variant, records)
            };

            changed |= ctx.fix && !records.is_empty();
            ctx.progress.tick(records.is_empty(), &owner.uid, None);
            collector.extend(&owner.uid, records);
            chunk.entries.insert(key, Value::Object(variant));
        }

        if changed {
            write_chunk(ctx, &chunk)?;
        }
    }
    Ok(())
}

/// The base entry a variant belongs to
fn owner_of(ctx: &RunContext<'_>, key: &str, variant: &Map<String, Value>, ct_uid: &str, locale: &str) -> Owner {
    let uid = variant.get("uid").and_then(Value::as_str).unwrap_or(key);
    let title = ctx
        .index
        .entry(uid)
        .first()
        .map(|meta| meta.title.as_str())
        .or_else(|| variant.get("title").and_then(Value::as_str))
        .unwrap_or(uid);
    Owner::entry(uid, title, ct_uid, locale)
}

fn write_chunk(ctx: &mut RunContext<'_>, chunk: &Chunk) -> Result<()> {
    ctx.persist(Module::Variants, |format| chunk.write(format))?;
    Ok(())
}
