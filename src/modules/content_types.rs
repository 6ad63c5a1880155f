//! Content type schemas

use std::path::Path;
use tracing::debug;

use super::{Module, RunContext};
use crate::checks::{Checks, FieldHandlers};
use crate::collector::Collector;
use crate::error::{AuditError, Result};
use crate::fixer::Fixer;
use crate::index::paths;
use crate::io::Collection;
use crate::path::TreePath;
use crate::record::Owner;
use crate::schema::ContentType;
use crate::walker::Walker;

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    audit_schemas(ctx, Module::ContentTypes, paths::CONTENT_TYPES)
}

/// Walk (or fix) every definition stored in `relative`.
///
/// The file must exist: a schema module has nothing to audit without it.
pub(crate) fn audit_schemas(ctx: &mut RunContext<'_>, module: Module, relative: &str) -> Result<Collector> {
    let path = ctx.base.join(relative);
    if !path.is_file() {
        return Err(AuditError::InvalidPath {
            module: module.to_string(),
            path,
        });
    }

    let mut collection: Collection<ContentType> = Collection::load(&path)?;
    debug!("Loaded {} definitions from {}", collection.len(), path.display());

    let checks = Checks::new(ctx.index, FieldHandlers::ALL, ctx.skip_refs);
    let root = TreePath::root();
    let mut collector = Collector::new();
    let mut changed = false;

    for definition in collection.values_mut() {
        let owner = Owner::new(&definition.uid, &definition.title);
        collector.begin(&definition.uid);

        let records = if ctx.fix {
            let schema = std::mem::take(&mut definition.schema);
            let fixed = Fixer::new(checks).fix_schema(&owner, &root, schema);
            changed |= fixed.changed();
            definition.schema = fixed.value;
            fixed.records
        } else {
            Walker::new(checks).walk_schema(&owner, &root, &definition.schema)
        };

        ctx.progress.tick(records.is_empty(), &definition.uid, None);
        collector.extend(&definition.uid, records);
    }

    if changed {
        persist(ctx, module, &collection, &path)?;
    }
    collector.finalize();
    Ok(collector)
}

fn persist(ctx: &mut RunContext<'_>, module: Module, collection: &Collection<ContentType>, path: &Path) -> Result<()> {
    ctx.persist(module, |format| collection.save(path, format))?;
    Ok(())
}
