//! Assets
//!
//! Only publish state is checked: each `publish_details` row must name an
//! exported environment and locale.

use serde_json::{Map, Value};
use tracing::warn;

use super::{Module, RunContext};
use crate::collector::Collector;
use crate::error::Result;
use crate::index::paths;
use crate::io::Collection;
use crate::path::TreePath;
use crate::record::Owner;
use crate::variants::{PublishScope, PublishValidator};

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    let path = ctx.base.join(paths::ASSETS);
    let mut collector = Collector::new();
    if !path.is_file() {
        warn!("{} not found, skipping assets", path.display());
        return Ok(collector);
    }

    let mut assets: Collection<Map<String, Value>> = Collection::load(&path)?;
    let publish = PublishValidator::new(ctx.index);
    let root = TreePath::root();
    let mut changed = false;

    for asset in assets.values_mut() {
        let uid = text(asset, "uid").unwrap_or_default().to_string();
        let name = text(asset, "title")
            .or_else(|| text(asset, "filename"))
            .unwrap_or(&uid)
            .to_string();
        let owner = Owner::new(&uid, name);
        collector.begin(&uid);

        let records = if ctx.fix {
            let fixed = publish.fix(&owner, &root, std::mem::take(asset), PublishScope::default());
            *asset = fixed.value;
            changed |= !fixed.records.is_empty();
            fixed.records
        } else {
            publish.validate(&owner, &root, asset, PublishScope::default())
        };

        ctx.progress.tick(records.is_empty(), &uid, None);
        collector.extend(&uid, records);
    }

    if changed {
        ctx.persist(Module::Assets, |format| assets.save(&path, format))?;
    }
    collector.finalize();
    Ok(collector)
}

fn text<'a>(asset: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    asset.get(key).and_then(Value::as_str)
}
