//! Missing-reference collector
//!
//! Accumulates records per owning entity. Owners that end up with no records
//! are dropped on finalize, so the report never lists an entity with an empty
//! record array.

use std::collections::BTreeMap;

use crate::record::MissingRef;

/// Records keyed by owner uid
#[derive(Debug, Clone, Default)]
pub struct Collector {
    records: BTreeMap<String, Vec<MissingRef>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owner before it is walked
    pub fn begin(&mut self, owner_uid: &str) {
        self.records.entry(owner_uid.to_string()).or_default();
    }

    pub fn push(&mut self, owner_uid: &str, record: MissingRef) {
        self.records.entry(owner_uid.to_string()).or_default().push(record);
    }

    pub fn extend(&mut self, owner_uid: &str, records: impl IntoIterator<Item = MissingRef>) {
        self.records
            .entry(owner_uid.to_string())
            .or_default()
            .extend(records);
    }

    /// Fold another collector into this one
    pub fn merge(&mut self, other: Collector) {
        for (uid, records) in other.records {
            self.extend(&uid, records);
        }
    }

    /// Drop owners without records. Finalizing twice is a no-op.
    pub fn finalize(&mut self) {
        self.records.retain(|_, records| !records.is_empty());
    }

    /// Unmark every record, for fixes that were not written
    pub fn discard_fixes(&mut self) {
        self.records.values_mut().flatten().for_each(MissingRef::unfix);
    }

    /// Finalized view of the records
    pub fn into_report(mut self) -> BTreeMap<String, Vec<MissingRef>> {
        self.finalize();
        self.records
    }

    pub fn get(&self, owner_uid: &str) -> Option<&[MissingRef]> {
        self.records.get(owner_uid).map(Vec::as_slice)
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &MissingRef> {
        self.records.values().flatten()
    }

    pub fn owner_count(&self) -> usize {
        self.records.values().filter(|r| !r.is_empty()).count()
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::TreePath;
    use crate::record::{MissingRefs, Owner};

    fn record(owner: &str) -> MissingRef {
        MissingRef::new(
            &Owner::new(owner, owner),
            &TreePath::root().join(owner, owner),
            "reference",
            "Ref",
            MissingRefs::list(["gone"]),
        )
    }

    #[test]
    fn test_finalize_prunes_empty_owners() {
        let mut collector = Collector::new();
        collector.begin("clean");
        collector.begin("dirty");
        collector.push("dirty", record("dirty"));

        collector.finalize();
        assert_eq!(collector.owners().collect::<Vec<_>>(), vec!["dirty"]);

        collector.finalize();
        assert_eq!(collector.owner_count(), 1);
        assert_eq!(collector.record_count(), 1);
    }

    #[test]
    fn test_discard_fixes_keeps_records() {
        let mut collector = Collector::new();
        collector.push("x", record("x").fixed().with_message("Removed field x"));
        collector.discard_fixes();

        assert_eq!(collector.record_count(), 1);
        let record = collector.records().next().unwrap();
        assert!(!record.is_fixed());
        assert!(record.fix_message.is_none());
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut a = Collector::new();
        a.push("x", record("x"));
        let mut b = Collector::new();
        b.push("x", record("x"));
        b.begin("y");
        a.merge(b);

        let report = a.into_report();
        assert_eq!(report["x"].len(), 2);
        assert!(!report.contains_key("y"));
    }
}
