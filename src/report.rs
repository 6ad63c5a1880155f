//! Report writers
//!
//! Each module produces `<report_path>/<module>.json`, the finalized record
//! map keyed by owner uid, and `<report_path>/<module>.csv` with one row per
//! record. An empty result still gets its `{}` JSON file but no CSV.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{OutputFormat, ReportConfig};
use crate::error::{AuditError, Result};
use crate::io::write_json;
use crate::modules::Module;
use crate::record::MissingRef;

/// Finalized records of one module, keyed by owner uid
pub type Report = BTreeMap<String, Vec<MissingRef>>;

/// CSV columns, in output order
pub const COLUMNS: [&str; 10] = [
    "ownerUid",
    "ownerName",
    "content_type_uid",
    "locale",
    "display_name",
    "data_type",
    "missingRefs",
    "treeStr",
    "fixStatus",
    "fixMessage",
];

/// Writes module reports under one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    format: OutputFormat,
    csv: bool,
    columns: Vec<&'static str>,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>, config: &ReportConfig) -> Self {
        Self {
            dir: dir.into(),
            format: config.output_format,
            csv: config.csv,
            columns: project_columns(&config.columns),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn json_path(&self, module: Module) -> PathBuf {
        self.dir.join(format!("{}.json", module))
    }

    pub fn csv_path(&self, module: Module) -> PathBuf {
        self.dir.join(format!("{}.csv", module))
    }

    /// Write the JSON report and, when there are records, the CSV
    pub fn write(&self, module: Module, report: &Report) -> Result<()> {
        let json_path = self.json_path(module);
        write_json(&json_path, report, self.format)?;
        debug!("Wrote {}", json_path.display());

        if !self.csv || report.values().all(Vec::is_empty) {
            return Ok(());
        }
        let csv_path = self.csv_path(module);
        fs::write(&csv_path, self.to_csv(report)).map_err(|source| AuditError::Write {
            path: csv_path.clone(),
            source,
        })?;
        debug!("Wrote {}", csv_path.display());
        Ok(())
    }

    /// Render the report as CSV with the configured columns
    pub fn to_csv(&self, report: &Report) -> String {
        let mut out = String::new();
        push_row(&mut out, self.columns.iter().map(|c| c.to_string()));
        for record in report.values().flatten() {
            push_row(&mut out, self.columns.iter().map(|c| column_value(record, c)));
        }
        out
    }
}

/// Known columns in their configured order; unknown names are dropped
fn project_columns(requested: &[String]) -> Vec<&'static str> {
    if requested.is_empty() {
        return COLUMNS.to_vec();
    }
    requested
        .iter()
        .filter_map(|name| {
            let found = COLUMNS.iter().copied().find(|c| *c == name.as_str());
            if found.is_none() {
                warn!("Unknown report column {}", name);
            }
            found
        })
        .collect()
}

fn column_value(record: &MissingRef, column: &str) -> String {
    match column {
        "ownerUid" => record.owner_uid.clone(),
        "ownerName" => record.owner_name.clone(),
        "content_type_uid" => record.content_type_uid.clone().unwrap_or_default(),
        "locale" => record.locale.clone().unwrap_or_default(),
        "display_name" => record.display_name.clone(),
        "data_type" => record.data_type.clone(),
        "missingRefs" => record.missing_refs.to_string(),
        "treeStr" => record.tree_str.clone(),
        "fixStatus" => record.fix_status.map(|s| s.to_string()).unwrap_or_default(),
        "fixMessage" => record.fix_message.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let row: Vec<String> = cells.map(|cell| escape(&cell)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// Quote a cell when it holds a separator, quote or line break
fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::TreePath;
    use crate::record::{MissingRefs, Owner};

    fn report() -> Report {
        let owner = Owner::entry("e1", "Home, sweet", "page", "en-us");
        let tree = TreePath::root().join("related", "Related");
        let record = MissingRef::new(&owner, &tree, "reference", "Related", MissingRefs::list(["a", "b"]))
            .fixed()
            .with_message("Removed 'a'");
        BTreeMap::from([("e1".to_string(), vec![record])])
    }

    #[test]
    fn test_csv_rows_are_escaped() {
        let writer = ReportWriter::new("out", &ReportConfig::default());
        let csv = writer.to_csv(&report());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "e1,\"Home, sweet\",page,en-us,Related,reference,\"a, b\",Related,Fixed,Removed 'a'"
        );
    }

    #[test]
    fn test_column_projection() {
        let config = ReportConfig {
            columns: vec!["treeStr".into(), "bogus".into(), "ownerUid".into()],
            ..Default::default()
        };
        let writer = ReportWriter::new("out", &config);
        assert_eq!(writer.to_csv(&report()), "treeStr,ownerUid\nRelated,e1\n");
    }

    #[test]
    fn test_empty_report_writes_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), &ReportConfig::default());
        writer.write(Module::Workflows, &Report::new()).unwrap();

        let json = fs::read_to_string(writer.json_path(Module::Workflows)).unwrap();
        assert_eq!(json.trim(), "{}");
        assert!(!writer.csv_path(Module::Workflows).exists());

        writer.write(Module::Entries, &report()).unwrap();
        assert!(writer.csv_path(Module::Entries).exists());
    }
}
