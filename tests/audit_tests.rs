//! End-to-end audits over an export tree on disk

use content_audit::io::{AutoConfirm, Confirm, NoProgress, WriteGate};
use content_audit::{AuditConfig, AuditOptions, AuditSummary, Auditor, Module, EMPTY_SCHEMA};
use serde_json::{json, Value};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;
use walkdir::WalkDir;

fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/export")
}

/// Copy the fixture export into `base`
fn export(base: &Path) {
    let source = fixtures_path();
    for entry in WalkDir::new(&source).into_iter().filter_map(|e| e.ok()) {
        let relative = entry.path().strip_prefix(&source).unwrap();
        let target = base.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

struct Fixture {
    _dir: TempDir,
    data: PathBuf,
    reports: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("export");
        let reports = dir.path().join("reports");
        export(&data);
        Self { _dir: dir, data, reports }
    }

    fn options(&self, fix: bool, modules: &[Module]) -> AuditOptions {
        let mut options = AuditOptions::from_config(&AuditConfig::default(), fix);
        options.data_dir = self.data.clone();
        options.report_path = self.reports.clone();
        if !modules.is_empty() {
            options.modules = modules.to_vec();
        }
        options
    }

    fn run(&self, fix: bool, modules: &[Module]) -> AuditSummary {
        self.run_with(fix, modules, WriteGate::always())
    }

    fn run_with(&self, fix: bool, modules: &[Module], gate: WriteGate) -> AuditSummary {
        Auditor::new(self.options(fix, modules), gate)
            .with_progress(Box::new(NoProgress))
            .run()
            .unwrap()
    }

    fn report(&self, module: Module) -> Value {
        read(&self.reports.join(format!("{}.json", module)))
    }

    fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        WalkDir::new(&self.data)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| (e.path().to_path_buf(), fs::read_to_string(e.path()).unwrap()))
            .collect()
    }
}

#[test]
fn validate_never_mutates_the_export() {
    let fixture = Fixture::new();
    let before = fixture.snapshot();

    let summary = fixture.run(false, &[]);
    assert!(summary.has_issues());
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn scenario_missing_reference_target() {
    let fixture = Fixture::new();
    fixture.run(false, &[Module::ContentTypes]);

    let report = fixture.report(Module::ContentTypes);
    assert_eq!(report["page"][0]["missingRefs"], json!(["page_0"]));
    assert_eq!(report["page"][0]["treeStr"], "Related");
    assert!(report["page"][0].get("fixStatus").is_none());
}

#[test]
fn scenario_empty_global_field_is_removed() {
    let fixture = Fixture::new();
    fixture.run(false, &[Module::ContentTypes]);
    let report = fixture.report(Module::ContentTypes);
    assert_eq!(report["page"][1]["missingRefs"], json!(EMPTY_SCHEMA));

    fixture.run(true, &[Module::ContentTypes]);
    let schema = read(&fixture.data.join("content_types/schema.json"));
    let uids: Vec<&str> = schema[0]["schema"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["uid"].as_str().unwrap())
        .collect();
    assert_eq!(uids, vec!["title", "related", "body", "tags", "sections"]);
    assert_eq!(schema[0]["schema"][1]["reference_to"], json!(["page"]));
}

#[test]
fn scenario_select_minimum_is_filled() {
    let fixture = Fixture::new();
    fixture.run(true, &[Module::Entries]);

    let report = fixture.report(Module::Entries);
    let added: Vec<&str> = report["e1"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["treeStr"] == "Tags")
        .map(|r| r["fixMessage"].as_str().unwrap())
        .collect();
    assert_eq!(
        added,
        vec![
            "Added 'a' to meet the minimum of 2 value(s)",
            "Added 'b' to meet the minimum of 2 value(s)",
        ]
    );

    let chunk = read(&fixture.data.join("entries/page/en-us/one.json"));
    assert_eq!(chunk["e1"]["tags"], json!(["a", "b"]));
}

#[test]
fn scenario_dangling_rte_child_is_pruned() {
    let fixture = Fixture::new();
    fixture.run(false, &[Module::Entries]);
    let report = fixture.report(Module::Entries);
    let rte = report["e1"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["data_type"] == "json")
        .unwrap();
    assert_eq!(rte["missingRefs"], json!(["X"]));
    assert_eq!(rte["treeStr"], "Body ➜ children ➜ r1");

    fixture.run(true, &[Module::Entries]);
    let chunk = read(&fixture.data.join("entries/page/en-us/one.json"));
    let children = chunk["e1"]["body"]["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["uid"], "p1");
}

#[test]
fn scenario_invalid_block_key_is_deleted() {
    let fixture = Fixture::new();
    fixture.run(false, &[Module::Entries]);
    let report = fixture.report(Module::Entries);
    let block = report["e1"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["data_type"] == "blocks")
        .unwrap();
    assert_eq!(block["missingRefs"], json!(["ghost"]));
    assert_eq!(block["treeStr"], "Sections ➜ ghost");

    fixture.run(true, &[Module::Entries]);
    let chunk = read(&fixture.data.join("entries/page/en-us/one.json"));
    assert_eq!(chunk["e1"]["sections"], json!([{"hero": {"heading": "Hi"}}]));
}

#[test]
fn fix_is_idempotent() {
    let fixture = Fixture::new();
    let first = fixture.run(true, &[]);
    assert!(first.total_records() > 0);
    let after_first = fixture.snapshot();

    let second = fixture.run(true, &[]);
    assert_eq!(second.total_records(), 0);
    assert_eq!(fixture.snapshot(), after_first);
    assert!(!fixture.run(false, &[]).has_issues());
}

#[test]
fn clean_owners_are_pruned_and_records_are_marked_fixed() {
    let fixture = Fixture::new();
    let summary = fixture.run(true, &[Module::Entries]);

    let entries = summary.module(Module::Entries).unwrap();
    assert!(!entries.report.contains_key("e2"));
    assert_eq!(entries.report.keys().collect::<Vec<_>>(), vec!["e1", "e3"]);
    assert_eq!(entries.fixed(), entries.records());

    let report = fixture.report(Module::Entries);
    assert!(report.get("e2").is_none());
    assert_eq!(report["e3"][0]["fixStatus"], "Fixed");
    assert_eq!(report["e3"][0]["fixMessage"], "Removed field related");
    assert_eq!(report["e3"][0]["content_type_uid"], "page");
}

#[test]
fn reports_include_csv_only_when_there_are_records() {
    let fixture = Fixture::new();
    fixture.run(false, &[Module::ContentTypes, Module::Workflows]);

    let csv = fs::read_to_string(fixture.reports.join("content-types.csv")).unwrap();
    assert!(csv.starts_with("ownerUid,ownerName,"));
    assert_eq!(csv.lines().count(), 3);
    assert_eq!(fixture.report(Module::Workflows), json!({}));
    assert!(!fixture.reports.join("workflows.csv").exists());
}

struct Counting(Rc<Cell<usize>>, bool);

impl Confirm for Counting {
    fn confirm(&mut self, _message: &str) -> bool {
        self.0.set(self.0.get() + 1);
        self.1
    }
}

#[test]
fn confirmation_is_asked_once_per_module() {
    let fixture = Fixture::new();
    let asked = Rc::new(Cell::new(0));
    let gate = WriteGate::new(Box::new(Counting(asked.clone(), true)), false);

    fixture.run_with(true, &[Module::Entries], gate);
    assert_eq!(asked.get(), 1);
    assert!(!fixture.run(false, &[Module::Entries]).has_issues());
}

#[test]
fn declined_confirmation_leaves_files_untouched() {
    let fixture = Fixture::new();
    let before = fixture.snapshot();

    let gate = WriteGate::new(Box::new(AutoConfirm(false)), false);
    let summary = fixture.run_with(true, &[], gate);
    assert!(summary.total_records() > 0);
    assert_eq!(fixture.snapshot(), before);
    assert!(summary.modules.iter().all(|m| m.fixed() == 0));

    let report = fixture.report(Module::ContentTypes);
    assert!(report["page"][0].get("fixStatus").is_none());
    assert!(report["page"][0].get("fixMessage").is_none());
}
