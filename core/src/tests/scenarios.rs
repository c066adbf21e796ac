//! End-to-end scenarios across catalog, store, classifier and aggregator

use std::fs;

use crate::catalog::{Catalog, CatalogEntry, TestType};
use crate::classify::{ClassKey, Classifier, classify};
use crate::report::Report;
use crate::store::{self, ResultDocument, ResultRecord, Source, Status};

fn rec(id: &str, status: Status) -> ResultRecord {
    ResultRecord::new(Some(id.to_string()), status)
}

#[test]
fn test_auto_entry_passes() {
    let entry = CatalogEntry::new("T1", TestType::Auto);
    let auto = ResultDocument::from_records(Source::Automated, vec![rec("T1", Status::Passed)], None);

    let c = classify(&entry, Some(&auto), None);
    assert_eq!(c.icon, "✅");
    assert_eq!(c.key, ClassKey::Passed);
}

#[test]
fn test_manual_without_documents() {
    let entry = CatalogEntry::new("T2", TestType::Manual);
    assert_eq!(classify(&entry, None, None).key, ClassKey::Manual);
}

#[test]
fn test_selenium_entry_ignores_automated_document() {
    let entry = CatalogEntry::new("T3", TestType::AutoSelenium);
    let auto = ResultDocument::from_records(Source::Automated, vec![rec("T3", Status::Passed)], None);

    assert_eq!(classify(&entry, Some(&auto), None).key, ClassKey::NotFound);
}

#[test]
fn test_sequential_processes_converge() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result_test_selenium.json");

    // Process A
    store::merge(&path, Source::EndToEnd, rec("17", Status::Passed)).unwrap();
    // Process B, a fresh invocation that only sees the file
    store::merge(&path, Source::EndToEnd, rec("17", Status::Failed)).unwrap();

    let doc = store::load(&path, Source::EndToEnd);
    assert_eq!(doc.len(), 1);
    assert_eq!(doc.find("17").unwrap().status, Status::Failed);
    assert_eq!(doc.summary().failed, 1);
    assert_eq!(doc.summary().passed, 0);
}

#[test]
fn test_skipped_scenario_counted_in_saved_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result_test_selenium.json");

    store::merge(&path, Source::EndToEnd, rec("16", Status::Passed)).unwrap();
    store::merge(&path, Source::EndToEnd, rec("18", Status::Skipped)).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let counted: u64 = value["summary"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(value["total_tests"], 2);
    assert_eq!(counted, 2);
    assert_eq!(value["summary"]["skipped"], 1);
}

#[test]
fn test_e2e_file_written_by_other_producer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result_test_selenium.json");
    fs::write(
        &path,
        r#"{
  "timestamp": "2025-11-03T10:15:42.123456",
  "total_tests": 1,
  "summary": {"passed": 1, "failed": 0, "errors": 0},
  "tests": [
    {"test_number": "16", "test_name": "TC016 - CRUD 10 tasks", "test_class": "SeleniumE2E",
     "test_method": "tc016_crud_10_tasks", "status": "passed", "error_message": null,
     "description": "CRUD cycle on 10 tasks", "details": {"initial_count": 3}}
  ]
}"#,
    )
    .unwrap();

    store::merge(
        &path,
        Source::EndToEnd,
        rec("17", Status::Error).with_error_message(Some("driver crashed".to_string())),
    )
    .unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["total_tests"], 2);
    assert_eq!(value["summary"]["errors"], 1);
    assert_eq!(value["tests"][0]["test_number"], "16");
    assert_eq!(value["tests"][0]["details"]["initial_count"], 3);
    assert_eq!(value["tests"][1]["test_number"], "17");
    assert_eq!(value["tests"][1]["error_message"], "driver crashed");
}

#[test]
fn test_full_reporting_pass() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("test_list.yaml");
    let auto_path = dir.path().join("result_test_auto.json");
    let e2e_path = dir.path().join("result_test_selenium.json");

    fs::write(
        &catalog_path,
        "tests:\n  - {id: 1, type: auto}\n  - {id: 2, type: auto}\n  - {id: 16, type: auto-selenium}\n  - {id: 17, type: auto-selenium}\n  - {id: 20, type: manual}\n",
    )
    .unwrap();
    store::replace(
        &auto_path,
        &ResultDocument::from_records(
            Source::Automated,
            vec![rec("1", Status::Passed), rec("2", Status::Error)],
            Some(0.8),
        ),
    )
    .unwrap();
    store::merge(&e2e_path, Source::EndToEnd, rec("16", Status::Passed)).unwrap();

    let catalog = Catalog::from_file(&catalog_path).unwrap();
    let auto = store::try_load(&auto_path, Source::Automated);
    let e2e = store::try_load(&e2e_path, Source::EndToEnd);
    let report = Report::build(&catalog, auto.as_ref(), e2e.as_ref());

    let stats = report.statistics();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.passed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.manual, 1);
    assert_eq!(stats.success_combined(), 3);
}

#[test]
fn test_report_degrades_without_documents() {
    let dir = tempfile::tempdir().unwrap();
    let auto = store::try_load(&dir.path().join("a.json"), Source::Automated);
    let e2e = store::try_load(&dir.path().join("b.json"), Source::EndToEnd);

    let catalog = Catalog::new(vec![
        CatalogEntry::new("1", TestType::Auto),
        CatalogEntry::new("2", TestType::AutoSelenium),
        CatalogEntry::new("3", TestType::Manual),
    ]);
    let classified = Classifier::new(auto.as_ref(), e2e.as_ref()).classify_all(&catalog);
    let keys: Vec<_> = classified.iter().map(|(_, c)| c.key).collect();
    assert_eq!(
        keys,
        vec![ClassKey::NotFound, ClassKey::NotFound, ClassKey::Manual]
    );
}
