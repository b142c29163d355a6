use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use strata_config::LoadConfig;
use strata_load::{LoadError, Loader};
use strata_store::SqliteReportStore;
use tempfile::tempdir;

fn report_doc(query_id: &str) -> serde_json::Value {
    json!({
        "queryId": query_id,
        "session": {"user": "etramel", "source": "pbench", "catalog": "hive", "schema": "tpcds"},
        "state": "FINISHED",
        "query": "SELECT count(*) FROM store_sales",
        "queryStats": {
            "createTime": "2024-08-19T17:42:03.000Z",
            "endTime": "2024-08-19T17:42:05.330Z",
            "elapsedTime": "2.33s",
            "queuedTime": "300.00us",
            "totalPlanningTime": "45.00ms",
            "executionTime": "2.10s",
            "totalCpuTime": "7.88s",
            "totalScheduledTime": "8.01s",
            "peakTotalMemoryReservation": "10.90MB",
            "cumulativeUserMemory": 1234.5,
            "rawInputDataSize": "128.00kB",
            "rawInputPositions": 960121,
            "totalDrivers": 16
        },
        "outputStage": {
            "stageId": format!("{query_id}.0"),
            "state": "FINISHED",
            "stageStats": {
                "totalTasks": 1,
                "totalDrivers": 4,
                "totalCpuTime": "1.10s",
                "totalScheduledTime": "1.20s",
                "outputDataSize": "59B",
                "outputPositions": 1,
                "operatorSummaries": [{
                    "pipelineId": 0,
                    "operatorId": 0,
                    "planNodeId": "147",
                    "operatorType": "TaskOutputOperator",
                    "totalDrivers": 4,
                    "inputPositions": 1,
                    "inputDataSize": "59B",
                    "outputPositions": 1,
                    "outputDataSize": "59B"
                }]
            },
            "subStages": [{
                "stageId": format!("{query_id}.1"),
                "state": "FINISHED",
                "stageStats": {
                    "totalTasks": 4,
                    "totalDrivers": 12,
                    "totalCpuTime": "6.78s",
                    "totalScheduledTime": "6.81s",
                    "rawInputDataSize": "128.00kB",
                    "rawInputPositions": 960121,
                    "outputDataSize": "59B",
                    "outputPositions": 1
                }
            }]
        }
    })
}

fn malformed_doc(query_id: &str) -> serde_json::Value {
    // Child reuses the root's stage id, which flattening rejects.
    let mut doc = report_doc(query_id);
    doc["outputStage"]["subStages"][0]["stageId"] = json!(format!("{query_id}.0"));
    doc
}

fn write_doc(dir: &Path, name: &str, doc: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, doc.to_string()).expect("write report file");
    path
}

#[test]
fn batch_isolates_the_broken_report_and_loads_the_rest() {
    let dir = tempdir().expect("create temp dir");
    write_doc(dir.path(), "a.json", &report_doc("20240819_174203_00001_abcde"));
    fs::write(dir.path().join("b.json"), "{\"queryId\": ").expect("write truncated report");
    write_doc(dir.path(), "c.json", &report_doc("20240819_174203_00003_abcde"));

    let mut store =
        SqliteReportStore::open(dir.path().join("reports.db")).expect("open store");
    let config = LoadConfig::default();
    let summary = Loader::new(&mut store, &config).run(&[dir.path().to_path_buf()]);

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.failures.len(), 1);
    let failure = &summary.failures[0];
    assert!(failure.path.ends_with("b.json"), "failed path: {}", failure.path.display());
    assert!(matches!(failure.error, LoadError::Parse(_)));

    // Both healthy reports are fully persisted, the broken one left no rows.
    for query_id in ["20240819_174203_00001_abcde", "20240819_174203_00003_abcde"] {
        let key = store
            .report_key(query_id)
            .expect("report key query")
            .expect("report persisted");
        assert_eq!(store.stage_rows(key).expect("stage rows").len(), 2);
        assert_eq!(store.operator_rows(key).expect("operator rows").len(), 1);
        assert!(store.statistics_key(key).expect("statistics query").is_some());
    }
    assert_eq!(store.row_counts().expect("row counts").creation_info, 2);
}

#[test]
fn check_mode_validates_without_a_database() {
    let dir = tempdir().expect("create temp dir");
    write_doc(dir.path(), "a.json", &report_doc("20240819_174203_00011_abcde"));
    write_doc(dir.path(), "b.json", &malformed_doc("20240819_174203_00012_abcde"));

    let config = LoadConfig::default();
    let summary = Loader::parse_only(&config).run(&[dir.path().to_path_buf()]);

    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(summary.failures[0].error, LoadError::Malformed(_)));
}

#[test]
fn directory_scan_skips_subdirectories_and_non_report_files() {
    let dir = tempdir().expect("create temp dir");
    write_doc(dir.path(), "a.json", &report_doc("20240819_174203_00021_abcde"));
    fs::write(dir.path().join("notes.txt"), "not a report").expect("write stray file");
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).expect("create nested dir");
    write_doc(&nested, "b.json", &report_doc("20240819_174203_00022_abcde"));

    let config = LoadConfig::default();
    let summary = Loader::parse_only(&config).run(&[dir.path().to_path_buf()]);

    assert_eq!(summary.loaded, 1);
    assert!(summary.failures.is_empty());
}

#[test]
fn explicitly_named_file_is_loaded_whatever_its_extension() {
    let dir = tempdir().expect("create temp dir");
    let path = write_doc(dir.path(), "report.out", &report_doc("20240819_174203_00031_abcde"));

    let config = LoadConfig::default();
    let summary = Loader::parse_only(&config).run(&[path]);

    assert_eq!(summary.loaded, 1);
    assert!(summary.failures.is_empty());
}

#[test]
fn missing_path_is_a_read_failure() {
    let config = LoadConfig::default();
    let summary =
        Loader::parse_only(&config).run(&[PathBuf::from("/definitely/missing/reports")]);

    assert_eq!(summary.loaded, 0);
    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(summary.failures[0].error, LoadError::Read(_)));
}

#[test]
fn unparseable_document_is_a_parse_failure() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("broken.json");
    fs::write(&path, "{\"queryId\": ").expect("write broken file");

    let config = LoadConfig::default();
    let summary = Loader::parse_only(&config).run(&[path]);

    assert_eq!(summary.loaded, 0);
    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(summary.failures[0].error, LoadError::Parse(_)));
}

#[test]
fn resubmitted_query_id_is_a_persist_failure() {
    let dir = tempdir().expect("create temp dir");
    write_doc(dir.path(), "a.json", &report_doc("20240819_174203_00041_abcde"));
    write_doc(dir.path(), "c.json", &report_doc("20240819_174203_00041_abcde"));

    let mut store = SqliteReportStore::open_in_memory().expect("open store");
    let config = LoadConfig::default();
    let summary = Loader::new(&mut store, &config).run(&[dir.path().to_path_buf()]);

    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.failures.len(), 1);
    let failure = &summary.failures[0];
    assert!(failure.path.ends_with("c.json"), "failed path: {}", failure.path.display());
    assert!(matches!(failure.error, LoadError::Persist(_)));
    assert_eq!(store.row_counts().expect("row counts").creation_info, 1);
}

#[test]
fn depth_limit_from_config_bounds_flattening() {
    let dir = tempdir().expect("create temp dir");
    write_doc(dir.path(), "a.json", &report_doc("20240819_174203_00051_abcde"));

    // The fixture tree is two levels deep; a limit of one rejects it.
    let config = LoadConfig { max_stage_depth: 1 };
    let summary = Loader::parse_only(&config).run(&[dir.path().to_path_buf()]);

    assert_eq!(summary.loaded, 0);
    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(summary.failures[0].error, LoadError::Malformed(_)));
}
