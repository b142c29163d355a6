use crate::error::LoadError;
use std::fs;
use std::path::{Path, PathBuf};
use strata_config::LoadConfig;
use strata_flatten::flatten_report;
use strata_report::QueryReport;
use strata_store::ReportStore;
use tracing::{debug, error};

#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: LoadError,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub loaded: usize,
    pub failures: Vec<LoadFailure>,
}

/// Sequential report pipeline: read, parse, flatten, insert. Without a store
/// it runs the same pipeline up to the insert, validating inputs only.
pub struct Loader<'a> {
    store: Option<&'a mut dyn ReportStore>,
    max_stage_depth: usize,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a mut dyn ReportStore, config: &LoadConfig) -> Self {
        Self {
            store: Some(store),
            max_stage_depth: config.max_stage_depth,
        }
    }

    pub fn parse_only(config: &LoadConfig) -> Self {
        Self {
            store: None,
            max_stage_depth: config.max_stage_depth,
        }
    }

    pub fn run(&mut self, paths: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for path in paths {
            self.load_path(path, &mut summary);
        }
        summary
    }

    fn load_path(&mut self, path: &Path, summary: &mut BatchSummary) {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(exc) => {
                record_failure(summary, path, exc.into());
                return;
            }
        };

        if !meta.is_dir() {
            // An explicitly named file is loaded whatever its extension.
            self.load_file(path, summary);
            return;
        }

        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(exc) => {
                record_failure(summary, path, exc.into());
                return;
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(exc) => {
                    record_failure(summary, path, exc.into());
                    continue;
                }
            };
            let entry_path = entry.path();
            match entry.file_type() {
                // One level only; nested directories are not descended.
                Ok(kind) if kind.is_dir() => continue,
                Ok(_) => {}
                Err(exc) => {
                    record_failure(summary, &entry_path, exc.into());
                    continue;
                }
            }
            if entry_path.extension().and_then(|s| s.to_str()) != Some("json") {
                debug!("skipping non-report file {}", entry_path.display());
                continue;
            }
            files.push(entry_path);
        }
        files.sort();

        for file in files {
            self.load_file(&file, summary);
        }
    }

    fn load_file(&mut self, path: &Path, summary: &mut BatchSummary) {
        match self.ingest_file(path) {
            Ok(()) => summary.loaded += 1,
            Err(error) => record_failure(summary, path, error),
        }
    }

    fn ingest_file(&mut self, path: &Path) -> Result<(), LoadError> {
        let bytes = fs::read(path)?;
        let report: QueryReport = serde_json::from_slice(&bytes)?;
        let flat = flatten_report(&report, self.max_stage_depth)?;

        if let Some(store) = self.store.as_mut() {
            store.insert_report(&flat)?;
        }

        Ok(())
    }
}

fn record_failure(summary: &mut BatchSummary, path: &Path, error: LoadError) {
    error!("failed to load {}: {error}", path.display());
    summary.failures.push(LoadFailure {
        path: path.to_path_buf(),
        error,
    });
}
