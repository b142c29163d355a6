use crate::error::{StoreError, StoreResult};
use crate::schema::run_migrations;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::path::Path;
use strata_flatten::{
    CreationInfoRow, FlatReport, OperatorStatsRow, QueryStatisticsRow, StageStatsRow,
};

/// Generated keys handed back after a successful insert. `stage_keys` is in
/// the same order as the flattened stage rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedReport {
    pub creation_info_key: i64,
    pub stage_keys: Vec<i64>,
    pub operator_rows: usize,
    pub statistics_key: i64,
}

pub trait ReportStore {
    fn insert_report(&mut self, report: &FlatReport) -> StoreResult<InsertedReport>;
}

pub struct SqliteReportStore {
    conn: Connection,
}

impl SqliteReportStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        run_migrations(&mut conn)?;

        Ok(Self { conn })
    }

    pub fn report_key(&self, query_id: &str) -> StoreResult<Option<i64>> {
        let key = self
            .conn
            .query_row(
                "SELECT id FROM presto_query_creation_info WHERE query_id = ?1",
                params![query_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(key)
    }

    pub fn stage_rows(&self, creation_info_key: i64) -> StoreResult<Vec<StoredStageRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, creation_info_id, parent_stage_db_id, stage_id
             FROM presto_query_stage_stats
             WHERE creation_info_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![creation_info_key], |row| {
                Ok(StoredStageRow {
                    id: row.get(0)?,
                    creation_info_id: row.get(1)?,
                    parent_stage_db_id: row.get(2)?,
                    stage_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn operator_rows(&self, creation_info_key: i64) -> StoreResult<Vec<StoredOperatorRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.id, o.stage_db_id, o.operator_type
             FROM presto_query_operator_stats o
             JOIN presto_query_stage_stats s ON s.id = o.stage_db_id
             WHERE s.creation_info_id = ?1
             ORDER BY o.id",
        )?;
        let rows = stmt
            .query_map(params![creation_info_key], |row| {
                Ok(StoredOperatorRow {
                    id: row.get(0)?,
                    stage_db_id: row.get(1)?,
                    operator_type: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn statistics_key(&self, creation_info_key: i64) -> StoreResult<Option<i64>> {
        let key = self
            .conn
            .query_row(
                "SELECT id FROM presto_query_statistics WHERE creation_info_id = ?1",
                params![creation_info_key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(key)
    }

    pub fn row_counts(&self) -> StoreResult<TableCounts> {
        Ok(TableCounts {
            creation_info: self.count("presto_query_creation_info")?,
            stage_stats: self.count("presto_query_stage_stats")?,
            operator_stats: self.count("presto_query_operator_stats")?,
            statistics: self.count("presto_query_statistics")?,
        })
    }

    fn count(&self, table: &str) -> StoreResult<i64> {
        let n = self
            .conn
            .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;

        Ok(n)
    }
}

impl ReportStore for SqliteReportStore {
    fn insert_report(&mut self, report: &FlatReport) -> StoreResult<InsertedReport> {
        let tx = self.conn.transaction()?;
        let inserted = insert_report_tx(&tx, report)?;
        tx.commit()?;

        Ok(inserted)
    }
}

/// One report's insert, inside an open transaction. Any error propagates
/// before commit, so the transaction drop rolls the whole report back.
fn insert_report_tx(tx: &Transaction<'_>, report: &FlatReport) -> StoreResult<InsertedReport> {
    let creation_info_key = insert_creation_info(tx, &report.creation_info)?;

    // Stage rows arrive parent-first, so the remap table already holds the
    // parent's generated key by the time each child is inserted.
    let mut key_by_stage_id: HashMap<&str, i64> = HashMap::with_capacity(report.stages.len());
    let mut stage_keys = Vec::with_capacity(report.stages.len());
    for row in &report.stages {
        let parent_key = match row.parent_stage_id.as_deref() {
            None => None,
            Some(parent) => Some(*key_by_stage_id.get(parent).ok_or_else(|| {
                StoreError::MissingParentKey {
                    stage_id: row.stage_id.clone(),
                    parent_stage_id: parent.to_string(),
                }
            })?),
        };

        let key = insert_stage(tx, creation_info_key, parent_key, row)?;
        key_by_stage_id.insert(row.stage_id.as_str(), key);
        stage_keys.push(key);
    }

    let mut operator_rows = 0;
    for row in &report.operators {
        let stage_key = *key_by_stage_id.get(row.stage_id.as_str()).ok_or_else(|| {
            StoreError::MissingStageKey {
                stage_id: row.stage_id.clone(),
            }
        })?;
        insert_operator(tx, stage_key, row)?;
        operator_rows += 1;
    }

    let statistics_key = insert_statistics(tx, creation_info_key, &report.statistics)?;

    Ok(InsertedReport {
        creation_info_key,
        stage_keys,
        operator_rows,
        statistics_key,
    })
}

fn insert_creation_info(tx: &Transaction<'_>, row: &CreationInfoRow) -> StoreResult<i64> {
    let result = tx.execute(
        "INSERT INTO presto_query_creation_info (
            query_id, user, source, catalog, schema, state,
            error_category, error_code_name, failure_message, query, create_time
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            row.query_id,
            row.user,
            row.source,
            row.catalog,
            row.schema,
            row.state,
            row.error_category,
            row.error_code_name,
            row.failure_message,
            row.query,
            row.create_time.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(tx.last_insert_rowid()),
        Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateReport {
            query_id: row.query_id.clone(),
        }),
        Err(err) => Err(err.into()),
    }
}

fn insert_stage(
    tx: &Transaction<'_>,
    creation_info_key: i64,
    parent_key: Option<i64>,
    row: &StageStatsRow,
) -> StoreResult<i64> {
    tx.execute(
        "INSERT INTO presto_query_stage_stats (
            creation_info_id, parent_stage_db_id, stage_id, state,
            total_tasks, total_drivers, total_cpu_time_ms, total_scheduled_time_ms,
            total_blocked_time_ms, raw_input_bytes, raw_input_positions,
            output_bytes, output_positions
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            creation_info_key,
            parent_key,
            row.stage_id,
            row.state,
            row.total_tasks,
            row.total_drivers,
            row.total_cpu_time_ms,
            row.total_scheduled_time_ms,
            row.total_blocked_time_ms,
            row.raw_input_bytes,
            row.raw_input_positions,
            row.output_bytes,
            row.output_positions,
        ],
    )?;

    Ok(tx.last_insert_rowid())
}

fn insert_operator(
    tx: &Transaction<'_>,
    stage_key: i64,
    row: &OperatorStatsRow,
) -> StoreResult<()> {
    tx.execute(
        "INSERT INTO presto_query_operator_stats (
            stage_db_id, pipeline_id, operator_id, plan_node_id, operator_type,
            total_drivers, input_positions, input_bytes, output_positions,
            output_bytes, add_input_cpu_ms, get_output_cpu_ms, finish_cpu_ms,
            blocked_wall_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            stage_key,
            row.pipeline_id,
            row.operator_id,
            row.plan_node_id,
            row.operator_type,
            row.total_drivers,
            row.input_positions,
            row.input_bytes,
            row.output_positions,
            row.output_bytes,
            row.add_input_cpu_ms,
            row.get_output_cpu_ms,
            row.finish_cpu_ms,
            row.blocked_wall_ms,
        ],
    )?;

    Ok(())
}

fn insert_statistics(
    tx: &Transaction<'_>,
    creation_info_key: i64,
    row: &QueryStatisticsRow,
) -> StoreResult<i64> {
    tx.execute(
        "INSERT INTO presto_query_statistics (
            creation_info_id, create_time, end_time, elapsed_time_ms,
            queued_time_ms, planning_time_ms, execution_time_ms,
            total_cpu_time_ms, total_scheduled_time_ms, peak_memory_bytes,
            cumulative_memory, raw_input_bytes, raw_input_positions, total_drivers
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            creation_info_key,
            row.create_time.to_rfc3339(),
            row.end_time.map(|t| t.to_rfc3339()),
            row.elapsed_time_ms,
            row.queued_time_ms,
            row.planning_time_ms,
            row.execution_time_ms,
            row.total_cpu_time_ms,
            row.total_scheduled_time_ms,
            row.peak_memory_bytes,
            row.cumulative_memory,
            row.raw_input_bytes,
            row.raw_input_positions,
            row.total_drivers,
        ],
    )?;

    Ok(tx.last_insert_rowid())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[derive(Debug, Clone)]
pub struct StoredStageRow {
    pub id: i64,
    pub creation_info_id: i64,
    pub parent_stage_db_id: Option<i64>,
    pub stage_id: String,
}

#[derive(Debug, Clone)]
pub struct StoredOperatorRow {
    pub id: i64,
    pub stage_db_id: i64,
    pub operator_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableCounts {
    pub creation_info: i64,
    pub stage_stats: i64,
    pub operator_stats: i64,
    pub statistics: i64,
}
