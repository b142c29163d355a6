use chrono::{DateTime, Utc};

/// One row per report for the creation-info table. Root of the aggregate;
/// every other row hangs off its generated key.
#[derive(Debug, Clone)]
pub struct CreationInfoRow {
    pub query_id: String,
    pub user: String,
    pub source: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub state: String,
    pub error_category: Option<String>,
    pub error_code_name: Option<String>,
    pub failure_message: Option<String>,
    pub query: String,
    pub create_time: DateTime<Utc>,
}

/// One row per stage. `stage_id` and `parent_stage_id` are the document's
/// identifiers; the store rewrites them to generated keys at insert time.
#[derive(Debug, Clone)]
pub struct StageStatsRow {
    pub stage_id: String,
    pub parent_stage_id: Option<String>,
    pub state: String,
    pub total_tasks: i64,
    pub total_drivers: i64,
    pub total_cpu_time_ms: f64,
    pub total_scheduled_time_ms: f64,
    pub total_blocked_time_ms: f64,
    pub raw_input_bytes: f64,
    pub raw_input_positions: i64,
    pub output_bytes: f64,
    pub output_positions: i64,
}

/// One row per operator, tagged with the owning stage's document identifier.
#[derive(Debug, Clone)]
pub struct OperatorStatsRow {
    pub stage_id: String,
    pub pipeline_id: i64,
    pub operator_id: i64,
    pub plan_node_id: String,
    pub operator_type: String,
    pub total_drivers: i64,
    pub input_positions: i64,
    pub input_bytes: f64,
    pub output_positions: i64,
    pub output_bytes: f64,
    pub add_input_cpu_ms: f64,
    pub get_output_cpu_ms: f64,
    pub finish_cpu_ms: f64,
    pub blocked_wall_ms: f64,
}

/// One summary row per report.
#[derive(Debug, Clone)]
pub struct QueryStatisticsRow {
    pub create_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub elapsed_time_ms: f64,
    pub queued_time_ms: f64,
    pub planning_time_ms: f64,
    pub execution_time_ms: f64,
    pub total_cpu_time_ms: f64,
    pub total_scheduled_time_ms: f64,
    pub peak_memory_bytes: f64,
    pub cumulative_memory: f64,
    pub raw_input_bytes: f64,
    pub raw_input_positions: i64,
    pub total_drivers: i64,
}

/// The flattened aggregate for one report, ready for a single-transaction
/// insert. `stages` is in pre-order: a parent row always precedes its
/// children, and `operators` follows the same stage order.
#[derive(Debug, Clone)]
pub struct FlatReport {
    pub creation_info: CreationInfoRow,
    pub stages: Vec<StageStatsRow>,
    pub operators: Vec<OperatorStatsRow>,
    pub statistics: QueryStatisticsRow,
}

impl FlatReport {
    pub fn row_count(&self) -> usize {
        2 + self.stages.len() + self.operators.len()
    }
}
