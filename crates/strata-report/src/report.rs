use crate::scalars::{DataSize, EngineDuration};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One query-execution report as the engine serializes it. Only the fields
/// strata persists are modeled; everything else in the document is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub query_id: String,
    pub session: SessionInfo,
    pub state: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub output_stage: Option<StageNode>,
    pub query_stats: QueryStats,
    #[serde(default)]
    pub error_code: Option<ErrorCode>,
    #[serde(default)]
    pub failure_info: Option<FailureInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorCode {
    pub code: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FailureInfo {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A node of the execution-stage tree. `sub_stages` nests recursively; the
/// document carries no explicit parent pointers, nesting is the linkage.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageNode {
    pub stage_id: String,
    pub state: String,
    pub stage_stats: StageStats,
    #[serde(default)]
    pub sub_stages: Vec<StageNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStats {
    #[serde(default)]
    pub total_tasks: i64,
    #[serde(default)]
    pub total_drivers: i64,
    #[serde(default)]
    pub total_cpu_time: EngineDuration,
    #[serde(default)]
    pub total_scheduled_time: EngineDuration,
    #[serde(default)]
    pub total_blocked_time: EngineDuration,
    #[serde(default)]
    pub raw_input_data_size: DataSize,
    #[serde(default)]
    pub raw_input_positions: i64,
    #[serde(default)]
    pub output_data_size: DataSize,
    #[serde(default)]
    pub output_positions: i64,
    #[serde(default)]
    pub operator_summaries: Vec<OperatorSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSummary {
    #[serde(default)]
    pub pipeline_id: i64,
    #[serde(default)]
    pub operator_id: i64,
    #[serde(default)]
    pub plan_node_id: String,
    pub operator_type: String,
    #[serde(default)]
    pub total_drivers: i64,
    #[serde(default)]
    pub input_positions: i64,
    #[serde(default)]
    pub input_data_size: DataSize,
    #[serde(default)]
    pub output_positions: i64,
    #[serde(default)]
    pub output_data_size: DataSize,
    #[serde(default)]
    pub add_input_cpu: EngineDuration,
    #[serde(default)]
    pub get_output_cpu: EngineDuration,
    #[serde(default)]
    pub finish_cpu: EngineDuration,
    #[serde(default)]
    pub blocked_wall: EngineDuration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    pub create_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub elapsed_time: EngineDuration,
    #[serde(default)]
    pub queued_time: EngineDuration,
    #[serde(default)]
    pub total_planning_time: EngineDuration,
    #[serde(default)]
    pub execution_time: EngineDuration,
    #[serde(default)]
    pub total_cpu_time: EngineDuration,
    #[serde(default)]
    pub total_scheduled_time: EngineDuration,
    #[serde(default)]
    pub peak_total_memory_reservation: DataSize,
    #[serde(default)]
    pub cumulative_user_memory: f64,
    #[serde(default)]
    pub raw_input_data_size: DataSize,
    #[serde(default)]
    pub raw_input_positions: i64,
    #[serde(default)]
    pub total_drivers: i64,
}
