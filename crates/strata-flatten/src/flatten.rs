use crate::error::{FlattenError, FlattenResult};
use crate::rows::{
    CreationInfoRow, FlatReport, OperatorStatsRow, QueryStatisticsRow, StageStatsRow,
};
use std::collections::{HashMap, HashSet};
use strata_report::{OperatorSummary, QueryReport, StageNode};

/// Flattens one report into ordered row sets. Stages come out in pre-order
/// (parent before children, children in source order); operators follow the
/// same stage order. Pure: no I/O, deterministic for a given input.
pub fn flatten_report(report: &QueryReport, max_depth: usize) -> FlattenResult<FlatReport> {
    let mut walk = StageWalk {
        max_depth,
        seen: HashSet::new(),
        ancestors: Vec::new(),
        stages: Vec::new(),
        operators: Vec::new(),
    };

    if let Some(root) = &report.output_stage {
        walk.visit(root, None, 0)?;
    }

    Ok(FlatReport {
        creation_info: creation_info_row(report),
        stages: walk.stages,
        operators: walk.operators,
        statistics: statistics_row(report),
    })
}

struct StageWalk<'a> {
    max_depth: usize,
    seen: HashSet<&'a str>,
    ancestors: Vec<&'a str>,
    stages: Vec<StageStatsRow>,
    operators: Vec<OperatorStatsRow>,
}

impl<'a> StageWalk<'a> {
    fn visit(
        &mut self,
        node: &'a StageNode,
        parent_stage_id: Option<&'a str>,
        depth: usize,
    ) -> FlattenResult<()> {
        if depth >= self.max_depth {
            return Err(FlattenError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        // An id collision with a node still on the visit path means the
        // declared parent chain loops back on itself; report that as a cycle
        // rather than a plain duplicate.
        if self.ancestors.iter().any(|id| *id == node.stage_id) {
            return Err(FlattenError::StageCycle {
                stage_id: node.stage_id.clone(),
            });
        }
        if !self.seen.insert(node.stage_id.as_str()) {
            return Err(FlattenError::DuplicateStageId {
                stage_id: node.stage_id.clone(),
            });
        }

        self.stages.push(stage_row(node, parent_stage_id));
        for summary in &node.stage_stats.operator_summaries {
            self.operators.push(operator_row(&node.stage_id, summary));
        }

        self.ancestors.push(node.stage_id.as_str());
        for child in &node.sub_stages {
            self.visit(child, Some(node.stage_id.as_str()), depth + 1)?;
        }
        self.ancestors.pop();

        Ok(())
    }
}

fn creation_info_row(report: &QueryReport) -> CreationInfoRow {
    CreationInfoRow {
        query_id: report.query_id.clone(),
        user: report.session.user.clone(),
        source: report.session.source.clone(),
        catalog: report.session.catalog.clone(),
        schema: report.session.schema.clone(),
        state: report.state.clone(),
        error_category: report
            .error_code
            .as_ref()
            .and_then(|code| code.category.clone()),
        error_code_name: report.error_code.as_ref().map(|code| code.name.clone()),
        failure_message: report
            .failure_info
            .as_ref()
            .and_then(|failure| failure.message.clone()),
        query: report.query.clone(),
        create_time: report.query_stats.create_time,
    }
}

fn stage_row(node: &StageNode, parent_stage_id: Option<&str>) -> StageStatsRow {
    let stats = &node.stage_stats;
    StageStatsRow {
        stage_id: node.stage_id.clone(),
        parent_stage_id: parent_stage_id.map(str::to_string),
        state: node.state.clone(),
        total_tasks: stats.total_tasks,
        total_drivers: stats.total_drivers,
        total_cpu_time_ms: stats.total_cpu_time.as_millis_f64(),
        total_scheduled_time_ms: stats.total_scheduled_time.as_millis_f64(),
        total_blocked_time_ms: stats.total_blocked_time.as_millis_f64(),
        raw_input_bytes: stats.raw_input_data_size.as_bytes_f64(),
        raw_input_positions: stats.raw_input_positions,
        output_bytes: stats.output_data_size.as_bytes_f64(),
        output_positions: stats.output_positions,
    }
}

fn operator_row(stage_id: &str, summary: &OperatorSummary) -> OperatorStatsRow {
    OperatorStatsRow {
        stage_id: stage_id.to_string(),
        pipeline_id: summary.pipeline_id,
        operator_id: summary.operator_id,
        plan_node_id: summary.plan_node_id.clone(),
        operator_type: summary.operator_type.clone(),
        total_drivers: summary.total_drivers,
        input_positions: summary.input_positions,
        input_bytes: summary.input_data_size.as_bytes_f64(),
        output_positions: summary.output_positions,
        output_bytes: summary.output_data_size.as_bytes_f64(),
        add_input_cpu_ms: summary.add_input_cpu.as_millis_f64(),
        get_output_cpu_ms: summary.get_output_cpu.as_millis_f64(),
        finish_cpu_ms: summary.finish_cpu.as_millis_f64(),
        blocked_wall_ms: summary.blocked_wall.as_millis_f64(),
    }
}

fn statistics_row(report: &QueryReport) -> QueryStatisticsRow {
    let stats = &report.query_stats;
    QueryStatisticsRow {
        create_time: stats.create_time,
        end_time: stats.end_time,
        elapsed_time_ms: stats.elapsed_time.as_millis_f64(),
        queued_time_ms: stats.queued_time.as_millis_f64(),
        planning_time_ms: stats.total_planning_time.as_millis_f64(),
        execution_time_ms: stats.execution_time.as_millis_f64(),
        total_cpu_time_ms: stats.total_cpu_time.as_millis_f64(),
        total_scheduled_time_ms: stats.total_scheduled_time.as_millis_f64(),
        peak_memory_bytes: stats.peak_total_memory_reservation.as_bytes_f64(),
        cumulative_memory: stats.cumulative_user_memory,
        raw_input_bytes: stats.raw_input_data_size.as_bytes_f64(),
        raw_input_positions: stats.raw_input_positions,
        total_drivers: stats.total_drivers,
    }
}

/// The parent/child structure recovered from flattened rows, used to check
/// that flattening lost nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuiltStage {
    pub stage_id: String,
    pub children: Vec<RebuiltStage>,
}

/// Reconstructs the stage forest from `(parent_stage_id, row)` pairs.
/// Rejects duplicate ids, parents missing from the row set, and row sets
/// whose parent chain loops without reaching a root.
pub fn rebuild_stage_tree(rows: &[StageStatsRow]) -> FlattenResult<Vec<RebuiltStage>> {
    let mut ids = HashSet::with_capacity(rows.len());
    for row in rows {
        if !ids.insert(row.stage_id.as_str()) {
            return Err(FlattenError::DuplicateStageId {
                stage_id: row.stage_id.clone(),
            });
        }
    }

    let mut children: HashMap<&str, Vec<&StageStatsRow>> = HashMap::new();
    let mut roots: Vec<&StageStatsRow> = Vec::new();
    for row in rows {
        match row.parent_stage_id.as_deref() {
            None => roots.push(row),
            Some(parent) => {
                if !ids.contains(parent) {
                    return Err(FlattenError::DanglingParent {
                        stage_id: row.stage_id.clone(),
                        parent_stage_id: parent.to_string(),
                    });
                }
                children.entry(parent).or_default().push(row);
            }
        }
    }

    let mut reached = HashSet::with_capacity(rows.len());
    let forest = roots
        .iter()
        .map(|row| build_rebuilt(row, &children, &mut reached))
        .collect();

    if reached.len() != rows.len() {
        let stranded = rows
            .iter()
            .find(|row| !reached.contains(row.stage_id.as_str()))
            .map(|row| row.stage_id.clone())
            .unwrap_or_default();
        return Err(FlattenError::StageCycle {
            stage_id: stranded,
        });
    }

    Ok(forest)
}

fn build_rebuilt<'a>(
    row: &'a StageStatsRow,
    children: &HashMap<&str, Vec<&'a StageStatsRow>>,
    reached: &mut HashSet<&'a str>,
) -> RebuiltStage {
    reached.insert(row.stage_id.as_str());
    let nested = children
        .get(row.stage_id.as_str())
        .map(|rows| {
            rows.iter()
                .map(|child| build_rebuilt(child, children, reached))
                .collect()
        })
        .unwrap_or_default();

    RebuiltStage {
        stage_id: row.stage_id.clone(),
        children: nested,
    }
}
