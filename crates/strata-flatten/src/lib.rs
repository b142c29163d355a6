mod error;
mod flatten;
mod rows;

pub use error::{FlattenError, FlattenResult};
pub use flatten::{flatten_report, rebuild_stage_tree, RebuiltStage};
pub use rows::{
    CreationInfoRow, FlatReport, OperatorStatsRow, QueryStatisticsRow, StageStatsRow,
};
