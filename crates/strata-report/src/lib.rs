mod report;
mod scalars;

pub use report::{
    ErrorCode, FailureInfo, OperatorSummary, QueryReport, QueryStats, SessionInfo, StageNode,
    StageStats,
};
pub use scalars::{DataSize, EngineDuration, ParseDataSizeError, ParseDurationError};
