use thiserror::Error;

pub type FlattenResult<T> = Result<T, FlattenError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlattenError {
    #[error("duplicate stage id {stage_id}")]
    DuplicateStageId { stage_id: String },

    #[error("stage {stage_id} appears among its own ancestors")]
    StageCycle { stage_id: String },

    #[error("stage tree exceeds maximum depth {limit}")]
    DepthExceeded { limit: usize },

    #[error("stage {stage_id} references unknown parent {parent_stage_id}")]
    DanglingParent {
        stage_id: String,
        parent_stage_id: String,
    },
}
