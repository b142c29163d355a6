use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report {query_id} is already loaded")]
    DuplicateReport { query_id: String },

    #[error("stage {stage_id} references parent {parent_stage_id} with no generated key")]
    MissingParentKey {
        stage_id: String,
        parent_stage_id: String,
    },

    #[error("operator row references stage {stage_id} with no generated key")]
    MissingStageKey { stage_id: String },

    #[error("migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
