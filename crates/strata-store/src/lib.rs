mod error;
mod schema;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use schema::{bundled_migrations, run_migrations, Migration};
pub use sqlite::{
    InsertedReport, ReportStore, SqliteReportStore, StoredOperatorRow, StoredStageRow, TableCounts,
};
