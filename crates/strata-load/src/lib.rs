mod batch;
mod error;

pub use batch::{BatchSummary, LoadFailure, Loader};
pub use error::LoadError;
