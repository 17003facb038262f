//! Shared data model for oTree deployment access: the error taxonomy, the
//! tabular payload type, the lazy per-app CSV store, and the deployment
//! settings snapshot with its session-config merge rules.

mod error;
mod settings;
mod store;
mod table;

pub use error::{Error, Result};
pub use settings::{SessionConfig, Settings};
pub use store::CsvStore;
pub use table::DataTable;
