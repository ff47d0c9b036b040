pub mod config;
pub mod context;
pub mod editor;
pub mod errors;
pub mod filters;
pub mod search;
pub mod store;
pub mod ui;

// Re-export commonly used types
pub use config::NgprcConfig;
pub use context::SearchContext;
pub use errors::{Error, Result};
pub use filters::Filters;
pub use search::{Engine, MatchMode, Matcher};
pub use store::{Entry, ResultStore, SharedStore};
pub use ui::{App, Outcome};
