pub mod matcher;
pub mod pipeline;
pub mod scanner;
pub mod walker;

pub use matcher::{MatchMode, Matcher};
pub use pipeline::Engine;
