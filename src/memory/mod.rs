pub mod source;
pub mod types;

pub use source::{JsonFileSource, MemorySource};
pub use types::MemoryRef;
