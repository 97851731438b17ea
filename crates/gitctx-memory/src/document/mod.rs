pub mod error;
pub mod splitter;
pub mod types;

pub use error::DocumentError;
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Document, DocumentMetadata};
