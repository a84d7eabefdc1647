pub mod document;
pub mod index;

pub use document::{DEFAULT_DOC_TYPE, DocumentBuilder};
pub use index::{DEFAULT_INDEX_PREFIX, IndexRouter};
