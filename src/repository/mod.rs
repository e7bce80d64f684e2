//! Owner-scoped repositories.

mod document;

pub use document::DocumentRepository;
