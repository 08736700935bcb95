pub mod collection;
pub mod document;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use collection::DocCollection;
pub use document::{Document, FieldPatch, Patch};
pub use manager::{DatabaseError, DatabaseManager};
pub use store::DocumentStore;
