pub mod session;

pub use session::{load_record, session_layer, store_record, SessionHandle, SessionRecord};
