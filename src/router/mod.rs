pub mod call;
pub mod dispatch;
pub mod handler;
pub mod registry;

pub use call::Call;
pub use dispatch::Dispatcher;
pub use handler::{handler, Handler};
pub use registry::{PathTemplate, Registry, RegistryError, Resolution};
