// HTTP actions. Each module registers its routes against the shared `App` and
// synchronizes the concepts it touches; routes are relative to the API base path.
pub mod collections;
pub mod friends;
pub mod posts;
pub mod progress;
pub mod responses;
pub mod trackers;
pub mod users;

use crate::app::App;
use crate::router::{Registry, RegistryError};

pub fn register_all(registry: &mut Registry<App>) -> Result<(), RegistryError> {
    users::register(registry)?;
    posts::register(registry)?;
    friends::register(registry)?;
    trackers::register(registry)?;
    collections::register(registry)?;
    progress::register(registry)?;
    Ok(())
}
