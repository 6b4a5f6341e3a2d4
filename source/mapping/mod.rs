mod loader;
mod store;

pub use loader::{load_fields, load_methods, load_params, Error};
pub use store::{Entry, ProjectType, Store};
