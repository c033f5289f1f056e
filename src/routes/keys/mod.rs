mod handler;
mod model;

pub use handler::{create_key, delete_key, list_keys, update_key};
