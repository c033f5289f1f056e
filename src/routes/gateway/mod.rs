mod handler;
mod model;

pub use handler::{chat_completions, list_models};
