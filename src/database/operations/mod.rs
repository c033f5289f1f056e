pub mod api_key;
pub mod usage;

pub use api_key::ApiKeyOperation;
pub use usage::UsageOperation;
