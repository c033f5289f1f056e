mod api_key;
mod auth;
mod error_handler;
mod rate_limit;

pub use api_key::{ApiKeyContext, api_key_auth};
pub use auth::{auth_middleware, require_admin};
pub use error_handler::log_errors;
pub use rate_limit::{LIMIT_HEADER, REMAINING_HEADER, rate_limit};
