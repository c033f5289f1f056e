mod handler;

pub use handler::analytics;
