mod app;
mod config;
mod distributed;
mod http;
mod sink;
mod template;
mod validation;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use distributed::DistributedError;
pub use http::HttpError;
pub use sink::SinkError;
pub use template::TemplateError;
pub use validation::ValidationError;
