pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod jobs;
pub mod push;
pub mod settlements;

pub use config::{Config, DispatchTiming};
pub use dispatch::Coordinator;
pub use error::DispatchError;
