pub mod client;
pub mod config;
pub mod error;
pub mod logs;
pub mod output;
pub mod poller;
pub mod request;

pub use client::ProtocolClient;
pub use config::{ClientConfig, ConfigProvider, Credentials, FileConfigProvider};
pub use error::{ClientError, HttpErrorKind};
pub use logs::StreamEnd;
pub use poller::StatusPoller;

/// Sent as `client-version` with every request.
pub const CLIENT_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));
