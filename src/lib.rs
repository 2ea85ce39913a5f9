pub mod config;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod service;
pub mod session;
pub mod storage;
pub mod transfer;
pub mod utils;

pub use config::BridgeConfig;
pub use service::{FileService, ServiceOptions};
