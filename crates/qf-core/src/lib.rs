pub mod config;
pub mod error;

pub use config::QfConfig;
pub use error::{CryptoError, QfError, QfResult, StoreError};
