//! Disposable infrastructure for integration tests.

pub mod error;
pub mod mysql;

pub use error::{Result, TestInfraError};
pub use mysql::{MySqlContainer, MySqlOptions};
