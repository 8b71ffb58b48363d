use crate::error::{Result, TestInfraError};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use tracing::debug;
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone, TypedBuilder)]
pub struct MySqlOptions {
    #[builder(default = "8.4".to_string(), setter(into))]
    image_tag: String,
    #[builder(default = "littleurl".to_string(), setter(into))]
    database: String,
    #[builder(default = "littleurl".to_string(), setter(into))]
    user: String,
    #[builder(default = "littleurl".to_string(), setter(into))]
    password: String,
    /// The "ready for connections" log line shows up before the server
    /// accepts TCP clients, so pool creation is retried.
    #[builder(default = 20)]
    connect_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    connect_backoff: Duration,
}

impl Default for MySqlOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A MySQL server running in a throwaway container.
///
/// The container is removed when this value is dropped.
pub struct MySqlContainer {
    container: ContainerAsync<GenericImage>,
    options: MySqlOptions,
}

impl MySqlContainer {
    pub async fn start(options: MySqlOptions) -> Result<Self> {
        let container = GenericImage::new("mysql", options.image_tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", options.database.as_str())
            .with_env_var("MYSQL_USER", options.user.as_str())
            .with_env_var("MYSQL_PASSWORD", options.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        Ok(Self { container, options })
    }

    pub async fn dsn(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(MYSQL_PORT).await?;
        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            self.options.user, self.options.password, host, port, self.options.database
        ))
    }

    /// Opens a small pool, retrying until the server takes connections.
    pub async fn pool(&self) -> Result<MySqlPool> {
        let dsn = self.dsn().await?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match MySqlPoolOptions::new().max_connections(5).connect(&dsn).await {
                Ok(pool) => return Ok(pool),
                Err(source) if attempt >= self.options.connect_attempts => {
                    return Err(TestInfraError::Connect {
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    debug!(attempt, error = %e, "mysql not ready yet");
                    tokio::time::sleep(self.options.connect_backoff).await;
                }
            }
        }
    }
}
