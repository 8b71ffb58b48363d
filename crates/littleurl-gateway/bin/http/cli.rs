use clap::{Parser, ValueEnum};
use littleurl_core::{CollisionPolicy, LifecycleSettings};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "LITTLEURL_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "LITTLEURL_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "LITTLEURL_MYSQL_DSN";
pub const TABLE_NAME_ENV: &str = "LITTLEURL_TABLE_NAME";
pub const RETENTION_DAYS_ENV: &str = "LITTLEURL_RETENTION_DAYS";
pub const COLLISION_POLICY_ENV: &str = "LITTLEURL_COLLISION_POLICY";
pub const MAX_ATTEMPTS_ENV: &str = "LITTLEURL_MAX_COLLISION_ATTEMPTS";
pub const LOG_FORMAT_ENV: &str = "LITTLEURL_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollisionPolicyArg {
    Overwrite,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "littleurl-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = TABLE_NAME_ENV,
        default_value = littleurl_storage::mysql::DEFAULT_TABLE_NAME
    )]
    pub table_name: String,

    /// Kept as raw text: unset, unparseable or out of range values fall back
    /// to the default window instead of failing startup.
    #[arg(long, env = RETENTION_DAYS_ENV)]
    pub retention_days: Option<String>,

    #[arg(
        long,
        env = COLLISION_POLICY_ENV,
        value_enum,
        default_value_t = CollisionPolicyArg::Overwrite
    )]
    pub collision_policy: CollisionPolicyArg,

    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_collision_attempts: u32,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

impl CLI {
    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        let collision_policy = match self.collision_policy {
            CollisionPolicyArg::Overwrite => CollisionPolicy::Overwrite,
            CollisionPolicyArg::Retry => CollisionPolicy::Retry {
                max_attempts: self.max_collision_attempts,
            },
        };

        LifecycleSettings::builder()
            .retention_days(LifecycleSettings::retention_days_or_default(
                self.retention_days.as_deref(),
            ))
            .collision_policy(collision_policy)
            .build()
    }
}
