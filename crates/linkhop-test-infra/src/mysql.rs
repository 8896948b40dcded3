use crate::Result;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

/// Schema of the `short_links` table, applied by [`MySqlServer::pool`].
pub const SHORT_LINKS_DDL: &str = include_str!("../../linkhop-storage/ddl/mysql/short_links.sql");

const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, TypedBuilder)]
pub struct MySqlConfig {
    #[builder(default = String::from("8.4"))]
    tag: String,
    #[builder(default = String::from("linkhop"), setter(into))]
    database: String,
    #[builder(default = String::from("linkhop"), setter(into))]
    username: String,
    #[builder(default = String::from("linkhop"), setter(into))]
    password: String,
    #[builder(default = 5)]
    max_connections: u32,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Disposable MySQL server holding a fresh `short_links` schema.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MySqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MySqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(3306_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        Ok(Self { container, config })
    }

    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(3306).await?;
        let MySqlConfig {
            database,
            username,
            password,
            ..
        } = &self.config;

        Ok(format!("mysql://{username}:{password}@{host}:{port}/{database}"))
    }

    /// Connects a pool and creates the `short_links` table.
    ///
    /// mysqld logs "ready for connections" once during its init phase before
    /// the real server starts, so the first connects may be refused.
    pub async fn pool(&self) -> Result<MySqlPool> {
        let pool = self.connect().await?;

        for statement in SHORT_LINKS_DDL.split(';').map(str::trim) {
            if !statement.is_empty() {
                sqlx::query(statement).execute(&pool).await?;
            }
        }

        Ok(pool)
    }

    async fn connect(&self) -> Result<MySqlPool> {
        let url = self.database_url().await?;
        let options = MySqlPoolOptions::new().max_connections(self.config.max_connections);

        let mut attempts = 1;
        loop {
            match options.clone().connect(&url).await {
                Ok(pool) => return Ok(pool),
                Err(e) if attempts >= CONNECT_ATTEMPTS => return Err(e.into()),
                Err(_) => {
                    attempts += 1;
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                }
            }
        }
    }
}
