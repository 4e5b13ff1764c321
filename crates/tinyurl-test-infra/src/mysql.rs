use crate::{Result, TestInfraError};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const MYSQL_IMAGE: &str = "mysql";
const MYSQL_PORT: u16 = 3306;
// The init server also logs "ready for connections", but only the final one binds X Plugin here.
const READY_MESSAGE: &str = "X Plugin ready for connections. Bind-address: '::' port: 33060";

/// Credentials and image for a disposable MySQL server.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "8.4".to_string())]
    tag: String,
    #[builder(default = "tinyurl".to_string())]
    database: String,
    #[builder(default = "tinyurl".to_string())]
    username: String,
    #[builder(default = "tinyurl".to_string())]
    password: String,
}

/// A MySQL container that lives as long as this value.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    /// Starts the container and waits until MySQL accepts connections.
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new(MYSQL_IMAGE, &config.tag)
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(READY_MESSAGE))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await
            .map_err(|source| TestInfraError::Start {
                image: MYSQL_IMAGE,
                source,
            })?;

        Ok(Self { container, config })
    }

    /// Host and mapped port of the server.
    pub async fn address(&self) -> Result<(String, u16)> {
        let host = self
            .container
            .get_host()
            .await
            .map_err(TestInfraError::Unreachable)?;
        let port = self
            .container
            .get_host_port_ipv4(MYSQL_PORT)
            .await
            .map_err(TestInfraError::Unreachable)?;
        Ok((host.to_string(), port))
    }

    /// A `mysql://` DSN for the configured user and database.
    pub async fn database_url(&self) -> Result<String> {
        let (host, port) = self.address().await?;
        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            self.config.username, self.config.password, host, port, self.config.database
        ))
    }
}
