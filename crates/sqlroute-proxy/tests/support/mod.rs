//! Testcontainers helpers for sqlroute integration tests.
//!
//! Starts a throwaway MySQL 8 server with an `app` user and an empty
//! `sakila` database.

use sqlroute_common::{DbCredentials, Node};
use sqlroute_proxy::{Connector, MySqlConnector};
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    GenericImage, ImageExt,
};

pub const DB_USER: &str = "app";
pub const DB_PASSWORD: &str = "password";
pub const DB_NAME: &str = "sakila";

pub fn credentials() -> DbCredentials {
    DbCredentials::new(DB_USER, DB_PASSWORD, DB_NAME)
}

pub struct MySqlContainer {
    #[allow(dead_code)]
    container: testcontainers::ContainerAsync<GenericImage>,
    pub host: String,
    pub port: u16,
}

impl MySqlContainer {
    pub async fn start() -> anyhow::Result<Self> {
        let image = GenericImage::new("mysql", "8.0")
            .with_exposed_port(3306.tcp())
            // The entrypoint runs a temporary server on port 0 first.
            .with_wait_for(WaitFor::message_on_stderr("port: 3306  MySQL Community Server"))
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .with_env_var("MYSQL_DATABASE", DB_NAME)
            .with_env_var("MYSQL_USER", DB_USER)
            .with_env_var("MYSQL_PASSWORD", DB_PASSWORD);

        let container = image.start().await?;
        let port = container.get_host_port_ipv4(3306).await?;

        let mysql = Self {
            container,
            host: "127.0.0.1".to_string(),
            port,
        };
        mysql.wait_for_ready().await?;
        Ok(mysql)
    }

    pub fn node(&self) -> Node {
        Node::manager(self.host.clone(), self.port)
    }

    async fn wait_for_ready(&self) -> anyhow::Result<()> {
        let connector = MySqlConnector::new(credentials(), Duration::from_secs(2));
        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(60);

        while start.elapsed() < timeout {
            if let Ok(session) = connector.connect(&self.node()).await {
                session.close().await?;
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        anyhow::bail!("MySQL did not accept connections on port {}", self.port);
    }
}
