//! `tokio-postgres` warehouse backend

use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use super::{validate_identifier, LoadError, LoadResult, WarehouseConnector, WarehouseSession};
use crate::schema::CellValue;

/// Default warehouse port
pub const DEFAULT_PORT: u16 = 5432;

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Warehouse credentials and session settings
#[derive(Clone)]
pub struct WarehouseConfig {
    /// Host name or account endpoint
    pub host: String,
    /// Port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Login password
    pub password: String,
    /// Database name
    pub database: String,
    /// Schema placed on the search path
    pub schema: Option<String>,
    /// Role assumed after login
    pub role: Option<String>,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl WarehouseConfig {
    /// Config with default port and no schema or role
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            schema: None,
            role: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        }
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.database)
            .connect_timeout(self.connect_timeout)
            .application_name(env!("CARGO_PKG_NAME"));
        config
    }
}

// Password stays out of logs
impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .finish()
    }
}

/// Opens [`PostgresSession`]s
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: WarehouseConfig,
}

impl PostgresConnector {
    /// Create a connector
    pub fn new(config: WarehouseConfig) -> Self {
        Self { config }
    }

    /// Connection settings
    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }
}

#[async_trait]
impl WarehouseConnector for PostgresConnector {
    async fn connect(&self) -> LoadResult<Box<dyn WarehouseSession>> {
        if let Some(schema) = &self.config.schema {
            validate_identifier(schema, false)?;
        }
        if let Some(role) = &self.config.role {
            validate_identifier(role, false)?;
        }

        info!(
            "Connecting to warehouse {}:{}/{} as {}",
            self.config.host, self.config.port, self.config.database, self.config.user
        );

        let (client, connection) = self
            .config
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| LoadError::Connect(e.to_string()))?;

        // Drives the socket until the client is dropped
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Warehouse connection error: {}", e);
            }
        });

        let mut session = PostgresSession {
            client: Some(client),
            connection: Some(handle),
        };

        if let Some(role) = &self.config.role {
            session.batch(&format!("SET ROLE {role}")).await?;
        }
        if let Some(schema) = &self.config.schema {
            session.batch(&format!("SET search_path TO {schema}")).await?;
        }

        Ok(Box::new(session))
    }
}

/// An open `tokio-postgres` connection
pub struct PostgresSession {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
}

impl PostgresSession {
    fn client(&self) -> LoadResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| LoadError::Connect("session already closed".to_string()))
    }

    async fn batch(&self, sql: &str) -> LoadResult<()> {
        debug!("Executing: {}", sql);
        self.client()?
            .batch_execute(sql)
            .await
            .map_err(|e| LoadError::Statement(format!("{sql}: {e}")))
    }
}

#[async_trait]
impl WarehouseSession for PostgresSession {
    async fn begin(&mut self) -> LoadResult<()> {
        self.batch("BEGIN").await
    }

    async fn execute(&mut self, sql: &str, params: &[CellValue]) -> LoadResult<u64> {
        let bound: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| match p {
                CellValue::Text(v) => v as &(dyn ToSql + Sync),
                CellValue::Bool(v) => v as &(dyn ToSql + Sync),
            })
            .collect();

        self.client()?
            .execute(sql, &bound)
            .await
            .map_err(|e| LoadError::Statement(e.to_string()))
    }

    async fn commit(&mut self) -> LoadResult<()> {
        self.batch("COMMIT").await
    }

    async fn rollback(&mut self) -> LoadResult<()> {
        self.batch("ROLLBACK").await
    }

    async fn close(&mut self) -> LoadResult<()> {
        drop(self.client.take());
        if let Some(handle) = self.connection.take() {
            handle
                .await
                .map_err(|e| LoadError::Connect(format!("connection task failed: {e}")))?;
        }
        debug!("Warehouse session closed");
        Ok(())
    }
}
