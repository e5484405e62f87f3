//! Configuration management

use crate::error::{IntakeError, Result};
use csvdrop_common::env::{env_parse, env_string};
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default database host.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default database port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default pool size. One connection, so loads reach the server one at a time.
pub const DEFAULT_DB_POOL_SIZE: u32 = 1;

/// Default time to wait for a connection, in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default target table.
pub const DEFAULT_TABLE: &str = "csvdata";

/// Default number of loads dispatched ahead of their completion.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Full runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DbConfig,
    pub intake: IntakeConfig,
}

impl Config {
    /// Read the environment
    ///
    /// Call `dotenvy::dotenv()` first if `.env` should be honoured.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            database: DbConfig::from_env()?,
            intake: IntakeConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.intake.validate()
    }
}

/// Storage connection settings
///
/// `DATABASE_URL` wins over the individual `CSVDROP_DB_*` parts when set.
#[derive(Clone)]
pub struct DbConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub pool_size: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: None,
            password: None,
            database: None,
            pool_size: DEFAULT_DB_POOL_SIZE,
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: env_string("DATABASE_URL"),
            host: env_string("CSVDROP_DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
            port: env_parse("CSVDROP_DB_PORT")?.unwrap_or(DEFAULT_DB_PORT),
            user: env_string("CSVDROP_DB_USER"),
            password: env_string("CSVDROP_DB_PASSWORD"),
            database: env_string("CSVDROP_DB_NAME"),
            pool_size: env_parse("CSVDROP_DB_POOL_SIZE")?.unwrap_or(DEFAULT_DB_POOL_SIZE),
            connect_timeout_secs: env_parse("CSVDROP_DB_CONNECT_TIMEOUT")?
                .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(IntakeError::config("CSVDROP_DB_POOL_SIZE must be greater than 0"));
        }

        if self.url.is_none() && self.host.trim().is_empty() {
            return Err(IntakeError::config("CSVDROP_DB_HOST cannot be empty"));
        }

        Ok(())
    }

    /// Build driver connection options
    ///
    /// Parts left unset fall back to libpq's own defaults (`PGUSER`, `PGDATABASE`, ...).
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(ref url) = self.url {
            return url
                .parse::<PgConnectOptions>()
                .map_err(|e| IntakeError::config(format!("invalid DATABASE_URL: {}", e)));
        }

        let mut options = PgConnectOptions::new().host(&self.host).port(self.port);

        if let Some(ref user) = self.user {
            options = options.username(user);
        }
        if let Some(ref password) = self.password {
            options = options.password(password);
        }
        if let Some(ref database) = self.database {
            options = options.database(database);
        }

        Ok(options)
    }
}

/// Batch behaviour settings
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub table: TableName,
    pub max_in_flight: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            table: TableName::unqualified(DEFAULT_TABLE),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self> {
        let table = match env_string("CSVDROP_TABLE") {
            Some(raw) => raw.parse()?,
            None => TableName::unqualified(DEFAULT_TABLE),
        };

        Ok(Self {
            table,
            max_in_flight: env_parse("CSVDROP_MAX_IN_FLIGHT")?.unwrap_or(DEFAULT_MAX_IN_FLIGHT),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(IntakeError::config("CSVDROP_MAX_IN_FLIGHT must be greater than 0"));
        }
        Ok(())
    }
}

/// A table reference that is safe to splice into SQL
///
/// Bulk-load statements cannot bind identifiers as parameters, so the name is
/// restricted to plain identifiers and always emitted double-quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    fn unqualified(name: &str) -> Self {
        Self {
            schema: None,
            name: name.to_string(),
        }
    }

    /// `"schema"."name"` or `"name"`
    pub fn quoted(&self) -> String {
        match self.schema {
            Some(ref schema) => format!("\"{}\".\"{}\"", schema, self.name),
            None => format!("\"{}\"", self.name),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.schema {
            Some(ref schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for TableName {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        let (schema, name) = match parts.as_slice() {
            [name] => (None, *name),
            [schema, name] => (Some(*schema), *name),
            _ => return Err(IntakeError::config(format!("invalid table name '{}'", s))),
        };

        for part in schema.iter().chain(std::iter::once(&name)) {
            if !is_plain_identifier(part) {
                return Err(IntakeError::config(format!(
                    "invalid table name '{}': '{}' is not a plain identifier",
                    s, part
                )));
            }
        }

        Ok(Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        })
    }
}

fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
