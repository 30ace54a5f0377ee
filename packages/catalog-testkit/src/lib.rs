pub mod fixtures;

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

/// Base DSN for the ignored Postgres tests.
pub fn env_dsn() -> Option<String> {
	env::var("CATALOG_PG_DSN").ok()
}

/// A uniquely named database on the server `CATALOG_PG_DSN` points at.
///
/// Nothing drops it implicitly. Tests call [`ScratchDatabase::drop_database`] when they finish.
pub struct ScratchDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
}
impl ScratchDatabase {
	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)?;
		let maintenance = base.clone().database("postgres");
		let name = format!("catalog_test_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&maintenance).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;
		conn.close().await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Drops the database, disconnecting any session still attached to it.
	pub async fn drop_database(self) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.maintenance).await?;

		conn.execute(format!(r#"DROP DATABASE IF EXISTS "{}" WITH (FORCE)"#, self.name).as_str())
			.await?;

		Ok(())
	}
}
