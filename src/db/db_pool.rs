use duckdb::{AccessMode, Config, Connection};
use r2d2::ManageConnection;
use std::path::PathBuf;

/// Hands out DuckDB connections opened in read-only access mode.
pub struct ReadOnlyDuckDbManager {
    path: PathBuf,
}

impl ReadOnlyDuckDbManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ManageConnection for ReadOnlyDuckDbManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Connection, duckdb::Error> {
        let flags = Config::default().access_mode(AccessMode::ReadOnly)?;
        Connection::open_with_flags(&self.path, flags)
    }

    fn is_valid(&self, conn: &mut Connection) -> Result<(), duckdb::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, _conn: &mut Connection) -> bool {
        false
    }
}
