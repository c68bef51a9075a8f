//! Catalog persistence
//!
//! SQLite is the durability layer only: the catalog survives restarts by
//! reloading the `symtoken` table into an in-memory generation on startup.
//! Runtime lookups never touch the connection.

use crate::error::Result;
use crate::model::{Exchange, Instrument, InstrumentType};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection};
use std::path::Path;

/// Injected storage handle for the canonical catalog
pub struct CatalogDb {
    conn: Mutex<Connection>,
}

impl CatalogDb {
    /// Open (or create) the catalog database at the given path
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database, used by tests and ephemeral sessions
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS migrations (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        run_migration(&conn, "001_symtoken", CREATE_SYMTOKEN_TABLE)?;

        tracing::info!("Catalog database migrations completed");
        Ok(())
    }

    /// Persist one complete generation, replacing whatever was stored.
    ///
    /// Runs in a single transaction so a crash mid-write leaves the previous
    /// stored generation intact.
    pub fn replace_all(&self, instruments: &[Instrument]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM symtoken", [])?;

        let mut stmt = tx.prepare(
            "INSERT INTO symtoken (symbol, broker_symbol, name, exchange, broker_exchange,
                                   token, expiry, strike, lot_size, instrument_type, tick_size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;

        for instrument in instruments {
            stmt.execute(params![
                instrument.symbol,
                instrument.broker_symbol,
                instrument.name,
                instrument.exchange.as_str(),
                instrument.broker_exchange,
                instrument.token,
                instrument.expiry,
                instrument.strike,
                instrument.lot_size,
                instrument.instrument_type.as_str(),
                instrument.tick_size,
            ])?;
        }

        drop(stmt);
        tx.commit()?;

        tracing::info!("Stored {} instruments in catalog database", instruments.len());
        Ok(())
    }

    /// Load the persisted generation (used to warm the in-memory catalog on
    /// startup)
    pub fn load_all(&self) -> Result<Vec<Instrument>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT symbol, broker_symbol, name, exchange, broker_exchange,
                    token, expiry, strike, lot_size, instrument_type, tick_size
             FROM symtoken",
        )?;

        let instruments = stmt
            .query_map([], |row| {
                let exchange: String = row.get(3)?;
                let instrument_type: String = row.get(9)?;
                Ok(Instrument {
                    symbol: row.get(0)?,
                    broker_symbol: row.get(1)?,
                    name: row.get(2)?,
                    exchange: exchange.parse::<Exchange>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
                    })?,
                    broker_exchange: row.get(4)?,
                    token: row.get(5)?,
                    expiry: row.get(6)?,
                    strike: row.get(7)?,
                    lot_size: row.get(8)?,
                    instrument_type: instrument_type.parse::<InstrumentType>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(9, Type::Text, e.into())
                    })?,
                    tick_size: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} instruments from catalog database", instruments.len());
        Ok(instruments)
    }

    /// Stored instrument count
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM symtoken", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_SYMTOKEN_TABLE: &str = r#"
CREATE TABLE symtoken (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    broker_symbol TEXT NOT NULL,
    name TEXT,
    exchange TEXT NOT NULL,
    broker_exchange TEXT NOT NULL,
    token TEXT NOT NULL,
    expiry TEXT,
    strike REAL,
    lot_size INTEGER NOT NULL,
    instrument_type TEXT NOT NULL,
    tick_size REAL NOT NULL
);
CREATE UNIQUE INDEX idx_symtoken_symbol_exchange ON symtoken (symbol, exchange);
CREATE INDEX idx_symtoken_exchange_token ON symtoken (exchange, token);
CREATE INDEX idx_symtoken_broker_symbol ON symtoken (broker_symbol);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(symbol: &str, exchange: Exchange, token: &str) -> Instrument {
        Instrument {
            symbol: symbol.to_string(),
            broker_symbol: format!("{}:{}-EQ", exchange.broker_exchange(), symbol),
            name: Some(format!("{} LTD", symbol)),
            exchange,
            broker_exchange: exchange.broker_exchange().to_string(),
            token: token.to_string(),
            expiry: None,
            strike: None,
            lot_size: 1,
            instrument_type: InstrumentType::Equity,
            tick_size: 0.05,
        }
    }

    #[test]
    fn test_replace_and_load_roundtrip() {
        let db = CatalogDb::open_in_memory().unwrap();
        let instruments = vec![
            instrument("SBIN", Exchange::Nse, "1010"),
            instrument("TCS", Exchange::Bse, "2010"),
        ];

        db.replace_all(&instruments).unwrap();
        assert_eq!(db.count().unwrap(), 2);

        let mut loaded = db.load_all().unwrap();
        loaded.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        assert_eq!(loaded, instruments);
    }

    #[test]
    fn test_replace_overwrites_previous_generation() {
        let db = CatalogDb::open_in_memory().unwrap();
        db.replace_all(&[instrument("SBIN", Exchange::Nse, "1010")])
            .unwrap();
        db.replace_all(&[instrument("TCS", Exchange::Nse, "2020")])
            .unwrap();

        let loaded = db.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].symbol, "TCS");
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let db = CatalogDb::new(&path).unwrap();
            db.replace_all(&[instrument("SBIN", Exchange::Nse, "1010")])
                .unwrap();
        }

        let db = CatalogDb::new(&path).unwrap();
        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.load_all().unwrap()[0].token, "1010");
    }

    #[test]
    fn test_empty_database_loads_empty() {
        let db = CatalogDb::open_in_memory().unwrap();
        assert_eq!(db.count().unwrap(), 0);
        assert!(db.load_all().unwrap().is_empty());
    }
}
