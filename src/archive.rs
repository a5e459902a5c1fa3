use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::tile::{TileIndex, TileRecord};

fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS metadata (
          name TEXT NOT NULL,
          value TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS metadata_name ON metadata (name);

        CREATE TABLE IF NOT EXISTS tiles (
          zoom_level INTEGER NOT NULL,
          tile_column INTEGER NOT NULL,
          tile_row INTEGER NOT NULL,
          tile_data BLOB NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS tile_index ON tiles (zoom_level, tile_column, tile_row);",
    )
}

/// An MBTiles archive on disk.
#[derive(Debug)]
pub struct Archive {
    conn: Connection,
}

impl Archive {
    /// Opens the archive at `path`, creating the file and its schema if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening archive");

        let conn = Connection::open(path)?;
        create_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Starts a write session. Nothing is visible in the archive until
    /// [`ArchiveWriter::commit`] is called.
    pub fn writer(&mut self) -> Result<ArchiveWriter<'_>> {
        Ok(ArchiveWriter {
            tx: self.conn.transaction()?,
        })
    }

    pub fn tile_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Reads a tile addressed in the XYZ scheme.
    pub fn tile(&self, tile: &TileIndex) -> Result<Option<Vec<u8>>> {
        let data = self
            .conn
            .query_row(
                "SELECT tile_data FROM tiles
                 WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
                (tile.z, tile.x, tile.tms_row()),
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    /// All stored tiles in XYZ addressing, ordered by zoom, column and row.
    pub fn tiles(&self) -> Result<Vec<TileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT zoom_level, tile_column, tile_row, tile_data FROM tiles
             ORDER BY zoom_level, tile_column, tile_row",
        )?;
        let rows = stmt.query_map([], |row| {
            let z: u8 = row.get(0)?;
            let tms_row: u32 = row.get(2)?;
            let index = TileIndex::from_tms(z, row.get(1)?, tms_row).ok_or(
                rusqlite::Error::IntegralValueOutOfRange(2, i64::from(tms_row)),
            )?;
            Ok(TileRecord {
                index,
                data: row.get(3)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn metadata(&self, name: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// A single transaction of tile and metadata writes.
pub struct ArchiveWriter<'a> {
    tx: Transaction<'a>,
}

impl ArchiveWriter<'_> {
    /// Inserts `record`, replacing any tile already stored at its address.
    pub fn insert_tile(&self, record: &TileRecord) -> Result<()> {
        let index = &record.index;
        self.tx
            .prepare_cached(
                "INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute((index.z, index.x, index.tms_row(), &record.data))?;
        Ok(())
    }

    pub fn set_metadata(&self, name: &str, value: &str) -> Result<()> {
        self.tx
            .prepare_cached("INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)")?
            .execute([name, value])?;
        Ok(())
    }

    /// Lowest and highest zoom level stored, including rows written in this
    /// session.
    pub fn zoom_extent(&self) -> Result<Option<(u8, u8)>> {
        let extent: (Option<u8>, Option<u8>) = self.tx.query_row(
            "SELECT MIN(zoom_level), MAX(zoom_level) FROM tiles",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(match extent {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        })
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}
