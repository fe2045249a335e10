//! Local draw history
//!
//! Two append-only tables: `draws` holds one row per fresh draw and
//! `winners` one row per drawn account. A draw and its winners are always
//! written in a single transaction.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::models::{DrawRecord, DrawWithWinners, Participant, WinnerRecord};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS draws (
        id           INTEGER PRIMARY KEY,
        post_url     TEXT NOT NULL,
        draw_time    TEXT NOT NULL,
        winner_count INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS winners (
        id      INTEGER PRIMARY KEY,
        draw_id INTEGER NOT NULL REFERENCES draws(id),
        handle  TEXT NOT NULL,
        avatar  TEXT NOT NULL DEFAULT ''
    );

    CREATE INDEX IF NOT EXISTS idx_winners_draw_id ON winners(draw_id);
";

pub struct DrawLedger {
    conn: Mutex<Connection>,
}

impl DrawLedger {
    /// Open (or create) the ledger at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open draw ledger at {}", path.display()))?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("failed to set database pragmas")?;
        conn.execute_batch(SCHEMA)
            .context("failed to create ledger schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("draw ledger mutex poisoned"))
    }

    /// Append a draw and all of its winners. Either every row is written
    /// or none is.
    pub fn record_draw(
        &self,
        post_url: &str,
        draw_time: &str,
        winners: &[Participant],
    ) -> Result<DrawRecord> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin transaction")?;

        tx.execute(
            "INSERT INTO draws (post_url, draw_time, winner_count) VALUES (?1, ?2, ?3)",
            params![post_url, draw_time, winners.len() as u32],
        )
        .context("failed to insert draw")?;
        let draw_id = tx.last_insert_rowid();

        {
            let mut stmt = tx
                .prepare("INSERT INTO winners (draw_id, handle, avatar) VALUES (?1, ?2, ?3)")
                .context("failed to prepare winner insert")?;
            for winner in winners {
                stmt.execute(params![draw_id, winner.handle, winner.avatar])
                    .with_context(|| format!("failed to insert winner {}", winner.handle))?;
            }
        }

        tx.commit().context("failed to commit draw")?;

        info!(
            "Recorded draw {} for {} with {} winners",
            draw_id,
            post_url,
            winners.len()
        );

        Ok(DrawRecord {
            id: draw_id,
            post_url: post_url.to_string(),
            draw_time: draw_time.to_string(),
            winner_count: winners.len() as u32,
        })
    }

    /// Most recent draws first.
    pub fn recent_draws(&self, limit: u32) -> Result<Vec<DrawRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, post_url, draw_time, winner_count
             FROM draws ORDER BY id DESC LIMIT ?1",
        )?;

        let draws = stmt
            .query_map(params![limit], |row| {
                Ok(DrawRecord {
                    id: row.get(0)?,
                    post_url: row.get(1)?,
                    draw_time: row.get(2)?,
                    winner_count: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(draws)
    }

    pub fn get_draw(&self, id: i64) -> Result<Option<DrawRecord>> {
        let conn = self.conn()?;
        let draw = conn
            .query_row(
                "SELECT id, post_url, draw_time, winner_count FROM draws WHERE id = ?1",
                params![id],
                |row| {
                    Ok(DrawRecord {
                        id: row.get(0)?,
                        post_url: row.get(1)?,
                        draw_time: row.get(2)?,
                        winner_count: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(draw)
    }

    pub fn winners_for(&self, draw_id: i64) -> Result<Vec<WinnerRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, draw_id, handle, avatar FROM winners WHERE draw_id = ?1 ORDER BY id",
        )?;

        let winners = stmt
            .query_map(params![draw_id], |row| {
                Ok(WinnerRecord {
                    id: row.get(0)?,
                    draw_id: row.get(1)?,
                    handle: row.get(2)?,
                    avatar: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(winners)
    }

    /// Recent draws with their winners attached.
    pub fn history(&self, limit: u32) -> Result<Vec<DrawWithWinners>> {
        self.recent_draws(limit)?
            .into_iter()
            .map(|draw| -> Result<DrawWithWinners> {
                let winners = self.winners_for(draw.id)?;
                Ok(DrawWithWinners { draw, winners })
            })
            .collect()
    }

    pub fn draw_with_winners(&self, id: i64) -> Result<Option<DrawWithWinners>> {
        match self.get_draw(id)? {
            Some(draw) => {
                let winners = self.winners_for(draw.id)?;
                Ok(Some(DrawWithWinners { draw, winners }))
            }
            None => Ok(None),
        }
    }

    pub fn total_draws(&self) -> Result<u32> {
        let conn = self.conn()?;
        let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn total_winners(&self) -> Result<u32> {
        let conn = self.conn()?;
        let count: u32 = conn.query_row("SELECT COUNT(*) FROM winners", [], |row| row.get(0))?;
        Ok(count)
    }
}
